use std::fmt::Write;
use std::path::Path;

use form_spec::render::input_hint;
use form_spec::{
    AnswerSet, AnswerValue, FieldError, FieldKind, RenderField, RenderPayload, StoredResponse,
    accepts_file,
};

/// Controls which bits of state the fill session prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: field prompts only.
    Clean,
    /// Verbose output: status line and progress.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts, errors and the final answer set of a fill session.
pub struct FillPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_answers_json: bool,
}

impl FillPresenter {
    pub fn new(verbosity: Verbosity, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_answers_json,
        }
    }

    pub fn show_header(&mut self, payload: &RenderPayload) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", payload.form_title);
        if !payload.form_description.is_empty() {
            println!("{}", payload.form_description);
        }
        if payload.progress.total == 0 {
            println!("This form has no fields.");
        }
        println!("Type 'exit' to abort.");
        self.header_printed = true;
    }

    pub fn show_status(&self, payload: &RenderPayload) {
        if self.verbosity.is_verbose() {
            println!(
                "Status: {} ({}/{})",
                payload.status.as_str(),
                payload.progress.answered,
                payload.progress.total
            );
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.index, prompt.total, prompt.label);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        if let Some(current) = &prompt.current {
            println!("Current: {} (press enter to keep)", current);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_field_error(&self, label: &str, error: &FieldError) {
        eprintln!("{}: {}", label, error.message);
    }

    pub fn show_completion(&self, answer_set: &AnswerSet, response: &StoredResponse) {
        println!("Done ✅");
        println!("Response id: {}", response.id);
        match answer_set.to_cbor() {
            Ok(bytes) => {
                println!("Answers (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize answers to CBOR: {}", err);
            }
        }
        if self.show_answers_json {
            match answer_set.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => {
                    eprintln!("Failed to serialize answers to JSON: {}", err);
                }
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub description: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub current: Option<String>,
}

impl PromptContext {
    pub fn new(field: &RenderField, position: usize, total: usize) -> Self {
        Self {
            index: position + 1,
            total,
            label: field.label.clone(),
            description: field.description.clone(),
            required: field.required,
            hint: input_hint(field),
            current: field
                .current_value
                .as_ref()
                .filter(|value| !value.is_empty())
                .map(ToString::to_string),
        }
    }
}

/// Error produced when terminal input cannot become an answer value.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Turns one line of input into the value the stepper stores for `field`.
///
/// Blank input becomes the kind's empty value so the stepper decides whether
/// the field may stay unanswered.
pub fn parse_answer(field: &RenderField, raw: &str) -> Result<AnswerValue, AnswerParseError> {
    let raw = raw.trim();
    match field.kind {
        FieldKind::Checkbox => parse_flag(raw),
        FieldKind::SingleSelect | FieldKind::SingleChoice if !raw.is_empty() => {
            parse_option(field.options.as_deref().unwrap_or_default(), raw).map(AnswerValue::from)
        }
        FieldKind::MultiChoice => parse_choices(field.options.as_deref().unwrap_or_default(), raw),
        FieldKind::Scale if !raw.is_empty() => parse_scale(field.bounds, raw),
        FieldKind::File if !raw.is_empty() => {
            parse_file(field.accept.as_deref().unwrap_or_default(), raw)
        }
        _ => Ok(AnswerValue::from(raw)),
    }
}

fn parse_flag(raw: &str) -> Result<AnswerValue, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(AnswerValue::Flag(true)),
        "" | "false" | "f" | "no" | "n" | "0" => Ok(AnswerValue::Flag(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

/// Accepts an option label (case-insensitive) or its 1-based position.
fn parse_option(options: &[String], raw: &str) -> Result<String, AnswerParseError> {
    let by_position = raw
        .parse::<usize>()
        .ok()
        .and_then(|position| position.checked_sub(1))
        .and_then(|index| options.get(index));
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw))
        .or(by_position)
        .cloned()
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("Choose one of: {}.", options.join(", ")),
                Some(format!("allowed values: {}", options.join(", "))),
            )
        })
}

fn parse_choices(options: &[String], raw: &str) -> Result<AnswerValue, AnswerParseError> {
    let mut picked: Vec<String> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let option = parse_option(options, part)?;
        if !picked.contains(&option) {
            picked.push(option);
        }
    }
    Ok(AnswerValue::Choices(picked))
}

fn parse_scale(bounds: Option<(i64, i64)>, raw: &str) -> Result<AnswerValue, AnswerParseError> {
    let value = raw.parse::<i64>().map_err(|_| {
        AnswerParseError::new(
            "Please enter a whole number.",
            Some("expected integer".to_string()),
        )
    })?;
    if let Some((min_value, max_value)) = bounds
        && !(min_value..=max_value).contains(&value)
    {
        return Err(AnswerParseError::new(
            format!("Pick a value from {} to {}.", min_value, max_value),
            None,
        ));
    }
    Ok(AnswerValue::Text(value.to_string()))
}

/// The stored answer is the file name; the path itself never leaves the shell.
fn parse_file(accept: &[String], raw: &str) -> Result<AnswerValue, AnswerParseError> {
    let path = Path::new(raw);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AnswerParseError::new("Please enter a file path.", None))?;
    let mime_type = guess_mime_type(path);
    if !accepts_file(accept, file_name, mime_type) {
        return Err(AnswerParseError::new(
            format!("This file type is not accepted ({}).", accept.join(", ")),
            mime_type.map(|mime| format!("detected {}", mime)),
        ));
    }
    Ok(AnswerValue::from(file_name))
}

fn guess_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => return None,
    };
    Some(mime)
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut encoded, "{:02x}", byte);
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(kind: FieldKind) -> RenderField {
        RenderField {
            id: "f".into(),
            kind,
            label: "Field".into(),
            description: None,
            placeholder: None,
            required: false,
            options: Some(vec!["Red".into(), "Green".into(), "Blue".into()]),
            bounds: Some((1, 5)),
            accept: Some(vec!["image/*".into(), ".pdf".into()]),
            current_value: None,
            error: None,
        }
    }

    #[test]
    fn checkbox_accepts_yes_and_blank() {
        let checkbox = field(FieldKind::Checkbox);
        assert_eq!(
            parse_answer(&checkbox, "yes").expect("flag"),
            AnswerValue::Flag(true)
        );
        assert_eq!(
            parse_answer(&checkbox, "").expect("flag"),
            AnswerValue::Flag(false)
        );
        assert!(parse_answer(&checkbox, "maybe").is_err());
    }

    #[test]
    fn choices_match_label_or_position() {
        let single = field(FieldKind::SingleChoice);
        assert_eq!(
            parse_answer(&single, "green").expect("label"),
            AnswerValue::from("Green")
        );
        assert_eq!(
            parse_answer(&single, "3").expect("position"),
            AnswerValue::from("Blue")
        );
        assert!(parse_answer(&single, "purple").is_err());
        assert_eq!(
            parse_answer(&single, "").expect("blank"),
            AnswerValue::from("")
        );

        let multi = field(FieldKind::MultiChoice);
        assert_eq!(
            parse_answer(&multi, "red, 3, Red").expect("multi"),
            AnswerValue::Choices(vec!["Red".into(), "Blue".into()])
        );
    }

    #[test]
    fn scale_respects_bounds() {
        let scale = field(FieldKind::Scale);
        assert_eq!(
            parse_answer(&scale, "4").expect("scale"),
            AnswerValue::from("4")
        );
        assert!(parse_answer(&scale, "9").is_err());
        assert!(parse_answer(&scale, "two").is_err());
    }

    #[test]
    fn file_checked_against_accept_list() {
        let file = field(FieldKind::File);
        assert_eq!(
            parse_answer(&file, "/tmp/scans/receipt.PDF").expect("pdf"),
            AnswerValue::from("receipt.PDF")
        );
        assert_eq!(
            parse_answer(&file, "photo.jpeg").expect("image"),
            AnswerValue::from("photo.jpeg")
        );
        assert!(parse_answer(&file, "notes.txt").is_err());
    }

    #[test]
    fn text_kinds_pass_through() {
        let email = field(FieldKind::Email);
        assert_eq!(
            parse_answer(&email, "  not-an-email ").expect("text"),
            AnswerValue::from("not-an-email")
        );
    }

    #[test]
    fn hex_is_lowercase_pairs() {
        assert_eq!(encode_hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}

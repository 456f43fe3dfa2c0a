mod store;
mod wizard;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use form_spec::{
    Advance, AnswerMap, AnswerValue, Builder, FieldKind, FieldPatch, FormStore, FormValidation,
    RenderField, StoredForm, Stepper, StepperOptions, Submission,
    build_render_payload, form_schema, render_text, validate,
};
use store::JsonDirStore;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wizard::{FillPresenter, PromptContext, Verbosity, parse_answer};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("aborted by user")]
    Aborted,
    #[error("form {form_id} has no field '{field_id}'")]
    UnknownField { form_id: String, field_id: String },
    #[error("index {index} is out of range for a form with {len} fields")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("answers failed validation")]
    ValidationFailed,
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Build forms and fill them in step by step",
    long_about = "Edits form documents field by field, previews them, and runs guided completion sessions against a local JSON store"
)]
struct Cli {
    /// Directory holding forms and responses.
    #[arg(long, global = true, env = "FORMKIT_STORE_DIR", default_value = ".formkit")]
    store: PathBuf,
    /// Owner id recorded on new forms and used by `list`.
    #[arg(long, global = true, env = "FORMKIT_OWNER", default_value = "local")]
    owner: String,
    /// Log builder and stepper decisions to stderr.
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty form and print its id.
    New {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Structural edits on a stored form.
    Field {
        /// Id of the form to edit.
        form: String,
        #[command(subcommand)]
        action: FieldCommand,
    },
    /// Print a stored form.
    Show {
        form: String,
        /// Print the stored JSON document instead of the field listing.
        #[arg(long, conflicts_with = "preview")]
        json: bool,
        /// Print the form the way respondents see it.
        #[arg(long)]
        preview: bool,
    },
    /// List the forms of the current owner.
    List,
    /// Fill a form in the terminal and store the response.
    Fill {
        form: String,
        /// Show every field at once and validate on submit.
        #[arg(long)]
        review: bool,
        /// Skip the intro screen.
        #[arg(long)]
        no_intro: bool,
        /// Also print the answer set as JSON.
        #[arg(long)]
        answers_json: bool,
    },
    /// Validate an answers JSON file against a stored form.
    Validate {
        form: String,
        /// Path to the answers JSON object keyed by field id.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Print the stored responses of a form, one JSON object per line.
    Responses { form: String },
    /// Print the JSON Schema of a form document.
    Schema,
}

#[derive(Subcommand)]
enum FieldCommand {
    /// Append a field of the given type.
    Add {
        #[arg(value_name = "TYPE")]
        kind: FieldKind,
        #[command(flatten)]
        attributes: AttributeArgs,
    },
    /// Delete a field.
    Remove { field: String },
    /// Change attributes of a field.
    Update {
        field: String,
        /// Switch the field to another type.
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<FieldKind>,
        #[command(flatten)]
        attributes: AttributeArgs,
    },
    /// Move the field at FROM to TO (0-based).
    Move { from: usize, to: usize },
    /// Insert a copy of the field at INDEX right after it.
    Duplicate { index: usize },
}

#[derive(Args, Default)]
struct AttributeArgs {
    #[arg(long)]
    label: Option<String>,
    /// Empty string clears it.
    #[arg(long)]
    description: Option<String>,
    /// Empty string clears it.
    #[arg(long)]
    placeholder: Option<String>,
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    required: Option<bool>,
    /// Message shown instead of the default format error.
    #[arg(long)]
    error_message: Option<String>,
    /// Choice option; repeat for each option.
    #[arg(long = "option", value_name = "OPTION")]
    options: Vec<String>,
    #[arg(long = "min", allow_negative_numbers = true)]
    min_value: Option<i64>,
    #[arg(long = "max", allow_negative_numbers = true)]
    max_value: Option<i64>,
    /// Accepted file pattern (`image/*`, `.pdf`); repeat for each pattern.
    #[arg(long = "accept", value_name = "PATTERN")]
    accept: Vec<String>,
}

impl AttributeArgs {
    fn into_patch(self, kind: Option<FieldKind>) -> FieldPatch {
        FieldPatch {
            kind,
            label: self.label,
            description: self.description,
            placeholder: self.placeholder,
            required: self.required,
            error_message: self.error_message,
            options: non_empty(self.options),
            min_value: self.min_value,
            max_value: self.max_value,
            allowed_mime_types: non_empty(self.accept),
        }
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() { None } else { Some(values) }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let store = JsonDirStore::new(&cli.store);
    tracing::debug!(root = %store.root().display(), owner = %cli.owner, "using store");

    match cli.command {
        Command::New { title, description } => {
            run_new(&store, &cli.owner, title, description).await
        }
        Command::Field { form, action } => run_field(&store, &form, action).await,
        Command::Show {
            form,
            json,
            preview,
        } => run_show(&store, &form, json, preview).await,
        Command::List => run_list(&store, &cli.owner).await,
        Command::Fill {
            form,
            review,
            no_intro,
            answers_json,
        } => {
            let options = if review {
                StepperOptions::review()
            } else {
                StepperOptions::guided().show_intro(!no_intro)
            };
            run_fill(&store, &form, options, cli.verbose, answers_json).await
        }
        Command::Validate { form, answers } => run_validate(&store, &form, answers).await,
        Command::Responses { form } => run_responses(&store, &form),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&form_schema())?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init();
}

async fn run_new(
    store: &JsonDirStore,
    owner: &str,
    title: String,
    description: String,
) -> CliResult<()> {
    let mut builder = Builder::new();
    builder.set_title(title);
    builder.set_description(description);
    let stored = builder.save(store, owner).await?;
    println!("{}", stored.id);
    Ok(())
}

async fn run_field(store: &JsonDirStore, form_id: &str, action: FieldCommand) -> CliResult<()> {
    let stored = store.read(form_id).await?;
    let owner = stored.owner_id.clone();
    let mut builder = Builder::open(stored)?;
    let len = builder.document().len();
    let unknown = |field_id: &str| CliError::UnknownField {
        form_id: form_id.to_string(),
        field_id: field_id.to_string(),
    };

    let touched = match action {
        FieldCommand::Add { kind, attributes } => {
            let id = builder.add_field(kind);
            builder.update_field(id.as_str(), attributes.into_patch(None));
            Some(id)
        }
        FieldCommand::Remove { field } => {
            if !builder.remove_field(&field) {
                return Err(unknown(&field).into());
            }
            None
        }
        FieldCommand::Update {
            field,
            kind,
            attributes,
        } => {
            if !builder.update_field(&field, attributes.into_patch(kind)) {
                return Err(unknown(&field).into());
            }
            None
        }
        FieldCommand::Move { from, to } => {
            if !builder.move_field(from, to) {
                return Err(CliError::IndexOutOfRange {
                    index: from.max(to),
                    len,
                }
                .into());
            }
            None
        }
        FieldCommand::Duplicate { index } => Some(
            builder
                .duplicate_field(index)
                .ok_or(CliError::IndexOutOfRange { index, len })?,
        ),
    };

    let saved = builder.save(store, &owner).await?;
    if let Some(id) = touched {
        println!("{}", id);
    }
    print_issues(&builder);
    tracing::debug!(form_id = %saved.id, fields = saved.document.len(), "field edit applied");
    Ok(())
}

fn print_issues(builder: &Builder) {
    for issue in builder.issues() {
        match &issue.field {
            Some(field) => eprintln!("warning: field {}: {}", field, issue.attention),
            None => eprintln!("warning: form: {}", issue.attention),
        }
    }
}

async fn run_show(store: &JsonDirStore, form_id: &str, json: bool, preview: bool) -> CliResult<()> {
    let stored = store.read(form_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stored.document)?);
        return Ok(());
    }
    if preview {
        let stepper = Stepper::new(&stored.document, StepperOptions::review());
        println!("{}", render_text(&build_render_payload(&stepper)));
        return Ok(());
    }
    print_form(&stored);
    Ok(())
}

fn print_form(stored: &StoredForm) {
    let document = &stored.document;
    println!("Form: {} ({})", document.title, stored.id);
    if !document.description.is_empty() {
        println!("{}", document.description);
    }
    for (index, field) in document.fields.iter().enumerate() {
        let mut line = format!("[{}] {} {} \"{}\"", index, field.id, field.kind(), field.label);
        if field.required {
            line.push_str(" *");
        }
        println!("{}", line);
        if let Some(options) = field.options() {
            println!("    options: {}", options.join(", "));
        }
        if let Some((min_value, max_value)) = field.shape.bounds() {
            println!("    range: {}..{}", min_value, max_value);
        }
        if let Some(accept) = field.shape.allowed_mime_types() {
            println!("    accept: {}", accept.join(", "));
        }
        for attention in field.attention() {
            println!("    ! {}", attention);
        }
    }
}

async fn run_list(store: &JsonDirStore, owner: &str) -> CliResult<()> {
    let forms = store.list_by_owner(owner).await?;
    if forms.is_empty() {
        println!("No forms for owner '{}'.", owner);
    }
    for form in forms {
        println!(
            "{}\t{}\t{} fields\t{}",
            form.id,
            form.document.title,
            form.document.len(),
            form.updated_at
        );
    }
    Ok(())
}

async fn run_fill(
    store: &JsonDirStore,
    form_id: &str,
    options: StepperOptions,
    verbose: bool,
    answers_json: bool,
) -> CliResult<()> {
    let stored = store.read(form_id).await?;
    stored.document.check_integrity()?;
    let form = stored.document;
    let mut stepper = Stepper::new(&form, options);
    let mut presenter = FillPresenter::new(Verbosity::from_verbose(verbose), answers_json);
    presenter.show_header(&build_render_payload(&stepper));
    stepper.begin();

    loop {
        let payload = build_render_payload(&stepper);
        presenter.show_status(&payload);
        let total = payload.progress.total;

        let ready = match payload.step {
            Some(position) => {
                if let Some(field) = payload.fields.first() {
                    let value = prompt_field(&presenter, field, position, total)?;
                    stepper.set_value(&field.id, value);
                }
                match stepper.advance() {
                    Advance::Blocked(id) => {
                        show_error(&presenter, &stepper, id.as_str());
                        false
                    }
                    Advance::Submitted => true,
                    Advance::Moved(_) | Advance::Ignored => false,
                }
            }
            None => {
                let pending: Vec<(usize, &RenderField)> = payload
                    .fields
                    .iter()
                    .enumerate()
                    .filter(|(_, field)| field.current_value.is_none() || field.error.is_some())
                    .collect();
                for (position, field) in pending {
                    let value = prompt_field(&presenter, field, position, total)?;
                    stepper.set_value(&field.id, value);
                }
                true
            }
        };
        if !ready {
            continue;
        }

        match stepper.submit(store, form_id).await? {
            Submission::Submitted(response) => {
                presenter.show_completion(&stepper.answer_set(form_id), &response);
                return Ok(());
            }
            Submission::Blocked { .. } => {
                let failing: Vec<_> = stepper.errors().keys().cloned().collect();
                for id in failing {
                    show_error(&presenter, &stepper, id.as_str());
                }
            }
            Submission::NotReady => {
                tracing::debug!(state = ?stepper.state(), "submit not ready");
            }
        }
    }
}

fn show_error(presenter: &FillPresenter, stepper: &Stepper<'_>, id: &str) {
    if let (Some(field), Some(error)) = (stepper.form().field(id), stepper.error(id)) {
        presenter.show_field_error(&field.label, error);
    }
}

fn prompt_field(
    presenter: &FillPresenter,
    field: &RenderField,
    position: usize,
    total: usize,
) -> CliResult<AnswerValue> {
    let prompt = PromptContext::new(field, position, total);
    loop {
        presenter.show_prompt(&prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err(CliError::Aborted.into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err(CliError::Aborted.into());
        }
        if trimmed.is_empty()
            && let Some(current) = field.current_value.as_ref().filter(|value| !value.is_empty())
        {
            return Ok(current.clone());
        }

        match parse_answer(field, trimmed) {
            Ok(value) => return Ok(value),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

fn run_responses(store: &JsonDirStore, form_id: &str) -> CliResult<()> {
    for response in store.responses(form_id)? {
        println!("{}", serde_json::to_string(&response)?);
    }
    Ok(())
}

async fn run_validate(store: &JsonDirStore, form_id: &str, answers_path: PathBuf) -> CliResult<()> {
    let stored = store.read(form_id).await?;
    let answers_json = fs::read_to_string(answers_path)?;
    let answers: AnswerMap = serde_json::from_str(&answers_json)?;

    let result = validate(&stored.document, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err(CliError::ValidationFailed.into())
    }
}

fn describe_validation(result: &FormValidation) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for (field, error) in &result.errors {
            println!("  {} - {}", field, error.message);
        }
    }
    if !result.missing_required.is_empty() {
        let missing: Vec<&str> = result.missing_required.iter().map(|id| id.as_str()).collect();
        println!("Missing required answers: {}", missing.join(", "));
    }
    if !result.unknown_fields.is_empty() {
        let unknown: Vec<&str> = result.unknown_fields.iter().map(|id| id.as_str()).collect();
        println!("Unknown answer fields: {}", unknown.join(", "));
    }
}

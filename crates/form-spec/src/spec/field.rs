use std::{borrow::Borrow, fmt, str::FromStr};

use globset::{Glob, GlobSet, GlobSetBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Stable identifier of a field inside a form.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FieldId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Closed vocabulary of field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    ShortText,
    LongText,
    Email,
    Phone,
    Number,
    Date,
    Time,
    DateTime,
    SingleSelect,
    SingleChoice,
    MultiChoice,
    Scale,
    File,
    Signature,
}

impl FieldKind {
    pub const ALL: [FieldKind; 14] = [
        FieldKind::ShortText,
        FieldKind::LongText,
        FieldKind::Email,
        FieldKind::Phone,
        FieldKind::Number,
        FieldKind::Date,
        FieldKind::Time,
        FieldKind::DateTime,
        FieldKind::SingleSelect,
        FieldKind::SingleChoice,
        FieldKind::MultiChoice,
        FieldKind::Scale,
        FieldKind::File,
        FieldKind::Signature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::ShortText => "short_text",
            FieldKind::LongText => "long_text",
            FieldKind::Email => "email",
            FieldKind::Phone => "phone",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::DateTime => "date_time",
            FieldKind::SingleSelect => "single_select",
            FieldKind::SingleChoice => "single_choice",
            FieldKind::MultiChoice => "multi_choice",
            FieldKind::Scale => "scale",
            FieldKind::File => "file",
            FieldKind::Signature => "signature",
        }
    }

    /// Kinds whose answers are picked from an `options` list.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldKind::SingleSelect | FieldKind::SingleChoice | FieldKind::MultiChoice
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace('-', "_");
        FieldKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown field kind '{}'", value))
    }
}

/// Kind-specific attributes. Each variant carries only what applies to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldShape {
    ShortText,
    LongText,
    Email,
    Phone,
    Number,
    Date,
    Time,
    DateTime,
    SingleSelect {
        #[serde(default)]
        options: Vec<String>,
    },
    SingleChoice {
        #[serde(default)]
        options: Vec<String>,
    },
    MultiChoice {
        #[serde(default)]
        options: Vec<String>,
    },
    Scale {
        #[serde(default = "default_scale_min")]
        min_value: i64,
        #[serde(default = "default_scale_max")]
        max_value: i64,
    },
    File {
        #[serde(default)]
        allowed_mime_types: Vec<String>,
    },
    Signature,
}

pub const DEFAULT_SCALE_MIN: i64 = 1;
pub const DEFAULT_SCALE_MAX: i64 = 10;

fn default_scale_min() -> i64 {
    DEFAULT_SCALE_MIN
}

fn default_scale_max() -> i64 {
    DEFAULT_SCALE_MAX
}

fn default_options() -> Vec<String> {
    vec!["Option 1".to_string(), "Option 2".to_string()]
}

fn default_allowed_mime_types() -> Vec<String> {
    ["image/*", ".pdf", ".doc", ".docx"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl FieldShape {
    /// Default attributes for a freshly added field of `kind`.
    pub fn defaults(kind: FieldKind) -> Self {
        match kind {
            FieldKind::ShortText => FieldShape::ShortText,
            FieldKind::LongText => FieldShape::LongText,
            FieldKind::Email => FieldShape::Email,
            FieldKind::Phone => FieldShape::Phone,
            FieldKind::Number => FieldShape::Number,
            FieldKind::Date => FieldShape::Date,
            FieldKind::Time => FieldShape::Time,
            FieldKind::DateTime => FieldShape::DateTime,
            FieldKind::SingleSelect => FieldShape::SingleSelect {
                options: default_options(),
            },
            FieldKind::SingleChoice => FieldShape::SingleChoice {
                options: default_options(),
            },
            FieldKind::MultiChoice => FieldShape::MultiChoice {
                options: default_options(),
            },
            FieldKind::Scale => FieldShape::Scale {
                min_value: DEFAULT_SCALE_MIN,
                max_value: DEFAULT_SCALE_MAX,
            },
            FieldKind::File => FieldShape::File {
                allowed_mime_types: default_allowed_mime_types(),
            },
            FieldKind::Signature => FieldShape::Signature,
        }
    }

    /// Shape for `kind` when converting an existing field. Options survive a
    /// switch between choice kinds; everything else starts from defaults.
    pub fn for_kind_from(kind: FieldKind, previous: &FieldShape) -> Self {
        if previous.kind() == kind {
            return previous.clone();
        }
        match (kind.is_choice(), previous.options()) {
            (true, Some(options)) => {
                let options = options.to_vec();
                match kind {
                    FieldKind::SingleSelect => FieldShape::SingleSelect { options },
                    FieldKind::SingleChoice => FieldShape::SingleChoice { options },
                    _ => FieldShape::MultiChoice { options },
                }
            }
            _ => FieldShape::defaults(kind),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldShape::ShortText => FieldKind::ShortText,
            FieldShape::LongText => FieldKind::LongText,
            FieldShape::Email => FieldKind::Email,
            FieldShape::Phone => FieldKind::Phone,
            FieldShape::Number => FieldKind::Number,
            FieldShape::Date => FieldKind::Date,
            FieldShape::Time => FieldKind::Time,
            FieldShape::DateTime => FieldKind::DateTime,
            FieldShape::SingleSelect { .. } => FieldKind::SingleSelect,
            FieldShape::SingleChoice { .. } => FieldKind::SingleChoice,
            FieldShape::MultiChoice { .. } => FieldKind::MultiChoice,
            FieldShape::Scale { .. } => FieldKind::Scale,
            FieldShape::File { .. } => FieldKind::File,
            FieldShape::Signature => FieldKind::Signature,
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            FieldShape::SingleSelect { options }
            | FieldShape::SingleChoice { options }
            | FieldShape::MultiChoice { options } => Some(options),
            _ => None,
        }
    }

    pub fn options_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            FieldShape::SingleSelect { options }
            | FieldShape::SingleChoice { options }
            | FieldShape::MultiChoice { options } => Some(options),
            _ => None,
        }
    }

    /// `(min_value, max_value)` for scale fields.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            FieldShape::Scale {
                min_value,
                max_value,
            } => Some((*min_value, *max_value)),
            _ => None,
        }
    }

    pub fn allowed_mime_types(&self) -> Option<&[String]> {
        match self {
            FieldShape::File { allowed_mime_types } => Some(allowed_mime_types),
            _ => None,
        }
    }
}

/// Something the builder should flag before the form is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum Attention {
    MissingLabel,
    TooFewOptions { count: usize },
}

impl fmt::Display for Attention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attention::MissingLabel => write!(f, "label is empty"),
            Attention::TooFewOptions { count } => {
                write!(f, "needs at least 2 options (has {})", count)
            }
        }
    }
}

/// One field of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldDefinition {
    pub id: FieldId,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Overrides the per-kind format error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub shape: FieldShape,
}

impl FieldDefinition {
    pub fn kind(&self) -> FieldKind {
        self.shape.kind()
    }

    pub fn options(&self) -> Option<&[String]> {
        self.shape.options()
    }

    pub fn attention(&self) -> Vec<Attention> {
        let mut issues = Vec::new();
        if self.label.trim().is_empty() {
            issues.push(Attention::MissingLabel);
        }
        if let Some(options) = self.shape.options()
            && options.len() < 2
        {
            issues.push(Attention::TooFewOptions {
                count: options.len(),
            });
        }
        issues
    }
}

/// Default field of `kind` carrying the supplied identifier.
pub fn defaults_for(kind: FieldKind, id: FieldId) -> FieldDefinition {
    FieldDefinition {
        id,
        label: default_label(kind).to_string(),
        description: None,
        placeholder: default_placeholder(kind).map(String::from),
        required: false,
        error_message: None,
        shape: FieldShape::defaults(kind),
    }
}

pub fn default_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::ShortText => "Short answer",
        FieldKind::LongText => "Long answer",
        FieldKind::Email => "Email address",
        FieldKind::Phone => "Phone number",
        FieldKind::Number => "Number",
        FieldKind::Date => "Date",
        FieldKind::Time => "Time",
        FieldKind::DateTime => "Date and time",
        FieldKind::SingleSelect => "Dropdown",
        FieldKind::SingleChoice => "Single choice",
        FieldKind::MultiChoice => "Multiple choice",
        FieldKind::Scale => "Rating",
        FieldKind::File => "File upload",
        FieldKind::Signature => "Signature",
    }
}

pub fn default_placeholder(kind: FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::ShortText => Some("Your answer"),
        FieldKind::LongText => Some("Write your answer here"),
        FieldKind::Email => Some("name@example.com"),
        FieldKind::Phone => Some("555-123-4567"),
        FieldKind::Number => Some("0"),
        FieldKind::SingleSelect => Some("Select an option"),
        _ => None,
    }
}

/// Matches a picked file against an accept list in HTML `accept` style:
/// `.ext` entries match the file name, `type/subtype` and `type/*` entries
/// match the MIME type. An empty list accepts everything.
pub fn accepts_file(allowed: &[String], file_name: &str, mime_type: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let mut names = GlobSetBuilder::new();
    let mut mimes = GlobSetBuilder::new();
    for pattern in allowed {
        let pattern = pattern.trim().to_lowercase();
        if pattern.is_empty() {
            continue;
        }
        let (builder, glob) = if let Some(ext) = pattern.strip_prefix('.') {
            (&mut names, format!("*.{}", ext))
        } else if pattern.contains('/') {
            (&mut mimes, pattern)
        } else {
            (&mut names, pattern)
        };
        match Glob::new(&glob) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => tracing::debug!(pattern = %glob, error = %err, "skipping accept pattern"),
        }
    }
    let names = names.build().unwrap_or_else(|_| GlobSet::empty());
    let mimes = mimes.build().unwrap_or_else(|_| GlobSet::empty());

    names.is_match(file_name.to_lowercase())
        || mime_type.is_some_and(|mime| mimes.is_match(mime.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_parses_from_snake_case_and_dashes() {
        assert_eq!("date_time".parse::<FieldKind>(), Ok(FieldKind::DateTime));
        assert_eq!("multi-choice".parse::<FieldKind>(), Ok(FieldKind::MultiChoice));
        assert!("checkbox".parse::<FieldKind>().is_err());
    }

    #[test]
    fn defaults_cover_kind_specific_attributes() {
        let scale = defaults_for(FieldKind::Scale, "s".into());
        assert_eq!(scale.shape.bounds(), Some((1, 10)));

        let choice = defaults_for(FieldKind::SingleChoice, "c".into());
        assert_eq!(choice.options().map(<[String]>::len), Some(2));

        let file = defaults_for(FieldKind::File, "f".into());
        assert!(file.shape.allowed_mime_types().is_some_and(|types| !types.is_empty()));

        let email = defaults_for(FieldKind::Email, "e".into());
        assert!(email.options().is_none());
        assert_eq!(email.placeholder.as_deref(), Some("name@example.com"));
    }

    #[test]
    fn every_kind_has_matching_default_shape() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldShape::defaults(kind).kind(), kind);
        }
    }

    #[test]
    fn kind_change_keeps_options_between_choice_kinds() {
        let previous = FieldShape::SingleChoice {
            options: vec!["red".into(), "blue".into(), "green".into()],
        };
        let converted = FieldShape::for_kind_from(FieldKind::MultiChoice, &previous);
        assert_eq!(converted.options().map(<[String]>::len), Some(3));

        let to_scale = FieldShape::for_kind_from(FieldKind::Scale, &previous);
        assert_eq!(to_scale.bounds(), Some((1, 10)));
    }

    #[test]
    fn attributes_round_trip_with_flat_names() {
        let field = FieldDefinition {
            id: "rating".into(),
            label: "How likely?".into(),
            description: None,
            placeholder: None,
            required: true,
            error_message: None,
            shape: FieldShape::Scale {
                min_value: 0,
                max_value: 5,
            },
        };
        let value = serde_json::to_value(&field).expect("serialize");
        assert_eq!(value["type"], "scale");
        assert_eq!(value["min_value"], 0);
        assert_eq!(value["max_value"], 5);

        let upload: FieldDefinition = serde_json::from_value(json!({
            "id": "cv",
            "type": "file",
            "label": "CV",
            "allowed_mime_types": ["application/pdf"]
        }))
        .expect("deserialize");
        assert_eq!(
            upload.shape.allowed_mime_types(),
            Some(&["application/pdf".to_string()][..])
        );
        assert!(!upload.required);
    }

    #[test]
    fn scale_without_bounds_loads_defaults() {
        let bare: FieldDefinition = serde_json::from_value(json!({
            "id": "nps",
            "type": "scale",
            "label": "Rate us"
        }))
        .expect("deserialize");
        assert_eq!(bare.shape.bounds(), Some((DEFAULT_SCALE_MIN, DEFAULT_SCALE_MAX)));

        let half: FieldDefinition = serde_json::from_value(json!({
            "id": "nps",
            "type": "scale",
            "label": "Rate us",
            "max_value": 5
        }))
        .expect("deserialize");
        assert_eq!(half.shape.bounds(), Some((1, 5)));
    }

    #[test]
    fn choice_with_one_option_needs_attention() {
        let mut field = defaults_for(FieldKind::SingleSelect, "pick".into());
        assert!(field.attention().is_empty());
        if let Some(options) = field.shape.options_mut() {
            options.truncate(1);
        }
        field.label.clear();
        assert_eq!(
            field.attention(),
            vec![Attention::MissingLabel, Attention::TooFewOptions { count: 1 }]
        );
    }

    #[test]
    fn accept_list_matches_extensions_and_mime_globs() {
        let allowed = vec!["image/*".to_string(), ".pdf".to_string()];
        assert!(accepts_file(&allowed, "Resume.PDF", None));
        assert!(accepts_file(&allowed, "photo", Some("image/png")));
        assert!(!accepts_file(&allowed, "notes.txt", Some("text/plain")));
        assert!(accepts_file(&[], "anything.bin", None));
    }
}

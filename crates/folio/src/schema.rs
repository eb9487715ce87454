use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{ValidationError, ValidationIssue};
use crate::types::{Entry, RawRecord};

const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Date,
    Url,
    List(&'static FieldType),
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Date => "date",
            FieldType::Url => "url",
            FieldType::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub fields: &'static [Field],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Document with a `---`/`+++` delimited header followed by body text.
    Frontmatter,
    /// One JSON, TOML or YAML record per file.
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePattern {
    pub base: &'static str,
    pub extensions: &'static [&'static str],
    pub format: SourceFormat,
}

impl SourcePattern {
    pub fn base_dir(&self, root: &Path) -> PathBuf {
        root.join(self.base)
    }

    pub fn matches(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('_'))
            .unwrap_or(true);
        if hidden {
            return false;
        }

        path.extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(extension))
            })
            .unwrap_or(false)
    }
}

impl fmt::Display for SourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.extensions {
            [single] => write!(f, "{}/**/*.{}", self.base, single),
            many => write!(f, "{}/**/*.{{{}}}", self.base, many.join(",")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDefinition {
    pub name: &'static str,
    pub schema: Schema,
    pub source: SourcePattern,
}

pub const BLOG: CollectionDefinition = CollectionDefinition {
    name: "blog",
    schema: Schema {
        fields: &[
            Field::required("title", FieldType::Text),
            Field::required("author", FieldType::Text),
            Field::required("date", FieldType::Date),
            Field::optional("tags", FieldType::List(&FieldType::Text)),
            Field::optional("description", FieldType::Text),
            Field::optional("image", FieldType::Text),
        ],
    },
    source: SourcePattern {
        base: "src/data/blog",
        extensions: &["mdx"],
        format: SourceFormat::Frontmatter,
    },
};

pub const PROJECTS: CollectionDefinition = CollectionDefinition {
    name: "projects",
    schema: Schema {
        fields: &[
            Field::required("title", FieldType::Text),
            Field::required("description", FieldType::Text),
            Field::required("link", FieldType::Url),
        ],
    },
    source: SourcePattern {
        base: "src/data/projects",
        extensions: &["json"],
        format: SourceFormat::Data,
    },
};

// `date` stays free-form text here, e.g. "2020-2023".
pub const WORK: CollectionDefinition = CollectionDefinition {
    name: "work",
    schema: Schema {
        fields: &[
            Field::required("title", FieldType::Text),
            Field::required("company", FieldType::Text),
            Field::required("date", FieldType::Text),
        ],
    },
    source: SourcePattern {
        base: "src/data/work",
        extensions: &["json"],
        format: SourceFormat::Data,
    },
};

const REGISTRY: &[CollectionDefinition] = &[BLOG, PROJECTS, WORK];

pub fn registry() -> &'static [CollectionDefinition] {
    REGISTRY
}

pub fn lookup(name: &str) -> Option<&'static CollectionDefinition> {
    REGISTRY.iter().find(|definition| definition.name == name)
}

/// A typed record that can be built from fields its schema has already validated.
pub trait ContentRecord: Sized {
    const DEFINITION: &'static CollectionDefinition;

    fn from_fields(fields: ValidatedFields) -> Result<Self, ValidationError>;

    fn sort_entries(entries: &mut [Entry<Self>]) {
        entries.sort_by(|a, b| a.id.cmp(&b.id));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Url(Url),
    List(Vec<FieldValue>),
}

impl FieldValue {
    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Date(_) => "date",
            FieldValue::Url(_) => "url",
            FieldValue::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedFields {
    path: PathBuf,
    values: HashMap<&'static str, FieldValue>,
}

impl ValidatedFields {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn take(&mut self, name: &str) -> Option<FieldValue> {
        self.values.remove(name)
    }

    fn wrong_type(&self, name: &str, expected: &'static str, found: &FieldValue) -> ValidationError {
        ValidationError::new(
            &self.path,
            name,
            ValidationIssue::WrongType {
                expected,
                found: found.type_name(),
            },
        )
    }

    fn require(&mut self, name: &str) -> Result<FieldValue, ValidationError> {
        self.take(name)
            .ok_or_else(|| ValidationError::new(&self.path, name, ValidationIssue::Missing))
    }

    pub fn text(&mut self, name: &str) -> Result<String, ValidationError> {
        match self.require(name)? {
            FieldValue::Text(text) => Ok(text),
            other => Err(self.wrong_type(name, "text", &other)),
        }
    }

    pub fn optional_text(&mut self, name: &str) -> Result<Option<String>, ValidationError> {
        match self.take(name) {
            None => Ok(None),
            Some(FieldValue::Text(text)) => Ok(Some(text)),
            Some(other) => Err(self.wrong_type(name, "text", &other)),
        }
    }

    pub fn date(&mut self, name: &str) -> Result<NaiveDate, ValidationError> {
        match self.require(name)? {
            FieldValue::Date(date) => Ok(date),
            other => Err(self.wrong_type(name, "date", &other)),
        }
    }

    pub fn url(&mut self, name: &str) -> Result<Url, ValidationError> {
        match self.require(name)? {
            FieldValue::Url(url) => Ok(url),
            other => Err(self.wrong_type(name, "url", &other)),
        }
    }

    pub fn optional_text_list(&mut self, name: &str) -> Result<Option<Vec<String>>, ValidationError> {
        let items = match self.take(name) {
            None => return Ok(None),
            Some(FieldValue::List(items)) => items,
            Some(other) => return Err(self.wrong_type(name, "list", &other)),
        };

        let mut texts = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                FieldValue::Text(text) => texts.push(text),
                other => {
                    return Err(self.wrong_type(&format!("{name}[{index}]"), "text", &other));
                }
            }
        }
        Ok(Some(texts))
    }
}

impl Schema {
    /// Checks every declared field of `record`. Fields the schema does not declare
    /// are dropped.
    pub fn validate(&self, record: &RawRecord, path: &Path) -> Result<ValidatedFields, ValidationError> {
        let mut values = HashMap::with_capacity(self.fields.len());

        for field in self.fields {
            match record.get(field.name) {
                Some(value) => {
                    let validated = validate_value(value, field.field_type, path, field.name)?;
                    values.insert(field.name, validated);
                }
                None if field.required => {
                    return Err(ValidationError::new(path, field.name, ValidationIssue::Missing));
                }
                None => {}
            }
        }

        Ok(ValidatedFields {
            path: path.to_path_buf(),
            values,
        })
    }
}

fn validate_value(
    value: &Value,
    field_type: FieldType,
    path: &Path,
    label: &str,
) -> Result<FieldValue, ValidationError> {
    let wrong_type = || {
        ValidationError::new(
            path,
            label,
            ValidationIssue::WrongType {
                expected: field_type.name(),
                found: json_kind(value),
            },
        )
    };

    match field_type {
        FieldType::Text => value
            .as_str()
            .map(|text| FieldValue::Text(text.to_string()))
            .ok_or_else(wrong_type),
        FieldType::Date => {
            let text = date_text(value).ok_or_else(wrong_type)?;
            parse_date(text).map(FieldValue::Date).ok_or_else(|| {
                ValidationError::new(path, label, ValidationIssue::InvalidDate(text.to_string()))
            })
        }
        FieldType::Url => {
            let text = value.as_str().ok_or_else(wrong_type)?;
            Url::parse(text).map(FieldValue::Url).map_err(|_| {
                ValidationError::new(path, label, ValidationIssue::InvalidUrl(text.to_string()))
            })
        }
        FieldType::List(element_type) => {
            let items = value.as_array().ok_or_else(wrong_type)?;
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    validate_value(item, *element_type, path, &format!("{label}[{index}]"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::List)
        }
    }
}

// TOML front matter hands native dates over as a single-key table.
fn date_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => Some(text.as_str()),
        Value::Object(map) if map.len() == 1 => map.get(TOML_DATETIME_KEY).and_then(Value::as_str),
        _ => None,
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "text",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    fn path() -> PathBuf {
        PathBuf::from("src/data/blog/post.mdx")
    }

    #[test]
    fn test_registry_lists_collections() {
        let names: Vec<&str> = registry().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["blog", "projects", "work"]);
        assert_eq!(lookup("projects").unwrap().source.base, "src/data/projects");
        assert!(lookup("talks").is_none());
    }

    #[test]
    fn test_source_pattern_display() {
        assert_eq!(BLOG.source.to_string(), "src/data/blog/**/*.mdx");
        let pattern = SourcePattern {
            base: "data",
            extensions: &["json", "yaml"],
            format: SourceFormat::Data,
        };
        assert_eq!(pattern.to_string(), "data/**/*.{json,yaml}");
    }

    #[test]
    fn test_source_pattern_matches() {
        let source = BLOG.source;
        assert!(source.matches(Path::new("src/data/blog/hello.mdx")));
        assert!(source.matches(Path::new("src/data/blog/nested/HELLO.MDX")));
        assert!(!source.matches(Path::new("src/data/blog/hello.md")));
        assert!(!source.matches(Path::new("src/data/blog/_draft.mdx")));
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        for missing in ["title", "author", "date"] {
            let mut value = json!({
                "title": "Hello",
                "author": "Ada",
                "date": "2024-01-15",
            });
            value.as_object_mut().unwrap().remove(missing);
            let error = BLOG.schema.validate(&record(value), &path()).unwrap_err();
            assert_eq!(error.field, missing);
            assert_eq!(error.issue, ValidationIssue::Missing);
        }
    }

    #[test]
    fn test_optional_fields_absent() {
        let value = json!({"title": "Hello", "author": "Ada", "date": "2024-01-15"});
        let fields = BLOG.schema.validate(&record(value), &path()).unwrap();
        assert_eq!(fields.len(), 3);
        assert!(fields.get("tags").is_none());
        assert!(fields.get("description").is_none());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let value = json!({"title": 42, "author": "Ada", "date": "2024-01-15"});
        let error = BLOG.schema.validate(&record(value), &path()).unwrap_err();
        assert_eq!(
            error.issue,
            ValidationIssue::WrongType {
                expected: "text",
                found: "number"
            }
        );
    }

    #[test]
    fn test_optional_field_with_null_rejected() {
        let value = json!({"title": "Hello", "author": "Ada", "date": "2024-01-15", "image": null});
        let error = BLOG.schema.validate(&record(value), &path()).unwrap_err();
        assert_eq!(error.field, "image");
    }

    #[test]
    fn test_list_elements_validated_individually() {
        let value = json!({
            "title": "Hello",
            "author": "Ada",
            "date": "2024-01-15",
            "tags": ["rust", 7],
        });
        let error = BLOG.schema.validate(&record(value), &path()).unwrap_err();
        assert_eq!(error.field, "tags[1]");
    }

    #[test]
    fn test_invalid_date_rejected() {
        let value = json!({"title": "Hello", "author": "Ada", "date": "last tuesday"});
        let error = BLOG.schema.validate(&record(value), &path()).unwrap_err();
        assert_eq!(
            error.issue,
            ValidationIssue::InvalidDate("last tuesday".to_string())
        );
    }

    #[test]
    fn test_malformed_url_rejected() {
        let value = json!({"title": "Site", "description": "Desc", "link": "not a url"});
        let error = PROJECTS
            .schema
            .validate(&record(value), Path::new("p.json"))
            .unwrap_err();
        assert_eq!(error.field, "link");
        assert!(matches!(error.issue, ValidationIssue::InvalidUrl(_)));
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let value = json!({"title": "Engineer", "company": "Acme", "date": "2020-2023", "extra": true});
        let fields = WORK.schema.validate(&record(value), Path::new("w.json")).unwrap();
        assert_eq!(fields.len(), 3);
        assert!(fields.get("extra").is_none());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("2024-01-15T10:30:00Z"), expected);
        assert_eq!(parse_date("2024-01-15T10:30:00+02:00"), expected);
        assert_eq!(parse_date("2024-01-15T10:30:00"), expected);
        assert_eq!(parse_date("2024-13-45"), None);
    }

    #[test]
    fn test_toml_native_date() {
        let value = json!({
            "title": "Hello",
            "author": "Ada",
            "date": {"$__toml_private_datetime": "2024-01-15"},
        });
        let mut fields = BLOG.schema.validate(&record(value), &path()).unwrap();
        assert_eq!(fields.date("date").unwrap(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_typed_accessor_reports_wrong_type() {
        let value = json!({"title": "Hello", "author": "Ada", "date": "2024-01-15"});
        let mut fields = BLOG.schema.validate(&record(value), &path()).unwrap();
        let error = fields.text("date").unwrap_err();
        assert_eq!(
            error.issue,
            ValidationIssue::WrongType {
                expected: "text",
                found: "date"
            }
        );
    }
}

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error while {operation} {path}: {source}")]
    IoAt {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {message}")]
    TomlParse { path: PathBuf, message: String },

    #[error("YAML parse error in {path}: {message}")]
    YamlParse { path: PathBuf, message: String },

    #[error("JSON parse error in {path}: {message}")]
    JsonParse { path: PathBuf, message: String },

    #[error("Invalid frontmatter in file: {path}")]
    InvalidFrontmatter { path: PathBuf },

    #[error("Unsupported data file: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("Directory walk error in {path}: {message}")]
    WalkDir { path: PathBuf, message: String },

    #[error("Unknown collection: {name}")]
    UnknownCollection { name: String },

    #[error("Duplicate {collection} entry '{id}' in {path} conflicts with {existing_path}")]
    DuplicateEntry {
        collection: String,
        id: String,
        path: PathBuf,
        existing_path: PathBuf,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Image conversion failed for {path}: {message}")]
    Conversion { path: PathBuf, message: String },

    #[error("Invalid site configuration: {message}")]
    Configuration { message: String },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },
}

impl FolioError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn conversion(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::Conversion {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Validation failed for {path}: field '{field}' {issue}")]
pub struct ValidationError {
    pub path: PathBuf,
    pub field: String,
    pub issue: ValidationIssue,
}

impl ValidationError {
    pub fn new(path: impl AsRef<Path>, field: impl Into<String>, issue: ValidationIssue) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            field: field.into(),
            issue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    Missing,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    InvalidUrl(String),
    InvalidDate(String),
    NotAnObject,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Missing => write!(f, "is required but missing"),
            ValidationIssue::WrongType { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            ValidationIssue::InvalidUrl(value) => write!(f, "is not a valid URL: '{value}'"),
            ValidationIssue::InvalidDate(value) => write!(f, "is not a valid date: '{value}'"),
            ValidationIssue::NotAnObject => write!(f, "record must be a key/value object"),
        }
    }
}

pub trait IoContext<T> {
    fn io_context(self, operation: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, operation: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| FolioError::IoAt {
            operation,
            path: path.to_path_buf(),
            source,
        })
    }
}

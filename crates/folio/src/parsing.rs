use crate::error::{FolioError, Result, ValidationError, ValidationIssue};
use crate::types::RawRecord;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

pub fn extract_frontmatter(content: &str, path: &Path) -> Result<(RawRecord, String)> {
    let content = content.replace("\r\n", "\n");
    let content = content.trim_start_matches('\u{feff}').trim_start();

    if content.starts_with("+++") {
        parse_toml_frontmatter(content, path)
    } else if content.starts_with("---") {
        parse_yaml_frontmatter(content, path)
    } else {
        Ok((RawRecord::default(), content.to_string()))
    }
}

fn parse_toml_frontmatter(content: &str, path: &Path) -> Result<(RawRecord, String)> {
    let rest = &content[3..];

    let (end_index, body_start) =
        find_closing_delimiter(rest, "+++").ok_or_else(|| FolioError::InvalidFrontmatter {
            path: path.to_path_buf(),
        })?;

    let frontmatter_str = &rest[..end_index];
    let body = &rest[body_start..];

    let raw: HashMap<String, Value> =
        toml::from_str(frontmatter_str).map_err(|error| FolioError::TomlParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;

    Ok((RawRecord { raw }, body.trim().to_string()))
}

fn parse_yaml_frontmatter(content: &str, path: &Path) -> Result<(RawRecord, String)> {
    let rest = &content[3..];

    let (end_index, body_start) =
        find_closing_delimiter(rest, "---").ok_or_else(|| FolioError::InvalidFrontmatter {
            path: path.to_path_buf(),
        })?;

    let frontmatter_str = &rest[..end_index];
    let body = &rest[body_start..];

    let value: Value = if frontmatter_str.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_yml::from_str(frontmatter_str).map_err(|error| FolioError::YamlParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?
    };

    Ok((into_record(value, path)?, body.trim().to_string()))
}

/// Byte offsets of the start of the closing delimiter line and of the first
/// byte after it.
fn find_closing_delimiter(content: &str, delimiter: &str) -> Option<(usize, usize)> {
    let mut position = 0;

    for line in content.split_inclusive('\n') {
        let next = position + line.len();
        if line.trim() == delimiter {
            return Some((position, next));
        }
        position = next;
    }

    None
}

/// Parses a structured data file holding exactly one record. The format is
/// picked from the file extension.
pub fn parse_data_file(content: &str, path: &Path) -> Result<RawRecord> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
        .unwrap_or_default();

    let value: Value = match extension.as_str() {
        "json" => serde_json::from_str(content).map_err(|error| FolioError::JsonParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?,
        "toml" => toml::from_str(content).map_err(|error| FolioError::TomlParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?,
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|error| FolioError::YamlParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?,
        _ => {
            return Err(FolioError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };

    into_record(value, path)
}

fn into_record(value: Value, path: &Path) -> Result<RawRecord> {
    match value {
        Value::Object(map) => Ok(RawRecord {
            raw: map.into_iter().collect(),
        }),
        _ => Err(ValidationError::new(path, "<record>", ValidationIssue::NotAnObject).into()),
    }
}

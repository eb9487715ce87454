use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use url::Url;

use crate::error::ValidationError;
use crate::schema::{BLOG, CollectionDefinition, ContentRecord, PROJECTS, ValidatedFields, WORK};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    pub description: String,
    pub link: Url,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkEntry {
    pub title: String,
    pub company: String,
    pub date: String,
}

impl ContentRecord for BlogPost {
    const DEFINITION: &'static CollectionDefinition = &BLOG;

    fn from_fields(mut fields: ValidatedFields) -> Result<Self, ValidationError> {
        Ok(Self {
            title: fields.text("title")?,
            author: fields.text("author")?,
            date: fields.date("date")?,
            tags: fields.optional_text_list("tags")?,
            description: fields.optional_text("description")?,
            image: fields.optional_text("image")?,
        })
    }

    fn sort_entries(entries: &mut [Entry<Self>]) {
        entries.sort_by(|a, b| b.data.date.cmp(&a.data.date).then_with(|| a.id.cmp(&b.id)));
    }
}

impl ContentRecord for Project {
    const DEFINITION: &'static CollectionDefinition = &PROJECTS;

    fn from_fields(mut fields: ValidatedFields) -> Result<Self, ValidationError> {
        Ok(Self {
            title: fields.text("title")?,
            description: fields.text("description")?,
            link: fields.url("link")?,
        })
    }
}

impl ContentRecord for WorkEntry {
    const DEFINITION: &'static CollectionDefinition = &WORK;

    fn from_fields(mut fields: ValidatedFields) -> Result<Self, ValidationError> {
        Ok(Self {
            title: fields.text("title")?,
            company: fields.text("company")?,
            date: fields.text("date")?,
        })
    }
}

/// A validated record together with the file it was loaded from.
#[derive(Debug, Clone, Serialize)]
pub struct Entry<T> {
    pub id: String,
    pub path: PathBuf,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Collection<T> {
    pub name: String,
    pub entries: Vec<Entry<T>>,
}

impl<T> Collection<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entry<T>> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteContent {
    pub blog: Collection<BlogPost>,
    pub projects: Collection<Project>,
    pub work: Collection<WorkEntry>,
}

/// Untyped key/value pairs as read from front matter or a data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(flatten)]
    pub raw: HashMap<String, Value>,
}

impl RawRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn entry<T>(id: &str, data: T) -> Entry<T> {
        Entry {
            id: id.to_string(),
            path: PathBuf::from(format!("{id}.json")),
            data,
            body: None,
        }
    }

    fn post(title: &str, date: &str) -> BlogPost {
        BlogPost {
            title: title.to_string(),
            author: "Author".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            tags: None,
            description: None,
            image: None,
        }
    }

    #[test]
    fn test_blog_posts_sort_newest_first() {
        let mut entries = vec![
            entry("older", post("Older", "2023-01-01")),
            entry("newer", post("Newer", "2024-06-01")),
            entry("also-newer", post("Also Newer", "2024-06-01")),
        ];
        BlogPost::sort_entries(&mut entries);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["also-newer", "newer", "older"]);
    }

    #[test]
    fn test_collection_lookup_by_id() {
        let collection = Collection {
            name: "work".to_string(),
            entries: vec![entry(
                "acme",
                WorkEntry {
                    title: "Engineer".to_string(),
                    company: "Acme".to_string(),
                    date: "2020-2023".to_string(),
                },
            )],
        };
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("acme").unwrap().data.company, "Acme");
        assert!(collection.get("missing").is_none());
        assert_eq!(collection.entries[0].path, Path::new("acme.json"));
    }

    #[test]
    fn test_raw_record_access() {
        let mut raw = HashMap::new();
        raw.insert("title".to_string(), Value::String("Hello".to_string()));
        raw.insert("count".to_string(), Value::from(3));
        let record = RawRecord { raw };
        assert_eq!(record.get("title").and_then(Value::as_str), Some("Hello"));
        assert_eq!(record.get("count").and_then(Value::as_str), None);
        assert!(record.get("missing").is_none());
        assert!(!record.is_empty());
    }
}

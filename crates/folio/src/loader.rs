use crate::error::{FolioError, IoContext, Result};
use crate::parsing::{extract_frontmatter, parse_data_file};
use crate::schema::{CollectionDefinition, ContentRecord, SourceFormat};
use crate::types::{BlogPost, Collection, Entry, Project, SiteContent, WorkEntry};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Discovers, parses and validates collection sources below a project root.
///
/// Nothing is cached: every call re-reads and re-validates the files on disk.
pub struct CollectionLoader {
    root: PathBuf,
}

impl CollectionLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn load_site_content(&self) -> Result<SiteContent> {
        Ok(SiteContent {
            blog: self.load::<BlogPost>()?,
            projects: self.load::<Project>()?,
            work: self.load::<WorkEntry>()?,
        })
    }

    pub fn load<T: ContentRecord>(&self) -> Result<Collection<T>> {
        let definition = T::DEFINITION;
        let base_dir = definition.source.base_dir(&self.root);
        let mut entries = Vec::new();
        let mut seen_ids: HashMap<String, PathBuf> = HashMap::new();

        for path in self.discover(definition)? {
            let entry = self.load_entry::<T>(&path)?;

            if let Some(existing_path) = seen_ids.get(&entry.id) {
                return Err(FolioError::DuplicateEntry {
                    collection: definition.name.to_string(),
                    id: entry.id.clone(),
                    path,
                    existing_path: existing_path.clone(),
                });
            }
            seen_ids.insert(entry.id.clone(), path);
            entries.push(entry);
        }

        T::sort_entries(&mut entries);

        tracing::info!(
            collection = definition.name,
            source = %definition.source,
            count = entries.len(),
            "loaded collection from {}",
            base_dir.display()
        );

        Ok(Collection {
            name: definition.name.to_string(),
            entries,
        })
    }

    /// Parses and validates a single source file of collection `T`.
    pub fn load_entry<T: ContentRecord>(&self, path: &Path) -> Result<Entry<T>> {
        let definition = T::DEFINITION;
        let file_content = fs::read_to_string(path).io_context("reading", path)?;

        let (record, body) = match definition.source.format {
            SourceFormat::Frontmatter => {
                let (record, body) = extract_frontmatter(&file_content, path)?;
                (record, Some(body))
            }
            SourceFormat::Data => (parse_data_file(&file_content, path)?, None),
        };

        let fields = definition.schema.validate(&record, path)?;
        let data = T::from_fields(fields)?;

        let base_dir = definition.source.base_dir(&self.root);
        let id = entry_id(path, &base_dir);
        tracing::debug!(collection = definition.name, id = %id, "validated {}", path.display());

        Ok(Entry {
            id,
            path: path.to_path_buf(),
            data,
            body,
        })
    }

    fn discover(&self, definition: &CollectionDefinition) -> Result<Vec<PathBuf>> {
        let base_dir = definition.source.base_dir(&self.root);

        if !base_dir.exists() {
            tracing::debug!(
                collection = definition.name,
                "source directory {} does not exist",
                base_dir.display()
            );
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&base_dir).min_depth(1).into_iter() {
            let entry = entry.map_err(|error| FolioError::WalkDir {
                path: base_dir.clone(),
                message: error.to_string(),
            })?;

            let path = entry.path();
            if path.is_file() && definition.source.matches(path) {
                paths.push(path.to_path_buf());
            }
        }

        paths.sort();
        Ok(paths)
    }
}

pub fn load_site_content(root: impl AsRef<Path>) -> Result<SiteContent> {
    CollectionLoader::new(root).load_site_content()
}

/// Slug-style id: the path below the collection base without its extension,
/// lowercased, with `/` separators and whitespace replaced by `-`.
pub fn entry_id(path: &Path, base_dir: &Path) -> String {
    let relative = path.strip_prefix(base_dir).unwrap_or(path);
    let without_extension = relative.with_extension("");

    without_extension
        .to_string_lossy()
        .replace('\\', "/")
        .split('/')
        .map(|segment| {
            segment
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-")
                .to_lowercase()
        })
        .collect::<Vec<_>>()
        .join("/")
}

use crate::error::{FolioError, IoContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "folio.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub site: String,
    #[serde(default, alias = "trailingSlash")]
    pub trailing_slash: TrailingSlash,
    #[serde(default)]
    pub integrations: Vec<Integration>,
    #[serde(default, alias = "defaultLocale")]
    pub default_locale: Option<String>,
    #[serde(default)]
    pub locales: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    #[default]
    Ignore,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integration {
    Mdx,
    Vue,
    Sitemap,
    Tailwind,
}

impl SiteConfig {
    /// Reads `folio.toml` from `root` and validates it.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(FolioError::ConfigNotFound { path: config_path });
        }

        let content = fs::read_to_string(&config_path).io_context("reading config", &config_path)?;
        Self::from_toml_str(&content, &config_path)
    }

    /// Malformed TOML is a parse error; well-formed TOML with unknown keys or
    /// values is a configuration error.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self> {
        let table: toml::Table = content.parse().map_err(|error: toml::de::Error| {
            FolioError::TomlParse {
                path: path.to_path_buf(),
                message: error.to_string(),
            }
        })?;

        let mut config: SiteConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|error: toml::de::Error| {
                FolioError::configuration(format!("{}: {}", path.display(), error.message()))
            })?;

        config.site = config.site.trim_end_matches('/').to_string();
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        let mut seen = HashSet::new();
        for integration in &self.integrations {
            if !seen.insert(integration) {
                return Err(FolioError::configuration(format!(
                    "integration '{:?}' is listed more than once",
                    integration
                )));
            }
        }

        for (code, tag) in &self.locales {
            if code.trim().is_empty() {
                return Err(FolioError::configuration("locale codes must not be empty"));
            }
            if tag.trim().is_empty() {
                return Err(FolioError::configuration(format!(
                    "locale '{code}' has an empty regional tag"
                )));
            }
        }

        match (&self.default_locale, self.locales.is_empty()) {
            (Some(default), false) if !self.locales.contains_key(default) => {
                Err(FolioError::configuration(format!(
                    "default locale '{default}' is not one of the configured locales ({})",
                    self.locales.keys().cloned().collect::<Vec<_>>().join(", ")
                )))
            }
            (Some(default), true) => Err(FolioError::configuration(format!(
                "default locale '{default}' is set but no locales are configured"
            ))),
            (None, false) => Err(FolioError::configuration(
                "locales are configured but no default locale is set",
            )),
            _ => Ok(()),
        }
    }

    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.site).map_err(|error| {
            FolioError::configuration(format!("site '{}' is not a valid URL: {error}", self.site))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(FolioError::configuration(format!(
                "site '{}' must use http or https",
                self.site
            )));
        }

        Ok(url)
    }

    pub fn has_integration(&self, integration: Integration) -> bool {
        self.integrations.contains(&integration)
    }

    pub fn regional_tag(&self, locale: &str) -> Option<&str> {
        self.locales.get(locale).map(String::as_str)
    }

    /// Absolute URL for `path`. Non-default locales get a `/<code>` prefix and
    /// the trailing-slash policy is applied to the result.
    pub fn canonical_url(&self, path: &str, locale: Option<&str>) -> Result<String> {
        let prefix = match locale {
            None => String::new(),
            Some(code) if self.default_locale.as_deref() == Some(code) => String::new(),
            Some(code) if self.locales.contains_key(code) => format!("/{code}"),
            Some(code) => {
                return Err(FolioError::configuration(format!("unknown locale '{code}'")));
            }
        };

        let trimmed = path.trim_start_matches('/');
        let mut full_path = format!("{prefix}/{trimmed}");

        match self.trailing_slash {
            TrailingSlash::Ignore => {}
            TrailingSlash::Always => {
                if !full_path.ends_with('/') {
                    full_path.push('/');
                }
            }
            TrailingSlash::Never => {
                while full_path.len() > 1 && full_path.ends_with('/') {
                    full_path.pop();
                }
            }
        }

        if full_path == "/" && self.trailing_slash == TrailingSlash::Never {
            return Ok(self.site.clone());
        }

        Ok(format!("{}{}", self.site, full_path))
    }
}

//! Export configuration, persisted as JSON in the user's config directory.

use crate::error::{Error, Result};
use crate::export::Exporter;
use crate::path::{
    default_char_map, FilenameSanitizer, PathResolver, DEFAULT_ATTACHMENT_TEMPLATE,
    DEFAULT_MAX_LENGTH, DEFAULT_PAGE_TEMPLATE,
};
use crate::render::RenderOptions;
use crate::source::Source;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "CONFLUENCE_MARKDOWN_CONFIG";

const REDACTED: &str = "********";

/// Connection and credentials for a Confluence instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL, e.g. `https://example.atlassian.net/wiki`
    pub url: String,

    /// User name for basic authentication
    pub username: String,

    /// API token for basic authentication
    pub api_token: String,

    /// Personal access token (bearer authentication)
    pub pat: String,
}

impl AuthConfig {
    /// Check if a URL and some form of credentials are present.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
            && (!self.pat.is_empty() || (!self.username.is_empty() && !self.api_token.is_empty()))
    }

    /// Check if bearer authentication is used.
    pub fn uses_pat(&self) -> bool {
        !self.pat.is_empty()
    }
}

/// Retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retry failed requests at all
    pub enabled: bool,

    /// Multiplier between consecutive waits
    pub backoff_factor: u32,

    /// Upper bound on a single wait
    pub max_backoff_seconds: u64,

    /// Retries before giving up
    pub max_retries: u32,

    /// HTTP status codes worth retrying
    pub retry_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backoff_factor: 2,
            max_backoff_seconds: 60,
            max_retries: 5,
            retry_status_codes: vec![413, 429, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Wait before retry number `attempt` (starting at 0): 1s, then multiplied, capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_factor.max(1));
        let secs = factor
            .checked_pow(attempt)
            .unwrap_or(u64::MAX)
            .min(self.max_backoff_seconds);
        Duration::from_secs(secs)
    }

    /// Check if a status code should be retried.
    pub fn should_retry(&self, status: u16) -> bool {
        self.enabled && self.retry_status_codes.contains(&status)
    }
}

/// Everything an export run can be configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Root directory of the export
    pub output_directory: PathBuf,

    /// Path template for pages
    pub page_path: String,

    /// Path template for attachments
    pub attachment_path: String,

    /// Character substitutions applied to every file name segment
    pub filename_encoding: BTreeMap<String, String>,

    /// Maximum length of one file name segment
    pub filename_length: usize,

    /// Download attachments
    pub include_attachments: bool,

    /// Download every attachment, not only referenced ones
    pub export_all_attachments: bool,

    /// Markdown output options
    pub render: RenderOptions,

    /// Retry policy of the REST client
    pub retry: RetryConfig,

    /// Confluence connection
    pub auth: AuthConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            page_path: DEFAULT_PAGE_TEMPLATE.to_string(),
            attachment_path: DEFAULT_ATTACHMENT_TEMPLATE.to_string(),
            filename_encoding: default_char_map()
                .into_iter()
                .map(|(c, r)| (c.to_string(), r))
                .collect(),
            filename_length: DEFAULT_MAX_LENGTH,
            include_attachments: true,
            export_all_attachments: false,
            render: RenderOptions::default(),
            retry: RetryConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Location of the config file: `$CONFLUENCE_MARKDOWN_CONFIG`, or the platform config directory.
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("confluence-markdown")
                    .join("config.json")
            })
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Set a value by dotted key, e.g. `render.include_frontmatter`.
    ///
    /// `value` is parsed as JSON when possible and taken as a plain string
    /// otherwise. The key must already exist and the result must validate.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut tree = serde_json::to_value(&*self)?;
        let slot = key
            .split('.')
            .try_fold(&mut tree, |node, part| node.get_mut(part))
            .ok_or_else(|| Error::Config(format!("unknown setting `{}`", key)))?;

        *slot = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

        let updated: Self = serde_json::from_value(tree)
            .map_err(|e| Error::Config(format!("invalid value for `{}`: {}", key, e)))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Restore every setting to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check templates and limits.
    pub fn validate(&self) -> Result<()> {
        if self.filename_length == 0 {
            return Err(Error::Config("filename_length must be positive".to_string()));
        }
        if self.filename_encoding.keys().any(|k| k.chars().count() != 1) {
            return Err(Error::Config(
                "filename_encoding keys must be single characters".to_string(),
            ));
        }
        self.path_resolver().map(|_| ())
    }

    /// Build the path resolver from the templates and file name settings.
    pub fn path_resolver(&self) -> Result<PathResolver> {
        PathResolver::new(
            &self.page_path,
            &self.attachment_path,
            FilenameSanitizer::from_settings(&self.filename_encoding, self.filename_length),
        )
    }

    /// Build an exporter over `source` configured from these settings.
    pub fn exporter<'a>(&self, source: &'a dyn Source) -> Result<Exporter<'a>> {
        Ok(Exporter::new(source, self.output_directory.clone())
            .with_resolver(self.path_resolver()?)
            .with_options(self.render.clone())
            .with_attachments(self.include_attachments)
            .with_all_attachments(self.export_all_attachments))
    }

    /// JSON view with secrets masked, for display.
    pub fn redacted(&self) -> Value {
        let mut copy = self.clone();
        for secret in [&mut copy.auth.api_token, &mut copy.auth.pat] {
            if !secret.is_empty() {
                *secret = REDACTED.to_string();
            }
        }
        serde_json::to_value(copy).unwrap_or(Value::Null)
    }

    /// Set the output directory.
    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = dir.into();
        self
    }

    /// Set the page path template.
    pub fn with_page_path(mut self, template: impl Into<String>) -> Self {
        self.page_path = template.into();
        self
    }

    /// Set the attachment path template.
    pub fn with_attachment_path(mut self, template: impl Into<String>) -> Self {
        self.attachment_path = template.into();
        self
    }

    /// Set the render options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    /// Enable or disable attachment download.
    pub fn with_attachments(mut self, include: bool) -> Self {
        self.include_attachments = include;
        self
    }

    /// Set the connection.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::LinkStyle;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.page_path, DEFAULT_PAGE_TEMPLATE);
        assert_eq!(config.retry.retry_status_codes, vec![413, 429, 502, 503, 504]);
        assert!(config.include_attachments);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_set_dotted_key() {
        let mut config = ExportConfig::default();
        config.set("render.include_frontmatter", "false").unwrap();
        config.set("render.link_style", "absolute").unwrap();
        config.set("page_path", "{page_title}.md").unwrap();
        config.set("retry.max_retries", "2").unwrap();

        assert!(!config.render.include_frontmatter);
        assert_eq!(config.render.link_style, LinkStyle::Absolute);
        assert_eq!(config.page_path, "{page_title}.md");
        assert_eq!(config.retry.max_retries, 2);
    }

    #[test]
    fn test_set_rejects_unknown_and_invalid() {
        let mut config = ExportConfig::default();
        assert!(config.set("render.nope", "1").is_err());
        assert!(config.set("retry.max_retries", "many").is_err());

        let err = config.set("page_path", "{bogus}.md").unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate { .. }));
        assert_eq!(config.page_path, DEFAULT_PAGE_TEMPLATE);
    }

    #[test]
    fn test_save_load_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");

        let mut config = ExportConfig::default().with_page_path("{space_key}/{page_id}.md");
        config.save(&path).unwrap();
        let loaded = ExportConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        config.reset();
        assert_eq!(config, ExportConfig::default());
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ExportConfig::default());
    }

    #[test]
    fn test_retry_delay() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay(0), Duration::from_secs(1));
        assert_eq!(retry.delay(3), Duration::from_secs(8));
        assert_eq!(retry.delay(10), Duration::from_secs(60));
        assert!(retry.should_retry(429));
        assert!(!retry.should_retry(404));
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let config = ExportConfig::default().with_auth(AuthConfig {
            url: "https://wiki".into(),
            username: "me".into(),
            api_token: "secret".into(),
            pat: String::new(),
        });
        let json = config.redacted().to_string();
        assert!(!json.contains("secret"));
        assert!(json.contains(REDACTED));
    }
}

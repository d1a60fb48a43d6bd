//! Configuration management for Marginalia

use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Errors raised while reading configuration from the environment
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Rendering and matching configuration for one annotation surface
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    /// Tag name of the wrapper element inserted around marked text
    pub marker_tag: String,
    /// Attribute carrying the owning group id on every marker
    pub id_attribute: String,
    /// Prefix for marker class names (`{prefix}-item`, `{prefix}-stroke`, ...)
    pub class_prefix: String,
    /// Characters of prefix/suffix context captured around a selection
    pub context_len: usize,
    /// Error budget for the quote-only fallback search
    pub lenient_max_errors: usize,
    /// Minimum context score for a quote-with-context match
    pub context_threshold: f64,
    /// Elements whose content never occupies offset space
    pub excluded_tags: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            marker_tag: "mark".to_string(),
            id_attribute: "data-mark-id".to_string(),
            class_prefix: "mark".to_string(),
            context_len: 32,
            lenient_max_errors: 2,
            context_threshold: 0.3,
            excluded_tags: ["script", "style", "head", "noscript", "template"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl MarkerConfig {
    /// Load configuration from `MARKER_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            marker_tag: env::var("MARKER_TAG").unwrap_or(defaults.marker_tag),
            id_attribute: env::var("MARKER_ID_ATTRIBUTE").unwrap_or(defaults.id_attribute),
            class_prefix: env::var("MARKER_CLASS_PREFIX").unwrap_or(defaults.class_prefix),
            context_len: parse_var("MARKER_CONTEXT_LEN", defaults.context_len)?,
            lenient_max_errors: parse_var("MARKER_LENIENT_MAX_ERRORS", defaults.lenient_max_errors)?,
            context_threshold: parse_var("MARKER_CONTEXT_THRESHOLD", defaults.context_threshold)?,
            excluded_tags: match env::var("MARKER_EXCLUDED_TAGS") {
                Ok(list) => list
                    .split(',')
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect(),
                Err(_) => defaults.excluded_tags,
            },
        })
    }

    /// Whether content under this tag is skipped by offset computations
    pub fn is_excluded(&self, tag: &str) -> bool {
        self.excluded_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Class present on every marker element
    pub fn item_class(&self) -> String {
        format!("{}-item", self.class_prefix)
    }

    /// Fully-qualified state class, e.g. `mark-self-stroke`
    pub fn state_class(&self, state: &str) -> String {
        format!("{}-{}", self.class_prefix, state)
    }
}

/// Inputs for the command-line renderer
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub document_path: String,
    pub records_path: String,
    pub user_id: String,
    pub marker: MarkerConfig,
}

impl RenderJob {
    /// Build a job from positional arguments, falling back to
    /// `MARGINALIA_DOCUMENT`, `MARGINALIA_RECORDS` and `MARGINALIA_USER_ID`.
    pub fn from_env_and_args(args: &[String]) -> Result<Self, env::VarError> {
        let document_path = match args.first() {
            Some(path) => path.clone(),
            None => env::var("MARGINALIA_DOCUMENT")?,
        };
        let records_path = match args.get(1) {
            Some(path) => path.clone(),
            None => env::var("MARGINALIA_RECORDS")?,
        };
        let user_id = args
            .get(2)
            .cloned()
            .or_else(|| env::var("MARGINALIA_USER_ID").ok())
            .unwrap_or_default();

        let marker = MarkerConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!("Invalid marker config: {}, using defaults", e);
            MarkerConfig::default()
        });

        Ok(Self {
            document_path,
            records_path,
            user_id,
            marker,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MarkerConfig::default();
        assert_eq!(config.context_len, 32);
        assert_eq!(config.lenient_max_errors, 2);
        assert!(config.is_excluded("SCRIPT"));
        assert!(!config.is_excluded("p"));
    }

    #[test]
    fn test_class_names() {
        let config = MarkerConfig::default();
        assert_eq!(config.item_class(), "mark-item");
        assert_eq!(config.state_class("self-stroke"), "mark-self-stroke");
    }

    #[test]
    fn test_job_from_args() {
        let args = vec!["doc.xhtml".to_string(), "marks.json".to_string(), "u1".to_string()];
        let job = RenderJob::from_env_and_args(&args).unwrap();
        assert_eq!(job.document_path, "doc.xhtml");
        assert_eq!(job.records_path, "marks.json");
        assert_eq!(job.user_id, "u1");
    }
}

//! Job configuration and credentials loading
//!
//! Credentials come from a small INI-style file (`dl.cfg` by convention):
//!
//! ```text
//! [aws_keys]
//! access_key_id = AKIA...
//! secret_access_key = ...
//! region = us-west-2
//! ```
//!
//! The parsed [`Credentials`] are handed explicitly to the storage
//! constructor. The job never exports them into the process environment.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Default input root when no flag is given
pub const DEFAULT_INPUT_ROOT: &str = "s3://udacity-dend/";

/// Default output root when no flag is given
pub const DEFAULT_OUTPUT_ROOT: &str = "s3://songlake-warehouse/";

/// Section of the credentials file holding the storage keys
const CREDENTIALS_SECTION: &str = "aws_keys";

// ============================================================================
// Credentials
// ============================================================================

/// Storage credentials for object-store access
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket region, optional
    pub region: Option<String>,
}

impl Credentials {
    /// Load credentials from an INI-style file
    ///
    /// Fails with a named error if the `[aws_keys]` section or one of its
    /// required keys is absent.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read credentials file '{}': {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_str(&content)
    }

    /// Parse credentials from INI-style text
    pub fn from_str(content: &str) -> Result<Self> {
        let sections = parse_ini(content)?;
        let keys = sections
            .get(CREDENTIALS_SECTION)
            .ok_or_else(|| Error::config(format!("Missing section [{CREDENTIALS_SECTION}]")))?;

        let get = |key: &str| -> Result<String> {
            keys.get(key)
                .cloned()
                .ok_or_else(|| Error::missing_key(CREDENTIALS_SECTION, key))
        };

        Ok(Self {
            access_key_id: get("access_key_id")?,
            secret_access_key: get("secret_access_key")?,
            region: keys.get("region").cloned(),
        })
    }
}

/// Parse simple `[section] key = value` text into nested maps
///
/// Blank lines and lines starting with `#` or `;` are ignored. A key/value
/// pair outside any section is a configuration error.
fn parse_ini(content: &str) -> Result<HashMap<String, HashMap<String, String>>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_lowercase();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::config(format!(
                "Invalid line {} in credentials file: '{line}'",
                lineno + 1
            )));
        };

        let Some(section) = &current else {
            return Err(Error::config(format!(
                "Key '{}' appears before any [section] header",
                key.trim()
            )));
        };

        sections
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_lowercase(), value.trim().to_string());
    }

    Ok(sections)
}

// ============================================================================
// Job Config
// ============================================================================

/// Resolved configuration for one ETL run
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Root of the raw input datasets
    pub input_root: String,
    /// Root under which the five output datasets are written
    pub output_root: String,
    /// Optional storage credentials (absent means anonymous/local access)
    pub credentials: Option<Credentials>,
}

impl JobConfig {
    /// Create a job config with the default roots and no credentials
    pub fn new() -> Self {
        Self {
            input_root: DEFAULT_INPUT_ROOT.to_string(),
            output_root: DEFAULT_OUTPUT_ROOT.to_string(),
            credentials: None,
        }
    }

    /// Override the input root
    #[must_use]
    pub fn with_input_root(mut self, root: impl Into<String>) -> Self {
        self.input_root = root.into();
        self
    }

    /// Override the output root
    #[must_use]
    pub fn with_output_root(mut self, root: impl Into<String>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Attach storage credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let content = r"
# data lake credentials
[aws_keys]
access_key_id = AKIAEXAMPLE
secret_access_key = wJalrXUtnFEMI
region = us-west-2
";
        let creds = Credentials::from_str(content).unwrap();
        assert_eq!(creds.access_key_id, "AKIAEXAMPLE");
        assert_eq!(creds.secret_access_key, "wJalrXUtnFEMI");
        assert_eq!(creds.region.as_deref(), Some("us-west-2"));
    }

    #[test]
    fn test_region_is_optional() {
        let content = "[aws_keys]\naccess_key_id = a\nsecret_access_key = b\n";
        let creds = Credentials::from_str(content).unwrap();
        assert!(creds.region.is_none());
    }

    #[test]
    fn test_missing_section() {
        let err = Credentials::from_str("[other]\nkey = value\n").unwrap_err();
        assert!(err.to_string().contains("aws_keys"));
    }

    #[test]
    fn test_missing_key() {
        let content = "[aws_keys]\naccess_key_id = a\n";
        let err = Credentials::from_str(content).unwrap_err();
        assert!(err.to_string().contains("secret_access_key"));
    }

    #[test]
    fn test_repeated_section_merges_keys() {
        let content = "[aws_keys]\naccess_key_id = a\n[aws_keys]\nsecret_access_key = b\n";
        let creds = Credentials::from_str(content).unwrap();
        assert_eq!(creds.access_key_id, "a");
        assert_eq!(creds.secret_access_key, "b");
    }

    #[test]
    fn test_key_before_section_is_rejected() {
        let err = Credentials::from_str("access_key_id = a\n").unwrap_err();
        assert!(err.to_string().contains("before any [section]"));
    }

    #[test]
    fn test_job_config_builder() {
        let config = JobConfig::new()
            .with_input_root("/tmp/in")
            .with_output_root("/tmp/out");
        assert_eq!(config.input_root, "/tmp/in");
        assert_eq!(config.output_root, "/tmp/out");
        assert!(config.credentials.is_none());
    }
}

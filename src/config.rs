//! Configuration for a collection run
//!
//! A run can be described entirely in YAML and loaded with
//! [`CollectorConfig::load`]; command line flags are applied on top.
//!
//! ```yaml
//! tag: sunset
//! count: 1000
//! keyfile: keys.csv
//! output: sunset.csv
//! page_size: 40
//! transform: image-timestamp-likes
//! params:
//!   min_tag_id: "1024"
//! http:
//!   timeout_seconds: 30
//!   requests_per_hour: 5000
//! ```

use crate::credentials::CredentialPool;
use crate::engine::{EngineConfig, DEFAULT_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::http::{HttpFetcherConfig, ThrottleConfig};
use crate::ledger::Ledger;
use crate::pagination::DEFAULT_BASE_URL;
use crate::transform::TransformKind;
use crate::types::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-Level Collector Config
// ============================================================================

/// Complete description of one collection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Hashtag to search, with or without `#`
    #[serde(default)]
    pub tag: String,

    /// Records to collect in total
    #[serde(default)]
    pub count: u64,

    /// Inline credentials, tried before those from `keyfile`
    #[serde(default)]
    pub credentials: Vec<String>,

    /// File with one credential per line
    #[serde(default)]
    pub keyfile: Option<PathBuf>,

    /// CSV output file; its ledger lives next to it. Without one the run
    /// is kept in memory only.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// CSV field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Extra query parameters for the first request
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Record transform
    #[serde(default)]
    pub transform: TransformKind,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpSettings,

    /// Log level when no `RUST_LOG` is set
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_delimiter() -> char {
    ','
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            tag: String::new(),
            count: 0,
            credentials: Vec::new(),
            keyfile: None,
            output: None,
            delimiter: default_delimiter(),
            page_size: default_page_size(),
            base_url: default_base_url(),
            params: BTreeMap::new(),
            transform: TransformKind::default(),
            http: HttpSettings::default(),
            log_level: LogLevel::default(),
        }
    }
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Pace requests to at most this many per hour
    #[serde(default)]
    pub requests_per_hour: Option<u32>,
}

fn default_timeout() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: None,
            requests_per_hour: None,
        }
    }
}

// ============================================================================
// Loading and Validation
// ============================================================================

impl CollectorConfig {
    /// Parse a config from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Check that the run is fully described
    pub fn validate(&self) -> Result<()> {
        if self.tag.trim().trim_start_matches('#').is_empty() {
            return Err(Error::config("No tag given"));
        }
        if self.count == 0 {
            return Err(Error::config("Record count must be positive"));
        }
        if self.page_size == 0 {
            return Err(Error::config("Page size must be positive"));
        }
        if self.credentials.is_empty() && self.keyfile.is_none() {
            return Err(Error::config("No credentials or key file given"));
        }
        if self.http.timeout_seconds == 0 {
            return Err(Error::config("Timeout must be positive"));
        }
        if self.http.requests_per_hour == Some(0) {
            return Err(Error::config("requests_per_hour must be positive"));
        }
        Ok(())
    }

    /// Build the credential pool: inline credentials first, then the key file
    pub fn credential_pool(&self) -> Result<CredentialPool> {
        let mut tokens = self.credentials.clone();
        if let Some(keyfile) = &self.keyfile {
            let from_file = CredentialPool::from_keyfile(keyfile)?;
            tokens.extend(from_file.iter().map(|c| c.as_str().to_string()));
        }
        CredentialPool::new(tokens)
    }

    /// Engine settings
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tag: self.tag.clone(),
            target: self.count,
            page_size: self.page_size,
            base_url: self.base_url.clone(),
            extra_params: self
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// HTTP executor settings
    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        let mut builder =
            HttpFetcherConfig::builder().timeout(Duration::from_secs(self.http.timeout_seconds));
        if let Some(agent) = &self.http.user_agent {
            builder = builder.user_agent(agent);
        }
        if let Some(per_hour) = self.http.requests_per_hour {
            builder = builder.throttle(ThrottleConfig::per_hour(per_hour));
        }
        builder.build()
    }

    /// Ledger for the configured output
    pub fn ledger(&self) -> Result<Ledger> {
        match &self.output {
            Some(output) => Ledger::for_output(output),
            None => Ok(Ledger::in_memory()),
        }
    }
}

/// Parse a `key=value` query parameter
pub fn parse_param(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::config(format!(
            "Invalid parameter '{raw}', expected key=value"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const KEY_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const KEY_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
tag: sunset
count: 100
credentials:
  - "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
"#;

        let config = CollectorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.tag, "sunset");
        assert_eq!(config.count, 100);
        assert_eq!(config.page_size, 40);
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.base_url, "https://api.instagram.com/v1");
        assert_eq!(config.transform, TransformKind::Raw);
        assert_eq!(config.http, HttpSettings::default());
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.output.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r##"
tag: "#sunset"
count: 500
keyfile: keys.csv
output: out/sunset.csv
delimiter: ";"
page_size: 20
base_url: "http://localhost:8080/v1"
transform: image-timestamp-likes
params:
  min_tag_id: "1024"
http:
  timeout_seconds: 5
  user_agent: "collector-test"
  requests_per_hour: 3600
log_level: debug
"##;

        let config = CollectorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.keyfile, Some(PathBuf::from("keys.csv")));
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.transform, TransformKind::ImageTimestampLikes);
        assert_eq!(config.log_level, LogLevel::Debug);

        let engine = config.engine_config();
        assert_eq!(engine.tag, "#sunset");
        assert_eq!(engine.target, 500);
        assert_eq!(engine.page_size, 20);
        assert_eq!(engine.base_url, "http://localhost:8080/v1");
        assert_eq!(
            engine.extra_params,
            vec![("min_tag_id".to_string(), "1024".to_string())]
        );

        let fetcher = config.fetcher_config();
        assert_eq!(fetcher.timeout, Duration::from_secs(5));
        assert_eq!(fetcher.user_agent, "collector-test");
        assert_eq!(fetcher.throttle, Some(ThrottleConfig::per_hour(3600)));

        let ledger = config.ledger().unwrap();
        assert_eq!(
            ledger.progress_path().unwrap(),
            Path::new("out/sunset.log")
        );
    }

    #[test]
    fn test_unknown_transform_rejected() {
        let result = CollectorConfig::from_yaml("tag: a\ntransform: sepia\n");
        assert!(matches!(result, Err(Error::YamlParse(_))));
    }

    #[test]
    fn test_validate_rejects_incomplete_config() {
        let base = CollectorConfig {
            tag: "sunset".to_string(),
            count: 10,
            credentials: vec![KEY_A.to_string()],
            ..CollectorConfig::default()
        };
        assert!(base.validate().is_ok());

        let cases = [
            CollectorConfig {
                tag: "#".to_string(),
                ..base.clone()
            },
            CollectorConfig {
                count: 0,
                ..base.clone()
            },
            CollectorConfig {
                page_size: 0,
                ..base.clone()
            },
            CollectorConfig {
                credentials: Vec::new(),
                ..base.clone()
            },
            CollectorConfig {
                http: HttpSettings {
                    requests_per_hour: Some(0),
                    ..HttpSettings::default()
                },
                ..base.clone()
            },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(Error::Config { .. })));
        }
    }

    #[test]
    fn test_credential_pool_merges_inline_and_keyfile() {
        let mut keyfile = tempfile::NamedTempFile::new().unwrap();
        writeln!(keyfile, "client_id,owner").unwrap();
        writeln!(keyfile, "{KEY_B},someone").unwrap();

        let config = CollectorConfig {
            credentials: vec![KEY_A.to_string()],
            keyfile: Some(keyfile.path().to_path_buf()),
            ..CollectorConfig::default()
        };

        let pool = config.credential_pool().unwrap();
        let keys: Vec<&str> = pool.iter().map(|c| c.as_str()).collect();
        assert_eq!(keys, vec![KEY_A, KEY_B]);
    }

    #[test]
    fn test_credential_pool_errors() {
        let empty = CollectorConfig::default();
        assert!(matches!(
            empty.credential_pool(),
            Err(Error::InvalidCredential { .. })
        ));

        let short = CollectorConfig {
            credentials: vec!["short".to_string()],
            ..CollectorConfig::default()
        };
        assert!(matches!(
            short.credential_pool(),
            Err(Error::InvalidCredential { .. })
        ));

        let missing = CollectorConfig {
            keyfile: Some(PathBuf::from("/nonexistent/keys.csv")),
            ..CollectorConfig::default()
        };
        assert!(matches!(missing.credential_pool(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_ledger_without_output_is_in_memory() {
        let config = CollectorConfig::default();
        assert!(config.ledger().unwrap().is_in_memory());
        assert!(config.fetcher_config().throttle.is_none());
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("min_tag_id=42").unwrap(),
            ("min_tag_id".to_string(), "42".to_string())
        );
        assert_eq!(
            parse_param("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_param("empty=").unwrap().1, "");
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = CollectorConfig::load("/nonexistent/collector.yaml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}

//! Configuration: API credentials, harvest settings, and environment
//! overrides from `.env`.

use crate::models::{MethodLimit, TimeFilter};
use crate::throttle::{RetryConfig, ThrottleConfig};
use dotenv::dotenv;
use log::{debug, info};
use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Reddit script-app credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("could not read credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("missing credentials: {0} is empty")]
    Empty(PathBuf),

    #[error("could not parse credentials: {0}")]
    Parse(String),

    #[error("missing credentials field '{0}'")]
    MissingField(&'static str),
}

impl Credentials {
    pub const CLIENT_ID: &'static str = "CLIENT_ID";
    pub const CLIENT_SECRET: &'static str = "CLIENT_SECRET";
    pub const USER_AGENT: &'static str = "USER_AGENT";

    /// Read credentials from a JSON file holding `CLIENT_ID`,
    /// `CLIENT_SECRET` and `USER_AGENT`.
    pub fn load(path: &Path) -> Result<Self, CredentialsError> {
        let content = fs::read_to_string(path).map_err(|source| CredentialsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Err(CredentialsError::Empty(path.to_path_buf()));
        }
        let credentials = Self::parse(&content)?;
        debug!("Loaded credentials for client id {}", credentials.client_id);
        Ok(credentials)
    }

    pub fn parse(content: &str) -> Result<Self, CredentialsError> {
        let json: serde_json::Value =
            serde_json::from_str(content).map_err(|e| CredentialsError::Parse(e.to_string()))?;
        if !json.is_object() {
            return Err(CredentialsError::Parse(
                "expected a JSON object".to_string(),
            ));
        }

        let field = |name: &'static str| {
            json[name]
                .as_str()
                .map(String::from)
                .ok_or(CredentialsError::MissingField(name))
        };

        Ok(Self {
            client_id: field(Self::CLIENT_ID)?,
            client_secret: field(Self::CLIENT_SECRET)?,
            user_agent: field(Self::USER_AGENT)?,
        })
    }
}

/// Settings for a harvest run. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub subreddits: Vec<String>,
    /// Listing methods to walk for each subreddit, in order.
    pub methods: Vec<MethodLimit>,
    /// Time window for the `top` listing.
    pub top_time_filter: String,
    /// Comment records per batch file.
    pub batch_size: usize,
    pub output_dir: PathBuf,
    /// "Load more comments" placeholders expanded per post.
    pub max_expansions: usize,
    /// Pause after a comment fails to process, in seconds.
    pub error_cooldown_secs: u64,
    pub throttle: ThrottleConfig,
    pub retry: RetryConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            subreddits: Vec::new(),
            methods: ["hot", "new", "controversial", "rising", "top"]
                .into_iter()
                .map(|method| MethodLimit::new(method, 100))
                .collect(),
            top_time_filter: TimeFilter::default().to_string(),
            batch_size: 100,
            output_dir: PathBuf::from("reddit_data"),
            max_expansions: 30,
            error_cooldown_secs: 65,
            throttle: ThrottleConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no subreddits configured")]
    NoSubreddits,
}

impl HarvestConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded harvest configuration from {}", path.display());
        Ok(config)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_secs)
    }

    /// Subreddit names with any `r/` prefix removed.
    pub fn normalized_subreddits(&self) -> Vec<String> {
        self.subreddits
            .iter()
            .map(|s| s.trim().trim_start_matches('/'))
            .map(|s| s.strip_prefix("r/").unwrap_or(s).to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Application configuration derived from environment variables and .env file
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub credentials_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn load() -> Self {
        // Try to load .env file, but continue even if it doesn't exist
        match dotenv() {
            Ok(_) => info!("Loaded environment from .env file"),
            Err(_) => debug!("No .env file found, using system environment variables only"),
        }
        Self::from_env()
    }

    fn from_env() -> Self {
        let path_var = |name: &str| {
            env::var_os(name)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };
        Self {
            credentials_path: path_var("REDDIT_CREDENTIALS"),
            config_path: path_var("REDHARVEST_CONFIG"),
            output_dir: path_var("REDHARVEST_OUTPUT_DIR"),
        }
    }

    /// Where credentials are read from when none is given on the command
    /// line: `$REDDIT_CREDENTIALS`, else `~/.redharvest/credentials.json`.
    pub fn credentials_path(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.credentials_path.clone())
            .unwrap_or_else(default_credentials_path)
    }
}

fn default_credentials_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".redharvest");
    path.push("credentials.json");
    path
}

#[cfg(test)]
mod tests {
    mod credentials {
        use super::super::*;
        use std::io::Write;

        fn write_temp(content: &str) -> tempfile::NamedTempFile {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(content.as_bytes()).unwrap();
            file
        }

        #[test]
        fn it_loads_all_three_fields() {
            let file = write_temp(
                r#"{"CLIENT_ID": "id", "CLIENT_SECRET": "secret", "USER_AGENT": "harvester/0.1"}"#,
            );
            let credentials = Credentials::load(file.path()).unwrap();
            assert_eq!(
                credentials,
                Credentials {
                    client_id: "id".to_string(),
                    client_secret: "secret".to_string(),
                    user_agent: "harvester/0.1".to_string(),
                }
            );
        }

        #[test]
        fn it_rejects_an_empty_file() {
            let file = write_temp("  \n");
            let err = Credentials::load(file.path()).unwrap_err();
            assert!(matches!(err, CredentialsError::Empty(_)), "{err}");
            assert!(err.to_string().starts_with("missing credentials"));
        }

        #[test]
        fn it_rejects_malformed_json() {
            let file = write_temp("{\"CLIENT_ID\": ");
            let err = Credentials::load(file.path()).unwrap_err();
            assert!(matches!(err, CredentialsError::Parse(_)), "{err}");
        }

        #[test]
        fn it_rejects_json_that_is_not_an_object() {
            let err = Credentials::parse("[\"id\", \"secret\"]").unwrap_err();
            assert!(matches!(err, CredentialsError::Parse(_)), "{err}");
        }

        #[test]
        fn it_names_the_missing_field() {
            let err = Credentials::parse(r#"{"CLIENT_ID": "id", "USER_AGENT": "ua"}"#).unwrap_err();
            assert!(matches!(err, CredentialsError::MissingField("CLIENT_SECRET")));
        }

        #[test]
        fn it_rejects_non_string_fields() {
            let err = Credentials::parse(r#"{"CLIENT_ID": 12, "CLIENT_SECRET": "s", "USER_AGENT": "ua"}"#)
                .unwrap_err();
            assert!(matches!(err, CredentialsError::MissingField("CLIENT_ID")));
        }

        #[test]
        fn it_reports_unreadable_files() {
            let dir = tempfile::tempdir().unwrap();
            let err = Credentials::load(&dir.path().join("nope.json")).unwrap_err();
            assert!(matches!(err, CredentialsError::Io { .. }));
        }
    }

    mod harvest_config {
        use super::super::*;
        use std::io::Write;

        #[test]
        fn it_has_the_documented_defaults() {
            let config = HarvestConfig::default();
            assert_eq!(config.batch_size, 100);
            assert_eq!(config.max_expansions, 30);
            assert_eq!(config.error_cooldown(), Duration::from_secs(65));
            assert_eq!(config.top_time_filter.parse::<TimeFilter>().unwrap(), TimeFilter::Month);
            assert_eq!(config.methods.len(), 5);
            assert_eq!(config.methods[4], MethodLimit::new("top", 100));
            assert_eq!(config.throttle.max_calls, 30);
        }

        #[test]
        fn it_fills_in_defaults_for_missing_fields() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(
                file,
                r#"{{
                    "subreddits": ["solana", "r/ethereum"],
                    "methods": [{{"method": "top", "limit": 5}}],
                    "top_time_filter": "week",
                    "throttle": {{"max_calls": 10}}
                }}"#
            )
            .unwrap();

            let config = HarvestConfig::from_file(file.path()).unwrap();
            assert_eq!(config.normalized_subreddits(), vec!["solana", "ethereum"]);
            assert_eq!(config.methods, vec![MethodLimit::new("top", 5)]);
            assert_eq!(config.top_time_filter.parse::<TimeFilter>().unwrap(), TimeFilter::Week);
            assert_eq!(config.batch_size, 100);
            assert_eq!(config.throttle.max_calls, 10);
            assert_eq!(config.throttle.window_secs, 60);
        }

        #[test]
        fn it_reports_parse_errors_with_the_path() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(file, "{{ \"batch_size\": \"many\" }}").unwrap();
            let err = HarvestConfig::from_file(file.path()).unwrap_err();
            assert!(matches!(err, ConfigError::Parse { .. }));
        }

        #[test]
        fn it_rejects_unknown_time_filters() {
            let config = HarvestConfig {
                top_time_filter: "decade".to_string(),
                ..HarvestConfig::default()
            };
            assert!(config.top_time_filter.parse::<TimeFilter>().is_err());
        }
    }

    mod app_config {
        use super::super::*;

        #[test]
        fn it_prefers_an_explicit_credentials_path() {
            let config = AppConfig {
                credentials_path: Some(PathBuf::from("/env/creds.json")),
                ..AppConfig::default()
            };
            assert_eq!(
                config.credentials_path(Some(Path::new("/cli/creds.json"))),
                PathBuf::from("/cli/creds.json")
            );
            assert_eq!(config.credentials_path(None), PathBuf::from("/env/creds.json"));
        }

        #[test]
        fn it_falls_back_to_the_home_directory() {
            let path = AppConfig::default().credentials_path(None);
            assert!(path.ends_with(".redharvest/credentials.json"));
        }
    }
}

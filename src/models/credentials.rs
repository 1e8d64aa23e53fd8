//! API credentials loaded once at process start.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};

/// Environment variables that override values from the credentials file.
const ENV_OVERRIDES: [(&str, &str); 3] = [
    ("client_id", "SUBCRAWL_CLIENT_ID"),
    ("client_secret", "SUBCRAWL_CLIENT_SECRET"),
    ("refresh_token", "SUBCRAWL_REFRESH_TOKEN"),
];

/// OAuth application credentials plus a long-lived refresh token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Overrides `crawler.user_agent` when set
    pub user_agent: Option<String>,
}

impl Credentials {
    /// Load credentials from a `key = value` file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "Credentials file {} not found, relying on environment",
                    path.display()
                );
                String::new()
            }
            Err(e) => return Err(AppError::Io(e)),
        };
        Self::from_pairs(parse_pairs(&content), |key| std::env::var(key).ok())
    }

    /// Build credentials from parsed pairs, consulting `env` for overrides.
    fn from_pairs(
        mut pairs: HashMap<String, String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        for (key, var) in ENV_OVERRIDES {
            if let Some(value) = env(var).filter(|v| !v.trim().is_empty()) {
                pairs.insert(key.to_string(), value);
            }
        }

        let mut take = |key: &str| {
            pairs
                .remove(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::config(format!("credentials are missing '{key}'")))
        };

        Ok(Self {
            client_id: take("client_id")?,
            client_secret: take("client_secret")?,
            refresh_token: take("refresh_token")?,
            user_agent: take("user_agent").ok(),
        })
    }

    /// Parse credentials from file content without consulting the environment.
    pub fn parse(content: &str) -> Result<Self> {
        Self::from_pairs(parse_pairs(content), |_| None)
    }
}

// Secrets never reach the log.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("refresh_token", &"***")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Parse `key = value` lines, ignoring blanks, comments and `[section]` headers.
fn parse_pairs(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && !line.starts_with(';')
                && !line.starts_with('[')
        })
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim().to_lowercase(), value.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# app registered at the forum's preferences page
[DEFAULT]
client_id = abc123
client_secret = "s3cr3t"
refresh_token='r-token'
"#;

    #[test]
    fn test_parse_key_value_file() {
        let creds = Credentials::parse(SAMPLE).unwrap();
        assert_eq!(creds.client_id, "abc123");
        assert_eq!(creds.client_secret, "s3cr3t");
        assert_eq!(creds.refresh_token, "r-token");
        assert!(creds.user_agent.is_none());
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = Credentials::parse("client_id = x\nclient_secret = y").unwrap_err();
        assert!(err.to_string().contains("refresh_token"));
    }

    #[test]
    fn test_env_overrides_file() {
        let env = |key: &str| (key == "SUBCRAWL_REFRESH_TOKEN").then(|| "from-env".to_string());
        let creds = Credentials::from_pairs(parse_pairs(SAMPLE), env).unwrap();
        assert_eq!(creds.refresh_token, "from-env");
        assert_eq!(creds.client_id, "abc123");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::parse(SAMPLE).unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("r-token"));
    }
}

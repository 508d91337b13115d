/// Configuration management for the client
///
/// Configuration comes from defaults layered under `CHOREBOARD_*`
/// environment variables (a `.env` file is loaded first when present).
/// Nested keys use a double underscore.
///
/// # Environment Variables
///
/// - `CHOREBOARD_REMOTE__URL`: Hosted service base URL (required)
/// - `CHOREBOARD_REMOTE__ANON_KEY`: Public anon key (required)
/// - `CHOREBOARD_REMOTE__TIMEOUT_SECS`: Request timeout (default: 30)
/// - `CHOREBOARD_STORAGE__PATH`: Key-value store file (default: `.choreboard/store.json`)
/// - `CHOREBOARD_AUTH__RESTORE_SESSION`: Reuse the stored session on start (default: false)
/// - `CHOREBOARD_AUTH__EMAIL` / `CHOREBOARD_AUTH__PASSWORD`: Optional sign-in for the CLI
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use choreboard_client::config::ClientConfig;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = ClientConfig::from_env()?;
/// println!("Talking to {}", config.remote.url);
/// # Ok(())
/// # }
/// ```

use choreboard_shared::remote::rest::RestConfig;
use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub remote: RemoteSettings,

    pub storage: StorageSettings,

    pub auth: AuthSettings,
}

/// Hosted service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    pub url: String,

    pub anon_key: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// On-device storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub path: PathBuf,
}

/// Startup authentication behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// When false, any stored session is discarded at startup and the user
    /// has to sign in again
    pub restore_session: bool,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from `.env` and the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `CHOREBOARD_REMOTE__URL` or `CHOREBOARD_REMOTE__ANON_KEY` is missing
    /// - A variable has a value of the wrong type
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::load(None)
    }

    /// Loads configuration from an explicit variable map instead of the
    /// process environment
    pub fn from_vars(vars: HashMap<String, String>) -> anyhow::Result<Self> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> anyhow::Result<Self> {
        let config: ClientConfig = Config::builder()
            .set_default("remote.url", "")?
            .set_default("remote.anon_key", "")?
            .set_default("remote.timeout_secs", 30_i64)?
            .set_default("storage.path", ".choreboard/store.json")?
            .set_default("auth.restore_session", false)?
            .add_source(
                Environment::with_prefix("CHOREBOARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.remote.url.trim().is_empty() {
            anyhow::bail!("CHOREBOARD_REMOTE__URL environment variable is required");
        }
        if self.remote.anon_key.trim().is_empty() {
            anyhow::bail!("CHOREBOARD_REMOTE__ANON_KEY environment variable is required");
        }
        if self.remote.timeout_secs == 0 {
            anyhow::bail!("CHOREBOARD_REMOTE__TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }

    /// Connection settings for the REST backend
    pub fn rest_config(&self) -> RestConfig {
        RestConfig {
            url: self.remote.url.clone(),
            anon_key: self.remote.anon_key.clone(),
            timeout_secs: self.remote.timeout_secs,
        }
    }

    /// Sign-in credentials, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.auth.email, &self.auth.password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_vars(vars(&[
            ("CHOREBOARD_REMOTE__URL", "https://project.example.co"),
            ("CHOREBOARD_REMOTE__ANON_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.storage.path, PathBuf::from(".choreboard/store.json"));
        assert!(!config.auth.restore_session);
        assert_eq!(config.credentials(), None);
        assert_eq!(config.rest_config().anon_key, "anon");
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_vars(vars(&[
            ("CHOREBOARD_REMOTE__URL", "http://localhost:54321"),
            ("CHOREBOARD_REMOTE__ANON_KEY", "anon"),
            ("CHOREBOARD_REMOTE__TIMEOUT_SECS", "5"),
            ("CHOREBOARD_STORAGE__PATH", "/tmp/choreboard.json"),
            ("CHOREBOARD_AUTH__RESTORE_SESSION", "true"),
            ("CHOREBOARD_AUTH__EMAIL", "host@example.com"),
            ("CHOREBOARD_AUTH__PASSWORD", "secret1"),
        ]))
        .unwrap();

        assert_eq!(config.remote.timeout_secs, 5);
        assert!(config.auth.restore_session);
        assert_eq!(config.credentials(), Some(("host@example.com", "secret1")));
    }

    #[test]
    fn test_missing_url_is_rejected() {
        let err = ClientConfig::from_vars(vars(&[("CHOREBOARD_REMOTE__ANON_KEY", "anon")]))
            .unwrap_err();
        assert!(err.to_string().contains("CHOREBOARD_REMOTE__URL"));
    }
}

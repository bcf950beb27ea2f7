//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::poll::PollPolicy;

/// Page where DigitalOcean personal access tokens are issued.
pub const TOKEN_SETTINGS_URL: &str = "https://cloud.digitalocean.com/account/api/tokens";

/// DigitalOcean settings derived from defaults, configuration files and
/// `DIGITALOCEAN_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "DIGITALOCEAN",
    discovery(
        app_name = "skiff",
        env_var = "SKIFF_CONFIG_PATH",
        config_file_name = "skiff.toml",
        dotfile_name = ".skiff.toml",
        project_file_name = "skiff.toml"
    )
)]
pub struct DigitalOceanConfig {
    /// Personal access token used as the bearer credential. Required for any
    /// provider call.
    pub api_token: Option<String>,
    /// Base URL of the v2 API. Overridable so tests can point at a local
    /// responder.
    #[ortho_config(default = "https://api.digitalocean.com/v2".to_owned())]
    pub api_base_url: String,
    /// Image used when `create` is given none.
    #[ortho_config(default = "ubuntu-14-04-x64".to_owned())]
    pub default_image: String,
    /// Size used when `create` is given none.
    #[ortho_config(default = "512mb".to_owned())]
    pub default_size: String,
    /// Region used when `create` is given none.
    #[ortho_config(default = "nyc3".to_owned())]
    pub default_region: String,
    /// Directory that relative public key paths are resolved under.
    #[ortho_config(default = ".skiff/keys".to_owned())]
    pub keys_dir: String,
    /// JSON file holding the local instance inventory.
    #[ortho_config(default = ".skiff/instances.json".to_owned())]
    pub inventory_path: String,
    /// Interval between action status queries, in milliseconds.
    #[ortho_config(default = 5000)]
    pub action_poll_interval_ms: u64,
    /// Interval between power state queries, in milliseconds.
    #[ortho_config(default = 3000)]
    pub power_poll_interval_ms: u64,
    /// Optional cap on queries per wait. Unset means wait indefinitely.
    pub max_poll_attempts: Option<u32>,
}

impl DigitalOceanConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("skiff")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the API token, or an error explaining how to provide one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the token is absent or
    /// blank.
    pub fn api_token(&self) -> Result<&str, ConfigError> {
        match self.api_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ConfigError::MissingField(format!(
                "DigitalOcean API token: set DIGITALOCEAN_API_TOKEN or add api_token to \
                 skiff.toml; create a token at {TOKEN_SETTINGS_URL}"
            ))),
        }
    }

    /// Performs semantic validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the token is missing or a poll interval
    /// is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_token()?;
        if self.action_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "action_poll_interval_ms must be greater than zero",
            )));
        }
        if self.power_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "power_poll_interval_ms must be greater than zero",
            )));
        }
        if self.max_poll_attempts == Some(0) {
            return Err(ConfigError::Invalid(String::from(
                "max_poll_attempts must be greater than zero when set",
            )));
        }
        Ok(())
    }

    /// Poll policy for action completion waits.
    #[must_use]
    pub fn action_poll_policy(&self) -> PollPolicy {
        self.poll_policy(self.action_poll_interval_ms)
    }

    /// Poll policy for power-off waits.
    #[must_use]
    pub fn power_poll_policy(&self) -> PollPolicy {
        self.poll_policy(self.power_poll_interval_ms)
    }

    /// Directory used to resolve relative public key paths.
    #[must_use]
    pub fn keys_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.keys_dir)
    }

    /// Location of the instance inventory file.
    #[must_use]
    pub fn inventory_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.inventory_path)
    }

    fn poll_policy(&self, interval_ms: u64) -> PollPolicy {
        let policy = PollPolicy::new(Duration::from_millis(interval_ms));
        self.max_poll_attempts
            .map_or(policy, |max| policy.with_max_attempts(max))
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing {0}")]
    MissingField(String),
    /// Indicates a field holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

//! Client configuration
//!
//! Settings are layered the same way for every front end: built-in defaults,
//! an optional configuration file, then `ECOGASPI_*` environment variables
//! (nested keys use `__`, e.g. `ECOGASPI_API__BASE_URL`).

use crate::error::{CoreError, CoreResult};
use crate::session::AppProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the state directory
pub const STATE_DIR_ENV: &str = "ECOGASPI_STATE_DIR";

/// Top-level client settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Backend API configuration
    pub api: ApiSettings,

    /// Session behaviour
    pub session: SessionSettings,

    /// Directory holding persisted credentials and logs
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// API root without the version segment
    pub base_url: String,

    /// Version segment appended to `base_url`
    pub version: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Root URL for uploaded files
    pub upload_base_url: String,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Which front end this client acts as
    pub profile: AppProfile,

    /// Inactivity period after which the session is ended, in seconds
    pub idle_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            version: "v1".to_string(),
            timeout_secs: 30,
            user_agent: concat!("ecogaspi-client/", env!("CARGO_PKG_VERSION")).to_string(),
            upload_base_url: "http://localhost:8080/uploads".to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            profile: AppProfile::Admin,
            idle_timeout_secs: 30 * 60,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value fails to parse
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.version", defaults.api.version)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default("api.upload_base_url", defaults.api.upload_base_url)?
            .set_default("session.profile", "admin")?
            .set_default("session.idle_timeout_secs", defaults.session.idle_timeout_secs)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix("ECOGASPI")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check values that serde cannot
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is malformed or a duration is zero
    pub fn validate(&self) -> CoreResult<()> {
        for (name, value) in [
            ("api.base_url", &self.api.base_url),
            ("api.upload_base_url", &self.api.upload_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| CoreError::invalid_config(format!("{name} '{value}': {e}")))?;
        }

        if self.session.idle_timeout_secs == 0 {
            return Err(CoreError::invalid_config(
                "session.idle_timeout_secs must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Versioned API root, e.g. `http://localhost:8080/api/v1`
    pub fn full_api_url(&self) -> String {
        format!(
            "{}/{}",
            self.api.base_url.trim_end_matches('/'),
            self.api.version.trim_matches('/')
        )
    }

    /// Absolute URL for an API endpoint
    pub fn build_api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.full_api_url(), endpoint.trim_start_matches('/'))
    }

    /// Absolute URL for an uploaded file name
    pub fn build_upload_url(&self, filename: &str) -> String {
        format!(
            "{}/{}",
            self.api.upload_base_url.trim_end_matches('/'),
            filename.trim_start_matches('/')
        )
    }

    /// Resolve an image reference that may already be a full or data URL
    pub fn image_url(&self, filename: &str) -> String {
        if filename.is_empty() {
            return String::new();
        }
        if filename.starts_with("http") || filename.starts_with("data:") {
            return filename.to_string();
        }
        self.build_upload_url(filename)
    }

    /// Request timeout
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Inactivity period before the session is ended
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }

    /// Data directory, falling back to `ECOGASPI_STATE_DIR` then the platform data dir
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            std::env::var(STATE_DIR_ENV).map_or_else(
                |_| {
                    dirs::data_dir()
                        .unwrap_or_else(|| PathBuf::from("."))
                        .join("ecogaspi")
                },
                PathBuf::from,
            )
        })
    }
}

//! Configuration types for the to-do service.
//!
//! Settings load from an optional TOML file and are then overlaid with the
//! environment variables the original deployment used (`PORT`,
//! `WATSONX_AI_*`, `WHATSAPP_*`), so a bare `.env`-style setup keeps
//! working without a config file.

use crate::error::{Result, TodoError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Task-list persistence settings.
    pub storage: StorageConfig,
    /// Reminder scheduler settings.
    pub scheduler: SchedulerConfig,
    /// watsonx.ai text-generation settings.
    pub watsonx: WatsonxConfig,
    /// WhatsApp Cloud API settings.
    pub whatsapp: WhatsAppConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3001,
        }
    }
}

/// Task-list persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the JSON task document.
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/tasks.json"),
        }
    }
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between full resynchronizations from the task store.
    pub resync_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: 60,
        }
    }
}

/// watsonx.ai configuration.
///
/// The client is considered configured only when both `api_key` and
/// `project_id` are non-empty; otherwise the parse endpoint degrades to
/// its heuristic fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatsonxConfig {
    /// IBM Cloud IAM API key.
    pub api_key: String,
    /// watsonx.ai project id.
    pub project_id: String,
    /// Regional service endpoint.
    pub service_url: String,
    /// Text-generation model id.
    pub model_id: String,
    /// API version date pinned by the service.
    pub version: String,
    /// IAM token exchange endpoint.
    pub iam_url: String,
}

impl Default for WatsonxConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: String::new(),
            service_url: "https://us-south.ml.cloud.ibm.com".to_owned(),
            model_id: "ibm/granite-3-8b-instruct".to_owned(),
            version: "2024-05-31".to_owned(),
            iam_url: "https://iam.cloud.ibm.com/identity/token".to_owned(),
        }
    }
}

impl WatsonxConfig {
    /// Returns `true` when enough credentials are present to call the API.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.project_id.trim().is_empty()
    }
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Bearer token for the Graph API.
    pub access_token: String,
    /// Sending phone number id.
    pub phone_number_id: String,
    /// Recipient phone number (E.164, with or without leading `+`).
    pub to: String,
    /// Graph API base URL, overridable for tests.
    pub api_base: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            to: String::new(),
            api_base: "https://graph.facebook.com/v20.0".to_owned(),
        }
    }
}

impl WhatsAppConfig {
    /// Returns `true` when credentials and a recipient are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.access_token.trim().is_empty()
            && !self.phone_number_id.trim().is_empty()
            && !self.to.trim().is_empty()
    }
}

impl AppConfig {
    /// Load configuration: the TOML file at `path` (or the default path)
    /// when it exists, then the environment overlay.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path.map(Path::to_path_buf).or_else(Self::default_config_path) {
            Some(p) if p.exists() => Self::from_toml_file(&p)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TodoError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            TodoError::Config(format!("invalid config {}: {e}", path.display()))
        })
    }

    /// Default config file location (`~/.config/ingatin/config.toml`).
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ingatin").join("config.toml"))
    }

    /// Overlay settings from the environment.
    ///
    /// Unset variables leave the current value alone; `WATSONX_APIKEY` is
    /// accepted as a fallback spelling of the key variable.
    pub fn apply_env(&mut self) {
        if let Some(port) = env_var("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(host) = env_var("HOST") {
            self.server.host = host;
        }
        if let Some(file) = env_var("DATA_FILE") {
            self.storage.data_file = PathBuf::from(file);
        }

        if let Some(key) = env_var("WATSONX_AI_API_KEY").or_else(|| env_var("WATSONX_APIKEY")) {
            self.watsonx.api_key = key;
        }
        if let Some(project) = env_var("WATSONX_AI_PROJECT_ID") {
            self.watsonx.project_id = project;
        }
        if let Some(url) = env_var("WATSONX_AI_SERVICE_URL") {
            self.watsonx.service_url = url;
        }
        if let Some(model) = env_var("WATSONX_AI_MODEL_ID") {
            self.watsonx.model_id = model;
        }

        if let Some(token) = env_var("WHATSAPP_TOKEN") {
            self.whatsapp.access_token = token;
        }
        if let Some(id) = env_var("WHATSAPP_PHONE_ID") {
            self.whatsapp.phone_number_id = id;
        }
        if let Some(to) = env_var("WHATSAPP_TO") {
            self.whatsapp.to = to;
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn defaults_are_unconfigured() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.scheduler.resync_interval_secs, 60);
        assert!(!config.watsonx.is_configured());
        assert!(!config.whatsapp.is_configured());
        assert_eq!(config.watsonx.model_id, "ibm/granite-3-8b-instruct");
    }

    #[test]
    fn watsonx_needs_both_key_and_project() {
        let mut config = WatsonxConfig::default();
        config.api_key = "key".to_owned();
        assert!(!config.is_configured());
        config.project_id = "project".to_owned();
        assert!(config.is_configured());
    }

    #[test]
    fn toml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8080

[storage]
data_file = "/tmp/tasks.json"

[watsonx]
api_key = "k"
project_id = "p"
model_id = "ibm/granite-13b-chat-v2"
"#,
        )
        .unwrap();

        let config = AppConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.data_file, PathBuf::from("/tmp/tasks.json"));
        assert!(config.watsonx.is_configured());
        assert_eq!(config.watsonx.model_id, "ibm/granite-13b-chat-v2");
        // untouched section keeps its default
        assert_eq!(config.scheduler.resync_interval_secs, 60);
    }

    struct EnvGuard {
        key: &'static str,
        old: Option<std::ffi::OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let old = std::env::var_os(key);
            unsafe { std::env::set_var(key, value) };
            Self { key, old }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old {
                Some(v) => unsafe { std::env::set_var(self.key, v) },
                None => unsafe { std::env::remove_var(self.key) },
            }
        }
    }

    #[test]
    fn env_overlay_wins_over_defaults() {
        let _port = EnvGuard::set("PORT", "4545");
        let _key = EnvGuard::set("WATSONX_AI_API_KEY", "env-key");
        let _project = EnvGuard::set("WATSONX_AI_PROJECT_ID", "env-project");
        let _to = EnvGuard::set("WHATSAPP_TO", "+628111");

        let mut config = AppConfig::default();
        config.apply_env();

        assert_eq!(config.server.port, 4545);
        assert!(config.watsonx.is_configured());
        assert_eq!(config.watsonx.api_key, "env-key");
        assert_eq!(config.whatsapp.to, "+628111");
        // untouched values keep their defaults
        assert_eq!(config.watsonx.service_url, "https://us-south.ml.cloud.ibm.com");
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = 'not a table'").unwrap();
        assert!(AppConfig::from_toml_file(&path).is_err());
    }
}

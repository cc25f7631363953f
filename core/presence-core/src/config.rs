//! Configuration loading.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file
//! (`{config_dir}/editor-presence/config.toml`), environment overrides, then
//! whatever the CLI sets on top.

use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::activity::EditorBranding;
use crate::error::{PresenceError, Result};

/// Discord application id every login uses unless overridden.
pub const DEFAULT_CLIENT_ID: &str = "1331928227782066229";

pub const CONFIG_ENV: &str = "EDITOR_PRESENCE_CONFIG";
pub const CLIENT_ID_ENV: &str = "EDITOR_PRESENCE_CLIENT_ID";
pub const SOCKET_ENV: &str = "EDITOR_PRESENCE_SOCKET";

const CONFIG_DIR_NAME: &str = "editor-presence";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresenceConfig {
    pub client_id: String,
    pub update_interval_secs: u64,
    pub compact_after_secs: u64,
    pub login_timeout_secs: u64,
    pub socket_path: Option<PathBuf>,
    pub small_image_key: String,
    pub small_image_text: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        let branding = EditorBranding::default();
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            update_interval_secs: 15,
            compact_after_secs: 5,
            login_timeout_secs: 10,
            socket_path: None,
            small_image_key: branding.small_image_key,
            small_image_text: branding.small_image_text,
        }
    }
}

impl PresenceConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs.max(1))
    }

    pub fn compact_after(&self) -> Duration {
        Duration::from_secs(self.compact_after_secs)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs.max(1))
    }

    pub fn branding(&self) -> EditorBranding {
        EditorBranding {
            small_image_key: self.small_image_key.clone(),
            small_image_text: self.small_image_text.clone(),
        }
    }
}

/// Returns the path of the configuration file, honouring `EDITOR_PRESENCE_CONFIG`.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Reads a config file. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<PresenceConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(PresenceConfig::default())
        }
        Err(source) => {
            return Err(PresenceError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str(&content).map_err(|err| PresenceError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

/// Loads the effective configuration. Never fails: a broken file is logged
/// and replaced by defaults.
pub fn load_config() -> PresenceConfig {
    let mut config = match config_path() {
        Some(path) => load_config_from(&path).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Failed to load presence config; using defaults");
            PresenceConfig::default()
        }),
        None => PresenceConfig::default(),
    };
    apply_env_overrides(&mut config);
    config
}

fn apply_env_overrides(config: &mut PresenceConfig) {
    if let Some(client_id) = non_empty_env(CLIENT_ID_ENV) {
        config.client_id = client_id;
    }
    if let Some(socket) = non_empty_env(SOCKET_ENV) {
        config.socket_path = Some(PathBuf::from(socket));
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

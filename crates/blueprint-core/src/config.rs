use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// HubConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Group joined by connections that present no identity.
    #[serde(default = "default_group")]
    pub default_group: String,
    /// Event name used when pushing a resolved action to a participant.
    #[serde(default = "default_receive_action_method")]
    pub receive_action_method: String,
    /// Upper bound on a single connection delivery.
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
    /// Per-connection outbound buffer in the real-time transport.
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprints_dir: Option<PathBuf>,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_group() -> String {
    "actionClients".to_string()
}

fn default_receive_action_method() -> String {
    "ReceiveAction".to_string()
}

fn default_delivery_timeout_ms() -> u64 {
    5000
}

fn default_connection_buffer() -> usize {
    64
}

fn default_port() -> u16 {
    3141
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            default_group: default_group(),
            receive_action_method: default_receive_action_method(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            connection_buffer: default_connection_buffer(),
            blueprints_dir: None,
            port: default_port(),
        }
    }
}

impl HubConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: HubConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn delivery_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.default_group.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "default_group must not be empty".to_string(),
            });
        }

        if self.receive_action_method.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "receive_action_method must not be empty".to_string(),
            });
        }

        if self.delivery_timeout_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "delivery_timeout_ms must be greater than zero".to_string(),
            });
        } else if self.delivery_timeout_ms > 60_000 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "delivery_timeout_ms={} lets one slow connection hold its group lane for over a minute",
                    self.delivery_timeout_ms
                ),
            });
        }

        if self.connection_buffer == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "connection_buffer must be greater than zero".to_string(),
            });
        }

        if let Some(dir) = &self.blueprints_dir {
            if !dir.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("blueprints_dir '{}' is not a directory", dir.display()),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

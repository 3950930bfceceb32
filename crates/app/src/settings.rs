use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use banter_client::{DEFAULT_ENDPOINT, TransportConfig};
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const DEFAULT_DISPLAY_NAME: &str = "Name";
pub const SETTINGS_DIRECTORY_NAME: &str = "banter";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Persisted client settings. Everything has a default, so a missing or
/// partial settings file still yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            display_name: default_display_name(),
            reconnect: default_reconnect(),
        }
    }
}

impl ChatSettings {
    pub fn normalized(mut self) -> Self {
        self.endpoint = if self.endpoint.trim().is_empty() {
            default_endpoint()
        } else {
            self.endpoint.trim().to_string()
        };

        if self.display_name.trim().is_empty() {
            self.display_name = default_display_name();
        }

        self
    }

    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig::new(&self.endpoint).with_reconnect(self.reconnect)
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<ChatSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".banter"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> Arc<ChatSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: ChatSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &PathBuf) -> ChatSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
            return ChatSettings::default();
        }

        let figment =
            Figment::from(Serialized::defaults(ChatSettings::default())).merge(Json::file(path));

        match figment.extract::<ChatSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                ChatSettings::default()
            }
        }
    }

    fn persist(&self, settings: &ChatSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}

fn default_reconnect() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_restores_defaults_for_blank_fields() {
        let settings = ChatSettings {
            endpoint: "   ".to_string(),
            display_name: String::new(),
            reconnect: false,
        }
        .normalized();

        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.display_name, DEFAULT_DISPLAY_NAME);
        assert!(!settings.reconnect);
    }

    #[test]
    fn normalization_trims_the_endpoint() {
        let settings = ChatSettings {
            endpoint: " ws://chat.example.com/graphql ".to_string(),
            ..ChatSettings::default()
        }
        .normalized();

        assert_eq!(settings.endpoint, "ws://chat.example.com/graphql");
    }

    #[test]
    fn transport_config_carries_endpoint_and_reconnect() {
        let settings = ChatSettings {
            reconnect: false,
            ..ChatSettings::default()
        };

        let config = settings.to_transport_config();
        assert_eq!(config.endpoint, settings.endpoint);
        assert!(!config.reconnect);
    }
}

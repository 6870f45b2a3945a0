use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::bus::DEFAULT_MAX_DISPATCH_DEPTH;

pub const DEFAULT_FOCUS_DELAY_MS: u64 = 500;
pub const MAX_FOCUS_DELAY_MS: u64 = 10_000;
pub const SETTINGS_DIRECTORY_NAME: &str = "notecraft";
pub const SETTINGS_FILE_NAME: &str = "compose.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretGuardSettings {
    #[serde(default = "default_require_checksum")]
    pub require_checksum: bool,
}

impl Default for SecretGuardSettings {
    fn default() -> Self {
        Self {
            require_checksum: default_require_checksum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeSettings {
    #[serde(default = "default_focus_delay_ms")]
    pub focus_delay_ms: u64,
    #[serde(default = "default_max_dispatch_depth")]
    pub max_dispatch_depth: usize,
    #[serde(default)]
    pub secret_guard: SecretGuardSettings,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            focus_delay_ms: default_focus_delay_ms(),
            max_dispatch_depth: default_max_dispatch_depth(),
            secret_guard: SecretGuardSettings::default(),
        }
    }
}

impl ComposeSettings {
    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }

    pub fn normalized(mut self) -> Self {
        self.focus_delay_ms = self.focus_delay_ms.min(MAX_FOCUS_DELAY_MS);
        // Zero would reject even top-level publishes.
        if self.max_dispatch_depth == 0 {
            self.max_dispatch_depth = default_max_dispatch_depth();
        }
        self
    }
}

/// Compose settings backed by a JSON file, swapped atomically on update.
pub struct SettingsStore {
    settings: Arc<ArcSwap<ComposeSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".notecraft"))
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

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<ComposeSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: ComposeSettings) -> SettingsResult<()> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &Path) -> ComposeSettings {
        if !path.exists() {
            tracing::info!(path = %path.display(), "settings file not found, using defaults");
            return ComposeSettings::default();
        }

        let figment = Figment::from(Serialized::defaults(ComposeSettings::default()))
            .merge(Json::file(path));

        match figment.extract::<ComposeSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "failed to parse settings, using defaults"
                );
                ComposeSettings::default()
            }
        }
    }

    fn persist(&self, settings: &ComposeSettings) -> SettingsResult<()> {
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

        tracing::info!(path = %self.config_path.display(), "saved compose settings");
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

pub type SettingsResult<T> = Result<T, SettingsError>;

fn default_focus_delay_ms() -> u64 {
    DEFAULT_FOCUS_DELAY_MS
}

fn default_max_dispatch_depth() -> usize {
    DEFAULT_MAX_DISPATCH_DEPTH
}

fn default_require_checksum() -> bool {
    true
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use folio_engine::editing::{EditorConfig, HistoryConfig, InputRules};
use folio_engine::html::{ParseOptions, UnknownTagPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value in config file at {config_path}: {reason}")]
    InvalidValue { config_path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Undo steps kept per session.
    pub depth: usize,
    /// Keystrokes closer together than this undo as one step.
    pub coalesce_ms: u64,
}

impl Default for HistorySettings {
    fn default() -> Self {
        let defaults = HistoryConfig::default();
        HistorySettings {
            depth: defaults.depth,
            coalesce_ms: defaults.coalesce_window.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlSettings {
    pub unknown_tags: UnknownTagPolicy,
}

/// Rewrites applied while typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// `--` to an em dash, straight to curly quotes, `(c)` to a copyright sign.
    pub typography: bool,
    /// Link URLs once a space is typed after them.
    pub autolink: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        let defaults = InputRules::default();
        EditorSettings {
            typography: defaults.typography,
            autolink: defaults.autolink,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub documents_path: PathBuf,
    #[serde(default)]
    pub editor: EditorSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub html: HtmlSettings,
}

impl Config {
    pub fn new(documents_path: impl Into<PathBuf>) -> Self {
        Config {
            documents_path: documents_path.into(),
            editor: EditorSettings::default(),
            history: HistorySettings::default(),
            html: HtmlSettings::default(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        if config.history.depth == 0 {
            return Err(ConfigError::InvalidValue {
                config_path: config_path.to_path_buf(),
                reason: "history.depth must be at least 1".to_string(),
            });
        }

        config.documents_path =
            Self::expand_path(&config.documents_path).unwrap_or(config.documents_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/folio");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Session settings for the engine.
    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            history: HistoryConfig {
                depth: self.history.depth,
                coalesce_window: Duration::from_millis(self.history.coalesce_ms),
            },
            html: ParseOptions {
                unknown_tags: self.html.unknown_tags,
            },
            input_rules: InputRules {
                typography: self.editor.typography,
                autolink: self.editor.autolink,
            },
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        shellexpand::full(&path_str)
            .ok()
            .map(|expanded| PathBuf::from(expanded.as_ref()))
    }
}

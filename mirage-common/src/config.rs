//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a `mirage.toml` file. Values resolve in
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup: a warning is logged
//! and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MIRAGE_ROOT_FOLDER";

/// Environment variable pointing at a TOML config file
pub const CONFIG_FILE_ENV: &str = "MIRAGE_CONFIG";

/// Config file name looked up under the platform config directory
pub const CONFIG_FILE_NAME: &str = "mirage.toml";

/// Folder (under the root folder) holding the image corpus
pub const IMAGE_FOLDER_NAME: &str = "album_images";

/// Folder (under the root folder) holding the MIDI corpus
pub const AUDIO_FOLDER_NAME: &str = "music_audios";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the corpus directories (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Retrieval tuning; every key is optional and overrides a compiled default
    #[serde(default)]
    pub retrieval: RetrievalSection,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[retrieval]` table of `mirage.toml`
///
/// Enum-like values (`image_score`, `audio_mode`) are kept as strings here and
/// parsed by the engine, which owns their meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_slide: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub melody_channel: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_notes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_subspace: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mirage"))
        .unwrap_or_else(|| PathBuf::from("./mirage_data"))
}

/// Root folder resolution (CLI > ENV > TOML > compiled default)
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>) -> Self {
        Self { cli_arg }
    }

    /// Resolve the root folder against an already-loaded TOML config
    pub fn resolve(&self, toml_config: &TomlConfig) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            debug!(path = %path.display(), "Root folder from command line");
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(path = %path, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &toml_config.root_folder {
            debug!(path = %path.display(), "Root folder from TOML config");
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Image corpus directory under a root folder
pub fn image_corpus_dir(root_folder: &Path) -> PathBuf {
    root_folder.join(IMAGE_FOLDER_NAME)
}

/// MIDI corpus directory under a root folder
pub fn audio_corpus_dir(root_folder: &Path) -> PathBuf {
    root_folder.join(AUDIO_FOLDER_NAME)
}

/// Locate the config file: CLI path, then `MIRAGE_CONFIG`, then the
/// platform config directory (only if the file exists there)
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// `<config dir>/mirage/mirage.toml`, whether or not it exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mirage").join(CONFIG_FILE_NAME))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// No config file was located
    Defaults,
    /// Parsed from this file
    File(PathBuf),
    /// The file was located but unusable; compiled defaults are in effect
    Fallback { path: PathBuf, reason: String },
}

impl ConfigSource {
    /// Report the outcome of loading
    ///
    /// Kept separate from loading so a binary can read its log level from the
    /// file before the subscriber exists, then log once it does.
    pub fn log(&self) {
        match self {
            ConfigSource::Defaults => debug!("No config file found, using compiled defaults"),
            ConfigSource::File(path) => {
                info!(path = %path.display(), "Loaded configuration")
            }
            ConfigSource::Fallback { path, reason } => warn!(
                path = %path.display(),
                error = %reason,
                "Config file unusable, using compiled defaults"
            ),
        }
    }
}

/// Configuration plus its origin
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

/// Load config, degrading to defaults on any failure
///
/// Does not log; call [`ConfigSource::log`] once tracing is installed.
pub fn load_or_default(path: Option<&Path>) -> LoadedConfig {
    let Some(path) = path else {
        return LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::Defaults,
        };
    };

    match load_toml_config(path) {
        Ok(config) => LoadedConfig {
            config,
            source: ConfigSource::File(path.to_path_buf()),
        },
        Err(e) => LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::Fallback {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        },
    }
}

/// Write config atomically (temp file in the same directory, then rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, content)?;
    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }

    Ok(())
}

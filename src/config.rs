//=============================================
// nekoscript/config.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Engine and project configuration
// Objective: Load `neko.toml` engine settings and project manifests with
//            defaults for every field
//=============================================

use crate::tokenizer::SyntaxMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Engine configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "neko.toml";
/// Project manifest written by `neko init`.
pub const MANIFEST_FILE: &str = "neko-projet.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("lecture de {} impossible : {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration invalide dans {} : {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("sérialisation de la configuration impossible : {0}")]
    Serialize(#[from] toml::ser::Error),
}

//=============================================
//            Section 1: Engine Configuration
//=============================================

/// Configuration model for the engine loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub web: WebSection,
    pub messaging: MessagingSection,
    pub game: GameSection,
    pub registry: RegistrySection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSection {
    pub parse_mode: SyntaxMode,
    pub max_call_depth: usize,
    /// Mirror `nekAfficher` lines to stdout as they are printed.
    pub echo_output: bool,
    /// Upper bound for one `attendre`/`nekAttendre` pause.
    pub max_sleep_ms: u64,
    /// How long `demarrer` waits for a program body before handing back its id.
    pub startup_grace_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            parse_mode: SyntaxMode::Lenient,
            max_call_depth: 200,
            echo_output: false,
            max_sleep_ms: 60_000,
            startup_grace_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSection {
    pub host: String,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagingSection {
    pub api_base: String,
    pub poll_interval_ms: u64,
}

impl Default for MessagingSection {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
            poll_interval_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GameSection {
    pub ticks_per_second: u32,
    pub max_immediate_frames: u32,
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            max_immediate_frames: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrySection {
    pub url: String,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000/api".to_string(),
        }
    }
}

impl EngineConfig {
    /// `./neko.toml`, then the user config directory, then defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let candidates = [Some(PathBuf::from(LOCAL_CONFIG_FILE)), Self::user_config_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading engine configuration");
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nekoscript").join("config.toml"))
    }

    /// Persist the configuration back to disk.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

//=============================================
//            Section 2: Project Manifest
//=============================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProjectManifest {
    pub projet: ProjectSection,
    #[serde(default)]
    pub dependances: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProjectSection {
    pub nom: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_entry")]
    pub entree: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_entry() -> String {
    "principal.neko".to_string()
}

impl ProjectManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            projet: ProjectSection {
                nom: name.into(),
                version: default_version(),
                entree: default_entry(),
            },
            dependances: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            "[engine]\nparse_mode = \"strict\"\n\n[game]\nticks_per_second = 30\n",
        )
        .expect("valid toml");
        assert_eq!(config.engine.parse_mode, SyntaxMode::Strict);
        assert_eq!(config.engine.max_call_depth, 200);
        assert_eq!(config.engine.max_sleep_ms, 60_000);
        assert_eq!(config.game.ticks_per_second, 30);
        assert_eq!(config.game.max_immediate_frames, 600);
        assert_eq!(config.web.host, "127.0.0.1");
    }

    #[test]
    fn manifest_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(MANIFEST_FILE);
        let mut manifest = ProjectManifest::new("chatbot");
        manifest
            .dependances
            .insert("outils".to_string(), "1.0.0".to_string());
        manifest.save(&path).expect("save");

        let loaded = ProjectManifest::load(&path).expect("load");
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.projet.entree, "principal.neko");
    }
}

//! User preferences
//!
//! Read from `autopackager/config.toml` in each of `$XDG_CONFIG_DIRS`, then
//! `$XDG_CONFIG_HOME`. Later files override earlier ones key by key.
//!
//! ```toml
//! cache_dir = "/var/cache/autopackager"
//! recipe_search_dirs = ["~/recipes", "/srv/recipes"]
//!
//! [RecipeInputOverrides."com.example.download.Foo"]
//! NAME = "FooBeta"
//! ```

use super::compose::LocalOverrides;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "autopackager";
const CONFIG_FILE: &str = "config.toml";
const OVERRIDES_KEY: &str = "RecipeInputOverrides";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PrefsToml {
    cache_dir: Option<PathBuf>,
    recipe_search_dirs: Option<Vec<PathBuf>>,
    #[serde(rename = "RecipeInputOverrides")]
    recipe_input_overrides: Option<BTreeMap<String, Value>>,
}

impl PrefsToml {
    fn merge(&mut self, other: PrefsToml) {
        if other.cache_dir.is_some() {
            self.cache_dir = other.cache_dir;
        }
        if other.recipe_search_dirs.is_some() {
            self.recipe_search_dirs = other.recipe_search_dirs;
        }
        match (&mut self.recipe_input_overrides, other.recipe_input_overrides) {
            (Some(dst), Some(src)) => {
                for (identifier, values) in src {
                    dst.insert(identifier, values);
                }
            }
            (None, Some(src)) => self.recipe_input_overrides = Some(src),
            _ => {}
        }
    }
}

/// Resolved user preferences.
#[derive(Debug, Clone, Default)]
pub struct Preferences {
    pub cache_dir: Option<PathBuf>,
    pub recipe_search_dirs: Vec<PathBuf>,
    pub local_overrides: LocalOverrides,
    /// Files that contributed, in load order.
    pub sources: Vec<PathBuf>,
}

impl Preferences {
    /// Load and merge every config file that exists. Missing files are fine.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_files(&find_config_files())
    }

    /// Load a single, explicitly named file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let parsed = read_toml(path)?;
        Ok(Self::resolve(parsed, vec![path.to_path_buf()]))
    }

    fn load_files(candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut merged = PrefsToml::default();
        let mut sources = Vec::new();

        for path in candidates {
            if !path.exists() {
                continue;
            }
            merged.merge(read_toml(path)?);
            sources.push(path.clone());
        }

        Ok(Self::resolve(merged, sources))
    }

    fn resolve(prefs: PrefsToml, sources: Vec<PathBuf>) -> Self {
        let origin = match sources.as_slice() {
            [] => OVERRIDES_KEY.to_owned(),
            paths => format!(
                "{OVERRIDES_KEY} ({})",
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };

        Self {
            cache_dir: prefs.cache_dir.map(|p| expand_home(&p)),
            recipe_search_dirs: prefs
                .recipe_search_dirs
                .unwrap_or_else(default_search_dirs)
                .iter()
                .map(|p| expand_home(p))
                .collect(),
            local_overrides: LocalOverrides::new(
                origin,
                prefs.recipe_input_overrides.unwrap_or_default(),
            ),
            sources,
        }
    }
}

/// Current directory, then the user's data dir.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let data_home = std::env::var("XDG_DATA_HOME")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from(".").join(".local/share"));

    vec![PathBuf::from("."), data_home.join(APP_DIR).join("recipes")]
}

/// Replace a leading `~` with the user's home directory.
pub(crate) fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

fn split_xdg_config_dirs() -> Vec<PathBuf> {
    let raw = std::env::var("XDG_CONFIG_DIRS").unwrap_or_else(|_| "/etc/xdg".to_owned());
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn xdg_config_home() -> PathBuf {
    if let Ok(raw) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

/// Candidate config files, lowest precedence first.
pub fn find_config_files() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = split_xdg_config_dirs()
        .into_iter()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .collect();
    paths.push(xdg_config_home().join(APP_DIR).join(CONFIG_FILE));
    paths
}

fn read_toml(path: &Path) -> Result<PrefsToml, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<PrefsToml>(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

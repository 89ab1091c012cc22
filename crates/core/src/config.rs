//! Application configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `RAILBOOK_*` environment variables, later sources overriding earlier ones.

use std::{
    fs,
    path::{Path, PathBuf},
};

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    persistence::{
        DataFiles, ParsePolicy, PersistenceManager, BOOKINGS_FILE, ROUTES_FILE, TRAINS_FILE,
        USERS_FILE,
    },
};

/// Directory under the platform config and data roots.
pub const APP_DIR: &str = "railbook";
/// Prefix for environment overrides, e.g. `RAILBOOK_DATA_DIR`.
pub const ENV_PREFIX: &str = "RAILBOOK";

const DEFAULT_CONFIG: &str = r#"# railbook configuration

# Directory holding the backing files. Relative file names below resolve here.
# data_dir = "/var/lib/railbook"

# users_file = "users.txt"
# trains_file = "trains.txt"
# routes_file = "routes.txt"
# bookings_file = "bookings.txt"

# What to do with a line that cannot be decoded at startup: "skip" or "fail".
# on_parse_error = "skip"
"#;

/// Resolved settings for a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Directory holding the backing files.
    pub data_dir: PathBuf,
    /// User records file.
    pub users_file: PathBuf,
    /// Train records file.
    pub trains_file: PathBuf,
    /// Route records file.
    pub routes_file: PathBuf,
    /// Booking histories file.
    pub bookings_file: PathBuf,
    /// Policy for undecodable lines at load time.
    pub on_parse_error: ParsePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            users_file: PathBuf::from(USERS_FILE),
            trains_file: PathBuf::from(TRAINS_FILE),
            routes_file: PathBuf::from(ROUTES_FILE),
            bookings_file: PathBuf::from(BOOKINGS_FILE),
            on_parse_error: ParsePolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load using `path` as the config file. A missing file is not an error.
    ///
    /// Nothing is logged here: the caller usually installs its subscriber
    /// only once the data directory is known.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().into_owned())?
            .set_default("users_file", USERS_FILE)?
            .set_default("trains_file", TRAINS_FILE)?
            .set_default("routes_file", ROUTES_FILE)?
            .set_default("bookings_file", BOOKINGS_FILE)?
            .set_default("on_parse_error", "skip")?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Replace the data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Backing file paths, resolving relative names against `data_dir`.
    pub fn data_files(&self) -> DataFiles {
        DataFiles {
            users: self.data_dir.join(&self.users_file),
            trains: self.data_dir.join(&self.trains_file),
            routes: self.data_dir.join(&self.routes_file),
            bookings: self.data_dir.join(&self.bookings_file),
        }
    }

    /// Persistence manager for the configured files and policy.
    pub fn persistence(&self) -> PersistenceManager {
        PersistenceManager::new(self.data_files(), self.on_parse_error)
    }
}

/// Default data directory under the user's data root.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default config file location under the user's config root.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Write a commented template to the default location if no file exists.
/// Returns the location and whether a file was created.
pub fn ensure_default_config() -> Result<(PathBuf, bool)> {
    let path = config_path();
    let created = write_default_config(&path)?;
    Ok((path, created))
}

/// Write the commented template to `path` unless a file is already there.
/// Returns whether a file was created.
pub fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    fs::write(path, DEFAULT_CONFIG).map_err(|err| Error::io(path, err))?;
    Ok(true)
}

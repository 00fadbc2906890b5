//! Command-line interface configuration
//!
//! [at28cflash] reads an optional `at28cflash.toml` from the current
//! directory, its parent, or the user's configuration directory; the [Config]
//! type handles the loading and saving of this configuration file.
//!
//! ```toml
//! [connection]
//! serial = "/dev/ttyUSB0"
//!
//! [programmer]
//! mode = "AT28C256"
//! validate_writes = true
//! ```
//!
//! [at28cflash]: https://crates.io/crates/at28cflash

use std::{
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::debug;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::{error::Error, targets::Mode};

const CONFIG_FILE_NAME: &str = "at28cflash.toml";

/// A configured, known serial connection
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Connection {
    /// Name of the serial port used for communication
    pub serial: Option<String>,
}

/// Defaults for the programmer session
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct ProgrammerConfig {
    /// EEPROM part in the programmer's socket
    pub mode: Option<Mode>,
    /// Read back every written byte
    pub validate_writes: Option<bool>,
}

/// Deserialized contents of a configuration file
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Preferred serial port connection information
    #[serde(default)]
    pub connection: Connection,
    /// Programmer defaults
    #[serde(default)]
    pub programmer: ProgrammerConfig,
    /// Path of the file to save the configuration to
    #[serde(skip)]
    save_path: PathBuf,
}

impl Config {
    /// Load configuration from the configuration file
    pub fn load() -> Result<Self> {
        let path = Self::find_config_path()?;

        Ok(Self::load_from(&path)?)
    }

    /// Load configuration from `path`, which does not need to exist
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let data = read_to_string(path).unwrap_or_default();

        let mut config: Config =
            toml::from_str(&data).map_err(|e| Error::InvalidConfig(path.to_owned(), e))?;
        config.save_path = path.to_owned();

        debug!("Config: {:#?}", &config);

        Ok(config)
    }

    /// Save a modified copy of the configuration to the file it came from
    pub fn save_with<F: Fn(&mut Self)>(&self, modify_fn: F) -> Result<()> {
        let mut copy = self.clone();
        modify_fn(&mut copy);

        let serialized = toml::to_string(&copy)
            .into_diagnostic()
            .wrap_err("Failed to serialize config")?;

        if let Some(parent) = self.save_path.parent() {
            create_dir_all(parent)
                .into_diagnostic()
                .wrap_err("Failed to create config directory")?;
        }

        write(&self.save_path, serialized)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write config to {}", self.save_path.display()))
    }

    fn find_config_path() -> Result<PathBuf> {
        let current_dir = std::env::current_dir().into_diagnostic()?;

        let local_config = current_dir.join(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Ok(local_config);
        }

        if let Some(parent_folder) = current_dir.parent() {
            let workspace_config = parent_folder.join(CONFIG_FILE_NAME);
            if workspace_config.exists() {
                return Ok(workspace_config);
            }
        }

        match ProjectDirs::from("rs", "at28c", "at28cflash") {
            Some(project_dirs) => Ok(project_dirs.config_dir().join(CONFIG_FILE_NAME)),
            None => Ok(local_config),
        }
    }
}

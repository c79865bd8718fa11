//! Code for loading program settings.
use crate::get_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::Result;
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for equishare
# Uncomment a line to change the setting from its default value
";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output files by default
    #[serde(default)]
    pub overwrite: bool,
    /// Whether to write share weights used in each period to an extra CSV file
    #[serde(default)]
    pub debug_model: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            debug_model: false,
        }
    }
}

impl Settings {
    /// Read the program settings from the user's config directory.
    ///
    /// If the file is not present, default values for settings will be used
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read settings from the specified path, using defaults if the file does not exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }

    /// The contents of the default settings file, with every setting commented out
    pub fn default_file_contents() -> String {
        let settings_raw =
            toml::to_string(&Settings::default()).expect("Could not convert settings to TOML");

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.lines() {
            let Some(last) = line.find('=') else {
                continue;
            };

            // All fields should have doc comments
            let field = line[..last].trim();
            let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
            for doc_line in docs.lines() {
                write!(&mut out, "\n# # {}\n", doc_line.trim()).unwrap();
            }
            writeln!(&mut out, "# {}", line.trim()).unwrap();
        }

        out
    }
}

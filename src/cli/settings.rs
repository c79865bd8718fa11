//! CLI commands for managing the program settings file.
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;

/// Subcommands for settings
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Open the settings file in a text editor, creating it if needed
    Edit,
    /// Print the path the settings file is read from
    Path,
    /// Print the contents of a default `settings.toml`
    DumpDefault,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Edit => handle_edit_command()?,
            Self::Path => println!("{}", get_settings_file_path().display()),
            Self::DumpDefault => print!("{}", Settings::default_file_contents()),
        }

        Ok(())
    }
}

/// Write a default settings file at `file_path` unless one is already there
fn write_default_settings_if_missing(file_path: &Path) -> Result<()> {
    if file_path.is_file() {
        return Ok(());
    }

    if let Some(dir_path) = file_path.parent() {
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }
    fs::write(file_path, Settings::default_file_contents())?;

    Ok(())
}

/// Handle the `settings edit` command
fn handle_edit_command() -> Result<()> {
    let file_path = get_settings_file_path();
    write_default_settings_if_missing(&file_path)?;

    println!("Opening settings file for editing: {}", file_path.display());
    edit::edit_file(&file_path)
        .with_context(|| format!("Failed to open editor for {}", file_path.display()))?;

    Ok(())
}

//! Saving and loading named configurations.
//!
//! Named configurations are TOML files under
//! `<config dir>/snarl/configs/<name>.toml`. Explicit paths work as well.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::commands::state::PacketProcessingState;
use crate::commands::update::apply_config;
use crate::error::{Result, SnarlError};
use crate::settings::ConfigFile;

/// Captures the current settings, armed modules and timing.
pub fn current_config(state: &PacketProcessingState) -> Result<ConfigFile> {
    Ok(ConfigFile {
        settings: state.lock_settings()?.clone(),
        enabled: state.switches.enabled_kinds(),
        processing: state.lock_processing()?.clone(),
    })
}

/// Saves the current configuration under `name`.
pub fn save_config(state: &PacketProcessingState, name: &str) -> Result<PathBuf> {
    let path = get_config_path(name)?;
    save_config_to(state, &path)?;
    info!("Saved configuration to {}", name);
    Ok(path)
}

/// Saves the current configuration to an explicit path.
pub fn save_config_to(state: &PacketProcessingState, path: &Path) -> Result<()> {
    let content = current_config(state)?.to_toml()?;
    fs::write(path, content)?;
    Ok(())
}

/// Loads the configuration named `name` and applies it.
pub fn load_config(state: &PacketProcessingState, name: &str) -> Result<ConfigFile> {
    let config = load_config_from(state, &get_config_path(name)?)?;
    info!("Loaded configuration from {}", name);
    Ok(config)
}

/// Loads a configuration file and applies it.
pub fn load_config_from(state: &PacketProcessingState, path: &Path) -> Result<ConfigFile> {
    let config = read_config_file(path)?;
    apply_config(state, &config)?;
    Ok(config)
}

/// Reads and validates a configuration file without applying it.
pub fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)?;
    ConfigFile::from_toml(&content)
}

/// Lists the names of all saved configurations, sorted.
pub fn list_configs() -> Result<Vec<String>> {
    list_configs_in(&get_config_dir()?)
}

/// Deletes the configuration named `name`.
pub fn delete_config(name: &str) -> Result<()> {
    let config_path = get_config_path(name)?;

    if !config_path.exists() {
        return Err(SnarlError::Config(format!(
            "Configuration {} does not exist",
            name
        )));
    }

    fs::remove_file(&config_path)?;
    info!("Deleted configuration {}", name);
    Ok(())
}

fn list_configs_in(config_dir: &Path) -> Result<Vec<String>> {
    let mut configs = Vec::new();
    for entry in fs::read_dir(config_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            if let Some(name) = path.file_stem().and_then(|name| name.to_str()) {
                configs.push(name.to_string());
            }
        }
    }
    configs.sort();
    Ok(configs)
}

/// Gets the path to the configs directory, creating it if needed.
fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| SnarlError::Config("Could not determine config directory".to_string()))?
        .join("snarl")
        .join("configs");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Gets the full path to a named configuration file.
fn get_config_path(name: &str) -> Result<PathBuf> {
    validate_name(name)?;
    Ok(get_config_dir()?.join(format!("{}.toml", name)))
}

/// Rejects names that would escape the configs directory.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '));
    if valid {
        Ok(())
    } else {
        Err(SnarlError::Config(format!(
            "Invalid configuration name: {:?}",
            name
        )))
    }
}

use crate::error::Result;
use crate::network::modules::registry::ModuleKind;
use crate::settings::manipulation::Settings;
use crate::settings::processing::ProcessingOptions;
use serde::{Deserialize, Serialize};

/// Everything persisted in a configuration file.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    /// Module parameters
    pub settings: Settings,

    /// Modules armed when the configuration is applied
    pub enabled: Vec<ModuleKind>,

    /// Scheduler timing
    pub processing: ProcessingOptions,
}

impl ConfigFile {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ConfigFile = toml::from_str(text)?;
        config.settings.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

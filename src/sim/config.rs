use std::path::PathBuf;

use anyhow::Context;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::*;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    /// Hard stop in host cycles.
    pub timeout: u64,
    pub stats_path: PathBuf,
    pub summary_json: Option<PathBuf>,
}

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> anyhow::Result<Self> {
        match section {
            Some(value) => Ok(value.clone().try_into().context("cannot deserialize config")?),
            None => {
                warn!("config section not found");
                Ok(Self::default())
            }
        }
    }
}

impl Config for SimConfig {}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            timeout: 10000000,
            stats_path: PathBuf::from("dramctl.stats"),
            summary_json: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_section_keeps_defaults() {
        let table: Table = toml::from_str("[sim]\ntimeout = 500\n").unwrap();
        let cfg = SimConfig::from_section(table.get("sim")).unwrap();
        assert_eq!(500, cfg.timeout);
        assert_eq!(PathBuf::from("dramctl.stats"), cfg.stats_path);
        assert!(cfg.summary_json.is_none());
    }

    #[test]
    fn mistyped_field_is_an_error() {
        let table: Table = toml::from_str("[sim]\ntimeout = \"soon\"\n").unwrap();
        assert!(SimConfig::from_section(table.get("sim")).is_err());
    }
}

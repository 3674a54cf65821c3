use anyhow::ensure;
use serde::Deserialize;

use crate::dram::clock::ClockMode;
use crate::sim::config::Config;
use crate::timeq::Cycle;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DramConfig {
    pub name: String,
    /// Bus + controller pipeline floor added to every data-moving access.
    pub min_latency: Cycle,
    pub cpu_freq_mhz: u64,
    /// Clock domain the controller's events belong to.
    pub domain: u32,
    /// log2 of the cache line size; line addresses are shifted by this to get byte addresses.
    pub line_bits: u32,
    /// Number of address-interleaved controllers.
    pub num_channels: usize,
    pub clock_mode: ClockMode,
}

impl Config for DramConfig {}

impl Default for DramConfig {
    fn default() -> Self {
        Self {
            name: "mem".to_string(),
            min_latency: 100,
            cpu_freq_mhz: 2000,
            domain: 0,
            line_bits: 6,
            num_channels: 1,
            clock_mode: ClockMode::Lockstep,
        }
    }
}

impl DramConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.cpu_freq_mhz > 0, "dram.cpu_freq_mhz must be > 0");
        ensure!(
            self.cpu_freq_mhz <= 1_000_000,
            "dram.cpu_freq_mhz {} exceeds 1 ps resolution",
            self.cpu_freq_mhz
        );
        ensure!(self.num_channels > 0, "dram.num_channels must be > 0");
        ensure!(self.line_bits < 32, "dram.line_bits {} out of range", self.line_bits);
        Ok(())
    }

    pub fn cache_line_size(&self) -> u64 {
        1 << self.line_bits
    }
}

/// Parameters of the reference fixed-latency engine.  Latencies are in engine cycles.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub tck_ps: u64,
    pub read_latency: Cycle,
    pub write_latency: Cycle,
    pub queue_capacity: usize,
    pub accepts_per_cycle: u32,
    pub num_cores: usize,
}

impl Config for EngineConfig {}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tck_ps: 1250, // DDR3-1600
            read_latency: 40,
            write_latency: 40,
            queue_capacity: 32,
            accepts_per_cycle: 1,
            num_cores: 1,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.tck_ps > 0, "engine.tck_ps must be > 0");
        ensure!(self.queue_capacity > 0, "engine.queue_capacity must be > 0");
        ensure!(self.accepts_per_cycle > 0, "engine.accepts_per_cycle must be > 0");
        ensure!(self.num_cores > 0, "engine.num_cores must be > 0");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Table;

    #[test]
    fn section_overrides_defaults() {
        let table: Table = toml::from_str(
            r#"
            [dram]
            min_latency = 42
            num_channels = 4
            clock_mode = "ratio"
            "#,
        )
        .unwrap();
        let cfg = DramConfig::from_section(table.get("dram")).unwrap();
        assert_eq!(42, cfg.min_latency);
        assert_eq!(4, cfg.num_channels);
        assert_eq!(ClockMode::Ratio, cfg.clock_mode);
        assert_eq!(2000, cfg.cpu_freq_mhz);
        assert_eq!(64, cfg.cache_line_size());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_section_uses_defaults() {
        let cfg = EngineConfig::from_section(None).unwrap();
        assert_eq!(1250, cfg.tck_ps);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_clock_mode_is_an_error() {
        let table: Table = toml::from_str("[dram]\nclock_mode = \"turbo\"\n").unwrap();
        let err = DramConfig::from_section(table.get("dram")).unwrap_err();
        assert!(format!("{err:#}").contains("unknown variant"));
    }

    #[test]
    fn zero_channels_rejected() {
        let cfg = DramConfig {
            num_channels: 0,
            ..DramConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}

use anyhow::Context;
use clap::Parser;
use dramctl::dram::config::{DramConfig, EngineConfig};
use dramctl::sim::config::{Config, SimConfig};
use dramctl::sim::top::MemSim;
use dramctl::traffic::config::TrafficConfig;
use dramctl::traffic::source::TrafficSource;
use log::LevelFilter;
use std::fs;
use std::path::PathBuf;
use toml::Table;

#[derive(Parser)]
#[command(version, about)]
struct DramCtlArgs {
    #[arg(help="Path to config.toml")]
    config_path: PathBuf,
    #[arg(long, help="Override simulation timeout in cycles")]
    timeout: Option<u64>,
    #[arg(long, help="Override number of memory channels")]
    channels: Option<usize>,
    #[arg(long, help="Override controller minimum latency")]
    min_latency: Option<u64>,
    #[arg(long, help="Override request trace path")]
    trace: Option<PathBuf>,
    #[arg(long, help="Override stats output path")]
    stats_path: Option<PathBuf>,
    #[arg(long, help="Enable log at level (0:warn, 1:info, 2:debug)")]
    log: Option<u64>,
}

fn init_logger(level: Option<u64>) {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = level {
        builder.filter_level(match level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        });
    }
    builder.init();
}

pub fn main() -> anyhow::Result<()> {
    let argv = DramCtlArgs::parse();
    init_logger(argv.log);

    let config = fs::read_to_string(&argv.config_path)
        .with_context(|| format!("failed to read config file {}", argv.config_path.display()))?;
    let config_table: Table = toml::from_str(&config).context("cannot parse config toml")?;
    let mut sim_config =
        SimConfig::from_section(config_table.get("sim")).context("invalid [sim] section")?;
    let mut dram_config =
        DramConfig::from_section(config_table.get("dram")).context("invalid [dram] section")?;
    let engine_config =
        EngineConfig::from_section(config_table.get("engine")).context("invalid [engine] section")?;
    let mut traffic_config = TrafficConfig::from_section(config_table.get("traffic"))
        .context("invalid [traffic] section")?;

    // override toml configs with argv
    sim_config.timeout = argv.timeout.unwrap_or(sim_config.timeout);
    sim_config.stats_path = argv.stats_path.unwrap_or(sim_config.stats_path);
    dram_config.num_channels = argv.channels.unwrap_or(dram_config.num_channels);
    dram_config.min_latency = argv.min_latency.unwrap_or(dram_config.min_latency);
    traffic_config.file = argv.trace.or(traffic_config.file);

    let traffic = TrafficSource::from_config(&traffic_config)?;
    let sim = MemSim::new(sim_config, dram_config, engine_config, traffic)?;
    let summary = sim.simulate()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

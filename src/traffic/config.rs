use serde::Deserialize;
use std::path::PathBuf;

use crate::sim::config::Config;
use crate::timeq::Cycle;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrafficConfig {
    /// Request trace, one `cycle kind line_addr src_id` record per line.
    pub file: Option<PathBuf>,
    pub seed: u64,
    pub patterns: Vec<TrafficPatternSpec>,
}

impl Config for TrafficConfig {}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            file: None,
            seed: 0,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    #[default]
    Sequential,
    Strided,
    Random,
}

/// Relative weights of the request kinds a pattern draws from.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TrafficMix {
    pub gets: u32,
    pub getx: u32,
    pub puts: u32,
    pub putx: u32,
}

impl Default for TrafficMix {
    fn default() -> Self {
        Self {
            gets: 3,
            getx: 0,
            puts: 0,
            putx: 1,
        }
    }
}

impl TrafficMix {
    pub fn total(&self) -> u32 {
        self.gets + self.getx + self.puts + self.putx
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrafficPatternSpec {
    pub name: String,
    pub kind: PatternKind,
    pub src_id: u32,
    pub start_cycle: Cycle,
    /// Host cycles between consecutive requests; 0 issues the whole pattern at once.
    pub interval: Cycle,
    pub count: u64,
    pub base_line: u64,
    pub stride: u64,
    /// Random patterns draw lines from `base_line..base_line + span`.
    pub span: u64,
    pub no_excl: bool,
    pub mix: TrafficMix,
}

impl Default for TrafficPatternSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: PatternKind::Sequential,
            src_id: 0,
            start_cycle: 0,
            interval: 1,
            count: 64,
            base_line: 0,
            stride: 1,
            span: 1 << 16,
            no_excl: false,
            mix: TrafficMix::default(),
        }
    }
}

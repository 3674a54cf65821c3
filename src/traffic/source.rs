use anyhow::{anyhow, bail, Context};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::dram::request::{MemReq, MemReqKind};
use crate::timeq::Cycle;
use crate::traffic::config::TrafficConfig;
use crate::traffic::patterns;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficItem {
    pub cycle: Cycle,
    pub kind: MemReqKind,
    pub line_addr: u64,
    pub src_id: u32,
    pub no_excl: bool,
}

impl TrafficItem {
    pub fn to_req(&self) -> MemReq {
        MemReq::new(self.kind, self.line_addr, self.cycle, self.src_id).with_no_excl(self.no_excl)
    }
}

fn parse_u64(field: &str) -> Result<u64, std::num::ParseIntError> {
    match field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => field.parse(),
    }
}

/// Parse a request trace.  Blank lines and `#` comments are skipped; every other line is
/// `cycle kind line_addr src_id`, with `kind` a request name or numeric code.
pub fn parse_trace(text: &str) -> anyhow::Result<Vec<TrafficItem>> {
    let mut items = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            bail!(
                "trace line {}: expected 4 fields, found {}",
                lineno + 1,
                fields.len()
            );
        }
        let cycle = parse_u64(fields[0])
            .with_context(|| format!("trace line {}: bad cycle '{}'", lineno + 1, fields[0]))?;
        let kind: MemReqKind = fields[1]
            .parse()
            .map_err(|err| anyhow!("trace line {}: {}", lineno + 1, err))?;
        let line_addr = parse_u64(fields[2])
            .with_context(|| format!("trace line {}: bad line address '{}'", lineno + 1, fields[2]))?;
        let src_id = fields[3]
            .parse()
            .with_context(|| format!("trace line {}: bad source id '{}'", lineno + 1, fields[3]))?;
        items.push(TrafficItem {
            cycle,
            kind,
            line_addr,
            src_id,
            no_excl: false,
        });
    }
    Ok(items)
}

/// Time-ordered request stream feeding the simulated memory.
#[derive(Debug, Default)]
pub struct TrafficSource {
    items: VecDeque<TrafficItem>,
}

impl TrafficSource {
    /// Merge the trace file (if any) with every configured pattern.  Ties in cycle keep trace
    /// records first, then patterns in declaration order.
    pub fn from_config(config: &TrafficConfig) -> anyhow::Result<Self> {
        let mut items = Vec::new();
        if let Some(path) = &config.file {
            items.extend(Self::load_trace(path)?);
        }
        let mut rng = StdRng::seed_from_u64(config.seed);
        for spec in &config.patterns {
            let expanded = patterns::expand(spec, &mut rng)?;
            info!("pattern '{}': {} requests", spec.name, expanded.len());
            items.extend(expanded);
        }
        Ok(Self::from_items(items))
    }

    pub fn from_items(mut items: Vec<TrafficItem>) -> Self {
        items.sort_by_key(|item| item.cycle);
        Self {
            items: items.into(),
        }
    }

    pub fn load_trace(path: &Path) -> anyhow::Result<Vec<TrafficItem>> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read trace {}", path.display()))?;
        let items =
            parse_trace(&text).with_context(|| format!("in trace {}", path.display()))?;
        info!("trace {}: {} requests", path.display(), items.len());
        Ok(items)
    }

    pub fn pop_due(&mut self, now: Cycle) -> Option<MemReq> {
        if self.items.front()?.cycle > now {
            return None;
        }
        self.items.pop_front().map(|item| item.to_req())
    }

    pub fn next_cycle(&self) -> Option<Cycle> {
        self.items.front().map(|item| item.cycle)
    }

    /// Highest requester id in the remaining stream.
    pub fn max_src_id(&self) -> Option<u32> {
        self.items.iter().map(|item| item.src_id).max()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

//! Explicitly owned statistics tree.
//!
//! Modules register their counters into an [`AggregateStat`] handed to them by the caller; there
//! is no process-wide registry.  A [`Counter`] is a shared handle, so the tree keeps observing the
//! live value after registration and still holds the final value once the owning module is gone.

use std::cell::Cell;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;

/// Monotonic event counter with a stable name and description.
#[derive(Debug, Clone)]
pub struct Counter {
    name: &'static str,
    desc: &'static str,
    value: Rc<Cell<u64>>,
}

impl Counter {
    pub fn new(name: &'static str, desc: &'static str) -> Self {
        Self {
            name,
            desc,
            value: Rc::new(Cell::new(0)),
        }
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, delta: u64) {
        self.value.set(self.value.get().saturating_add(delta));
    }

    /// Raise the counter to `value` if it is currently lower; never decreases it.
    pub fn raise_to(&self, value: u64) {
        if value > self.value.get() {
            self.value.set(value);
        }
    }

    pub fn get(&self) -> u64 {
        self.value.get()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn desc(&self) -> &'static str {
        self.desc
    }
}

#[derive(Debug, Clone)]
pub enum StatNode {
    Counter(Counter),
    Aggregate(AggregateStat),
}

/// Named group of counters and nested groups.
#[derive(Debug, Clone)]
pub struct AggregateStat {
    name: String,
    desc: String,
    children: Vec<StatNode>,
}

impl AggregateStat {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn children(&self) -> &[StatNode] {
        &self.children
    }

    pub fn append_counter(&mut self, counter: &Counter) {
        self.children.push(StatNode::Counter(counter.clone()));
    }

    pub fn append(&mut self, child: AggregateStat) {
        self.children.push(StatNode::Aggregate(child));
    }

    /// Look up a counter value by dotted path relative to this group, e.g. `mem-0.rd`.
    pub fn lookup(&self, path: &str) -> Option<u64> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        self.children.iter().find_map(|child| match (child, rest) {
            (StatNode::Counter(counter), None) if counter.name() == head => Some(counter.get()),
            (StatNode::Aggregate(group), Some(rest)) if group.name == head => group.lookup(rest),
            _ => None,
        })
    }

    fn render_into(&self, prefix: &str, out: &mut String) {
        for child in &self.children {
            match child {
                StatNode::Counter(counter) => {
                    let _ = writeln!(
                        out,
                        "{}{} = {} # {}",
                        prefix,
                        counter.name(),
                        counter.get(),
                        counter.desc()
                    );
                }
                StatNode::Aggregate(group) => {
                    let _ = writeln!(out, "# {}{}: {}", prefix, group.name, group.desc);
                    group.render_into(&format!("{}{}.", prefix, group.name), out);
                }
            }
        }
    }
}

/// Root of the statistics tree for one simulation run.
#[derive(Debug)]
pub struct StatsContext {
    root: AggregateStat,
}

impl Default for StatsContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsContext {
    pub fn new() -> Self {
        Self {
            root: AggregateStat::new("root", "Stats"),
        }
    }

    pub fn root(&self) -> &AggregateStat {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut AggregateStat {
        &mut self.root
    }

    pub fn lookup(&self, path: &str) -> Option<u64> {
        self.root.lookup(path)
    }

    /// Line-oriented `path.name = value # description` dump of every registered counter.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.root.render_into("", &mut out);
        out
    }

    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create stats directory {}", parent.display()))?;
        }
        fs::write(path, self.render())
            .with_context(|| format!("cannot write stats file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_handles_share_value() {
        let counter = Counter::new("rd", "Completed Read requests");
        let mut group = AggregateStat::new("mem-0", "Memory controller stats");
        group.append_counter(&counter);
        counter.inc();
        counter.inc_by(4);
        assert_eq!(Some(5), group.lookup("rd"));
    }

    #[test]
    fn raise_to_never_decreases() {
        let counter = Counter::new("maxOverflow", "peak");
        counter.raise_to(3);
        counter.raise_to(1);
        assert_eq!(3, counter.get());
    }

    #[test]
    fn nested_lookup_and_render() {
        let mut ctx = StatsContext::new();
        let rd = Counter::new("rd", "Completed Read requests");
        let mut group = AggregateStat::new("mem-0", "Memory controller stats");
        group.append_counter(&rd);
        ctx.root_mut().append(group);
        rd.inc();

        assert_eq!(Some(1), ctx.lookup("mem-0.rd"));
        assert_eq!(None, ctx.lookup("mem-0.wr"));
        assert_eq!(None, ctx.lookup("mem-1.rd"));

        let text = ctx.render();
        assert!(text.contains("# mem-0: Memory controller stats"));
        assert!(text.contains("mem-0.rd = 1 # Completed Read requests"));
    }
}

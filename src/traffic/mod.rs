pub mod config;
pub mod patterns;
pub mod source;

pub use config::{PatternKind, TrafficConfig, TrafficMix, TrafficPatternSpec};
pub use source::{TrafficItem, TrafficSource};

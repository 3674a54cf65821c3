pub mod clock;
pub mod config;
pub mod controller;
pub mod engine;
pub mod event;
mod inflight;
pub mod overflow;
pub mod request;
pub mod split;
pub mod stats;


pub use clock::{ClockBridge, ClockMode, ClockRatio};
pub use config::{DramConfig, EngineConfig};
pub use controller::DramController;
pub use engine::{DramEngine, FixedLatencyDram};
pub use event::{AccessEvent, EventId, EventRecorder, EventState, TimingRecord};
pub use request::{DramRequest, DramRequestKind, MemReq, MemReqKind, MesiState};
pub use split::SplitAddrMemory;
pub use stats::ControllerStats;

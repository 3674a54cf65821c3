use log::{info, warn};

use crate::dram::config::EngineConfig;
use crate::dram::request::DramRequest;
use crate::timeq::{Cycle, ServerConfig, ServiceRequest, TimedServer};

/// DRAM timing engine as seen by the controller.
///
/// `send` never blocks; `false` means the engine is at capacity and the caller keeps the request.
/// Completed requests are handed back, by value, to the closure passed to `tick`.
pub trait DramEngine {
    fn tick(&mut self, on_complete: &mut dyn FnMut(DramRequest));

    fn send(&mut self, request: DramRequest) -> bool;

    fn finish(&mut self);

    /// Native cycle time in picoseconds.
    fn tck_ps(&self) -> u64;
}

/// Reference engine: every request takes a fixed number of engine cycles, with bounded
/// outstanding requests and bounded admissions per cycle.
#[derive(Debug)]
pub struct FixedLatencyDram {
    server: TimedServer<DramRequest>,
    clk: Cycle,
    config: EngineConfig,
    reads: u64,
    writes: u64,
    rejects: u64,
}

impl FixedLatencyDram {
    pub fn new(config: EngineConfig) -> Self {
        let server = TimedServer::new(ServerConfig {
            base_latency: 0,
            queue_capacity: config.queue_capacity,
            accepts_per_cycle: config.accepts_per_cycle,
        });
        Self {
            server,
            clk: 0,
            config,
            reads: 0,
            writes: 0,
            rejects: 0,
        }
    }

    pub fn clk(&self) -> Cycle {
        self.clk
    }

    pub fn outstanding(&self) -> usize {
        self.server.outstanding()
    }
}

impl DramEngine for FixedLatencyDram {
    fn tick(&mut self, on_complete: &mut dyn FnMut(DramRequest)) {
        self.clk += 1;
        self.server
            .service_ready(self.clk, |result| on_complete(result.payload));
    }

    fn send(&mut self, request: DramRequest) -> bool {
        debug_assert!(
            (request.core_id as usize) < self.config.num_cores,
            "core id {} out of range",
            request.core_id
        );
        let latency = if request.kind.is_write() {
            self.config.write_latency
        } else {
            self.config.read_latency
        };
        match self
            .server
            .try_enqueue(self.clk, ServiceRequest::new(request, latency))
        {
            Ok(_) => {
                if request.kind.is_write() {
                    self.writes += 1;
                } else {
                    self.reads += 1;
                }
                true
            }
            Err(_) => {
                self.rejects += 1;
                false
            }
        }
    }

    fn finish(&mut self) {
        info!(
            "[dram] finished at clk {}: {} reads, {} writes, {} rejected sends",
            self.clk, self.reads, self.writes, self.rejects
        );
        if self.server.outstanding() > 0 {
            warn!(
                "[dram] {} requests still outstanding at finish",
                self.server.outstanding()
            );
        }
    }

    fn tck_ps(&self) -> u64 {
        self.config.tck_ps
    }
}

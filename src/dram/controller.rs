use log::{debug, error, info, warn};
use smallvec::SmallVec;
use std::sync::Arc;

use crate::base::behavior::{ModuleBehaviors, Parameterizable};
use crate::base::mem::MemObject;
use crate::base::module::{module, IsModule, ModuleBase};
use crate::base::stats::AggregateStat;
use crate::dram::clock::{ClockBridge, ClockRatio};
use crate::dram::config::DramConfig;
use crate::dram::engine::DramEngine;
use crate::dram::event::{AccessEvent, EventRecorder, TimingRecord};
use crate::dram::inflight::InflightIndex;
use crate::dram::overflow::OverflowQueue;
use crate::dram::request::{DramRequest, MemReq, MemReqKind, MesiState};
use crate::dram::stats::{ControllerCounters, ControllerStats};
use crate::timeq::{module_now, Cycle};

#[derive(Debug, Default)]
pub struct DramControllerState {
    overflow: OverflowQueue,
    inflight: InflightIndex,
    inflight_reads: u64,
    inflight_writes: u64,
    completions: Vec<AccessEvent>,
}

/// Admission/completion front end of one DRAM channel.
///
/// Requests enter through [`DramController::access`], which returns the response-cycle floor and
/// records a deferred event.  When the host runs that event ([`DramController::simulate`]) the
/// controller offers it to the engine; refused events wait in the overflow queue and the head is
/// retried on every [`DramController::tick`].  Engine completions resolve the matching in-flight
/// event, which is then handed back to the host through [`DramController::drain_completions`].
pub struct DramController {
    base: ModuleBase<DramControllerState, DramConfig>,
    id: usize,
    name: String,
    engine: Box<dyn DramEngine>,
    clock: ClockBridge,
    counters: ControllerCounters,
}

impl DramController {
    /// `id` must equal this controller's position among its siblings; events carry it back to the
    /// host so they can be routed to the right controller.
    pub fn new(config: Arc<DramConfig>, id: usize, engine: Box<dyn DramEngine>) -> Self {
        let ratio = ClockRatio::new(config.cpu_freq_mhz, engine.tck_ps());
        let name = format!("{}-{}", config.name, id);
        info!(
            "[{}] cpu frequency {:.3} MHz, mem frequency {:.3} MHz",
            name,
            ratio.host_freq_mhz(),
            ratio.mem_freq_mhz()
        );
        info!(
            "[{}] cpu/mem frequency ratio {} (periods {}:{} ps, reduced {}:{})",
            name,
            ratio.freq_ratio(),
            ratio.host_tick_ps(),
            ratio.mem_tick_ps(),
            ratio.host_ticks(),
            ratio.mem_ticks()
        );

        let mut me = DramController {
            base: ModuleBase {
                frequency: config.cpu_freq_mhz * 1_000_000,
                ..ModuleBase::default()
            },
            id,
            name,
            engine,
            clock: ClockBridge::new(ratio, config.clock_mode),
            counters: ControllerCounters::new(),
        };
        me.init_conf(config);
        debug!("[{}] clock mode {:?}", me.name, me.clock.mode());
        me
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn cycle(&self) -> Cycle {
        module_now(self)
    }

    pub fn clock_ratio(&self) -> &ClockRatio {
        self.clock.ratio()
    }

    pub fn overflow_len(&self) -> usize {
        self.base.state.overflow.len()
    }

    pub fn inflight_len(&self) -> usize {
        self.base.state.inflight.len()
    }

    pub fn inflight_reads(&self) -> u64 {
        self.base.state.inflight_reads
    }

    pub fn inflight_writes(&self) -> u64 {
        self.base.state.inflight_writes
    }

    pub fn stats(&self) -> ControllerStats {
        self.counters.snapshot()
    }

    /// No request overflowed, in flight, or resolved but not yet drained.
    pub fn is_idle(&self) -> bool {
        let state = &self.base.state;
        state.overflow.is_empty() && state.inflight.is_empty() && state.completions.is_empty()
    }

    pub fn access(&mut self, req: &mut MemReq, recorder: Option<&mut dyn EventRecorder>) -> Cycle {
        req.state = match req.kind {
            MemReqKind::PutS | MemReqKind::PutX => MesiState::I,
            MemReqKind::GetS => {
                if req.no_excl {
                    MesiState::S
                } else {
                    MesiState::E
                }
            }
            MemReqKind::GetX => MesiState::M,
        };

        if req.kind.is_downgrade() {
            return req.cycle;
        }

        let (min_latency, line_bits, domain) = {
            let conf = self.conf();
            (conf.min_latency, conf.line_bits, conf.domain)
        };
        let resp_cycle = req.cycle + min_latency;
        self.counters.incoming_rd_wr.inc();

        if let Some(recorder) = recorder {
            self.counters.accesses.inc();
            let addr = req.line_addr << line_bits;
            let mut event = AccessEvent::new(
                recorder.alloc_id(),
                self.id,
                req.kind.is_write(),
                addr,
                req.src_id,
                domain,
            );
            event.set_min_start_cycle(req.cycle);
            recorder.push_record(TimingRecord {
                addr,
                req_cycle: req.cycle,
                resp_cycle,
                kind: req.kind,
                event,
            });
        }
        resp_cycle
    }

    /// Scheduler entry point of a recorded event.
    pub fn simulate(&mut self, mut event: AccessEvent, start_cycle: Cycle) {
        debug_assert_eq!(
            event.target(),
            self.id,
            "event {} routed to the wrong controller",
            event.id()
        );
        event.start(start_cycle);
        self.counters.simulate_num.inc();
        self.enqueue(event, start_cycle);
    }

    /// Offer a started event to the engine.  A refusal parks it in the overflow queue.
    pub fn enqueue(&mut self, event: AccessEvent, cycle: Cycle) {
        self.counters.enqueued.inc();

        if self.engine.send(event.dram_request()) {
            debug!(
                "[{}] {} to {:#x} admitted at {}",
                self.name,
                direction(&event),
                event.addr(),
                cycle
            );
            self.admit(event);
        } else {
            debug!(
                "[{}] {} to {:#x} refused at {}, overflowing",
                self.name,
                direction(&event),
                event.addr(),
                cycle
            );
            self.counters.reissued.inc();
            let depth = self.base.state.overflow.push_back(event);
            self.counters.max_overflow.raise_to(depth as u64);
        }
        self.check_conservation();
    }

    /// Advance the controller by one host cycle.  Returns the number of cycles until the next
    /// tick is due.
    pub fn tick(&mut self, _host_cycle: Cycle) -> Cycle {
        let due = self.clock.due_mem_ticks();
        for _ in 0..due {
            let mut done: SmallVec<[DramRequest; 4]> = SmallVec::new();
            self.engine.tick(&mut |request| done.push(request));
            for request in done {
                self.on_completion(request);
            }
        }

        self.retry_overflow_head();
        self.base.advance();
        self.check_conservation();
        1
    }

    /// Hand resolved events back to the host.
    pub fn drain_completions(&mut self) -> Vec<AccessEvent> {
        std::mem::take(&mut self.base.state.completions)
    }

    /// Flush the engine and report.  Consumes the controller.
    pub fn finish(mut self) -> ControllerStats {
        self.engine.finish();
        let stats = self.counters.snapshot();
        let ratio = *self.clock.ratio();
        info!(
            "[{}] finished at cycle {} (mem {:.3} MHz, ratio {})",
            self.name,
            self.base.cycle,
            ratio.mem_freq_mhz(),
            ratio.freq_ratio()
        );
        info!(
            "[{}] reads {} (lat {}), writes {} (lat {}), reissued {}, peak overflow {}",
            self.name,
            stats.reads,
            stats.total_rd_lat,
            stats.writes,
            stats.total_wr_lat,
            stats.reissued,
            stats.max_overflow
        );
        if !self.is_idle() {
            warn!(
                "[{}] finishing with {} in flight, {} overflowed, {} undrained",
                self.name,
                self.base.state.inflight.len(),
                self.base.state.overflow.len(),
                self.base.state.completions.len()
            );
        }
        stats
    }

    fn retry_overflow_head(&mut self) {
        let request = match self.base.state.overflow.front() {
            Some(head) => head.dram_request(),
            None => return,
        };
        if self.engine.send(request) {
            let event = self
                .base
                .state
                .overflow
                .pop_front()
                .expect("front just checked");
            debug!(
                "[{}] overflowed {} to {:#x} admitted at {}",
                self.name,
                direction(&event),
                event.addr(),
                self.base.cycle
            );
            self.admit(event);
        }
    }

    fn admit(&mut self, mut event: AccessEvent) {
        let state = &mut self.base.state;
        if event.is_write() {
            state.inflight_writes += 1;
        } else {
            state.inflight_reads += 1;
        }
        self.counters.issued_rd_wr.inc();
        self.counters.inflight_requests.inc();
        if state.inflight.contains(event.addr()) {
            debug!(
                "[{}] {:#x} already has {} request(s) in flight",
                self.name,
                event.addr(),
                state.inflight.count(event.addr())
            );
        }
        event.hold();
        state.inflight.insert(event.addr(), event);
    }

    // Reads and writes share one completion path.
    fn on_completion(&mut self, request: DramRequest) {
        self.counters.completed.inc();
        let cycle = self.base.cycle;

        let state = &mut self.base.state;
        let mut event = match state.inflight.take(request.addr, request.kind.is_write()) {
            Some(event) => event,
            None => {
                error!(
                    "[{}] I didn't request address {:#x} (core {})",
                    self.name, request.addr, request.core_id
                );
                panic!(
                    "[{}] completion for untracked address {:#x}",
                    self.name, request.addr
                );
            }
        };

        let lat = (cycle + 1).saturating_sub(event.s_cycle());
        if event.is_write() {
            self.counters.writes.inc();
            self.counters.total_wr_lat.inc_by(lat);
            state.inflight_writes -= 1;
        } else {
            self.counters.reads.inc();
            self.counters.total_rd_lat.inc_by(lat);
            state.inflight_reads -= 1;
        }

        event.release();
        event.done(cycle + 1);
        state.completions.push(event);
    }

    fn check_conservation(&self) {
        let state = &self.base.state;
        debug_assert_eq!(
            (state.inflight_reads + state.inflight_writes) as usize,
            state.inflight.len(),
            "[{}] in-flight gauges disagree with the index",
            self.name
        );
        debug_assert_eq!(
            self.counters.completed.get() + (state.overflow.len() + state.inflight.len()) as u64,
            self.counters.enqueued.get(),
            "[{}] enqueued requests not conserved",
            self.name
        );
    }
}

fn direction(event: &AccessEvent) -> &'static str {
    if event.is_write() {
        "write"
    } else {
        "read"
    }
}

impl MemObject for DramController {
    fn access(&mut self, req: &mut MemReq, recorder: Option<&mut dyn EventRecorder>) -> Cycle {
        DramController::access(self, req, recorder)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn init_stats(&self, parent: &mut AggregateStat) {
        let mut group = AggregateStat::new(self.name.clone(), "Memory controller stats");
        self.counters.register(&mut group);
        parent.append(group);
    }
}

module!(DramController, DramControllerState, DramConfig,);

impl ModuleBehaviors for DramController {
    fn tick_one(&mut self) {
        let now = module_now(self);
        self.tick(now);
    }

    /// Rewinds the controller cycle and clock accumulator only.  The engine clock and the
    /// counters keep running.
    fn reset(&mut self) {
        assert!(
            self.is_idle(),
            "[{}] reset with requests outstanding",
            self.name
        );
        self.base.cycle = 0;
        self.clock.reset();
    }
}

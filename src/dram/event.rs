//! Pending-access events and the seam through which the controller hands them to the host
//! scheduler.
//!
//! An [`AccessEvent`] is created by `access`, parked in the host's queue until its start cycle,
//! then owned by the controller (overflow queue or in-flight index) until its completion resolves
//! it.  The resolved event is handed back to the host.  The state machine below enforces that each
//! event is started, held and resolved exactly once.

use crate::dram::request::{DramRequest, DramRequestKind, MemReqKind};
use crate::timeq::Cycle;

pub type EventId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// Recorded with the scheduler, not yet simulated.
    Recorded,
    /// `simulate` ran; waiting for admission to the engine.
    Running,
    /// Admitted; suspended until the engine completes it.
    Held,
    /// Completion arrived; hold released.
    Released,
    Done(Cycle),
}

#[derive(Debug)]
pub struct AccessEvent {
    id: EventId,
    target: usize,
    write: bool,
    addr: u64,
    core_id: u32,
    domain: u32,
    min_start_cycle: Cycle,
    s_cycle: Cycle,
    state: EventState,
}

impl AccessEvent {
    pub fn new(id: EventId, target: usize, write: bool, addr: u64, core_id: u32, domain: u32) -> Self {
        Self {
            id,
            target,
            write,
            addr,
            core_id,
            domain,
            min_start_cycle: 0,
            s_cycle: 0,
            state: EventState::Recorded,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    /// Index of the controller that owns this event.
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn is_write(&self) -> bool {
        self.write
    }

    pub fn addr(&self) -> u64 {
        self.addr
    }

    pub fn core_id(&self) -> u32 {
        self.core_id
    }

    pub fn domain(&self) -> u32 {
        self.domain
    }

    pub fn min_start_cycle(&self) -> Cycle {
        self.min_start_cycle
    }

    pub fn set_min_start_cycle(&mut self, cycle: Cycle) {
        self.min_start_cycle = cycle;
    }

    /// Cycle at which the scheduler actually ran the event.
    pub fn s_cycle(&self) -> Cycle {
        self.s_cycle
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    pub fn done_cycle(&self) -> Option<Cycle> {
        match self.state {
            EventState::Done(cycle) => Some(cycle),
            _ => None,
        }
    }

    pub fn dram_request(&self) -> DramRequest {
        let kind = if self.write {
            DramRequestKind::Write
        } else {
            DramRequestKind::Read
        };
        DramRequest::new(self.addr, kind, self.core_id)
    }

    pub(crate) fn start(&mut self, start_cycle: Cycle) {
        assert_eq!(
            self.state,
            EventState::Recorded,
            "event {} simulated twice",
            self.id
        );
        self.s_cycle = start_cycle;
        self.state = EventState::Running;
    }

    pub(crate) fn hold(&mut self) {
        assert_eq!(
            self.state,
            EventState::Running,
            "event {} held while not running",
            self.id
        );
        self.state = EventState::Held;
    }

    pub(crate) fn release(&mut self) {
        assert_eq!(
            self.state,
            EventState::Held,
            "event {} released without a hold",
            self.id
        );
        self.state = EventState::Released;
    }

    pub(crate) fn done(&mut self, cycle: Cycle) {
        assert_eq!(
            self.state,
            EventState::Released,
            "event {} resolved twice or before release",
            self.id
        );
        self.state = EventState::Done(cycle);
    }
}

/// What `access` reports to the scheduler alongside a new event.
#[derive(Debug)]
pub struct TimingRecord {
    pub addr: u64,
    pub req_cycle: Cycle,
    pub resp_cycle: Cycle,
    pub kind: MemReqKind,
    pub event: AccessEvent,
}

/// Host-side sink for deferred events.  A requester without a recorder gets the response-cycle
/// bound only and no event is created.
pub trait EventRecorder {
    fn alloc_id(&mut self) -> EventId;

    fn push_record(&mut self, record: TimingRecord);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> AccessEvent {
        AccessEvent::new(7, 0, false, 0x40, 1, 0)
    }

    #[test]
    fn lifecycle_runs_once() {
        let mut ev = event();
        ev.start(12);
        assert_eq!(12, ev.s_cycle());
        ev.hold();
        ev.release();
        ev.done(30);
        assert_eq!(Some(30), ev.done_cycle());
    }

    #[test]
    #[should_panic(expected = "resolved twice")]
    fn double_resolve_is_fatal() {
        let mut ev = event();
        ev.start(0);
        ev.hold();
        ev.release();
        ev.done(5);
        ev.done(6);
    }

    #[test]
    #[should_panic(expected = "released without a hold")]
    fn release_without_hold_is_fatal() {
        let mut ev = event();
        ev.start(0);
        ev.release();
    }

    #[test]
    fn dram_request_carries_direction() {
        let ev = AccessEvent::new(1, 0, true, 0x80, 3, 0);
        let req = ev.dram_request();
        assert_eq!(0x80, req.addr);
        assert_eq!(DramRequestKind::Write, req.kind);
        assert_eq!(3, req.core_id);
    }
}

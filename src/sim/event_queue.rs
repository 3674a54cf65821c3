//! Minimal host scheduler for deferred memory events.
//!
//! Records handed over by `access` are run on their owning controller once the host reaches the
//! event's minimum start cycle (FIFO among equal cycles).  Resolved events come back through
//! [`EventQueue::collect`] and are turned into [`CompletedAccess`] records.

use log::trace;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::dram::controller::DramController;
use crate::dram::event::{AccessEvent, EventId, EventRecorder, TimingRecord};
use crate::timeq::Cycle;

#[derive(Debug)]
struct Scheduled {
    start: Cycle,
    seq: u64,
    event: AccessEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.start, self.seq) == (other.start, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        (other.start, other.seq).cmp(&(self.start, self.seq))
    }
}

#[derive(Debug, Clone, Copy)]
struct Outstanding {
    req_cycle: Cycle,
    resp_cycle: Cycle,
}

/// Host view of a finished access.  `done_cycle` never precedes the response cycle that `access`
/// promised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletedAccess {
    pub id: EventId,
    pub target: usize,
    pub core_id: u32,
    pub domain: u32,
    pub addr: u64,
    pub is_write: bool,
    pub req_cycle: Cycle,
    pub resp_cycle: Cycle,
    pub done_cycle: Cycle,
}

impl CompletedAccess {
    pub fn latency(&self) -> Cycle {
        self.done_cycle - self.req_cycle
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    next_id: EventId,
    seq: u64,
    scheduled: BinaryHeap<Scheduled>,
    outstanding: HashMap<EventId, Outstanding>,
    completed: Vec<CompletedAccess>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_start(&self) -> Option<Cycle> {
        self.scheduled.peek().map(|s| s.start)
    }

    pub fn pop_due(&mut self, now: Cycle) -> Option<AccessEvent> {
        if self.next_start()? > now {
            return None;
        }
        self.scheduled.pop().map(|s| s.event)
    }

    /// Run every event due at `now` on its owning controller.
    pub fn run_due(&mut self, now: Cycle, ctrls: &mut [DramController]) -> usize {
        let mut ran = 0;
        while let Some(event) = self.pop_due(now) {
            let target = event.target();
            ctrls[target].simulate(event, now);
            ran += 1;
        }
        ran
    }

    /// Pull resolved events out of every controller.
    pub fn collect(&mut self, ctrls: &mut [DramController]) -> usize {
        let mut n = 0;
        for ctrl in ctrls.iter_mut() {
            for event in ctrl.drain_completions() {
                self.complete(event);
                n += 1;
            }
        }
        n
    }

    pub fn complete(&mut self, event: AccessEvent) -> CompletedAccess {
        let done = event
            .done_cycle()
            .unwrap_or_else(|| panic!("event {} handed back unresolved", event.id()));
        let outstanding = self
            .outstanding
            .remove(&event.id())
            .unwrap_or_else(|| panic!("event {} was never recorded", event.id()));
        let completed = CompletedAccess {
            id: event.id(),
            target: event.target(),
            core_id: event.core_id(),
            domain: event.domain(),
            addr: event.addr(),
            is_write: event.is_write(),
            req_cycle: outstanding.req_cycle,
            resp_cycle: outstanding.resp_cycle,
            done_cycle: done.max(outstanding.resp_cycle),
        };
        trace!(
            "event {} ({:#x}) done@{} latency {}",
            completed.id,
            completed.addr,
            completed.done_cycle,
            completed.latency()
        );
        self.completed.push(completed);
        completed
    }

    pub fn scheduled_len(&self) -> usize {
        self.scheduled.len()
    }

    /// Recorded events not yet completed, scheduled or not.
    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_drained(&self) -> bool {
        self.outstanding.is_empty()
    }

    pub fn completed(&self) -> &[CompletedAccess] {
        &self.completed
    }
}

impl EventRecorder for EventQueue {
    fn alloc_id(&mut self) -> EventId {
        self.next_id += 1;
        self.next_id
    }

    fn push_record(&mut self, record: TimingRecord) {
        trace!(
            "record {:?} {:#x} req@{} resp@{}",
            record.kind,
            record.addr,
            record.req_cycle,
            record.resp_cycle
        );
        self.outstanding.insert(
            record.event.id(),
            Outstanding {
                req_cycle: record.req_cycle,
                resp_cycle: record.resp_cycle,
            },
        );
        self.seq += 1;
        self.scheduled.push(Scheduled {
            start: record.event.min_start_cycle(),
            seq: self.seq,
            event: record.event,
        });
    }
}

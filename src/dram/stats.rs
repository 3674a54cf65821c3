use serde::Serialize;
use std::ops::AddAssign;

use crate::base::stats::{AggregateStat, Counter};

/// Live counters of one controller.  Registered by handle into the caller's stats tree.
#[derive(Debug, Clone)]
pub(crate) struct ControllerCounters {
    pub(crate) reads: Counter,
    pub(crate) writes: Counter,
    pub(crate) total_rd_lat: Counter,
    pub(crate) total_wr_lat: Counter,
    pub(crate) reissued: Counter,
    pub(crate) accesses: Counter,
    pub(crate) completed: Counter,
    pub(crate) enqueued: Counter,
    pub(crate) inflight_requests: Counter,
    pub(crate) simulate_num: Counter,
    pub(crate) incoming_rd_wr: Counter,
    pub(crate) issued_rd_wr: Counter,
    pub(crate) max_overflow: Counter,
}

impl ControllerCounters {
    pub(crate) fn new() -> Self {
        Self {
            reads: Counter::new("rd", "Completed Read requests"),
            writes: Counter::new("wr", "Completed Write requests"),
            total_rd_lat: Counter::new(
                "rdlat",
                "Total latency experienced by completed read requests",
            ),
            total_wr_lat: Counter::new(
                "wrlat",
                "Total latency experienced by completed write requests",
            ),
            reissued: Counter::new(
                "reissuedAccesses",
                "Number of accesses that were reissued due to full queue",
            ),
            accesses: Counter::new("accesses", "Total accesses"),
            completed: Counter::new("completed", "Total completed number"),
            enqueued: Counter::new("enqueue", "Total enqueue number"),
            inflight_requests: Counter::new("InflightRequests", "Total InflightRequests number"),
            simulate_num: Counter::new("simulateNum", "Total simulate number"),
            incoming_rd_wr: Counter::new("incomingRdWr", "Total incoming RdWr requests"),
            issued_rd_wr: Counter::new("issuedRdWr", "Total issued RdWr requests"),
            max_overflow: Counter::new("maxOverflow", "Peak overflow queue occupancy"),
        }
    }

    fn all(&self) -> [&Counter; 13] {
        [
            &self.reads,
            &self.writes,
            &self.total_rd_lat,
            &self.total_wr_lat,
            &self.reissued,
            &self.accesses,
            &self.completed,
            &self.enqueued,
            &self.inflight_requests,
            &self.simulate_num,
            &self.incoming_rd_wr,
            &self.issued_rd_wr,
            &self.max_overflow,
        ]
    }

    pub(crate) fn register(&self, group: &mut AggregateStat) {
        for counter in self.all() {
            group.append_counter(counter);
        }
    }

    pub(crate) fn snapshot(&self) -> ControllerStats {
        ControllerStats {
            reads: self.reads.get(),
            writes: self.writes.get(),
            total_rd_lat: self.total_rd_lat.get(),
            total_wr_lat: self.total_wr_lat.get(),
            reissued: self.reissued.get(),
            accesses: self.accesses.get(),
            completed: self.completed.get(),
            enqueued: self.enqueued.get(),
            inflight_requests: self.inflight_requests.get(),
            simulate_num: self.simulate_num.get(),
            incoming_rd_wr: self.incoming_rd_wr.get(),
            issued_rd_wr: self.issued_rd_wr.get(),
            max_overflow: self.max_overflow.get(),
        }
    }
}

/// Point-in-time copy of a controller's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    pub reads: u64,
    pub writes: u64,
    pub total_rd_lat: u64,
    pub total_wr_lat: u64,
    pub reissued: u64,
    pub accesses: u64,
    pub completed: u64,
    pub enqueued: u64,
    pub inflight_requests: u64,
    pub simulate_num: u64,
    pub incoming_rd_wr: u64,
    pub issued_rd_wr: u64,
    pub max_overflow: u64,
}

impl ControllerStats {
    pub fn avg_read_latency(&self) -> Option<f64> {
        (self.reads > 0).then(|| self.total_rd_lat as f64 / self.reads as f64)
    }

    pub fn avg_write_latency(&self) -> Option<f64> {
        (self.writes > 0).then(|| self.total_wr_lat as f64 / self.writes as f64)
    }
}

impl AddAssign<&ControllerStats> for ControllerStats {
    fn add_assign(&mut self, other: &ControllerStats) {
        self.reads = self.reads.saturating_add(other.reads);
        self.writes = self.writes.saturating_add(other.writes);
        self.total_rd_lat = self.total_rd_lat.saturating_add(other.total_rd_lat);
        self.total_wr_lat = self.total_wr_lat.saturating_add(other.total_wr_lat);
        self.reissued = self.reissued.saturating_add(other.reissued);
        self.accesses = self.accesses.saturating_add(other.accesses);
        self.completed = self.completed.saturating_add(other.completed);
        self.enqueued = self.enqueued.saturating_add(other.enqueued);
        self.inflight_requests = self
            .inflight_requests
            .saturating_add(other.inflight_requests);
        self.simulate_num = self.simulate_num.saturating_add(other.simulate_num);
        self.incoming_rd_wr = self.incoming_rd_wr.saturating_add(other.incoming_rd_wr);
        self.issued_rd_wr = self.issued_rd_wr.saturating_add(other.issued_rd_wr);
        self.max_overflow = self.max_overflow.max(other.max_overflow);
    }
}

impl AddAssign<ControllerStats> for ControllerStats {
    fn add_assign(&mut self, other: ControllerStats) {
        *self += &other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_exposes_stable_names() {
        let counters = ControllerCounters::new();
        let mut group = AggregateStat::new("mem-0", "Memory controller stats");
        counters.register(&mut group);
        counters.reads.inc();
        counters.reissued.inc_by(2);
        for name in [
            "rd",
            "wr",
            "rdlat",
            "wrlat",
            "reissuedAccesses",
            "accesses",
            "completed",
            "enqueue",
            "InflightRequests",
            "simulateNum",
            "incomingRdWr",
            "issuedRdWr",
            "maxOverflow",
        ] {
            assert!(group.lookup(name).is_some(), "{name} not registered");
        }
        assert_eq!(Some(1), group.lookup("rd"));
        assert_eq!(Some(2), group.lookup("reissuedAccesses"));
    }

    #[test]
    fn accumulate_sums_and_keeps_peak() {
        let mut total = ControllerStats {
            reads: 2,
            total_rd_lat: 200,
            max_overflow: 3,
            ..ControllerStats::default()
        };
        total += ControllerStats {
            reads: 2,
            total_rd_lat: 400,
            max_overflow: 1,
            ..ControllerStats::default()
        };
        assert_eq!(4, total.reads);
        assert_eq!(Some(150.0), total.avg_read_latency());
        assert_eq!(None, total.avg_write_latency());
        assert_eq!(3, total.max_overflow);
    }
}

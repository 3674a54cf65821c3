/*
Time-queue used by the reference DRAM engine.

A TimedServer holds requests that were admitted at some cycle and releases them once their service
time has elapsed.  Admission is bounded two ways:
    - a cap on outstanding requests (queue_capacity)
    - a cap on admissions within the same cycle (accepts_per_cycle)

When either cap is hit the server returns a Backpressure carrying the request back to the caller, so
nothing is lost on a refused admission.
*/

use std::collections::VecDeque;

use crate::base::module::IsModule;

pub type Cycle = u64;

// Helper to read the current cycle from any module
pub fn module_now<M: IsModule>(module: &M) -> Cycle {
    module.base_ref().cycle
}

// Result of queueing a request with a timed server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    ready_at: Cycle,
}

impl Ticket {
    fn new(ready_at: Cycle) -> Self {
        Self { ready_at }
    }

    // Cycle at which the server hands the payload back.
    pub fn ready_at(&self) -> Cycle {
        self.ready_at
    }

    pub fn is_ready(&self, now: Cycle) -> bool {
        now >= self.ready_at
    }
}

// The request carries the payload and the cycles it occupies the server on top of the base latency
#[derive(Debug)]
pub struct ServiceRequest<T> {
    pub payload: T,
    pub service_cycles: Cycle,
}

impl<T> ServiceRequest<T> {
    pub fn new(payload: T, service_cycles: Cycle) -> Self {
        Self {
            payload,
            service_cycles,
        }
    }
}

#[derive(Debug)]
pub struct ServiceResult<T> {
    pub payload: T,
    pub ticket: Ticket,
}

// Reasons why the server rejected a request
#[derive(Debug)]
pub enum Backpressure<T> {
    // Too many requests outstanding
    QueueFull { request: ServiceRequest<T>, capacity: usize },
    // Admission budget for this cycle is spent
    Busy { request: ServiceRequest<T>, available_at: Cycle },
}

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    // Fixed latency added to every request
    pub base_latency: Cycle,
    // Maximum number of outstanding requests the server will accept
    pub queue_capacity: usize,
    // Maximum number of admissions within a single cycle
    pub accepts_per_cycle: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_latency: 0,
            queue_capacity: 1,
            accepts_per_cycle: 1,
        }
    }
}

#[derive(Debug)]
struct Inflight<T> {
    payload: T,
    ticket: Ticket,
}

// Server that keeps outstanding work ordered by completion cycle.  Requests with the same ready
// cycle leave in admission order.
#[derive(Debug)]
pub struct TimedServer<T> {
    config: ServerConfig,
    inflight: VecDeque<Inflight<T>>,
    budget_cycle: Cycle,
    accepted_in_cycle: u32,
}

impl<T> TimedServer<T> {
    pub fn new(config: ServerConfig) -> Self {
        assert!(config.queue_capacity > 0, "queue_capacity must be > 0");
        assert!(config.accepts_per_cycle > 0, "accepts_per_cycle must be > 0");
        Self {
            config,
            inflight: VecDeque::with_capacity(config.queue_capacity),
            budget_cycle: 0,
            accepted_in_cycle: 0,
        }
    }

    // Attempt to enqueue a request at the provided cycle.
    // Returns a Ticket on success or a Backpressure describing why the request could not be accepted.
    pub fn try_enqueue(
        &mut self,
        now: Cycle,
        request: ServiceRequest<T>,
    ) -> Result<Ticket, Backpressure<T>> {
        if self.inflight.len() >= self.config.queue_capacity {
            return Err(Backpressure::QueueFull {
                request,
                capacity: self.config.queue_capacity,
            });
        }

        if now != self.budget_cycle {
            self.budget_cycle = now;
            self.accepted_in_cycle = 0;
        }
        if self.accepted_in_cycle >= self.config.accepts_per_cycle {
            return Err(Backpressure::Busy {
                request,
                available_at: now.saturating_add(1),
            });
        }

        let ready_at = now
            .saturating_add(self.config.base_latency)
            .saturating_add(request.service_cycles);
        let ticket = Ticket::new(ready_at);
        self.accepted_in_cycle += 1;

        let pos = self
            .inflight
            .iter()
            .position(|entry| entry.ticket.ready_at > ready_at)
            .unwrap_or(self.inflight.len());
        self.inflight.insert(
            pos,
            Inflight {
                payload: request.payload,
                ticket,
            },
        );

        Ok(ticket)
    }

    // Drain any requests that have completed by "now" and invoke the supplied callback with the
    // results.
    pub fn service_ready<F>(&mut self, now: Cycle, mut callback: F)
    where
        F: FnMut(ServiceResult<T>),
    {
        while let Some(front) = self.inflight.front() {
            if !front.ticket.is_ready(now) {
                break;
            }
            let inflight = self.inflight.pop_front().expect("front just checked");
            callback(ServiceResult {
                payload: inflight.payload,
                ticket: inflight.ticket,
            });
        }
    }

    pub fn outstanding(&self) -> usize {
        self.inflight.len()
    }
}

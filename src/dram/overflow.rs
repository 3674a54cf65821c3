use std::collections::VecDeque;

use crate::dram::event::AccessEvent;

/// Events the engine refused on their first admission attempt, retried strictly in arrival order.
/// Unbounded; `high_water` records the peak depth.
#[derive(Debug, Default)]
pub struct OverflowQueue {
    entries: VecDeque<AccessEvent>,
    high_water: usize,
}

impl OverflowQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return the resulting depth.
    pub fn push_back(&mut self, event: AccessEvent) -> usize {
        self.entries.push_back(event);
        self.high_water = self.high_water.max(self.entries.len());
        self.entries.len()
    }

    pub fn front(&self) -> Option<&AccessEvent> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<AccessEvent> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(id: u64) -> AccessEvent {
        AccessEvent::new(id, 0, false, id * 64, 0, 0)
    }

    #[test]
    fn pops_in_arrival_order() {
        let mut q = OverflowQueue::new();
        assert_eq!(1, q.push_back(ev(1)));
        assert_eq!(2, q.push_back(ev(2)));
        assert_eq!(3, q.push_back(ev(3)));
        assert_eq!(1, q.front().unwrap().id());
        let order: Vec<_> = std::iter::from_fn(|| q.pop_front()).map(|e| e.id()).collect();
        assert_eq!(vec![1, 2, 3], order);
        assert!(q.is_empty());
    }

    #[test]
    fn high_water_survives_drain() {
        let mut q = OverflowQueue::new();
        q.push_back(ev(1));
        q.push_back(ev(2));
        q.pop_front();
        q.push_back(ev(3));
        q.pop_front();
        q.pop_front();
        assert_eq!(0, q.len());
        assert_eq!(2, q.high_water());
    }
}

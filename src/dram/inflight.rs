use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::dram::event::AccessEvent;

/// Multi-valued address -> event table for requests the engine has accepted.
///
/// Several events may be outstanding for one address.  A completion resolves the oldest entry for
/// its address whose direction matches, falling back to the oldest entry of either direction.
#[derive(Debug, Default)]
pub(crate) struct InflightIndex {
    entries: BTreeMap<u64, SmallVec<[AccessEvent; 2]>>,
    len: usize,
}

impl InflightIndex {
    pub(crate) fn insert(&mut self, addr: u64, event: AccessEvent) {
        self.entries.entry(addr).or_default().push(event);
        self.len += 1;
    }

    pub(crate) fn take(&mut self, addr: u64, write: bool) -> Option<AccessEvent> {
        let slot = self.entries.get_mut(&addr)?;
        let idx = slot
            .iter()
            .position(|event| event.is_write() == write)
            .unwrap_or(0);
        let event = slot.remove(idx);
        if slot.is_empty() {
            self.entries.remove(&addr);
        }
        self.len -= 1;
        Some(event)
    }

    pub(crate) fn contains(&self, addr: u64) -> bool {
        self.entries.contains_key(&addr)
    }

    pub(crate) fn count(&self, addr: u64) -> usize {
        self.entries.get(&addr).map_or(0, |slot| slot.len())
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}

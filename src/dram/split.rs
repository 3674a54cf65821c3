use crate::base::mem::MemObject;
use crate::base::stats::AggregateStat;
use crate::dram::event::EventRecorder;
use crate::dram::request::MemReq;
use crate::timeq::Cycle;

/// Line-interleaves accesses over several memory objects: line `a` goes to `mems[a % n]` as line
/// `a / n`.  Holds no state of its own.
pub struct SplitAddrMemory<M> {
    mems: Vec<M>,
    name: String,
}

impl<M: MemObject> SplitAddrMemory<M> {
    pub fn new(mems: Vec<M>, name: impl Into<String>) -> Self {
        assert!(!mems.is_empty(), "address split needs at least one memory");
        Self {
            mems,
            name: name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.mems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mems.is_empty()
    }

    pub fn mems(&self) -> &[M] {
        &self.mems
    }

    pub fn mems_mut(&mut self) -> &mut [M] {
        &mut self.mems
    }

    pub fn into_inner(self) -> Vec<M> {
        self.mems
    }
}

impl<M: MemObject> MemObject for SplitAddrMemory<M> {
    fn access(&mut self, req: &mut MemReq, recorder: Option<&mut dyn EventRecorder>) -> Cycle {
        let addr = req.line_addr;
        let n = self.mems.len() as u64;
        let mem = (addr % n) as usize;
        req.line_addr = addr / n;
        let resp_cycle = self.mems[mem].access(req, recorder);
        req.line_addr = addr;
        resp_cycle
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn init_stats(&self, parent: &mut AggregateStat) {
        for mem in &self.mems {
            mem.init_stats(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::stats::Counter;
    use crate::dram::request::MemReqKind;

    struct Probe {
        name: String,
        latency: Cycle,
        seen: Vec<u64>,
        hits: Counter,
    }

    impl Probe {
        fn new(id: usize, latency: Cycle) -> Self {
            Self {
                name: format!("probe-{id}"),
                latency,
                seen: Vec::new(),
                hits: Counter::new("hits", "accesses seen"),
            }
        }
    }

    impl MemObject for Probe {
        fn access(&mut self, req: &mut MemReq, _recorder: Option<&mut dyn EventRecorder>) -> Cycle {
            self.seen.push(req.line_addr);
            self.hits.inc();
            req.cycle + self.latency
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn init_stats(&self, parent: &mut AggregateStat) {
            let mut group = AggregateStat::new(self.name.clone(), "probe");
            group.append_counter(&self.hits);
            parent.append(group);
        }
    }

    #[test]
    fn routes_by_modulo_and_restores_address() {
        let mut split = SplitAddrMemory::new(vec![Probe::new(0, 10), Probe::new(1, 20), Probe::new(2, 30)], "split");
        let mut req = MemReq::new(MemReqKind::GetS, 7, 100, 0);
        let resp = split.access(&mut req, None);
        // 7 % 3 = 1, 7 / 3 = 2
        assert_eq!(120, resp);
        assert_eq!(7, req.line_addr);
        assert_eq!(vec![2], split.mems()[1].seen);
        assert!(split.mems()[0].seen.is_empty());
        assert!(split.mems()[2].seen.is_empty());
    }

    #[test]
    fn single_memory_is_identity() {
        let mut split = SplitAddrMemory::new(vec![Probe::new(0, 5)], "split");
        let mut req = MemReq::new(MemReqKind::GetX, 0x1234, 0, 0);
        split.access(&mut req, None);
        assert_eq!(vec![0x1234], split.mems()[0].seen);
    }

    #[test]
    fn init_stats_delegates_to_every_memory() {
        let split = SplitAddrMemory::new(vec![Probe::new(0, 1), Probe::new(1, 1)], "split");
        let mut root = AggregateStat::new("root", "Stats");
        split.init_stats(&mut root);
        assert_eq!(2, root.children().len());
        assert_eq!(Some(0), root.lookup("probe-1.hits"));
    }

    #[test]
    #[should_panic(expected = "at least one memory")]
    fn empty_split_rejected() {
        let _ = SplitAddrMemory::<Probe>::new(Vec::new(), "split");
    }
}

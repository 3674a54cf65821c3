use crate::base::stats::AggregateStat;
use crate::dram::event::EventRecorder;
use crate::dram::request::MemReq;
use crate::timeq::Cycle;

/// Trait for memory objects that sit below the cache hierarchy.
pub trait MemObject {
    /// Perform the access and return the cycle at which the response is available.  The returned
    /// cycle is a lower bound; when a recorder is supplied the true completion is reported later
    /// through the event it receives.
    fn access(&mut self, req: &mut MemReq, recorder: Option<&mut dyn EventRecorder>) -> Cycle;

    fn name(&self) -> &str;

    fn init_stats(&self, parent: &mut AggregateStat);
}

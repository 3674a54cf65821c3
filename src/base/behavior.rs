use std::sync::Arc;

/// Per-cycle behavior shared by every simulated module.
pub trait ModuleBehaviors {
    /// Advance the module by one of its own cycles.
    fn tick_one(&mut self);

    fn reset(&mut self);
}

pub trait Parameterizable {
    type ConfigType;

    fn conf(&self) -> &Self::ConfigType;

    fn init_conf(&mut self, conf: Arc<Self::ConfigType>);
}

pub mod behavior;
pub mod mem;
pub mod module;
pub mod stats;

pub mod config;
pub mod event_queue;
pub mod top;

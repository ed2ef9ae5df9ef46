//! Trigger guard and workflow selection for forkkeep.

pub mod scheduler;
pub mod triggers;

pub use scheduler::Scheduler;
pub use triggers::TriggerMatcher;

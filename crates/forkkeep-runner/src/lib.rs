//! Step execution engine for forkkeep.

pub mod action;
pub mod executor;
pub mod runner;
pub mod shell;

pub use action::ActionRunner;
pub use executor::WorkflowExecutor;
pub use runner::{OutputLine, OutputStream, RunnerConfig, StepContext, StepResult, StepRunner};
pub use shell::{OUTPUT_FILE_VAR, ShellRunner};

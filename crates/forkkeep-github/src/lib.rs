//! GitHub access for forkkeep.
//!
//! [`GitHubClient`] covers the REST endpoints the fork maintenance tasks
//! need. [`DispatchNotifier`] is the narrow seam workflow steps use to
//! send a `repository_dispatch` event to another repository.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod types;

pub use client::{DEFAULT_API_URL, GitHubClient};
pub use dispatch::{DispatchNotifier, GitHubDispatcher};
pub use error::GitHubError;
pub use types::*;

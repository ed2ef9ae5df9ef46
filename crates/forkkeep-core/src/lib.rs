//! forkkeep core
//!
//! Domain vocabulary shared by every forkkeep crate: trigger events,
//! workflow definitions, credentials, run records, strict versions and the
//! JSON files kept in integration repositories.

pub mod credentials;
pub mod error;
pub mod identity;
pub mod ids;
pub mod interpolation;
pub mod manifest;
pub mod run;
pub mod trigger;
pub mod version;
pub mod workflow;

pub use error::{Error, Result};
pub use identity::GitIdentity;
pub use ids::*;

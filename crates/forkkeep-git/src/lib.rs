//! Thin async wrapper over the `git` command line.

pub mod repo;

pub use repo::{GitOutput, GitRepo, authenticated_url, mask_url_credentials};

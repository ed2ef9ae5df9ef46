//! Maintenance tasks for the integration forks: pulling upstream releases
//! into an `autoupdate` pull request, packaging, publishing GitHub releases
//! and onboarding new forks.

pub mod build;
pub mod fork;
pub mod onboard;
pub mod release;
pub mod release_file;
pub mod sync;

pub use build::{BuildOptions, Platform, build};
pub use fork::ForkManager;
pub use onboard::{OnboardOptions, onboard};
pub use release::{package_assets, release};
pub use release_file::update_release_file;
pub use sync::sync;

use forkkeep_core::GitIdentity;

/// Remote names used in fork working copies.
pub const ORIGIN_REMOTE: &str = "origin";
pub const UPSTREAM_REMOTE: &str = "upstream";

/// Event sent to a fork after new upstream changes were pushed.
pub const VALIDATION_EVENT: &str = "validation";

/// Default dependency install command: pin the requirements with
/// pip-compile, then install wheels for the target platform without
/// resolving further dependencies. `{requirements}`, `{target}` and
/// `{platform}` are replaced before running it through `sh -c`.
pub const DEFAULT_INSTALL_COMMAND: &str = concat!(
    r#"pip-compile --quiet --output-file=- "{requirements}" | "#,
    r#"python -m pip install --requirement /dev/stdin --platform {platform} "#,
    r#"--target "{target}" --python-version 37 --no-compile --no-deps"#,
);

/// Settings shared by the tasks.
#[derive(Debug, Clone)]
pub struct TaskSettings {
    /// Account owning the forks; used to authenticate pushes.
    pub owner: GitIdentity,
    /// Account authoring commits.
    pub bot: GitIdentity,
    pub install_command: String,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            owner: GitIdentity::owner(),
            bot: GitIdentity::bot(),
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
        }
    }
}

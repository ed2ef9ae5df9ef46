//! Git identities used when committing and pushing on behalf of the
//! organisation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitIdentity {
    pub login: String,
    pub email: String,
}

impl GitIdentity {
    pub fn new(login: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            email: email.into(),
        }
    }

    /// Account that owns the forks.
    pub fn owner() -> Self {
        Self::new("FriendsOfGalaxy", "FriendsOfGalaxy@gmail.com")
    }

    /// Automation account that authors commits.
    pub fn bot() -> Self {
        Self::new("FriendsOfGalaxyBot", "FriendsOfGalaxy+bot@gmail.com")
    }
}

//! Credential tokens and their repository scopes.
//!
//! A credential is an opaque token injected through the environment. When a
//! binding names a repository, the token may only be handed out for that
//! repository.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declares where a credential comes from and what it may be used for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBinding {
    pub name: String,
    /// Environment variable holding the token. Defaults to `name`.
    #[serde(default)]
    pub env: Option<String>,
    /// `owner/name` of the only repository this token may authenticate.
    #[serde(default)]
    pub repository: Option<String>,
}

impl CredentialBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            env: None,
            repository: None,
        }
    }

    pub fn scoped(name: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            env: None,
            repository: Some(repository.into()),
        }
    }

    pub fn env_var(&self) -> &str {
        self.env.as_deref().unwrap_or(&self.name)
    }
}

/// A resolved token.
#[derive(Clone)]
pub struct Credential {
    binding: CredentialBinding,
    value: String,
}

impl Credential {
    pub fn new(binding: CredentialBinding, value: impl Into<String>) -> Self {
        Self {
            binding,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.binding.name
    }

    pub fn repository(&self) -> Option<&str> {
        self.binding.repository.as_deref()
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    fn allows(&self, repository: &str) -> bool {
        match &self.binding.repository {
            Some(allowed) => allowed.eq_ignore_ascii_case(repository),
            None => true,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.binding.name)
            .field("repository", &self.binding.repository)
            .field("value", &"***")
            .finish()
    }
}

/// Credentials available to one workflow run.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    credentials: BTreeMap<String, Credential>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every binding from the process environment.
    pub fn from_env(bindings: &[CredentialBinding]) -> Result<Self> {
        Self::resolve(bindings, |var| std::env::var(var).ok())
    }

    /// Resolve bindings through an arbitrary lookup.
    pub fn resolve<F>(bindings: &[CredentialBinding], lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut store = Self::new();
        for binding in bindings {
            let value = lookup(binding.env_var())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::MissingCredential(binding.name.clone()))?;
            store.insert(Credential::new(binding.clone(), value));
        }
        Ok(store)
    }

    pub fn insert(&mut self, credential: Credential) {
        self.credentials
            .insert(credential.name().to_string(), credential);
    }

    pub fn get(&self, name: &str) -> Result<&Credential> {
        self.credentials
            .get(name)
            .ok_or_else(|| Error::MissingCredential(name.to_string()))
    }

    /// Token for `name`, only if it may authenticate against `repository`.
    pub fn for_repository(&self, name: &str, repository: &str) -> Result<&str> {
        let credential = self.get(name)?;
        if !credential.allows(repository) {
            return Err(Error::CredentialScope {
                name: name.to_string(),
                requested: repository.to_string(),
                allowed: credential.repository().unwrap_or_default().to_string(),
            });
        }
        Ok(credential.expose())
    }

    /// A store holding only the named credentials.
    pub fn subset(&self, names: &[String]) -> Result<Self> {
        let mut store = Self::new();
        for name in names {
            store.insert(self.get(name)?.clone());
        }
        Ok(store)
    }

    /// Name/value pairs, for interpolation.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.credentials
            .iter()
            .map(|(k, c)| (k.clone(), c.value.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Replace every credential value in `input` with `***`.
    pub fn mask(&self, input: &str) -> String {
        let mut output = input.to_string();
        for credential in self.credentials.values() {
            if !credential.value.is_empty() {
                output = output.replace(&credential.value, "***");
            }
        }
        output
    }
}

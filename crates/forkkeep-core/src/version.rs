//! Strict `major.minor[.patch][a|bN]` versions, as written in integration
//! manifests.

use crate::error::{Error, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?(?:([ab])(\d+))?$").expect("valid version regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    Alpha(u64),
    Beta(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct StrictVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<PreRelease>,
    explicit_patch: bool,
}

impl StrictVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            explicit_patch: true,
        }
    }

    /// Increment the last numeric component and drop any pre-release tag.
    pub fn bump(&self) -> Result<Self> {
        let mut next = *self;
        next.pre = None;
        let component = if self.explicit_patch {
            &mut next.patch
        } else {
            &mut next.minor
        };
        *component = component
            .checked_add(1)
            .ok_or_else(|| Error::InvalidVersion(format!("{} cannot be incremented", self)))?;
        Ok(next)
    }

    fn key(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl FromStr for StrictVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = version_regex()
            .captures(s.trim())
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;
        let num = |i: usize| -> Result<u64> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u64>())
                .transpose()
                .map_err(|_| Error::InvalidVersion(s.to_string()))
                .map(|v| v.unwrap_or(0))
        };

        let pre = match caps.get(4).map(|m| m.as_str()) {
            Some("a") => Some(PreRelease::Alpha(num(5)?)),
            Some("b") => Some(PreRelease::Beta(num(5)?)),
            _ => None,
        };

        Ok(Self {
            major: num(1)?,
            minor: num(2)?,
            patch: num(3)?,
            pre,
            explicit_patch: caps.get(3).is_some(),
        })
    }
}

impl PartialEq for StrictVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StrictVersion {}

impl PartialOrd for StrictVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StrictVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key()).then_with(|| match (self.pre, other.pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(&b),
        })
    }
}

impl fmt::Display for StrictVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.explicit_patch || self.patch != 0 {
            write!(f, ".{}", self.patch)?;
        }
        match self.pre {
            Some(PreRelease::Alpha(n)) => write!(f, "a{}", n),
            Some(PreRelease::Beta(n)) => write!(f, "b{}", n),
            None => Ok(()),
        }
    }
}

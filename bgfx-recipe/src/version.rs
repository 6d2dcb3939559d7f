//! Commit-count based semantic versions.
//!
//! Upstream does not tag releases, so a version is derived from the number of
//! commits on the main branch: `major = 1 + n / 10000`, `minor = (n / 100) % 100`
//! and `patch = n % 100`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::source::SourceControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn from_commit_count(count: u64) -> Self {
        Self {
            major: (1 + count / 10_000) as u32,
            minor: ((count / 100) % 100) as u32,
            patch: (count % 100) as u32,
        }
    }

    /// Inverse of [`Version::from_commit_count`].
    pub fn commit_count(&self) -> Result<u64> {
        if self.major == 0 || self.minor >= 100 || self.patch >= 100 {
            return Err(Error::invalid_version(format!(
                "{self} does not correspond to a commit count"
            )));
        }
        Ok(u64::from(self.major - 1) * 10_000 + u64::from(self.minor) * 100 + u64::from(self.patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('.');
        let mut next = |what: &str| -> Result<u32> {
            parts
                .next()
                .ok_or_else(|| Error::invalid_version(format!("`{s}` is missing the {what} part")))?
                .parse::<u32>()
                .map_err(|e| Error::invalid_version(format!("`{s}`: bad {what} part: {e}")))
        };
        let version = Version::new(next("major")?, next("minor")?, next("patch")?);
        if parts.next().is_some() {
            return Err(Error::invalid_version(format!("`{s}` has more than three parts")));
        }
        Ok(version)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Which revision of a repository to check out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Revision {
    #[default]
    Latest,
    Exact(Version),
}

impl FromStr for Revision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("latest") {
            Ok(Revision::Latest)
        } else {
            s.parse().map(Revision::Exact)
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Latest => f.write_str("latest"),
            Revision::Exact(v) => v.fmt(f),
        }
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Version of the checked out tree at `repo`, from its main branch history.
pub fn resolve<S: SourceControl + ?Sized>(scm: &S, repo: &Path, branch: &str) -> Result<Version> {
    let count = scm.commit_count(repo, branch)?;
    let version = Version::from_commit_count(count);
    info!(repo = %repo.display(), commits = count, %version, "resolved version");
    Ok(version)
}

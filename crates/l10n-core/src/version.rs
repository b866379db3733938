// SPDX-License-Identifier: MIT OR Apache-2.0
//! Semantic catalog versions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// VersionBump
// ---------------------------------------------------------------------------

/// Which component of a [`SemVersion`] an advancement increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    /// Increment MAJOR, zero MINOR and PATCH.
    Major,
    /// Increment MINOR, zero PATCH.
    Minor,
    /// Increment PATCH.
    Patch,
}

impl VersionBump {
    /// Stable lowercase tag (`"major"`, `"minor"`, `"patch"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionBump {
    type Err = SemVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            other => Err(SemVersionError::InvalidBump(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// SemVersion
// ---------------------------------------------------------------------------

/// A `MAJOR.MINOR.PATCH` catalog version.
///
/// Ordered lexicographically by component, which matches the strictly
/// increasing creation order enforced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl SemVersion {
    /// The `0.0.0` origin every catalog starts from.
    pub const ZERO: SemVersion = SemVersion { major: 0, minor: 0, patch: 0 };

    /// Construct from components.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Return the strict successor in the chosen component, with lower
    /// components zeroed.
    pub fn bump(&self, bump: VersionBump) -> SemVersion {
        match bump {
            VersionBump::Major => SemVersion::new(self.major + 1, 0, 0),
            VersionBump::Minor => SemVersion::new(self.major, self.minor + 1, 0),
            VersionBump::Patch => SemVersion::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl fmt::Display for SemVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemVersion {
    type Err = SemVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');
        let mut next = |name: &'static str| -> Result<u64, SemVersionError> {
            let part = parts
                .next()
                .ok_or_else(|| SemVersionError::InvalidFormat(s.to_string()))?;
            part.parse::<u64>()
                .map_err(|_| SemVersionError::InvalidComponent {
                    version: s.to_string(),
                    component: name,
                })
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        Ok(Self { major, minor, patch })
    }
}

// Serialized as the display string, matching the wire and storage format.
impl Serialize for SemVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// SemVersionError
// ---------------------------------------------------------------------------

/// Errors from parsing version strings or bump tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemVersionError {
    /// The string is not of the form `MAJOR.MINOR.PATCH`.
    #[error("invalid version format: {0:?}")]
    InvalidFormat(String),
    /// A component is not a non-negative integer.
    #[error("invalid {component} component in version {version:?}")]
    InvalidComponent {
        /// The offending version string.
        version: String,
        /// Which component failed to parse.
        component: &'static str,
    },
    /// The bump tag is not one of `major`, `minor`, `patch`.
    #[error("invalid version type: {0:?}")]
    InvalidBump(String),
}

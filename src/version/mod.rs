//! Version parsing and total ordering for release versions.
//!
//! CMAM versions follow `major.minor.patch[-prerelease]` where the optional
//! pre-release tag is one of `alpha`, `beta` or `rc`. A version is reduced to
//! the tuple `(major, minor, patch, tier)` and compared by tuple order, so two
//! strings that reduce to the same tuple are the same version regardless of
//! formatting (`v1.0.0` and `1.0.0`, `1.0.0-RC` and `1.0.0-rc`).
//!
//! # Ordering
//!
//! - Numeric components compare numerically: `1.2.0 < 1.10.0`
//! - Any pre-release is below the final release of the same `major.minor.patch`
//! - Among pre-releases: `alpha < beta < rc`
//!
//! ```rust
//! use cmam_cli::version::Version;
//!
//! # fn example() -> cmam_cli::core::Result<()> {
//! let alpha = Version::parse("1.0.0-alpha")?;
//! let rc = Version::parse("1.0.0-rc")?;
//! let final_release = Version::parse("v1.0.0")?;
//!
//! assert!(alpha < rc);
//! assert!(rc < final_release);
//! assert!(Version::parse("1.2.0")? < Version::parse("1.10.0")?);
//! # Ok(())
//! # }
//! ```
//!
//! Unrecognized pre-release tags are rejected rather than given a fallback
//! position in the order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::core::{CmamError, Result};

/// Pre-release tier of a version. Declaration order is precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    /// `-alpha`
    Alpha,
    /// `-beta`
    Beta,
    /// `-rc`
    Rc,
    /// No pre-release tag.
    Final,
}

impl PreRelease {
    /// Numeric rank: alpha=0, beta=1, rc=2, final=3.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Alpha => 0,
            Self::Beta => 1,
            Self::Rc => 2,
            Self::Final => 3,
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "alpha" => Some(Self::Alpha),
            "beta" => Some(Self::Beta),
            "rc" => Some(Self::Rc),
            _ => None,
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::Alpha => "-alpha",
            Self::Beta => "-beta",
            Self::Rc => "-rc",
            Self::Final => "",
        }
    }
}

/// A parsed, totally ordered version.
///
/// Field order matches comparison order, so the derived `Ord` is the tuple
/// order `(major, minor, patch, pre_release)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
    /// Pre-release tier
    pub pre_release: PreRelease,
}

impl Version {
    /// Create a final-release version.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: PreRelease::Final,
        }
    }

    /// Parse `major.minor.patch[-alpha|-beta|-rc]`, with an optional leading `v`.
    ///
    /// # Errors
    ///
    /// Returns [`CmamError::InvalidVersionFormat`] when the string has the wrong
    /// number of components, a non-numeric component, or an unknown
    /// pre-release tag.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || CmamError::InvalidVersionFormat {
            version: input.to_string(),
        };

        let trimmed = input.trim();
        let body = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);

        let (core, pre_release) = match body.split_once('-') {
            Some((core, tag)) => (core, PreRelease::from_tag(tag).ok_or_else(invalid)?),
            None => (body, PreRelease::Final),
        };

        let mut parts = core.split('.');
        let mut next_component = || -> Result<u64> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u64>().map_err(|_| invalid())
        };

        let major = next_component()?;
        let minor = next_component()?;
        let patch = next_component()?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre_release,
        })
    }
}

impl FromStr for Version {
    type Err = CmamError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}{}",
            self.major,
            self.minor,
            self.patch,
            self.pre_release.suffix()
        )
    }
}

/// Compare two version strings.
///
/// # Errors
///
/// Fails if either string is not a valid version.
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

/// Whether two version strings denote the same release.
///
/// Falls back to comparing the strings with any leading `v` removed when
/// either side does not parse, so unusual tags can still be matched exactly.
#[must_use]
pub fn same_version(a: &str, b: &str) -> bool {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => strip_v(a) == strip_v(b),
    }
}

/// Remove a single leading `v`/`V` from a tag.
#[must_use]
pub fn strip_v(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix(['v', 'V']).unwrap_or(tag)
}

/// Sort version strings newest first.
///
/// Strings that parse are ordered by [`Version`]; strings that do not parse
/// are placed after them in lexical order so the result stays deterministic.
pub fn sort_newest_first(versions: &mut [String]) {
    versions.sort_by(|a, b| match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
}

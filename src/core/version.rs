//! Version constraint parsing and selection
//!
//! Constraints come in three forms, chosen by their leading character:
//!
//! - `1.2.3` selects exactly that version
//! - `^1.2.0` selects the *greatest* known version, provided it is at least 1.2.0
//! - `~1.2.0` selects the known version nearest to 1.2.0 by magnitude
//!
//! The at-least form is intentionally not semver caret semantics: it picks the
//! maximum available version rather than the minimal satisfying one.

use semver::Version;

use crate::error::ResolveError;

/// A parsed version constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionQuery {
    /// Exact version
    Exact(Version),
    /// Greatest version, if it is not below the bound
    AtLeast(Version),
    /// Version with the smallest magnitude distance
    Nearest(Version),
}

impl VersionQuery {
    /// Parse a constraint string
    pub fn parse(constraint: &str) -> Result<Self, ResolveError> {
        let trimmed = constraint.trim();
        let invalid = |reason: &str| ResolveError::InvalidConstraint {
            constraint: constraint.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("constraint is empty"));
        }

        if let Some(rest) = trimmed.strip_prefix('^') {
            let bound = parse_numeric(rest).ok_or_else(|| invalid("expected ^MAJOR[.MINOR[.PATCH]]"))?;
            return Ok(Self::AtLeast(bound));
        }
        if let Some(rest) = trimmed.strip_prefix('~') {
            let near = parse_numeric(rest).ok_or_else(|| invalid("expected ~MAJOR[.MINOR[.PATCH]]"))?;
            return Ok(Self::Nearest(near));
        }

        parse_numeric(trimmed)
            .or_else(|| Version::parse(trimmed).ok())
            .map(Self::Exact)
            .ok_or_else(|| invalid("expected a version, ^version or ~version"))
    }

    /// Pick the best candidate from a list sorted in ascending order
    pub fn find_best(&self, sorted: &[Version]) -> Option<Version> {
        match self {
            Self::Exact(version) => sorted.iter().find(|v| *v == version).cloned(),
            Self::AtLeast(bound) => sorted.last().filter(|max| *max >= bound).cloned(),
            Self::Nearest(near) => find_nearest(sorted, near),
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }
}

/// Magnitude encoding used by nearest queries
///
/// Assumes no component exceeds 2^20.
pub fn magnitude(version: &Version) -> i128 {
    (i128::from(version.major) << 40) | (i128::from(version.minor) << 20) | i128::from(version.patch)
}

fn find_nearest(sorted: &[Version], near: &Version) -> Option<Version> {
    let target = magnitude(near);
    let mut best: Option<(&Version, i128)> = None;
    for candidate in sorted {
        let dist = (magnitude(candidate) - target).abs();
        match best {
            Some((_, best_dist)) if dist > best_dist => break,
            Some((_, best_dist)) if dist == best_dist => {}
            _ => best = Some((candidate, dist)),
        }
    }
    best.map(|(v, _)| v.clone())
}

/// Parse `MAJOR[.MINOR[.PATCH]]`; missing components are zero
pub fn parse_numeric(value: &str) -> Option<Version> {
    let parts: Vec<&str> = value.trim().split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    Some(Version::new(numbers[0], numbers[1], numbers[2]))
}

/// Sort and deduplicate versions in ascending order
pub fn sorted_versions(mut versions: Vec<Version>) -> Vec<Version> {
    versions.sort();
    versions.dedup();
    versions
}

//! Versioning modes deciding which tag a container should move to

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;
use tracing::debug;

use crate::registry::client::Tag;
use crate::registry::digest::Digest;
use crate::registry::error::RegistryError;
use crate::version::semver::parse_tag;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown versioning mode {0:?}")]
pub struct UnknownModeError(pub String);

/// Update policy of a container, selected by its mode label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersioningMode {
    /// Re-pull the deployed tag when the registry's digest for it changed
    SameTag,
    /// Any newer version
    SemVerMajor,
    /// Newer version with the same major number
    SemVerMinor,
    /// Newer version with the same major and minor number
    SemVerPatch,
}

impl VersioningMode {
    pub const ALL: [Self; 4] = [
        Self::SameTag,
        Self::SemVerMajor,
        Self::SemVerMinor,
        Self::SemVerPatch,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::SameTag => "same_tag",
            Self::SemVerMajor => "semver_major",
            Self::SemVerMinor => "semver_minor",
            Self::SemVerPatch => "semver_patch",
        }
    }

    /// Pick the tag the container should be updated to, if any.
    ///
    /// Only `SameTag` performs I/O (the digest lookup of the deployed tag);
    /// a failed lookup is returned as an error.
    pub async fn select_upgrade(
        &self,
        current_tag: &str,
        current_digest: &Digest,
        available: &[Tag],
    ) -> Result<Option<Tag>, RegistryError> {
        match self {
            Self::SameTag => same_tag_upgrade(current_tag, current_digest, available).await,
            Self::SemVerMajor | Self::SemVerMinor | Self::SemVerPatch => {
                Ok(select_semver_upgrade(*self, current_tag, available).cloned())
            }
        }
    }

    /// Whether `candidate` is an allowed upgrade from `current`
    fn accepts(&self, current: &Version, candidate: &Version) -> bool {
        let newer = candidate.cmp_precedence(current) == Ordering::Greater;
        match self {
            Self::SameTag => false,
            Self::SemVerMajor => newer,
            Self::SemVerMinor => newer && candidate.major == current.major,
            Self::SemVerPatch => {
                newer && candidate.major == current.major && candidate.minor == current.minor
            }
        }
    }
}

impl FromStr for VersioningMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.label() == s)
            .ok_or_else(|| UnknownModeError(s.to_string()))
    }
}

impl fmt::Display for VersioningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Highest semver tag that `mode` accepts as an upgrade from `current_tag`.
///
/// Returns `None` if the current tag is not a semantic version or no tag
/// qualifies. Among tags of equal precedence the first one listed wins.
pub fn select_semver_upgrade<'a>(
    mode: VersioningMode,
    current_tag: &str,
    available: &'a [Tag],
) -> Option<&'a Tag> {
    let current = parse_tag(current_tag)?;

    available
        .iter()
        .filter_map(|tag| tag.semver.as_ref().map(|semver| (tag, semver)))
        .filter(|(_, semver)| mode.accepts(&current.version, &semver.version))
        .fold(None, |best: Option<(&Tag, _)>, candidate| match best {
            Some(best) if candidate.1.cmp_precedence(best.1) != Ordering::Greater => Some(best),
            _ => Some(candidate),
        })
        .map(|(tag, _)| tag)
}

async fn same_tag_upgrade(
    current_tag: &str,
    current_digest: &Digest,
    available: &[Tag],
) -> Result<Option<Tag>, RegistryError> {
    let Some(tag) = available.iter().find(|tag| tag.name == current_tag) else {
        return Ok(None);
    };

    let remote_digest = tag.digest().await?;
    debug!(
        tag = %tag.name,
        remote = %remote_digest,
        local = %current_digest,
        "comparing digests"
    );

    Ok((remote_digest != *current_digest).then(|| tag.clone()))
}

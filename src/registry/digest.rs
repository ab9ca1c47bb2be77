//! Content digests as reported by registries and the container engine

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    #[error("digest {0:?} is missing the algorithm separator")]
    MissingSeparator(String),

    #[error("digest {0:?} has an invalid algorithm")]
    InvalidAlgorithm(String),

    #[error("digest {0:?} has an invalid encoded part")]
    InvalidEncoded(String),
}

/// A content digest of the form `<algorithm>:<encoded>`, e.g. `sha256:4e8f...`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the digest part of a repo digest such as `nginx@sha256:abc...`
    pub fn from_repo_digest(repo_digest: &str) -> Result<Self, DigestError> {
        let digest = repo_digest
            .rsplit_once('@')
            .map_or(repo_digest, |(_, digest)| digest);
        digest.parse()
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, encoded) = s
            .split_once(':')
            .ok_or_else(|| DigestError::MissingSeparator(s.to_string()))?;

        // algorithm := component ([+._-] component)*, component := [a-z0-9]+
        let valid_algorithm = !algorithm.is_empty()
            && algorithm
                .split(['+', '.', '_', '-'])
                .all(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        if !valid_algorithm {
            return Err(DigestError::InvalidAlgorithm(s.to_string()));
        }

        let valid_encoded = !encoded.is_empty()
            && encoded
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'=' | b'_' | b'-'));
        if !valid_encoded {
            return Err(DigestError::InvalidEncoded(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

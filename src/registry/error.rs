use thiserror::Error;

use crate::registry::digest::DigestError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Repository or tag not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid digest: {0}")]
    InvalidDigest(#[from] DigestError),

    #[error("Repository {0:?} not present in cache, can't fetch digest")]
    NotCached(String),

    #[error("Registry cache is no longer running")]
    CacheClosed,
}

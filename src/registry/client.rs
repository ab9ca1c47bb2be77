//! Registry client used by the scan

use std::sync::Arc;

use crate::docker::image::ImageReference;
use crate::registry::api::{HttpRegistry, RegistryApi};
use crate::registry::auth::Credentials;
use crate::registry::cache::RegistryCache;
use crate::registry::digest::Digest;
use crate::registry::error::RegistryError;
use crate::version::semver::SemVerTag;

/// A tag reported by the registry.
///
/// Tags compare by their parsed version only; the digest is looked up lazily
/// through the cache the tag came from.
#[derive(Debug, Clone)]
pub struct Tag {
    pub name: String,
    pub semver: Option<SemVerTag>,
    repository: String,
    cache: RegistryCache,
}

impl Tag {
    pub(crate) fn new(
        name: &str,
        semver: Option<SemVerTag>,
        repository: &str,
        cache: RegistryCache,
    ) -> Self {
        Self {
            name: name.to_string(),
            semver,
            repository: repository.to_string(),
            cache,
        }
    }

    /// Repository path the tag belongs to, e.g. "library/nginx"
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Content digest the tag currently points to
    pub async fn digest(&self) -> Result<Digest, RegistryError> {
        self.cache.digest(&self.repository, &self.name).await
    }
}

/// Cached access to a registry's tags
#[derive(Debug, Clone)]
pub struct RegistryClient {
    cache: RegistryCache,
}

impl RegistryClient {
    pub fn new(api: Arc<dyn RegistryApi>) -> Self {
        Self {
            cache: RegistryCache::spawn(api),
        }
    }

    /// Client for the registry at `base_url`, anonymous unless credentials are given
    pub fn connect(base_url: &str, credentials: Option<Credentials>) -> Self {
        Self::new(Arc::new(HttpRegistry::new(base_url, credentials)))
    }

    /// Tags available for the repository of an image
    pub async fn repo_tags(&self, image: &ImageReference) -> Result<Vec<Tag>, RegistryError> {
        self.cache.list_tags(&image.registry_repository()).await
    }
}

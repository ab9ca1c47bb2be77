//! Registry test utilities

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use lookbuilding::registry::{Digest, RegistryApi, RegistryError};

/// Registry serving fixed tags and digests, counting tag list requests
#[derive(Default)]
pub struct FakeRegistry {
    tags: HashMap<String, Vec<(String, String)>>,
    tag_requests: AtomicUsize,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `tags` for `repository`, every tag pointing at `digest`
    pub fn with_tags(self, repository: &str, tags: &[&str], digest: &str) -> Self {
        let tags = tags
            .iter()
            .map(|tag| (tag.to_string(), digest.to_string()))
            .collect();
        self.with_digests(repository, tags)
    }

    pub fn with_digests(mut self, repository: &str, tags: Vec<(String, String)>) -> Self {
        self.tags.insert(repository.to_string(), tags);
        self
    }

    pub fn tag_requests(&self) -> usize {
        self.tag_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryApi for FakeRegistry {
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, RegistryError> {
        self.tag_requests.fetch_add(1, Ordering::SeqCst);
        match self.tags.get(repository) {
            Some(tags) => Ok(tags.iter().map(|(tag, _)| tag.clone()).collect()),
            None => Err(RegistryError::NotFound(repository.to_string())),
        }
    }

    async fn manifest_digest(&self, repository: &str, tag: &str) -> Result<Digest, RegistryError> {
        let digest = self
            .tags
            .get(repository)
            .and_then(|tags| tags.iter().find(|(name, _)| name == tag))
            .map(|(_, digest)| digest)
            .ok_or_else(|| RegistryError::NotFound(format!("{repository}:{tag}")))?;
        Ok(digest.parse()?)
    }
}

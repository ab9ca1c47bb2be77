//! Registry metadata cache
//!
//! A single task owns every cached tag list and digest. Callers talk to it
//! through [`RegistryCache`] handles; requests are answered strictly one at a
//! time, so two callers asking for the same repository never trigger two
//! network fetches and never see a half-filled entry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::CACHE_MAILBOX_SIZE;
use crate::registry::api::RegistryApi;
use crate::registry::client::Tag;
use crate::registry::digest::Digest;
use crate::registry::error::RegistryError;
use crate::version::semver::{SemVerTag, parse_tag};

enum CacheRequest {
    ListTags {
        repository: String,
        respond_to: oneshot::Sender<Result<Vec<Tag>, RegistryError>>,
    },
    GetDigest {
        repository: String,
        tag: String,
        respond_to: oneshot::Sender<Result<Digest, RegistryError>>,
    },
}

#[derive(Debug, Clone)]
struct TagEntry {
    name: String,
    semver: Option<SemVerTag>,
}

/// Cached metadata of one repository
#[derive(Debug, Default)]
struct RepoCache {
    tags: Vec<TagEntry>,
    /// Map tags to digests
    digests: HashMap<String, Digest>,
}

/// Handle to the cache task. Cloning is cheap; the task stops once every
/// handle (including those held by [`Tag`] values) has been dropped.
#[derive(Debug, Clone)]
pub struct RegistryCache {
    sender: mpsc::Sender<CacheRequest>,
}

impl std::fmt::Debug for CacheRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListTags { repository, .. } => {
                f.debug_struct("ListTags").field("repository", repository).finish()
            }
            Self::GetDigest { repository, tag, .. } => f
                .debug_struct("GetDigest")
                .field("repository", repository)
                .field("tag", tag)
                .finish(),
        }
    }
}

impl RegistryCache {
    /// Spawn the cache task on the current tokio runtime
    pub fn spawn(api: Arc<dyn RegistryApi>) -> Self {
        let (sender, receiver) = mpsc::channel(CACHE_MAILBOX_SIZE);
        let actor = CacheActor {
            api,
            store: HashMap::new(),
            handle: sender.downgrade(),
            receiver,
        };
        tokio::spawn(actor.run());

        Self { sender }
    }

    /// Tags of a repository, fetched from the registry on first use
    pub async fn list_tags(&self, repository: &str) -> Result<Vec<Tag>, RegistryError> {
        let (respond_to, response) = oneshot::channel();
        self.request(CacheRequest::ListTags {
            repository: repository.to_string(),
            respond_to,
        })
        .await?;
        response.await.map_err(|_| RegistryError::CacheClosed)?
    }

    /// Digest of a tag in a repository that has already been listed
    pub async fn digest(&self, repository: &str, tag: &str) -> Result<Digest, RegistryError> {
        let (respond_to, response) = oneshot::channel();
        self.request(CacheRequest::GetDigest {
            repository: repository.to_string(),
            tag: tag.to_string(),
            respond_to,
        })
        .await?;
        response.await.map_err(|_| RegistryError::CacheClosed)?
    }

    /// Handle not connected to any task, for building tags in tests
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (sender, _) = mpsc::channel(1);
        Self { sender }
    }

    async fn request(&self, request: CacheRequest) -> Result<(), RegistryError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| RegistryError::CacheClosed)
    }
}

struct CacheActor {
    api: Arc<dyn RegistryApi>,
    store: HashMap<String, RepoCache>,
    /// Weak so that cached state never keeps the task alive on its own
    handle: mpsc::WeakSender<CacheRequest>,
    receiver: mpsc::Receiver<CacheRequest>,
}

impl CacheActor {
    async fn run(mut self) {
        debug!("registry cache starting");

        while let Some(request) = self.receiver.recv().await {
            match request {
                CacheRequest::ListTags {
                    repository,
                    respond_to,
                } => {
                    let result = self.list_tags(&repository).await;
                    // The caller may have given up waiting; nothing to do then
                    let _ = respond_to.send(result);
                }
                CacheRequest::GetDigest {
                    repository,
                    tag,
                    respond_to,
                } => {
                    let result = self.digest(&repository, &tag).await;
                    let _ = respond_to.send(result);
                }
            }
        }

        debug!("registry cache stopped");
    }

    async fn list_tags(&mut self, repository: &str) -> Result<Vec<Tag>, RegistryError> {
        if !self.store.contains_key(repository) {
            // Errors are returned as-is and not cached, the next request retries
            let names = self.api.list_tags(repository).await?;
            info!(repository, count = names.len(), "cached tag list");

            let tags = names
                .into_iter()
                .map(|name| TagEntry {
                    semver: parse_tag(&name),
                    name,
                })
                .collect();
            self.store.insert(
                repository.to_string(),
                RepoCache {
                    tags,
                    digests: HashMap::new(),
                },
            );
        }

        let cache = RegistryCache {
            sender: self.handle.upgrade().ok_or(RegistryError::CacheClosed)?,
        };
        let entries = self
            .store
            .get(repository)
            .map(|repo| repo.tags.as_slice())
            .unwrap_or_default();

        Ok(entries
            .iter()
            .map(|entry| Tag::new(&entry.name, entry.semver.clone(), repository, cache.clone()))
            .collect())
    }

    async fn digest(&mut self, repository: &str, tag: &str) -> Result<Digest, RegistryError> {
        let repo = self
            .store
            .get_mut(repository)
            .ok_or_else(|| RegistryError::NotCached(repository.to_string()))?;

        if let Some(digest) = repo.digests.get(tag) {
            return Ok(digest.clone());
        }

        let digest = self.api.manifest_digest(repository, tag).await?;
        repo.digests.insert(tag.to_string(), digest.clone());
        Ok(digest)
    }
}

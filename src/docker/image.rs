//! Image names split into owner, repository and tag

use std::fmt;

/// Prefix for images pulled from Docker Hub
const DEFAULT_REGISTRY_HOST: &str = "docker.io";

/// Host names that all refer to Docker Hub
const DOCKER_HUB_HOSTS: [&str; 3] = ["docker.io", "index.docker.io", "registry-1.docker.io"];

/// Namespace of Docker Hub's official images
const OFFICIAL_NAMESPACE: &str = "library";

/// An image name such as `owner/repository:tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub owner: Option<String>,
    pub repository: String,
    pub tag: Option<String>,
    /// Pinned content digest, from a trailing `@sha256:...`
    pub digest: Option<String>,
}

impl ImageReference {
    /// Split an image name on the first `/` (owner) and the last `:` (tag),
    /// after removing any trailing `@digest`.
    pub fn parse(image: &str) -> Self {
        let (name, digest) = match image.split_once('@') {
            Some((name, digest)) => (name, Some(digest.to_string())),
            None => (image, None),
        };

        let (owner, name) = match name.split_once('/') {
            Some((owner, name)) => (Some(owner.to_string()), name),
            None => (None, name),
        };

        let (repository, tag) = match name.rsplit_once(':') {
            Some((repository, tag)) => (repository, Some(tag.to_string())),
            None => (name, None),
        };

        Self {
            owner,
            repository: repository.to_string(),
            tag,
            digest,
        }
    }

    /// Same image with another tag, no longer pinned to a digest
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            digest: None,
            ..self.clone()
        }
    }

    /// `owner/repository` without the tag
    pub fn name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}/{}", owner, self.repository),
            None => self.repository.clone(),
        }
    }

    /// Repository path as the registry API expects it.
    ///
    /// A leading registry host is dropped, and Docker Hub's official images
    /// live under `library/`.
    pub fn registry_repository(&self) -> String {
        match self.owner.as_deref() {
            None => format!("{}/{}", OFFICIAL_NAMESPACE, self.repository),
            Some(host) if DOCKER_HUB_HOSTS.contains(&host) && !self.repository.contains('/') => {
                format!("{}/{}", OFFICIAL_NAMESPACE, self.repository)
            }
            Some(host) if is_registry_host(host) => self.repository.clone(),
            Some(_) => self.name(),
        }
    }

    /// Fully qualified reference for pulling, e.g. `docker.io/owner/repository:tag`
    pub fn canonical(&self) -> String {
        if self.owner.as_deref().is_some_and(is_registry_host) {
            self.to_string()
        } else {
            format!("{}/{}", DEFAULT_REGISTRY_HOST, self)
        }
    }
}

/// Whether the first path component names a registry rather than an owner
fn is_registry_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner {
            write!(f, "{}/", owner)?;
        }
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

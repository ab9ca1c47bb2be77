//! Registry HTTP API v2 access

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use reqwest::header::{ACCEPT, LINK, WWW_AUTHENTICATE};
use reqwest::{Method, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::REGISTRY_TIMEOUT_SECS;
use crate::registry::auth::{Challenge, Credentials, fetch_token};
use crate::registry::digest::Digest;
use crate::registry::error::RegistryError;

/// Manifest media types accepted when resolving a tag's digest.
///
/// Multi-arch images are pulled by their index digest, so the index types
/// must be accepted for the digest to match the local repo digest.
const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.list.v2+json, \
application/vnd.oci.image.index.v1+json, \
application/vnd.docker.distribution.manifest.v2+json, \
application/vnd.oci.image.manifest.v1+json";

const CONTENT_DIGEST_HEADER: &str = "docker-content-digest";

/// Network access to a container registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RegistryApi: Send + Sync {
    /// Fetches every tag name of a repository (e.g. "library/nginx")
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, RegistryError>;

    /// Resolves the content digest a tag currently points to
    async fn manifest_digest(&self, repository: &str, tag: &str) -> Result<Digest, RegistryError>;
}

#[derive(Debug, Deserialize)]
struct TagListResponse {
    tags: Option<Vec<String>>,
}

/// Registry implementation for the registry HTTP API v2
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    /// Bearer tokens by repository
    tokens: Mutex<HashMap<String, String>>,
}

impl HttpRegistry {
    /// Creates a new HttpRegistry with a custom base URL
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("lookbuilding")
                .timeout(Duration::from_secs(REGISTRY_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn cached_token(&self, repository: &str) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(repository)
            .cloned()
    }

    fn store_token(&self, repository: &str, token: String) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(repository.to_string(), token);
    }

    fn request(&self, method: &Method, url: &Url, accept: Option<&str>) -> reqwest::RequestBuilder {
        let request = self.client.request(method.clone(), url.clone());
        match accept {
            Some(accept) => request.header(ACCEPT, accept),
            None => request,
        }
    }

    /// Send a request, answering one authentication challenge if the registry asks for it
    async fn send(
        &self,
        method: Method,
        url: Url,
        repository: &str,
        accept: Option<&str>,
    ) -> Result<Response, RegistryError> {
        let mut request = self.request(&method, &url, accept);
        if let Some(token) = self.cached_token(repository) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(Challenge::parse)
            .ok_or_else(|| {
                RegistryError::Unauthorized(format!("{url} returned 401 without a usable challenge"))
            })?;

        let retry = self.request(&method, &url, accept);
        let retry = match challenge {
            Challenge::Basic => {
                let credentials = self.credentials.as_ref().ok_or_else(|| {
                    RegistryError::Unauthorized(format!("{url} requires basic credentials"))
                })?;
                retry.basic_auth(&credentials.username, Some(&credentials.password))
            }
            Challenge::Bearer {
                realm,
                service,
                scope,
            } => {
                let token = fetch_token(
                    &self.client,
                    &realm,
                    service.as_deref(),
                    scope.as_deref(),
                    repository,
                    self.credentials.as_ref(),
                )
                .await?;
                self.store_token(repository, token.clone());
                retry.bearer_auth(token)
            }
        };

        let response = retry.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(RegistryError::Unauthorized(url.to_string()));
        }
        Ok(response)
    }

    fn parse_url(&self, url: &str) -> Result<Url, RegistryError> {
        Url::parse(url).map_err(|e| RegistryError::InvalidResponse(format!("invalid url {url}: {e}")))
    }

    /// Resolve the `rel="next"` target of a `Link` header against the registry URL
    fn next_page(&self, response: &Response) -> Result<Option<Url>, RegistryError> {
        let Some(link) = response.headers().get(LINK).and_then(|v| v.to_str().ok()) else {
            return Ok(None);
        };

        let Some(target) = parse_next_link(link) else {
            return Ok(None);
        };

        let base = self.parse_url(&self.base_url)?;
        base.join(target)
            .map(Some)
            .map_err(|e| RegistryError::InvalidResponse(format!("invalid link {target}: {e}")))
    }
}

/// Extract the target of `<...>; rel="next"` from a `Link` header
fn parse_next_link(link: &str) -> Option<&str> {
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| matches!(p.trim(), "rel=\"next\"" | "rel=next"));
        if !is_next {
            return None;
        }
        target.trim().strip_prefix('<')?.strip_suffix('>')
    })
}

#[async_trait::async_trait]
impl RegistryApi for HttpRegistry {
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, RegistryError> {
        let mut url = self.parse_url(&format!("{}/v2/{}/tags/list", self.base_url, repository))?;
        let mut tags = Vec::new();

        loop {
            info!(%url, repository, "registry.tags.list");
            let response = self.send(Method::GET, url.clone(), repository, None).await?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(RegistryError::NotFound(repository.to_string()));
            }
            if !status.is_success() {
                warn!("registry returned status {}: {}", status, url);
                return Err(RegistryError::InvalidResponse(format!(
                    "Unexpected status: {}",
                    status
                )));
            }

            let next = self.next_page(&response)?;

            let page: TagListResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse tag list response: {}", e);
                RegistryError::InvalidResponse(e.to_string())
            })?;
            tags.extend(page.tags.unwrap_or_default());

            match next {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!(repository, count = tags.len(), "fetched tag list");
        Ok(tags)
    }

    async fn manifest_digest(&self, repository: &str, tag: &str) -> Result<Digest, RegistryError> {
        let url = self.parse_url(&format!(
            "{}/v2/{}/manifests/{}",
            self.base_url, repository, tag
        ))?;
        info!(%url, repository, reference = tag, "registry.manifest.head");

        let response = self
            .send(Method::HEAD, url.clone(), repository, Some(MANIFEST_ACCEPT))
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(format!("{}:{}", repository, tag)));
        }
        if !status.is_success() {
            warn!("registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let digest = response
            .headers()
            .get(CONTENT_DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                RegistryError::InvalidResponse(format!(
                    "manifest response for {}:{} has no digest header",
                    repository, tag
                ))
            })?;

        Ok(digest.parse()?)
    }
}

//! Registry authentication challenges (`WWW-Authenticate`) and token exchange

use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::registry::error::RegistryError;

/// A single basic credential pair used for the registry and its token service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Parsed `WWW-Authenticate` header of a 401 response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Basic,
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
}

impl Challenge {
    /// Parse a challenge such as
    /// `Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/nginx:pull"`
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));

        if scheme.eq_ignore_ascii_case("basic") {
            return Some(Self::Basic);
        }
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut realm = None;
        let mut service = None;
        let mut scope = None;
        for (key, value) in split_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {}
            }
        }

        Some(Self::Bearer {
            realm: realm?,
            service,
            scope,
        })
    }
}

/// Split `key="value",key2="value, with comma"` into pairs, honoring quotes
fn split_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = params.trim();

    while !rest.is_empty() {
        let Some((key, after_key)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().trim_start_matches(',').trim().to_string();

        let (value, remainder) = match after_key.strip_prefix('"') {
            Some(quoted) => match quoted.split_once('"') {
                Some((value, remainder)) => (value.to_string(), remainder),
                None => (quoted.to_string(), ""),
            },
            None => match after_key.split_once(',') {
                Some((value, remainder)) => (value.trim().to_string(), remainder),
                None => (after_key.trim().to_string(), ""),
            },
        };

        pairs.push((key, value));
        rest = remainder.trim_start_matches([',', ' ']);
    }

    pairs
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Request a bearer token from the realm named in a challenge.
///
/// Anonymous unless `credentials` are given. If the challenge carries no scope,
/// pull access to `repository` is requested.
pub async fn fetch_token(
    client: &reqwest::Client,
    realm: &str,
    service: Option<&str>,
    scope: Option<&str>,
    repository: &str,
    credentials: Option<&Credentials>,
) -> Result<String, RegistryError> {
    let default_scope = format!("repository:{}:pull", repository);
    let mut params = vec![("scope", scope.unwrap_or(default_scope.as_str()))];
    if let Some(service) = service {
        params.push(("service", service));
    }

    let url = Url::parse_with_params(realm, &params)
        .map_err(|e| RegistryError::InvalidResponse(format!("invalid token realm {realm}: {e}")))?;
    debug!(%url, "requesting registry token");

    let mut request = client.get(url);
    if let Some(credentials) = credentials {
        request = request.basic_auth(&credentials.username, Some(&credentials.password));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RegistryError::Unauthorized(format!(
            "token request to {realm} returned {status}"
        )));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

    // Docker Hub uses "token", some registries only send "access_token"
    body.token
        .or(body.access_token)
        .ok_or_else(|| RegistryError::InvalidResponse("token response without token".to_string()))
}

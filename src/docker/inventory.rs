//! Finding the running containers that should be kept up to date

use bollard::models::ContainerSummary;
use tracing::{debug, error, info, warn};

use crate::config::{FailurePolicy, MODE_LABEL};
use crate::docker::container::{LabeledContainer, container_name};
use crate::docker::engine::ContainerEngine;
use crate::docker::error::InventoryError;
use crate::docker::image::ImageReference;
use crate::registry::digest::Digest;
use crate::version::mode::VersioningMode;

/// Collect the running containers carrying a valid mode label.
///
/// Containers with untagged images, without the label or with an unknown
/// mode are skipped. A container whose image digest can't be resolved
/// aborts the scan under [`FailurePolicy::Abort`] and is logged and skipped
/// under [`FailurePolicy::Continue`].
pub async fn scan_labeled_containers(
    engine: &dyn ContainerEngine,
    policy: FailurePolicy,
) -> Result<Vec<LabeledContainer>, InventoryError> {
    let containers = engine
        .list_containers()
        .await
        .map_err(InventoryError::ListContainers)?;

    info!("scanning running container labels");

    let mut labeled = Vec::new();
    for summary in &containers {
        match label_container(engine, summary).await {
            Ok(Some(container)) => labeled.push(container),
            Ok(None) => {}
            Err(e) if policy == FailurePolicy::Continue => {
                error!(container = %container_name(summary), "skipping container: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(labeled)
}

async fn label_container(
    engine: &dyn ContainerEngine,
    summary: &ContainerSummary,
) -> Result<Option<LabeledContainer>, InventoryError> {
    let name = container_name(summary);
    let image = summary.image.as_deref().unwrap_or_default();
    let image_id = summary.image_id.as_deref().unwrap_or_default();

    if image == image_id {
        error!(container = %name, "ignoring container which has an untagged image");
        return Ok(None);
    }

    debug!(container = %name, image, "checking labels");
    if let Some(labels) = &summary.labels {
        for (key, value) in labels {
            debug!(r#"  - "{}": "{}""#, key, value);
        }
    }

    let Some(label) = summary.labels.as_ref().and_then(|l| l.get(MODE_LABEL)) else {
        return Ok(None);
    };

    let mode: VersioningMode = match label.parse() {
        Ok(mode) => mode,
        Err(e) => {
            warn!(container = %name, "failed to parse {:?} as a versioning mode: {}", label, e);
            return Ok(None);
        }
    };

    let reference = ImageReference::parse(image);
    if reference.tag.is_none() {
        error!(container = %name, image, "no tag specified for container, ignoring");
        return Ok(None);
    }

    let image_digest = resolve_image_digest(engine, &name, image_id).await?;

    Ok(Some(LabeledContainer {
        id: summary.id.clone().unwrap_or_default(),
        name,
        image: reference,
        image_digest,
        mode,
    }))
}

/// Digest of the image a container runs, from the image's first repo digest
async fn resolve_image_digest(
    engine: &dyn ContainerEngine,
    name: &str,
    image_id: &str,
) -> Result<Digest, InventoryError> {
    let inspect = engine
        .inspect_image(image_id)
        .await
        .map_err(|source| InventoryError::InspectImage {
            name: name.to_string(),
            source,
        })?;

    let repo_digests = inspect.repo_digests.unwrap_or_default();
    if repo_digests.len() > 1 {
        warn!(container = %name, "unexpected: container had more than one RepoDigest");
    }

    let first = repo_digests
        .first()
        .ok_or_else(|| InventoryError::NoRepoDigest(name.to_string()))?;

    Digest::from_repo_digest(first).map_err(|source| InventoryError::InvalidRepoDigest {
        name: name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use bollard::models::ImageInspect;

    use crate::docker::engine::MockContainerEngine;
    use crate::logging::capture::LogCapture;

    const DIGEST_A: &str = "sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const DIGEST_B: &str = "sha256:bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn summary(name: &str, image: &str, mode: Option<&str>) -> ContainerSummary {
        let labels = mode.map(|mode| HashMap::from([(MODE_LABEL.to_string(), mode.to_string())]));
        ContainerSummary {
            id: Some(format!("{name}-id")),
            names: Some(vec![format!("/{name}")]),
            image: Some(image.to_string()),
            image_id: Some(format!("sha256:{name}-image")),
            labels,
            ..Default::default()
        }
    }

    fn image_with_digests(digests: &[&str]) -> ImageInspect {
        ImageInspect {
            repo_digests: Some(digests.iter().map(|d| d.to_string()).collect()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn labeled_container_is_resolved() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_list_containers()
            .returning(|| Ok(vec![summary("web", "owner/app:v1.2.3", Some("semver_patch"))]));
        engine
            .expect_inspect_image()
            .withf(|id| id == "sha256:web-image")
            .returning(|_| Ok(image_with_digests(&[&format!("owner/app@{DIGEST_A}")])));

        let containers = scan_labeled_containers(&engine, FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(
            containers,
            vec![LabeledContainer {
                id: "web-id".to_string(),
                name: "web".to_string(),
                image: ImageReference::parse("owner/app:v1.2.3"),
                image_digest: DIGEST_A.parse().unwrap(),
                mode: VersioningMode::SemVerPatch,
            }]
        );
    }

    #[tokio::test]
    async fn unlabeled_untagged_and_unknown_mode_containers_are_skipped() {
        let mut engine = MockContainerEngine::new();
        engine.expect_list_containers().returning(|| {
            let mut untagged = summary("dangling", "", Some("same_tag"));
            untagged.image = untagged.image_id.clone();
            Ok(vec![
                summary("plain", "owner/app:v1", None),
                untagged,
                summary("odd", "owner/app:v1", Some("newest")),
                summary("tagless", "owner/app", Some("same_tag")),
            ])
        });
        engine.expect_inspect_image().never();

        let logs = LogCapture::new();
        let containers = {
            let _guard = logs.set_default();
            scan_labeled_containers(&engine, FailurePolicy::Abort)
                .await
                .unwrap()
        };

        assert!(containers.is_empty());
        assert!(logs.contains("failed to parse \"newest\" as a versioning mode"));
        assert!(logs.contains("untagged image"));
    }

    #[tokio::test]
    async fn more_than_one_repo_digest_warns_and_uses_first() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_list_containers()
            .returning(|| Ok(vec![summary("web", "owner/app:latest", Some("same_tag"))]));
        engine.expect_inspect_image().returning(|_| {
            Ok(image_with_digests(&[
                &format!("owner/app@{DIGEST_A}"),
                &format!("mirror/app@{DIGEST_B}"),
            ]))
        });

        let logs = LogCapture::new();
        let containers = {
            let _guard = logs.set_default();
            scan_labeled_containers(&engine, FailurePolicy::Abort)
                .await
                .unwrap()
        };

        assert_eq!(containers[0].image_digest.as_str(), DIGEST_A);
        assert!(logs.contains("more than one RepoDigest"));
        assert!(logs.contains("WARN"));
    }

    #[tokio::test]
    async fn missing_repo_digest_aborts_scan() {
        let mut engine = MockContainerEngine::new();
        engine.expect_list_containers().returning(|| {
            Ok(vec![
                summary("local", "owner/built:v1.0.0", Some("semver_major")),
                summary("web", "owner/app:v1.0.0", Some("semver_major")),
            ])
        });
        engine
            .expect_inspect_image()
            .withf(|id| id == "sha256:local-image")
            .returning(|_| Ok(image_with_digests(&[])));

        let result = scan_labeled_containers(&engine, FailurePolicy::Abort).await;

        assert!(matches!(result, Err(InventoryError::NoRepoDigest(name)) if name == "local"));
    }

    #[tokio::test]
    async fn missing_repo_digest_is_skipped_when_continuing() {
        let mut engine = MockContainerEngine::new();
        engine.expect_list_containers().returning(|| {
            Ok(vec![
                summary("local", "owner/built:v1.0.0", Some("semver_major")),
                summary("web", "owner/app:v1.0.0", Some("semver_major")),
            ])
        });
        engine.expect_inspect_image().returning(|id| {
            if id == "sha256:local-image" {
                Ok(image_with_digests(&[]))
            } else {
                Ok(image_with_digests(&[&format!("owner/app@{DIGEST_A}")]))
            }
        });

        let containers = scan_labeled_containers(&engine, FailurePolicy::Continue)
            .await
            .unwrap();

        let names: Vec<_> = containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["web"]);
    }

    #[tokio::test]
    async fn malformed_repo_digest_is_an_error() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_list_containers()
            .returning(|| Ok(vec![summary("web", "owner/app:v1", Some("same_tag"))]));
        engine
            .expect_inspect_image()
            .returning(|_| Ok(image_with_digests(&["owner/app@garbage"])));

        let result = scan_labeled_containers(&engine, FailurePolicy::Abort).await;

        assert!(matches!(result, Err(InventoryError::InvalidRepoDigest { .. })));
    }
}

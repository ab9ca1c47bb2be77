//! Replacing a running container with one running a newer image
//!
//! The old container is stopped and kept under a temporary name while its
//! replacement is created, so the new container can take over the original
//! name and mount the old container's volumes.

use std::sync::Arc;

use bollard::container::{Config, NetworkingConfig};
use bollard::models::ContainerInspectResponse;
use tracing::info;

use crate::config::OLD_CONTAINER_SUFFIX;
use crate::docker::container::LabeledContainer;
use crate::docker::engine::ContainerEngine;
use crate::docker::error::ReplaceError;
use crate::docker::image::ImageReference;

/// A planned move of one container to a new tag
pub struct Replacement {
    engine: Arc<dyn ContainerEngine>,
    container: LabeledContainer,
    target: ImageReference,
}

impl Replacement {
    pub fn new(engine: Arc<dyn ContainerEngine>, container: LabeledContainer, new_tag: &str) -> Self {
        let target = container.image.with_tag(new_tag);
        Self {
            engine,
            container,
            target,
        }
    }

    pub fn container(&self) -> &LabeledContainer {
        &self.container
    }

    pub fn target(&self) -> &ImageReference {
        &self.target
    }

    /// Run every step in order and return the id of the new container.
    ///
    /// The first failing step ends the replacement. Nothing is rolled back.
    pub async fn run(&self) -> Result<String, ReplaceError> {
        let name = self.container.name.as_str();
        let old_name = format!("{}{}", name, OLD_CONTAINER_SUFFIX);
        let canonical = self.target.canonical();

        info!(container = name, "pulling image {:?}", canonical);
        self.engine
            .pull_image(&canonical)
            .await
            .map_err(|source| ReplaceError::Pull {
                image: canonical.clone(),
                source,
            })?;

        info!(container = name, "stopping container");
        self.engine
            .stop_container(&self.container.id)
            .await
            .map_err(|source| ReplaceError::Stop {
                name: name.to_string(),
                source,
            })?;

        let old = self
            .engine
            .inspect_container(&self.container.id)
            .await
            .map_err(|source| ReplaceError::Inspect {
                name: name.to_string(),
                source,
            })?;
        let old_id = old.id.clone().unwrap_or_else(|| self.container.id.clone());
        let config = replacement_config(old, &self.target.to_string(), &old_name);

        info!(container = name, "renaming container to {}", old_name);
        self.engine
            .rename_container(&self.container.id, &old_name)
            .await
            .map_err(|source| ReplaceError::Rename {
                name: name.to_string(),
                new_name: old_name.clone(),
                source,
            })?;

        info!(container = name, "creating new container");
        let new_id = self
            .engine
            .create_container(name, config)
            .await
            .map_err(|source| ReplaceError::Create {
                name: name.to_string(),
                image: self.target.to_string(),
                source,
            })?;

        info!(container = name, "starting new container with id {}", new_id);
        self.engine
            .start_container(&new_id)
            .await
            .map_err(|source| ReplaceError::Start {
                name: name.to_string(),
                source,
            })?;

        info!(container = name, "removing old container {}", old_name);
        self.engine
            .remove_container(&old_id)
            .await
            .map_err(|source| ReplaceError::Remove {
                name: old_name.clone(),
                source,
            })?;

        Ok(new_id)
    }
}

/// Creation config for the replacement: the old container's settings with
/// the new image, and volumes taken from the renamed old container
fn replacement_config(
    old: ContainerInspectResponse,
    image: &str,
    old_name: &str,
) -> Config<String> {
    let mut config: Config<String> = old.config.map(Config::from).unwrap_or_default();
    config.image = Some(image.to_string());

    let mut host_config = old.host_config.unwrap_or_default();
    host_config.volumes_from = Some(vec![old_name.to_string()]);
    config.host_config = Some(host_config);

    let endpoints_config = old
        .network_settings
        .and_then(|settings| settings.networks)
        .unwrap_or_default();
    config.networking_config = Some(NetworkingConfig { endpoints_config });

    config
}

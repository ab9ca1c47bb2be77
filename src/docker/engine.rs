//! Container engine access

#[cfg(test)]
use mockall::automock;

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, RenameContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerInspectResponse, ContainerSummary, ImageInspect};
use futures::TryStreamExt;
use tracing::debug;

use crate::docker::error::EngineError;

/// The container engine operations the updater needs
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Running containers
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError>;

    async fn inspect_image(&self, image_id: &str) -> Result<ImageInspect, EngineError>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse, EngineError>;

    /// Pull an image and wait until it is stored locally
    async fn pull_image(&self, reference: &str) -> Result<(), EngineError>;

    /// Stop a container, waiting for the engine's grace period
    async fn stop_container(&self, id: &str) -> Result<(), EngineError>;

    async fn rename_container(&self, id: &str, new_name: &str) -> Result<(), EngineError>;

    /// Create a container and return its id
    async fn create_container(&self, name: &str, config: Config<String>)
    -> Result<String, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// Remove a stopped container, keeping its volumes
    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;
}

/// Docker Engine API implementation
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect using `DOCKER_HOST` or the platform's default socket
    pub fn connect() -> Result<Self, EngineError> {
        Ok(Self::new(Docker::connect_with_local_defaults()?))
    }
}

#[async_trait::async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        Ok(self.docker.list_containers(Some(options)).await?)
    }

    async fn inspect_image(&self, image_id: &str) -> Result<ImageInspect, EngineError> {
        Ok(self.docker.inspect_image(image_id).await?)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse, EngineError> {
        Ok(self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?)
    }

    async fn pull_image(&self, reference: &str) -> Result<(), EngineError> {
        let options = CreateImageOptions {
            from_image: reference.to_string(),
            ..Default::default()
        };

        // The image is only stored once the progress stream has been drained
        let mut progress = self.docker.create_image(Some(options), None, None);
        while let Some(info) = progress.try_next().await? {
            if let Some(error) = info.error {
                return Err(EngineError::Pull(error));
            }
            if let Some(status) = info.status {
                debug!(image = reference, %status, "pull progress");
            }
        }

        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        Ok(self
            .docker
            .stop_container(id, None::<StopContainerOptions>)
            .await?)
    }

    async fn rename_container(&self, id: &str, new_name: &str) -> Result<(), EngineError> {
        let options = RenameContainerOptions {
            name: new_name.to_string(),
        };
        Ok(self.docker.rename_container(id, options).await?)
    }

    async fn create_container(
        &self,
        name: &str,
        config: Config<String>,
    ) -> Result<String, EngineError> {
        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };
        let response = self.docker.create_container(Some(options), config).await?;
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        Ok(self
            .docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?)
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            v: false,
            force: false,
            link: false,
        };
        Ok(self.docker.remove_container(id, Some(options)).await?)
    }
}

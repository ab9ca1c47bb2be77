//! In-memory container engine

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bollard::container::Config;
use bollard::models::{
    ContainerConfig, ContainerInspectResponse, ContainerSummary, HostConfig, ImageInspect,
};

use lookbuilding::config::MODE_LABEL;
use lookbuilding::docker::{ContainerEngine, EngineError};

use super::DIGEST_B;

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub image_id: String,
    pub labels: HashMap<String, String>,
    pub running: bool,
    pub volumes_from: Vec<String>,
}

#[derive(Default)]
struct EngineState {
    containers: Vec<FakeContainer>,
    repo_digests: HashMap<String, Vec<String>>,
    calls: Vec<String>,
    created: usize,
}

/// Engine holding containers in memory and recording every mutating call
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a running container; `repo_digests` are reported for its image
    pub fn with_container(
        self,
        name: &str,
        image: &str,
        mode: Option<&str>,
        repo_digests: &[&str],
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let image_id = format!("sha256:{name}-image");
            state.repo_digests.insert(
                image_id.clone(),
                repo_digests.iter().map(|d| d.to_string()).collect(),
            );
            let labels = mode
                .map(|mode| HashMap::from([(MODE_LABEL.to_string(), mode.to_string())]))
                .unwrap_or_default();
            state.containers.push(FakeContainer {
                id: format!("{name}-id"),
                name: name.to_string(),
                image: image.to_string(),
                image_id,
                labels,
                running: true,
                volumes_from: Vec::new(),
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Containers currently known to the engine, running or not
    pub fn containers(&self) -> Vec<FakeContainer> {
        self.state.lock().unwrap().containers.clone()
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.containers().into_iter().find(|c| c.name == name)
    }
}

fn not_found(what: &str) -> EngineError {
    EngineError::Docker(bollard::errors::Error::DockerResponseServerError {
        status_code: 404,
        message: format!("No such {what}"),
    })
}

impl EngineState {
    fn find_mut(&mut self, id: &str) -> Result<&mut FakeContainer, EngineError> {
        self.containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("container"))
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .iter()
            .filter(|c| c.running)
            .map(|c| ContainerSummary {
                id: Some(c.id.clone()),
                names: Some(vec![format!("/{}", c.name)]),
                image: Some(c.image.clone()),
                image_id: Some(c.image_id.clone()),
                labels: Some(c.labels.clone()),
                ..Default::default()
            })
            .collect())
    }

    async fn inspect_image(&self, image_id: &str) -> Result<ImageInspect, EngineError> {
        let state = self.state.lock().unwrap();
        let repo_digests = state
            .repo_digests
            .get(image_id)
            .ok_or_else(|| not_found("image"))?;
        Ok(ImageInspect {
            id: Some(image_id.to_string()),
            repo_digests: Some(repo_digests.clone()),
            ..Default::default()
        })
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse, EngineError> {
        let mut state = self.state.lock().unwrap();
        let container = state.find_mut(id)?;
        Ok(ContainerInspectResponse {
            id: Some(container.id.clone()),
            name: Some(format!("/{}", container.name)),
            config: Some(ContainerConfig {
                image: Some(container.image.clone()),
                labels: Some(container.labels.clone()),
                ..Default::default()
            }),
            host_config: Some(HostConfig::default()),
            ..Default::default()
        })
    }

    async fn pull_image(&self, reference: &str) -> Result<(), EngineError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("pull {reference}"));
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("stop {id}"));
        state.find_mut(id)?.running = false;
        Ok(())
    }

    async fn rename_container(&self, id: &str, new_name: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("rename {id} {new_name}"));
        state.find_mut(id)?.name = new_name.to_string();
        Ok(())
    }

    async fn create_container(
        &self,
        name: &str,
        config: Config<String>,
    ) -> Result<String, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        let id = format!("new-{}", state.created);
        let image = config.image.unwrap_or_default();
        state.calls.push(format!("create {name} {image}"));

        let image_id = format!("sha256:{id}-image");
        let repository = image.split(':').next().unwrap_or_default();
        state
            .repo_digests
            .insert(image_id.clone(), vec![format!("{repository}@{DIGEST_B}")]);
        state.containers.push(FakeContainer {
            id: id.clone(),
            name: name.to_string(),
            image,
            image_id,
            labels: config.labels.unwrap_or_default(),
            running: false,
            volumes_from: config
                .host_config
                .and_then(|h| h.volumes_from)
                .unwrap_or_default(),
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("start {id}"));
        state.find_mut(id)?.running = true;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("remove {id}"));
        let index = state
            .containers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| not_found("container"))?;
        state.containers.remove(index);
        Ok(())
    }
}

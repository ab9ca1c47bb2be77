use std::error::Error;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info};

use crate::config::FailurePolicy;
use crate::docker::container::LabeledContainer;
use crate::docker::engine::ContainerEngine;
use crate::docker::error::InventoryError;
use crate::docker::inventory::scan_labeled_containers;
use crate::docker::replace::Replacement;
use crate::registry::client::{RegistryClient, Tag};
use crate::registry::error::RegistryError;
use crate::worker::coordinator::ScanJob;

/// Outcome of one scan cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Labeled containers found by the inventory
    pub containers: usize,
    /// Containers moved to a new image, as `name -> image`
    pub replaced: Vec<String>,
    /// Containers whose update check or replacement failed
    pub failed: Vec<String>,
}

/// Checks every labeled container and replaces the ones with an upgrade
pub struct Updater {
    engine: Arc<dyn ContainerEngine>,
    registry: RegistryClient,
    policy: FailurePolicy,
}

impl Updater {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        registry: RegistryClient,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            engine,
            registry,
            policy,
        }
    }

    /// Run one scan cycle to completion, replacements included
    pub async fn scan(&self) -> Result<ScanReport, InventoryError> {
        let containers = scan_labeled_containers(self.engine.as_ref(), self.policy).await?;
        info!("found {} valid containers", containers.len());

        let mut report = ScanReport {
            containers: containers.len(),
            ..Default::default()
        };

        let mut replacements = Vec::new();
        for container in containers {
            match self.find_upgrade(&container).await {
                Ok(Some(tag)) => {
                    info!(
                        container = %container.name,
                        "updating {} from {} to {}",
                        container.image.name(),
                        container.current_tag(),
                        tag.name
                    );
                    replacements.push(Replacement::new(self.engine.clone(), container, &tag.name));
                }
                Ok(None) => {
                    info!(container = %container.name, "no update available");
                }
                Err(e) => {
                    error!(
                        container = %container.name,
                        "failed to check for updates: {}",
                        error_chain(&e)
                    );
                    report.failed.push(container.name);
                }
            }
        }

        let results = join_all(replacements.iter().map(|replacement| replacement.run())).await;
        for (replacement, result) in replacements.iter().zip(results) {
            let name = &replacement.container().name;
            match result {
                Ok(id) => {
                    info!(container = %name, id = %id, "now running {}", replacement.target());
                    report
                        .replaced
                        .push(format!("{} -> {}", name, replacement.target()));
                }
                Err(e) => {
                    error!(container = %name, "update failed: {}", error_chain(&e));
                    report.failed.push(name.clone());
                }
            }
        }

        info!("scan complete");
        Ok(report)
    }

    async fn find_upgrade(&self, container: &LabeledContainer) -> Result<Option<Tag>, RegistryError> {
        let tags = self.registry.repo_tags(&container.image).await?;
        debug!(
            container = %container.name,
            "found {} tags for {}",
            tags.len(),
            container.image.name()
        );
        for tag in &tags {
            match &tag.semver {
                Some(semver) => debug!("  - {:?}: semver {}", tag.name, semver.version),
                None => debug!("  - {:?}: not semver", tag.name),
            }
        }

        container
            .mode
            .select_upgrade(container.current_tag(), &container.image_digest, &tags)
            .await
    }
}

#[async_trait::async_trait]
impl ScanJob for Updater {
    async fn run(&self) {
        if let Err(e) = self.scan().await {
            error!("scan aborted: {}", error_chain(&e));
        }
    }
}

/// An error followed by its sources, separated by `: `
fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

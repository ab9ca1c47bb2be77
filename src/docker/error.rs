use thiserror::Error;

use crate::registry::digest::DigestError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Docker API error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Image pull failed: {0}")]
    Pull(String),
}

/// A labeled container that can't be checked for updates
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to list running containers")]
    ListContainers(#[source] EngineError),

    #[error("failed to inspect image of container {name}")]
    InspectImage {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("unexpected: container {0} has no RepoDigests")]
    NoRepoDigest(String),

    #[error("failed to parse image digest of running container {name}")]
    InvalidRepoDigest {
        name: String,
        #[source]
        source: DigestError,
    },
}

/// A failed step of replacing a container.
///
/// Steps already taken are not undone, so depending on the step the old
/// container may be stopped or renamed to `<name>.lb.old`.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("failed to pull image {image:?}")]
    Pull {
        image: String,
        #[source]
        source: EngineError,
    },

    #[error("failed to stop container {name:?}")]
    Stop {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("failed to inspect container {name:?}")]
    Inspect {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("failed to rename container {name:?} to {new_name:?}")]
    Rename {
        name: String,
        new_name: String,
        #[source]
        source: EngineError,
    },

    #[error("failed to create container {name:?} for new version {image}")]
    Create {
        name: String,
        image: String,
        #[source]
        source: EngineError,
    },

    #[error("failed to start new container {name:?}")]
    Start {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("failed to remove old container {name:?}")]
    Remove {
        name: String,
        #[source]
        source: EngineError,
    },
}

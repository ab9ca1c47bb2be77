//! Container engine side of the updater
//!
//! # Modules
//!
//! - [`engine`]: `ContainerEngine` trait and the Docker implementation
//! - [`image`]: image names and their canonical pull references
//! - [`container`]: labeled containers found by a scan
//! - [`inventory`]: finding labeled containers and their image digests
//! - [`replace`]: moving a container to a new image
//! - [`error`]: engine, inventory and replacement errors

pub mod container;
pub mod engine;
pub mod error;
pub mod image;
pub mod inventory;
pub mod replace;

pub use container::LabeledContainer;
pub use engine::{ContainerEngine, DockerEngine};
pub use error::{EngineError, InventoryError, ReplaceError};
pub use image::ImageReference;
pub use inventory::scan_labeled_containers;
pub use replace::Replacement;

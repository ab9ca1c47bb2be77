//! Keeps labeled Docker containers on the newest image their versioning mode allows
//!
//! # Modules
//!
//! - [`config`]: constants and environment configuration
//! - [`docker`]: container inventory and replacement
//! - [`registry`]: cached registry access
//! - [`version`]: tag parsing and upgrade decisions
//! - [`worker`]: scan coordination and the scan cycle
//! - [`server`]: HTTP trigger endpoint
//! - [`logging`]: log subscriber setup

pub mod config;
pub mod docker;
pub mod logging;
pub mod registry;
pub mod server;
pub mod version;
pub mod worker;

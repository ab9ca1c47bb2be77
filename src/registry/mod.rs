//! Registry access layer
//!
//! # Modules
//!
//! - [`api`]: `RegistryApi` trait and the HTTP API v2 implementation
//! - [`auth`]: `WWW-Authenticate` challenges and token exchange
//! - [`cache`]: single-task cache of tag lists and digests
//! - [`client`]: `RegistryClient` facade and the `Tag` type
//! - [`digest`]: validated content digests
//! - [`error`]: registry error type

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod digest;
pub mod error;

pub use api::{HttpRegistry, RegistryApi};
pub use client::{RegistryClient, Tag};
pub use digest::Digest;
pub use error::RegistryError;

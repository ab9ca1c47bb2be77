//! Version decisions for image tags
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│    Tags     │────▶│    Mode     │──▶ upgrade target
//! │  (cached)   │     │  (semver)   │     │  (policy)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`semver`]: parsing tags such as `v1.2.3` into a prefix and a version
//! - [`mode`]: the four versioning modes and upgrade selection

pub mod mode;
pub mod semver;

pub use mode::{UnknownModeError, VersioningMode, select_semver_upgrade};
pub use self::semver::{SemVerTag, parse_tag};

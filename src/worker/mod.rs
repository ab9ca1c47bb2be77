//! Background scanning
//!
//! - [`coordinator`]: the task deciding when scans run
//! - [`scan`]: the scan cycle itself

pub mod coordinator;
pub mod scan;

pub use coordinator::{CoordinatorState, ScanJob, ScanTrigger, spawn};
pub use scan::{ScanReport, Updater};

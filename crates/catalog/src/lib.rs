//! Network catalog engine for airlog
//!
//! This crate owns the deduplicated catalog of sighted wireless networks,
//! including the merge rules for live and imported records, the inclusion
//! filter, the time-sliced notification drain for display targets, and the
//! configuration and logging setup used by the `airlog` binary.

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod filter;
pub mod logging;
pub mod merge;
pub mod scheduler;

pub use config::CatalogConfig;
pub use dispatcher::{DisplayTarget, DrainStatus, NotificationDispatcher};
pub use engine::{CatalogStats, ExportScope, NetworkCatalog, SaveOutcome};
pub use error::{CatalogError, Result};
pub use filter::{FilterSettings, NetworkFilter};
pub use logging::setup_logging;
pub use merge::MergePolicy;
pub use scheduler::{ChannelScheduler, DrainScheduler, DrainTicks, ManualScheduler};

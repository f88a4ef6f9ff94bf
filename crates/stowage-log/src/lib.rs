//! Crash-recoverable record log for stowage.
//!
//! [`RecordLog`] is the persistence backbone shared by the content and
//! journal engines. Every committed mutation becomes one CRC-framed
//! record, and replaying the log front-to-back rebuilds the state the
//! store held when it was last open.

pub mod config;
pub mod record;

pub use config::{LogConfig, SyncPolicy};
pub use record::RecordLog;

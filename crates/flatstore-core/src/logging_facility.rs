//! Structured logging facility
//!
//! Operations log a boundary pair through the macros in [`macros`]: one
//! `start` event, then one `end` or `end_error` event carrying
//! `duration_ms`. Field keys and event names come from
//! [`log_schema`](crate::log_schema). Everything else (dropped records,
//! skipped files) is a plain `warn!` or `debug!` with the same keys.
//!
//! ```rust
//! use flatstore_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};

//! Structured logging facility for lakescan
//!
//! - Single initialization point via `init(profile)`
//! - Op-boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use lakescan_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Planning code below the op boundary logs with plain `tracing::debug!`
//! and the field names from `lakescan_core_types::schema`.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};

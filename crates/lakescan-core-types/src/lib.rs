//! Core types shared across lakescan facilities
//!
//! This crate provides foundational types used by both error handling
//! and logging facilities:
//!
//! - **Correlation types**: ScanId, TraceId, RequestContext
//! - **Schema constants**: canonical operation-boundary event names

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, ScanId, TraceId};

//! Shared test utilities for the MLCast validator workspace.
//!
//! This crate provides common testing infrastructure including:
//! - In-memory dataset fixtures and a builder for variations of them
//! - Writers for small real Zarr v2/v3 stores on disk
//! - Common attribute values (WKT strings, provenance metadata)
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{compliant_radar_dataset, DatasetBuilder};
//! ```

pub mod builder;
pub mod fixtures;
pub mod zarr;

// Re-export commonly used items at the crate root
pub use builder::*;
pub use fixtures::*;
pub use zarr::*;

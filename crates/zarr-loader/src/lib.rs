//! Zarr store loading for the MLCast validator.
//!
//! Opens a Zarr v2 or v3 group from a local directory or an `s3://` URL and
//! describes it as a read-only [`mlcast_common::Dataset`]. Only metadata and
//! the values of 1-D coordinate arrays are read; data chunks never are.

pub mod error;
pub mod loader;
pub mod metadata;
pub mod storage;

pub use error::{LoadError, Result};
pub use loader::{build_dataset, DatasetLoader, LoaderConfig};
pub use metadata::{read_store_metadata, ArrayNode, StoreMetadata};
pub use storage::{create_s3_storage, open_storage, DatasetLocation, S3Options, TokioBlockOn};

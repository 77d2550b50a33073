//! Common types shared across the MLCast validator crates.
//!
//! The central type is [`Dataset`], a read-only handle describing a chunked
//! gridded dataset: its global attributes, its coordinate variables and its
//! data variables, each with attributes, dimensions and storage encoding.
//! Loaders build it; the compliance engine only reads it.

pub mod dataset;
pub mod encoding;
pub mod error;
pub mod time;

pub use dataset::{Attributes, AttributesExt, Dataset, StoreInfo, Variable, VariableRole};
pub use encoding::{Codec, Encoding};
pub use error::{TimeDecodeError, TimeResult};
pub use time::{decode_cf_times, decode_time_variable, parse_iso8601, CfTimeUnits};

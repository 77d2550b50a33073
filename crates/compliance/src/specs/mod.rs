//! Published product specifications.
//!
//! Each product module binds the constants of every published version to
//! the checks that implement them. A published version never gains a
//! requirement; new requirements go into a new version.

pub mod radar_precipitation;

use crate::error::Result;
use crate::pipeline::Pipeline;

/// Builds the pipeline of one published version.
pub type PipelineBuilder = fn() -> Result<Pipeline>;

/// The published versions of one `stage/product`.
#[derive(Debug, Clone, Copy)]
pub struct ProductSpec {
    pub stage: &'static str,
    pub product: &'static str,
    pub default_version: &'static str,
    /// Oldest first.
    pub versions: &'static [(&'static str, PipelineBuilder)],
}

impl ProductSpec {
    pub fn version_ids(&self) -> Vec<&'static str> {
        self.versions.iter().map(|(v, _)| *v).collect()
    }

    pub fn builder(&self, version: &str) -> Option<PipelineBuilder> {
        self.versions
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, build)| *build)
    }
}

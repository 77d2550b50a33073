//! Time-axis chunking (section 4.1).

use async_trait::async_trait;
use mlcast_common::Dataset;

use super::{Check, CheckContext};
use crate::report::{Report, Status};

const SECTION: &str = "4.1";
/// Offending chunk sizes quoted in a failure detail.
const QUOTED_CHUNKS: usize = 5;

pub struct ChunkingCheck {
    time_chunksize: u64,
}

impl ChunkingCheck {
    pub fn new(time_chunksize: u64) -> Self {
        Self { time_chunksize }
    }
}

#[async_trait]
impl Check for ChunkingCheck {
    fn id(&self) -> &str {
        "chunking"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        format!("Data variables chunked as {} timestep(s) per chunk", self.time_chunksize)
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        for var in dataset.qualifying_data_vars() {
            let requirement = format!("Chunking strategy for {}", var.name);
            let Some(chunks) = var.encoding.chunks.as_ref() else {
                report.add(SECTION, requirement, Status::Warning, "Data not chunked (not a dask array)");
                continue;
            };
            let time_chunks = chunks.first().map(Vec::as_slice).unwrap_or_default();
            if !chunks.is_empty() && time_chunks.iter().all(|&c| c == self.time_chunksize) {
                report.add(
                    SECTION,
                    requirement,
                    Status::Pass,
                    format!("Correct chunking: {} chunk(s) per timestep", self.time_chunksize),
                );
            } else {
                let shown = &time_chunks[..time_chunks.len().min(QUOTED_CHUNKS)];
                report.add(
                    SECTION,
                    requirement,
                    Status::Fail,
                    format!(
                        "Time dimension must be chunked as {} per timestep. Found: {shown:?}...",
                        self.time_chunksize
                    ),
                );
            }
        }
        report
    }
}

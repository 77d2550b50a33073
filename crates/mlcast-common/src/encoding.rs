//! Storage encoding of a variable: chunk layout and codec pipeline.

use serde::{Deserialize, Serialize};

/// One codec of a storage pipeline (e.g. `zstd`, `blosc`, `shuffle`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Codec {
    /// Codec identifier as written in the store metadata.
    pub id: String,
    /// Codec parameters (level, cname, ...).
    #[serde(default)]
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

impl Codec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            configuration: serde_json::Map::new(),
        }
    }

    pub fn with_config(mut self, key: &str, value: serde_json::Value) -> Self {
        self.configuration.insert(key.to_string(), value);
        self
    }

    /// Lower-cased codec identifier.
    pub fn name(&self) -> String {
        self.id.trim().to_lowercase()
    }
}

/// How a variable is laid out in storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    /// Chunk sizes per axis, one sequence per dimension (dask style).
    /// `None` when the variable is not chunked.
    #[serde(default)]
    pub chunks: Option<Vec<Vec<u64>>>,
    /// Byte-level compressors, in application order.
    #[serde(default)]
    pub compressors: Vec<Codec>,
    /// Filter pipeline steps, in application order.
    #[serde(default)]
    pub filters: Vec<Codec>,
}

impl Encoding {
    /// Expand a regular chunk shape into per-axis chunk sequences.
    ///
    /// An axis of length 10 chunked by 4 yields `[4, 4, 2]`.
    pub fn regular_chunks(shape: &[u64], chunk_shape: &[u64]) -> Vec<Vec<u64>> {
        shape
            .iter()
            .zip(chunk_shape.iter())
            .map(|(&len, &chunk)| {
                if chunk == 0 || len == 0 {
                    return Vec::new();
                }
                let full = len / chunk;
                let mut sizes = vec![chunk; full as usize];
                let rem = len % chunk;
                if rem > 0 {
                    sizes.push(rem);
                }
                sizes
            })
            .collect()
    }

    /// Chunk sizes along one axis, if the variable is chunked.
    pub fn axis_chunks(&self, axis: usize) -> Option<&[u64]> {
        self.chunks
            .as_ref()
            .and_then(|c| c.get(axis))
            .map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_chunks_with_remainder() {
        let chunks = Encoding::regular_chunks(&[10, 256], &[4, 256]);
        assert_eq!(chunks, vec![vec![4, 4, 2], vec![256]]);
    }

    #[test]
    fn test_regular_chunks_exact() {
        let chunks = Encoding::regular_chunks(&[3], &[1]);
        assert_eq!(chunks, vec![vec![1, 1, 1]]);
    }

    #[test]
    fn test_regular_chunks_empty_axis() {
        let chunks = Encoding::regular_chunks(&[0], &[1]);
        assert_eq!(chunks, vec![Vec::<u64>::new()]);
    }

    #[test]
    fn test_codec_name_is_lowercase() {
        assert_eq!(Codec::new(" Zstd ").name(), "zstd");
    }
}

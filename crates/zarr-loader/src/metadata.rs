//! Raw Zarr v2/v3 metadata reading.
//!
//! The loader needs more than zarrs exposes through `Array`: the consolidated
//! metadata documents, the group attributes and the codec pipeline exactly as
//! written. This module reads those JSON documents directly from the store.

use mlcast_common::{Attributes, Codec};
use serde_json::Value;
use tracing::debug;
use zarrs_storage::{ListableStorageTraits, ReadableStorageTraits, StoreKey, StorePrefix};

use crate::error::{LoadError, Result};

/// Array-to-bytes codecs that separate filters from compressors in a v3
/// codec chain.
const ARRAY_TO_BYTES_CODECS: &[&str] = &["bytes", "endian", "sharding_indexed", "vlen-utf8", "vlen-bytes", "packbits"];

/// Metadata of one array node, format independent.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    pub name: String,
    pub shape: Vec<u64>,
    /// Outer chunk shape, if the chunk grid is regular.
    pub chunk_shape: Option<Vec<u64>>,
    /// Numpy-style data type name.
    pub dtype: String,
    pub dims: Vec<String>,
    pub attrs: Attributes,
    pub compressors: Vec<Codec>,
    pub filters: Vec<Codec>,
}

/// Everything the loader needs from the store root.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreMetadata {
    pub zarr_format: u8,
    pub consolidated: bool,
    pub attrs: Attributes,
    pub arrays: Vec<ArrayNode>,
}

fn key(s: &str) -> Result<StoreKey> {
    StoreKey::new(s).map_err(|e| LoadError::invalid_metadata(s, e.to_string()))
}

fn read_json<S: ReadableStorageTraits + ?Sized>(storage: &S, name: &str) -> Result<Option<Value>> {
    let Some(bytes) = storage.get(&key(name)?)? else {
        return Ok(None);
    };
    let value = serde_json::from_slice(&bytes).map_err(|e| LoadError::invalid_metadata(name, e.to_string()))?;
    Ok(Some(value))
}

fn as_object(value: Option<&Value>) -> Attributes {
    value.and_then(Value::as_object).cloned().unwrap_or_default()
}

fn u64_list(value: Option<&Value>) -> Option<Vec<u64>> {
    value?.as_array()?.iter().map(Value::as_u64).collect()
}

/// Child node names directly below the store root, sorted.
fn list_children<S: ListableStorageTraits + ?Sized>(storage: &S) -> Result<Vec<String>> {
    let listing = storage.list_dir(&StorePrefix::root())?;
    let mut names: Vec<String> = listing
        .prefixes()
        .iter()
        .map(|p| p.as_str().trim_end_matches('/').to_string())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    Ok(names)
}

/// Read the root metadata of a Zarr v2 or v3 store.
pub fn read_store_metadata<S>(storage: &S) -> Result<StoreMetadata>
where
    S: ReadableStorageTraits + ListableStorageTraits + ?Sized,
{
    if let Some(root) = read_json(storage, "zarr.json")? {
        return read_v3(storage, &root);
    }
    if let Some(consolidated) = read_json(storage, ".zmetadata")? {
        return read_v2_consolidated(&consolidated);
    }
    if read_json(storage, ".zgroup")?.is_some() {
        return read_v2_listed(storage);
    }
    Err(LoadError::NotAZarrStore(
        "no zarr.json, .zmetadata or .zgroup at the store root".to_string(),
    ))
}

// ============================================================================
// Zarr v3
// ============================================================================

fn read_v3<S>(storage: &S, root: &Value) -> Result<StoreMetadata>
where
    S: ReadableStorageTraits + ListableStorageTraits + ?Sized,
{
    if root.get("node_type").and_then(Value::as_str) == Some("array") {
        return Err(LoadError::NotAZarrStore(
            "store root is a single array, expected a group".to_string(),
        ));
    }
    let attrs = as_object(root.get("attributes"));

    let consolidated = root
        .get("consolidated_metadata")
        .and_then(|c| c.get("metadata"))
        .and_then(Value::as_object);

    let mut arrays = Vec::new();
    match consolidated {
        Some(nodes) => {
            for (name, node) in nodes {
                if name.contains('/') || node.get("node_type").and_then(Value::as_str) != Some("array") {
                    continue;
                }
                arrays.push(parse_v3_array(name, node)?);
            }
        }
        None => {
            for name in list_children(storage)? {
                let doc_key = format!("{name}/zarr.json");
                if let Some(node) = read_json(storage, &doc_key)? {
                    if node.get("node_type").and_then(Value::as_str) == Some("array") {
                        arrays.push(parse_v3_array(&name, &node)?);
                    }
                }
            }
        }
    }

    debug!(arrays = arrays.len(), consolidated = consolidated.is_some(), "Read Zarr v3 metadata");
    Ok(StoreMetadata {
        zarr_format: 3,
        consolidated: consolidated.is_some(),
        attrs,
        arrays,
    })
}

fn v3_codec(value: &Value) -> Option<Codec> {
    match value {
        Value::String(name) => Some(Codec::new(name.clone())),
        Value::Object(obj) => {
            let name = obj.get("name")?.as_str()?;
            Some(Codec {
                id: name.to_string(),
                configuration: as_object(obj.get("configuration")),
            })
        }
        _ => None,
    }
}

/// Split a v3 codec chain into (filters, compressors) around its
/// array-to-bytes codec. Sharded arrays report the inner chain.
fn split_v3_codecs(codecs: &[Value]) -> (Vec<Codec>, Vec<Codec>) {
    let codecs: Vec<Codec> = codecs.iter().filter_map(v3_codec).collect();
    let Some(pivot) = codecs.iter().position(|c| ARRAY_TO_BYTES_CODECS.contains(&c.name().as_str())) else {
        return (Vec::new(), codecs);
    };
    if codecs[pivot].name() == "sharding_indexed" {
        if let Some(inner) = codecs[pivot].configuration.get("codecs").and_then(Value::as_array) {
            return split_v3_codecs(inner);
        }
    }
    (codecs[..pivot].to_vec(), codecs[pivot + 1..].to_vec())
}

fn parse_v3_array(name: &str, node: &Value) -> Result<ArrayNode> {
    let doc = format!("{name}/zarr.json");
    let shape = u64_list(node.get("shape")).ok_or_else(|| LoadError::invalid_metadata(&doc, "missing or invalid 'shape'"))?;

    let chunk_shape = node
        .get("chunk_grid")
        .filter(|g| g.get("name").and_then(Value::as_str) == Some("regular"))
        .and_then(|g| u64_list(g.get("configuration").and_then(|c| c.get("chunk_shape"))));

    let dtype = match node.get("data_type") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(obj)) => obj.get("name").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        _ => return Err(LoadError::invalid_metadata(&doc, "missing 'data_type'")),
    };

    let dims = match node.get("dimension_names").and_then(Value::as_array) {
        Some(names) => names
            .iter()
            .enumerate()
            .map(|(i, n)| n.as_str().map(str::to_string).unwrap_or_else(|| format!("dim_{i}")))
            .collect(),
        None => default_dims(shape.len()),
    };

    let codecs = node.get("codecs").and_then(Value::as_array).cloned().unwrap_or_default();
    let (filters, compressors) = split_v3_codecs(&codecs);

    Ok(ArrayNode {
        name: name.to_string(),
        shape,
        chunk_shape,
        dtype,
        dims,
        attrs: as_object(node.get("attributes")),
        compressors,
        filters,
    })
}

// ============================================================================
// Zarr v2
// ============================================================================

fn read_v2_consolidated(doc: &Value) -> Result<StoreMetadata> {
    let metadata = doc
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| LoadError::invalid_metadata(".zmetadata", "missing 'metadata' object"))?;

    let attrs = as_object(metadata.get(".zattrs"));
    let mut arrays = Vec::new();
    for (entry, zarray) in metadata {
        let Some(name) = entry.strip_suffix("/.zarray") else {
            continue;
        };
        if name.contains('/') {
            continue;
        }
        let zattrs = metadata.get(&format!("{name}/.zattrs"));
        arrays.push(parse_v2_array(name, zarray, zattrs)?);
    }

    debug!(arrays = arrays.len(), "Read consolidated Zarr v2 metadata");
    Ok(StoreMetadata {
        zarr_format: 2,
        consolidated: true,
        attrs,
        arrays,
    })
}

fn read_v2_listed<S>(storage: &S) -> Result<StoreMetadata>
where
    S: ReadableStorageTraits + ListableStorageTraits + ?Sized,
{
    let attrs = as_object(read_json(storage, ".zattrs")?.as_ref());
    let mut arrays = Vec::new();
    for name in list_children(storage)? {
        let Some(zarray) = read_json(storage, &format!("{name}/.zarray"))? else {
            continue;
        };
        let zattrs = read_json(storage, &format!("{name}/.zattrs"))?;
        arrays.push(parse_v2_array(&name, &zarray, zattrs.as_ref())?);
    }

    debug!(arrays = arrays.len(), "Read unconsolidated Zarr v2 metadata");
    Ok(StoreMetadata {
        zarr_format: 2,
        consolidated: false,
        attrs,
        arrays,
    })
}

fn v2_codec(value: &Value) -> Option<Codec> {
    let obj = value.as_object()?;
    let id = obj.get("id")?.as_str()?;
    let mut configuration = obj.clone();
    configuration.remove("id");
    Some(Codec {
        id: id.to_string(),
        configuration,
    })
}

fn parse_v2_array(name: &str, zarray: &Value, zattrs: Option<&Value>) -> Result<ArrayNode> {
    let doc = format!("{name}/.zarray");
    let shape = u64_list(zarray.get("shape")).ok_or_else(|| LoadError::invalid_metadata(&doc, "missing or invalid 'shape'"))?;
    let chunk_shape = u64_list(zarray.get("chunks"));
    let dtype = match zarray.get("dtype") {
        Some(Value::String(s)) => numpy_dtype_name(s),
        Some(_) => "structured".to_string(),
        None => return Err(LoadError::invalid_metadata(&doc, "missing 'dtype'")),
    };

    let mut attrs = as_object(zattrs);
    let dims = match attrs.remove("_ARRAY_DIMENSIONS") {
        Some(Value::Array(names)) => names
            .iter()
            .enumerate()
            .map(|(i, n)| n.as_str().map(str::to_string).unwrap_or_else(|| format!("dim_{i}")))
            .collect(),
        _ => default_dims(shape.len()),
    };

    let compressors = zarray.get("compressor").and_then(v2_codec).into_iter().collect();
    let filters = zarray
        .get("filters")
        .and_then(Value::as_array)
        .map(|f| f.iter().filter_map(v2_codec).collect())
        .unwrap_or_default();

    Ok(ArrayNode {
        name: name.to_string(),
        shape,
        chunk_shape,
        dtype,
        dims,
        attrs,
        compressors,
        filters,
    })
}

fn default_dims(ndim: usize) -> Vec<String> {
    (0..ndim).map(|i| format!("dim_{i}")).collect()
}

/// Convert a numpy typestr (`<f4`, `|u1`, `<M8[ns]`) to its dtype name.
pub fn numpy_dtype_name(typestr: &str) -> String {
    let body = typestr.trim_start_matches(['<', '>', '|', '=']);
    let (kind, rest) = body.split_at(body.len().min(1));
    let size: Option<u32> = rest.parse().ok();
    match (kind, size) {
        ("f", Some(n)) => format!("float{}", n * 8),
        ("i", Some(n)) => format!("int{}", n * 8),
        ("u", Some(n)) => format!("uint{}", n * 8),
        ("c", Some(n)) => format!("complex{}", n * 8),
        ("b", Some(1)) => "bool".to_string(),
        ("M", _) => format!("datetime64{}", rest.trim_start_matches('8')),
        ("m", _) => format!("timedelta64{}", rest.trim_start_matches('8')),
        ("S", _) => "bytes".to_string(),
        ("U", _) => "str".to_string(),
        _ => typestr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numpy_dtype_names() {
        assert_eq!(numpy_dtype_name("<f4"), "float32");
        assert_eq!(numpy_dtype_name("<f8"), "float64");
        assert_eq!(numpy_dtype_name("<i8"), "int64");
        assert_eq!(numpy_dtype_name("|u1"), "uint8");
        assert_eq!(numpy_dtype_name("|b1"), "bool");
        assert_eq!(numpy_dtype_name("<M8[ns]"), "datetime64[ns]");
    }

    #[test]
    fn test_v2_consolidated_parsing() {
        let doc = json!({
            "zarr_consolidated_format": 1,
            "metadata": {
                ".zgroup": {"zarr_format": 2},
                ".zattrs": {"license": "CC-BY-4.0"},
                "rr/.zarray": {
                    "shape": [10, 300, 300],
                    "chunks": [1, 300, 300],
                    "dtype": "<f4",
                    "compressor": {"id": "zstd", "level": 3},
                    "filters": null,
                    "zarr_format": 2
                },
                "rr/.zattrs": {"_ARRAY_DIMENSIONS": ["time", "y", "x"], "units": "mm/h"},
                "time/.zarray": {
                    "shape": [10], "chunks": [10], "dtype": "<i8",
                    "compressor": null, "filters": null, "zarr_format": 2
                },
                "time/.zattrs": {"_ARRAY_DIMENSIONS": ["time"]}
            }
        });
        let meta = read_v2_consolidated(&doc).unwrap();
        assert_eq!(meta.zarr_format, 2);
        assert!(meta.consolidated);
        assert_eq!(meta.attrs.get("license"), Some(&json!("CC-BY-4.0")));
        assert_eq!(meta.arrays.len(), 2);

        let rr = &meta.arrays[0];
        assert_eq!(rr.name, "rr");
        assert_eq!(rr.dims, vec!["time", "y", "x"]);
        assert_eq!(rr.dtype, "float32");
        assert_eq!(rr.compressors[0].id, "zstd");
        assert_eq!(rr.compressors[0].configuration.get("level"), Some(&json!(3)));
        assert!(!rr.attrs.contains_key("_ARRAY_DIMENSIONS"));
    }

    #[test]
    fn test_v3_codec_split() {
        let codecs = vec![
            json!({"name": "transpose", "configuration": {"order": [0, 1]}}),
            json!({"name": "bytes", "configuration": {"endian": "little"}}),
            json!({"name": "zstd", "configuration": {"level": 5}}),
        ];
        let (filters, compressors) = split_v3_codecs(&codecs);
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].id, "transpose");
        assert_eq!(compressors.len(), 1);
        assert_eq!(compressors[0].id, "zstd");
    }

    #[test]
    fn test_v3_sharded_codecs_use_inner_chain() {
        let codecs = vec![json!({
            "name": "sharding_indexed",
            "configuration": {
                "chunk_shape": [1, 64, 64],
                "codecs": [{"name": "bytes"}, {"name": "blosc", "configuration": {"cname": "zstd"}}],
                "index_codecs": [{"name": "bytes"}, {"name": "crc32c"}]
            }
        })];
        let (filters, compressors) = split_v3_codecs(&codecs);
        assert!(filters.is_empty());
        assert_eq!(compressors[0].id, "blosc");
    }

    #[test]
    fn test_v3_array_defaults_dims() {
        let node = json!({
            "zarr_format": 3,
            "node_type": "array",
            "shape": [4, 5],
            "data_type": "float64",
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [2, 5]}},
            "codecs": [{"name": "bytes"}]
        });
        let arr = parse_v3_array("field", &node).unwrap();
        assert_eq!(arr.dims, vec!["dim_0", "dim_1"]);
        assert_eq!(arr.chunk_shape, Some(vec![2, 5]));
        assert!(arr.compressors.is_empty());
    }

    #[test]
    fn test_v2_array_missing_shape_is_error() {
        let err = parse_v2_array("bad", &json!({"dtype": "<f4"}), None).unwrap_err();
        assert!(matches!(err, LoadError::InvalidMetadata { .. }));
    }
}

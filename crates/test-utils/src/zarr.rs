//! Writers for small on-disk Zarr stores.
//!
//! The stores mimic what xarray writes for a radar composite: a `time`
//! coordinate encoded as minutes since an epoch, projected `x`/`y`
//! coordinates, a `rr` data variable and a scalar `crs` variable. Only
//! coordinate chunks are written; data chunks are left to the fill value.

use std::path::Path;
use std::sync::Arc;

use mlcast_common::Attributes;
use serde_json::{json, Value};
use zarrs::array::Array;
use zarrs_filesystem::FilesystemStore;

use crate::builder::compliant_global_attrs;
use crate::fixtures::{crs, time};

/// Layout of a radar store written by [`write_radar_zarr`].
#[derive(Debug, Clone)]
pub struct RadarZarrLayout {
    /// Zarr format version, 2 or 3.
    pub zarr_format: u8,
    /// Write consolidated metadata (`.zmetadata` / inline `consolidated_metadata`).
    pub consolidated: bool,
    /// Time values in minutes since [`time::EPOCH`].
    pub time_minutes: Vec<i64>,
    pub nx: usize,
    pub ny: usize,
    /// Grid spacing in metres.
    pub step_m: f64,
    /// Time chunk length of the data variable.
    pub time_chunk: u64,
    pub global_attrs: Attributes,
}

impl Default for RadarZarrLayout {
    fn default() -> Self {
        Self {
            zarr_format: 3,
            consolidated: true,
            time_minutes: (0..6).map(|i| i * 5).collect(),
            nx: 8,
            ny: 6,
            step_m: 1000.0,
            time_chunk: 1,
            global_attrs: compliant_global_attrs(),
        }
    }
}

struct ArraySpec {
    name: &'static str,
    dims: Vec<&'static str>,
    shape: Vec<u64>,
    chunks: Vec<u64>,
    /// (v3 data_type, v2 dtype)
    dtype: (&'static str, &'static str),
    attrs: Value,
    compressed: bool,
}

fn array_specs(layout: &RadarZarrLayout) -> Vec<ArraySpec> {
    let nt = layout.time_minutes.len() as u64;
    let (ny, nx) = (layout.ny as u64, layout.nx as u64);
    vec![
        ArraySpec {
            name: "crs",
            dims: vec![],
            shape: vec![],
            chunks: vec![],
            dtype: ("int64", "<i8"),
            attrs: json!({
                "grid_mapping_name": "lambert_azimuthal_equal_area",
                "spatial_ref": crs::LAEA_EUROPE_WKT,
                "crs_wkt": crs::LAEA_EUROPE_WKT,
            }),
            compressed: false,
        },
        ArraySpec {
            name: "rr",
            dims: vec!["time", "y", "x"],
            shape: vec![nt, ny, nx],
            chunks: vec![layout.time_chunk, ny, nx],
            dtype: ("float32", "<f4"),
            attrs: json!({
                "long_name": "Rainfall rate",
                "standard_name": "rainfall_flux",
                "units": "kg m-2 h-1",
                "grid_mapping": "crs",
            }),
            compressed: true,
        },
        ArraySpec {
            name: "time",
            dims: vec!["time"],
            shape: vec![nt],
            chunks: vec![nt.max(1)],
            dtype: ("int64", "<i8"),
            attrs: json!({
                "standard_name": "time",
                "axis": "T",
                "units": time::UNITS,
                "calendar": "proleptic_gregorian",
            }),
            compressed: false,
        },
        ArraySpec {
            name: "x",
            dims: vec!["x"],
            shape: vec![nx],
            chunks: vec![nx.max(1)],
            dtype: ("float64", "<f8"),
            attrs: json!({"standard_name": "projection_x_coordinate", "axis": "X", "units": "m"}),
            compressed: false,
        },
        ArraySpec {
            name: "y",
            dims: vec!["y"],
            shape: vec![ny],
            chunks: vec![ny.max(1)],
            dtype: ("float64", "<f8"),
            attrs: json!({"standard_name": "projection_y_coordinate", "axis": "Y", "units": "m"}),
            compressed: false,
        },
    ]
}

fn coordinate_values(layout: &RadarZarrLayout, name: &str) -> Option<Vec<f64>> {
    let axis = |n: usize| (0..n).map(|i| i as f64 * layout.step_m + layout.step_m / 2.0).collect();
    match name {
        "x" => Some(axis(layout.nx)),
        "y" => Some(axis(layout.ny)),
        _ => None,
    }
}

fn write_json(path: &Path, value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

fn v3_array_metadata(spec: &ArraySpec) -> Value {
    let mut codecs = vec![json!({"name": "bytes", "configuration": {"endian": "little"}})];
    if spec.compressed {
        codecs.push(json!({"name": "zstd", "configuration": {"level": 3, "checksum": false}}));
    }
    json!({
        "zarr_format": 3,
        "node_type": "array",
        "shape": spec.shape,
        "data_type": spec.dtype.0,
        "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": spec.chunks}},
        "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
        "fill_value": 0,
        "codecs": codecs,
        "attributes": spec.attrs,
        "dimension_names": spec.dims,
    })
}

fn v2_array_metadata(spec: &ArraySpec) -> (Value, Value) {
    let compressor = if spec.compressed {
        json!({"id": "zstd", "level": 3})
    } else {
        Value::Null
    };
    let zarray = json!({
        "zarr_format": 2,
        "shape": spec.shape,
        "chunks": spec.chunks,
        "dtype": spec.dtype.1,
        "compressor": compressor,
        "filters": null,
        "fill_value": 0,
        "order": "C",
    });
    let mut zattrs = spec.attrs.clone();
    if let Some(obj) = zattrs.as_object_mut() {
        obj.insert("_ARRAY_DIMENSIONS".to_string(), json!(spec.dims));
    }
    (zarray, zattrs)
}

/// Write a radar store with the given layout into `path`.
pub fn write_radar_zarr(path: &Path, layout: &RadarZarrLayout) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(path)?;
    let specs = array_specs(layout);
    match layout.zarr_format {
        2 => write_v2(path, layout, &specs),
        3 => write_v3(path, layout, &specs),
        other => Err(format!("unsupported zarr format {other}").into()),
    }
}

fn write_v3(path: &Path, layout: &RadarZarrLayout, specs: &[ArraySpec]) -> Result<(), Box<dyn std::error::Error>> {
    let mut nodes = serde_json::Map::new();
    for spec in specs {
        let meta = v3_array_metadata(spec);
        write_json(&path.join(spec.name).join("zarr.json"), &meta)?;
        nodes.insert(spec.name.to_string(), meta);
    }

    let mut root = json!({
        "zarr_format": 3,
        "node_type": "group",
        "attributes": layout.global_attrs,
    });
    if layout.consolidated {
        root["consolidated_metadata"] = json!({
            "kind": "inline",
            "must_understand": false,
            "metadata": nodes,
        });
    }
    write_json(&path.join("zarr.json"), &root)?;

    // Coordinate chunks go through zarrs so the loader reads real encoded data.
    let store = Arc::new(FilesystemStore::new(path)?);
    let time = Array::open(store.clone(), "/time")?;
    time.store_array_subset_elements::<i64>(&time.subset_all(), &layout.time_minutes)?;
    for name in ["x", "y"] {
        if let Some(values) = coordinate_values(layout, name) {
            let array = Array::open(store.clone(), &format!("/{name}"))?;
            array.store_array_subset_elements::<f64>(&array.subset_all(), &values)?;
        }
    }
    Ok(())
}

fn write_v2(path: &Path, layout: &RadarZarrLayout, specs: &[ArraySpec]) -> Result<(), Box<dyn std::error::Error>> {
    let zgroup = json!({"zarr_format": 2});
    let zattrs_root = Value::Object(layout.global_attrs.clone());
    write_json(&path.join(".zgroup"), &zgroup)?;
    write_json(&path.join(".zattrs"), &zattrs_root)?;

    let mut consolidated = serde_json::Map::new();
    consolidated.insert(".zgroup".to_string(), zgroup);
    consolidated.insert(".zattrs".to_string(), zattrs_root);

    for spec in specs {
        let (zarray, zattrs) = v2_array_metadata(spec);
        write_json(&path.join(spec.name).join(".zarray"), &zarray)?;
        write_json(&path.join(spec.name).join(".zattrs"), &zattrs)?;
        consolidated.insert(format!("{}/.zarray", spec.name), zarray);
        consolidated.insert(format!("{}/.zattrs", spec.name), zattrs);
    }

    // Uncompressed little-endian C-order chunks, a single chunk per coordinate.
    let time_bytes: Vec<u8> = layout.time_minutes.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path.join("time").join("0"), time_bytes)?;
    for name in ["x", "y"] {
        if let Some(values) = coordinate_values(layout, name) {
            let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            std::fs::write(path.join(name).join("0"), bytes)?;
        }
    }

    if layout.consolidated {
        write_json(
            &path.join(".zmetadata"),
            &json!({"zarr_consolidated_format": 1, "metadata": consolidated}),
        )?;
    }
    Ok(())
}

/// Write a radar store into a fresh temporary directory.
///
/// The returned `TempDir` must be kept alive for as long as the store is used.
pub fn temp_radar_zarr(layout: &RadarZarrLayout) -> Result<(tempfile::TempDir, std::path::PathBuf), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("radar.zarr");
    write_radar_zarr(&path, layout)?;
    Ok((dir, path))
}

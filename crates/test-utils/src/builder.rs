//! In-memory dataset fixtures.
//!
//! [`compliant_radar_dataset`] satisfies every requirement of the default
//! radar precipitation pipeline. Tests derive non-compliant variants from it
//! with [`DatasetBuilder`].

use mlcast_common::{Attributes, Codec, Dataset, Encoding, StoreInfo, Variable, VariableRole};
use serde_json::{json, Value};

use crate::fixtures::{crs, provenance, time};

/// Builder for [`Dataset`] fixtures.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    dataset: Dataset,
}

impl DatasetBuilder {
    pub fn new(location: &str) -> Self {
        Self {
            dataset: Dataset {
                location: location.to_string(),
                store: StoreInfo {
                    zarr_format: Some(3),
                    consolidated: true,
                },
                ..Default::default()
            },
        }
    }

    /// Start from an existing dataset.
    pub fn from_dataset(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn attr(mut self, key: &str, value: Value) -> Self {
        self.dataset.attrs.insert(key.to_string(), value);
        self
    }

    pub fn without_attr(mut self, key: &str) -> Self {
        self.dataset.attrs.remove(key);
        self
    }

    /// Add or replace a variable.
    pub fn variable(mut self, variable: Variable) -> Self {
        self.dataset.upsert(variable);
        self
    }

    pub fn without_variable(mut self, name: &str) -> Self {
        self.dataset.variables.retain(|v| v.name != name);
        self
    }

    /// Modify a variable in place; no-op if it does not exist.
    pub fn map_variable(mut self, name: &str, f: impl FnOnce(&mut Variable)) -> Self {
        if let Some(var) = self.dataset.variables.iter_mut().find(|v| v.name == name) {
            f(var);
        }
        self
    }

    pub fn var_attr(self, name: &str, key: &str, value: Value) -> Self {
        let key = key.to_string();
        self.map_variable(name, move |v| {
            v.attrs.insert(key, value);
        })
    }

    pub fn without_var_attr(self, name: &str, key: &str) -> Self {
        self.map_variable(name, |v| {
            v.attrs.remove(key);
        })
    }

    pub fn zarr_format(mut self, version: Option<u8>, consolidated: bool) -> Self {
        self.dataset.store = StoreInfo {
            zarr_format: version,
            consolidated,
        };
        self
    }

    pub fn build(self) -> Dataset {
        self.dataset
    }
}

fn attrs(pairs: &[(&str, Value)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// CF time coordinate in minutes since [`time::EPOCH`].
pub fn time_coordinate(minutes: &[f64]) -> Variable {
    let mut var = Variable::new("time", VariableRole::Coordinate);
    var.dims = vec!["time".to_string()];
    var.shape = vec![minutes.len() as u64];
    var.dtype = "int64".to_string();
    var.attrs = attrs(&[
        ("standard_name", json!("time")),
        ("axis", json!("T")),
        ("units", json!(time::UNITS)),
        ("calendar", json!("proleptic_gregorian")),
    ]);
    var.encoding.chunks = Some(vec![vec![minutes.len() as u64]]);
    var.values = Some(minutes.to_vec());
    var
}

/// Evenly spaced time offsets in minutes.
pub fn regular_minutes(count: usize, step_minutes: f64) -> Vec<f64> {
    (0..count).map(|i| i as f64 * step_minutes).collect()
}

/// Projected coordinate (`x` or `y`) with the given step in metres.
pub fn projected_coordinate(name: &str, len: usize, step_m: f64) -> Variable {
    let (standard_name, axis) = if name == "x" {
        ("projection_x_coordinate", "X")
    } else {
        ("projection_y_coordinate", "Y")
    };
    let mut var = Variable::new(name, VariableRole::Coordinate);
    var.dims = vec![name.to_string()];
    var.shape = vec![len as u64];
    var.dtype = "float64".to_string();
    var.attrs = attrs(&[
        ("standard_name", json!(standard_name)),
        ("axis", json!(axis)),
        ("units", json!("m")),
    ]);
    var.values = Some((0..len).map(|i| i as f64 * step_m + step_m / 2.0).collect());
    var
}

/// 2-D auxiliary latitude or longitude coordinate over (y, x).
pub fn geographic_coordinate(name: &str, ny: usize, nx: usize) -> Variable {
    let (standard_name, units) = if name == "lat" {
        ("latitude", "degrees_north")
    } else {
        ("longitude", "degrees_east")
    };
    let mut var = Variable::new(name, VariableRole::Coordinate);
    var.dims = vec!["y".to_string(), "x".to_string()];
    var.shape = vec![ny as u64, nx as u64];
    var.dtype = "float64".to_string();
    var.attrs = attrs(&[
        ("standard_name", json!(standard_name)),
        ("units", json!(units)),
    ]);
    var
}

/// Rainfall-rate data variable over (time, y, x), one chunk per timestep.
pub fn rainfall_variable(name: &str, nt: usize, ny: usize, nx: usize) -> Variable {
    let shape = vec![nt as u64, ny as u64, nx as u64];
    let mut var = Variable::new(name, VariableRole::Data);
    var.dims = vec!["time".to_string(), "y".to_string(), "x".to_string()];
    var.dtype = "float32".to_string();
    var.attrs = attrs(&[
        ("long_name", json!("Rainfall rate")),
        ("standard_name", json!("rainfall_flux")),
        ("units", json!("kg m-2 h-1")),
        ("grid_mapping", json!("crs")),
    ]);
    var.encoding = Encoding {
        chunks: Some(Encoding::regular_chunks(&shape, &[1, ny as u64, nx as u64])),
        compressors: vec![Codec::new("zstd").with_config("level", json!(3))],
        filters: Vec::new(),
    };
    var.shape = shape;
    var
}

/// Scalar CRS variable carrying `spatial_ref` and `crs_wkt`.
pub fn crs_variable(wkt: &str) -> Variable {
    let mut var = Variable::new("crs", VariableRole::Data);
    var.dtype = "int64".to_string();
    var.attrs = attrs(&[
        ("grid_mapping_name", json!("lambert_azimuthal_equal_area")),
        ("spatial_ref", json!(wkt)),
        ("crs_wkt", json!(wkt)),
    ]);
    var
}

/// Global attributes of a compliant dataset.
pub fn compliant_global_attrs() -> Attributes {
    attrs(&[
        ("title", json!("Nordic radar rainfall composite")),
        ("Conventions", json!("CF-1.10")),
        ("license", json!("CC-BY-4.0")),
        ("mlcast_created_on", json!(provenance::CREATED_ON)),
        ("mlcast_created_by", json!(provenance::CREATED_BY)),
        ("mlcast_created_with", json!(provenance::CREATED_WITH)),
        ("mlcast_dataset_version", json!(provenance::DATASET_VERSION)),
        ("mlcast_source_org_id", json!(provenance::SOURCE_ORG_ID)),
    ])
}

/// A dataset satisfying every requirement of the default radar
/// precipitation pipeline: CF coordinates (time, projected x/y, 2-D lat/lon),
/// 1 km resolution on a 300×300 grid, a little over three years of hourly
/// data, zstd compression with one chunk per timestep, a recommended licence
/// and complete georeferencing.
pub fn compliant_radar_dataset() -> Dataset {
    let nt = time::THREE_YEARS_HOURLY;
    let (ny, nx) = (300, 300);

    let mut builder = DatasetBuilder::new("memory://compliant-radar.zarr")
        .variable(time_coordinate(&regular_minutes(nt, 60.0)))
        .variable(projected_coordinate("y", ny, 1000.0))
        .variable(projected_coordinate("x", nx, 1000.0))
        .variable(geographic_coordinate("lat", ny, nx))
        .variable(geographic_coordinate("lon", ny, nx))
        .variable(rainfall_variable("rr", nt, ny, nx))
        .variable(crs_variable(crs::LAEA_EUROPE_WKT));
    for (key, value) in compliant_global_attrs() {
        builder = builder.attr(&key, value);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compliant_dataset_shape() {
        let ds = compliant_radar_dataset();
        assert_eq!(ds.coords().count(), 5);
        let names: Vec<_> = ds.qualifying_data_vars().iter().map(|v| v.name.clone()).collect();
        assert_eq!(names, vec!["rr"]);
        let rr = ds.data_var("rr").unwrap();
        assert!(rr.encoding.axis_chunks(0).unwrap().iter().all(|&c| c == 1));
    }

    #[test]
    fn test_builder_variations() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .without_attr("license")
            .var_attr("rr", "units", json!("mm/h"))
            .without_variable("lat")
            .build();
        assert!(!ds.attrs.contains_key("license"));
        assert_eq!(ds.data_var("rr").unwrap().attrs.get("units"), Some(&json!("mm/h")));
        assert!(ds.coord("lat").is_none());
    }
}

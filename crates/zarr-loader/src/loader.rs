//! Dataset construction from a Zarr store.

use std::collections::BTreeSet;
use std::sync::Arc;

use mlcast_common::{Attributes, AttributesExt, Dataset, Encoding, StoreInfo, Variable, VariableRole};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zarrs::array::{Array, DataType};
use zarrs_storage::{ReadableListableStorage, ReadableListableStorageTraits};

use crate::error::Result;
use crate::metadata::{read_store_metadata, ArrayNode, StoreMetadata};
use crate::storage::{open_storage, DatasetLocation, S3Options};

/// Loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Coordinates longer than this are described but their values are not read.
    pub max_coord_values: u64,
    #[serde(default)]
    pub s3: S3Options,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_coord_values: 2_000_000,
            s3: S3Options::default(),
        }
    }
}

/// Opens Zarr stores as [`Dataset`] handles.
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    config: LoaderConfig,
}

impl DatasetLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Open the store at `location` (local path or `s3://` URL) and load it.
    pub fn open(&self, location: &str) -> Result<Dataset> {
        let parsed = DatasetLocation::parse(location)?;
        let storage = open_storage(&parsed, &self.config.s3)?;
        self.load(storage, location)
    }

    /// Load a dataset from an already opened store.
    pub fn load(&self, storage: ReadableListableStorage, location: &str) -> Result<Dataset> {
        let start = std::time::Instant::now();
        let metadata = read_store_metadata(&*storage)?;

        let mut dataset = build_dataset(location, &metadata);
        self.read_coordinate_values(&storage, &mut dataset);

        info!(
            location,
            zarr_format = metadata.zarr_format,
            consolidated = metadata.consolidated,
            variables = dataset.variables.len(),
            notes = dataset.load_notes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(dataset)
    }

    fn read_coordinate_values(&self, storage: &ReadableListableStorage, dataset: &mut Dataset) {
        let mut notes = Vec::new();
        for var in dataset.variables.iter_mut().filter(|v| v.is_coordinate()) {
            if var.shape.len() != 1 {
                continue;
            }
            if var.shape[0] > self.config.max_coord_values {
                notes.push(format!(
                    "values of coordinate '{}' not read: {} elements exceeds limit of {}",
                    var.name, var.shape[0], self.config.max_coord_values
                ));
                continue;
            }
            match read_values_f64(storage.clone(), &var.name) {
                Ok(values) => {
                    debug!(coord = %var.name, len = values.len(), "Read coordinate values");
                    var.values = Some(values);
                }
                Err(message) => {
                    warn!(coord = %var.name, error = %message, "Could not read coordinate values");
                    notes.push(format!("values of coordinate '{}' not read: {}", var.name, message));
                }
            }
        }
        dataset.load_notes.extend(notes);
    }
}

/// Read a 1-D numeric array as f64 values.
fn read_values_f64(storage: Arc<dyn ReadableListableStorageTraits>, name: &str) -> std::result::Result<Vec<f64>, String> {
    let array = Array::open(storage, &format!("/{name}")).map_err(|e| e.to_string())?;
    let subset = array.subset_all();

    macro_rules! read_as {
        ($t:ty) => {
            array
                .retrieve_array_subset_elements::<$t>(&subset)
                .map(|v| v.into_iter().map(|x| x as f64).collect())
                .map_err(|e| e.to_string())
        };
    }

    match array.data_type() {
        DataType::Float64 => read_as!(f64),
        DataType::Float32 => read_as!(f32),
        DataType::Int64 => read_as!(i64),
        DataType::Int32 => read_as!(i32),
        DataType::Int16 => read_as!(i16),
        DataType::Int8 => read_as!(i8),
        DataType::UInt64 => read_as!(u64),
        DataType::UInt32 => read_as!(u32),
        DataType::UInt16 => read_as!(u16),
        DataType::UInt8 => read_as!(u8),
        other => Err(format!("unsupported data type {:?}", other)),
    }
}

/// Names that xarray treats as coordinates: dimension coordinates plus any
/// name listed in a `coordinates` attribute.
fn coordinate_names(metadata: &StoreMetadata) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for node in &metadata.arrays {
        if node.dims.len() == 1 && node.dims[0] == node.name {
            names.insert(node.name.clone());
        }
        if let Some(listed) = node.attrs.text("coordinates") {
            names.extend(listed.split_whitespace().map(str::to_string));
        }
    }
    if let Some(listed) = metadata.attrs.text("coordinates") {
        names.extend(listed.split_whitespace().map(str::to_string));
    }
    names
}

fn to_variable(node: &ArrayNode, role: VariableRole) -> Variable {
    let mut attrs: Attributes = node.attrs.clone();
    attrs.remove("coordinates");

    let chunks = node
        .chunk_shape
        .as_ref()
        .filter(|c| c.len() == node.shape.len())
        .map(|c| Encoding::regular_chunks(&node.shape, c));

    Variable {
        name: node.name.clone(),
        role,
        dims: node.dims.clone(),
        shape: node.shape.clone(),
        dtype: node.dtype.clone(),
        attrs,
        encoding: Encoding {
            chunks,
            compressors: node.compressors.clone(),
            filters: node.filters.clone(),
        },
        values: None,
    }
}

/// Build the dataset handle from raw metadata, without reading any chunks.
pub fn build_dataset(location: &str, metadata: &StoreMetadata) -> Dataset {
    let coords = coordinate_names(metadata);
    let mut attrs = metadata.attrs.clone();
    attrs.remove("coordinates");

    let variables = metadata
        .arrays
        .iter()
        .map(|node| {
            let role = if coords.contains(&node.name) {
                VariableRole::Coordinate
            } else {
                VariableRole::Data
            };
            to_variable(node, role)
        })
        .collect();

    Dataset {
        location: location.to_string(),
        store: StoreInfo {
            zarr_format: Some(metadata.zarr_format),
            consolidated: metadata.consolidated,
        },
        attrs,
        variables,
        load_notes: Vec::new(),
    }
}

//! The read-only dataset handle.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;

/// Attribute map of a variable or of the dataset itself.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Convenience accessors for attribute maps.
pub trait AttributesExt {
    /// Attribute rendered as text: strings as-is, numbers and booleans via
    /// their JSON representation. Arrays and objects yield `None`.
    fn text(&self, key: &str) -> Option<String>;

    /// Attribute as a string slice, only if it is a JSON string.
    fn str_value(&self, key: &str) -> Option<&str>;

    fn has(&self, key: &str) -> bool;
}

impl AttributesExt for Attributes {
    fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn str_value(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    fn has(&self, key: &str) -> bool {
        self.contains_key(key)
    }
}

/// Whether a variable is a coordinate or a data variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableRole {
    Coordinate,
    Data,
}

/// A named array of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub role: VariableRole,
    /// Dimension names, outermost first.
    #[serde(default)]
    pub dims: Vec<String>,
    /// Dimension sizes, same order as `dims`.
    #[serde(default)]
    pub shape: Vec<u64>,
    /// Numpy-style element type name (`float32`, `int64`, ...).
    #[serde(default)]
    pub dtype: String,
    #[serde(default)]
    pub attrs: Attributes,
    #[serde(default)]
    pub encoding: Encoding,
    /// Decoded values of 1-D coordinates. Data variables never carry values.
    #[serde(default)]
    pub values: Option<Vec<f64>>,
}

impl Variable {
    pub fn new(name: impl Into<String>, role: VariableRole) -> Self {
        Self {
            name: name.into(),
            role,
            dims: Vec::new(),
            shape: Vec::new(),
            dtype: String::new(),
            attrs: Attributes::new(),
            encoding: Encoding::default(),
            values: None,
        }
    }

    pub fn is_coordinate(&self) -> bool {
        self.role == VariableRole::Coordinate
    }

    /// Size of the named dimension, if this variable spans it.
    pub fn size_of(&self, dim: &str) -> Option<u64> {
        self.dims
            .iter()
            .position(|d| d == dim)
            .and_then(|idx| self.shape.get(idx).copied())
    }

    pub fn attr_text(&self, key: &str) -> Option<String> {
        self.attrs.text(key)
    }

    /// The variable named by this variable's `grid_mapping` attribute.
    pub fn grid_mapping(&self) -> Option<&str> {
        self.attrs.str_value("grid_mapping").map(str::trim)
    }
}

/// Facts about the underlying store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreInfo {
    /// Zarr format version (2 or 3), if known.
    pub zarr_format: Option<u8>,
    /// Whether consolidated metadata was found.
    pub consolidated: bool,
}

/// Read-only view of a gridded dataset.
///
/// Variables are kept in store order; every lookup that returns several
/// variables preserves that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Where the dataset was loaded from.
    pub location: String,
    #[serde(default)]
    pub store: StoreInfo,
    /// Global attributes.
    #[serde(default)]
    pub attrs: Attributes,
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Non-fatal problems met while loading (e.g. undecodable coordinates).
    #[serde(default)]
    pub load_notes: Vec<String>,
}

impl Dataset {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    /// Coordinate variables in store order.
    pub fn coords(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.is_coordinate())
    }

    /// Data variables in store order.
    pub fn data_vars(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| !v.is_coordinate())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn coord(&self, name: &str) -> Option<&Variable> {
        self.coords().find(|v| v.name == name)
    }

    pub fn data_var(&self, name: &str) -> Option<&Variable> {
        self.data_vars().find(|v| v.name == name)
    }

    pub fn has_coord(&self, name: &str) -> bool {
        self.coord(name).is_some()
    }

    /// Names of variables acting as CF grid_mapping definitions: those
    /// referenced by a data variable's `grid_mapping` attribute and present
    /// in the dataset.
    pub fn grid_mapping_definitions(&self) -> BTreeSet<&str> {
        self.data_vars()
            .filter_map(|v| v.grid_mapping())
            .filter(|name| self.variable(name).is_some())
            .collect()
    }

    /// Data variables that carry actual data, skipping grid_mapping
    /// definition variables.
    pub fn qualifying_data_vars(&self) -> Vec<&Variable> {
        let gm = self.grid_mapping_definitions();
        self.data_vars()
            .filter(|v| !gm.contains(v.name.as_str()))
            .collect()
    }

    /// Insert or replace a variable, keeping the position of a replaced one.
    pub fn upsert(&mut self, variable: Variable) {
        match self.variables.iter_mut().find(|v| v.name == variable.name) {
            Some(existing) => *existing = variable,
            None => self.variables.push(variable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_var(name: &str, grid_mapping: Option<&str>) -> Variable {
        let mut v = Variable::new(name, VariableRole::Data);
        if let Some(gm) = grid_mapping {
            v.attrs.insert("grid_mapping".into(), json!(gm));
        }
        v
    }

    #[test]
    fn test_qualifying_vars_skip_grid_mapping_definitions() {
        let mut ds = Dataset::new("mem://");
        ds.upsert(data_var("rr", Some("crs")));
        ds.upsert(data_var("crs", None));
        ds.upsert(data_var("quality", Some("missing_crs")));

        let names: Vec<_> = ds.qualifying_data_vars().iter().map(|v| v.name.clone()).collect();
        assert_eq!(names, vec!["rr", "quality"]);
    }

    #[test]
    fn test_attribute_text_renders_numbers() {
        let mut attrs = Attributes::new();
        attrs.insert("scale".into(), json!(1.5));
        attrs.insert("flag".into(), json!([1, 2]));
        assert_eq!(attrs.text("scale").as_deref(), Some("1.5"));
        assert_eq!(attrs.text("flag"), None);
        assert!(attrs.has("flag"));
    }

    #[test]
    fn test_size_of_dimension() {
        let mut v = Variable::new("rr", VariableRole::Data);
        v.dims = vec!["time".into(), "y".into(), "x".into()];
        v.shape = vec![10, 300, 400];
        assert_eq!(v.size_of("x"), Some(400));
        assert_eq!(v.size_of("lat"), None);
    }

    #[test]
    fn test_upsert_keeps_order() {
        let mut ds = Dataset::new("mem://");
        ds.upsert(Variable::new("time", VariableRole::Coordinate));
        ds.upsert(Variable::new("x", VariableRole::Coordinate));
        let mut replaced = Variable::new("time", VariableRole::Coordinate);
        replaced.dtype = "int64".into();
        ds.upsert(replaced);

        let names: Vec<_> = ds.coords().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["time", "x"]);
        assert_eq!(ds.coord("time").map(|v| v.dtype.as_str()), Some("int64"));
    }
}

//! Declarative rules for recognising CF coordinates.
//!
//! A [`Rule`] is an ordered list of [`Clause`]s. An entity matches the rule
//! when any clause holds; a clause holds when every one of its attribute
//! constraints holds. This lets partial metadata (only `axis` and `units`,
//! or only a conventional name) still resolve to a coordinate role.

use std::sync::OnceLock;

use mlcast_common::{Attributes, AttributesExt, Variable};

use crate::error::{Result, ValidatorError};

/// Pseudo attribute standing for the entity's own name.
pub const NAME_ATTR: &str = "name";

pub const LAT_UNITS: &[&str] = &["degrees_north", "degree_north", "degrees_n", "degree_n", "deg_n"];
pub const LON_UNITS: &[&str] = &["degrees_east", "degree_east", "degrees_e", "degree_e", "deg_e"];
pub const LINEAR_UNITS: &[&str] = &[
    "m",
    "meter",
    "meters",
    "metre",
    "metres",
    "km",
    "kilometer",
    "kilometers",
    "kilometre",
    "kilometres",
];

/// Normalise an attribute value for comparison: `axis` compares upper-case,
/// everything else lower-case, both trimmed.
pub fn normalize(attr: &str, value: &str) -> String {
    if attr == "axis" {
        value.trim().to_uppercase()
    } else {
        value.trim().to_lowercase()
    }
}

/// A conjunction of attribute constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    constraints: Vec<(String, Vec<String>)>,
}

impl Clause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `attr` to take one of `values`.
    pub fn require(mut self, attr: &str, values: &[&str]) -> Self {
        let allowed = values.iter().map(|v| normalize(attr, v)).collect();
        self.constraints.push((attr.to_string(), allowed));
        self
    }

    /// Whether every constraint holds. A clause without constraints never
    /// matches.
    pub fn matches(&self, name: &str, attrs: &Attributes) -> bool {
        if self.constraints.is_empty() {
            return false;
        }
        self.constraints.iter().all(|(attr, allowed)| {
            let value = if attr == NAME_ATTR {
                Some(name.to_string())
            } else {
                attrs.text(attr)
            };
            match value {
                Some(v) => allowed.contains(&normalize(attr, &v)),
                None => false,
            }
        })
    }
}

/// A category and the clauses that identify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub category: String,
    pub clauses: Vec<Clause>,
}

impl Rule {
    pub fn new(category: &str, clauses: Vec<Clause>) -> Self {
        Self {
            category: category.to_string(),
            clauses,
        }
    }

    pub fn matches(&self, name: &str, attrs: &Attributes) -> bool {
        self.clauses.iter().any(|c| c.matches(name, attrs))
    }
}

/// Immutable set of rules keyed by category.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The CF coordinate rules (`lat`, `lon`, `x`, `y`, `time`).
    pub fn coordinates() -> &'static RuleCatalog {
        static CATALOG: OnceLock<RuleCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            RuleCatalog::new(vec![
                Rule::new(
                    "lat",
                    vec![
                        Clause::new().require("standard_name", &["latitude"]),
                        Clause::new().require("axis", &["Y"]).require("units", LAT_UNITS),
                        Clause::new().require(NAME_ATTR, &["lat", "latitude"]),
                    ],
                ),
                Rule::new(
                    "lon",
                    vec![
                        Clause::new().require("standard_name", &["longitude"]),
                        Clause::new().require("axis", &["X"]).require("units", LON_UNITS),
                        Clause::new().require(NAME_ATTR, &["lon", "longitude"]),
                    ],
                ),
                Rule::new(
                    "x",
                    vec![
                        Clause::new().require("standard_name", &["projection_x_coordinate"]),
                        Clause::new().require("axis", &["X"]).require("units", LINEAR_UNITS),
                        Clause::new().require(NAME_ATTR, &["x", "easting"]),
                    ],
                ),
                Rule::new(
                    "y",
                    vec![
                        Clause::new().require("standard_name", &["projection_y_coordinate"]),
                        Clause::new().require("axis", &["Y"]).require("units", LINEAR_UNITS),
                        Clause::new().require(NAME_ATTR, &["y", "northing"]),
                    ],
                ),
                Rule::new(
                    "time",
                    vec![
                        Clause::new().require("standard_name", &["time"]),
                        Clause::new().require("axis", &["T"]),
                        Clause::new().require(NAME_ATTR, &["time"]),
                    ],
                ),
            ])
        })
    }

    pub fn rule(&self, category: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.category == category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.category.as_str())
    }

    /// Names of the entities matching `category`, in iteration order.
    pub fn find_matches<'a, I>(&self, entities: I, category: &str) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = &'a Variable>,
    {
        let rule = self
            .rule(category)
            .ok_or_else(|| ValidatorError::catalog(format!("no rule defined for category '{category}'")))?;
        Ok(entities
            .into_iter()
            .filter(|v| rule.matches(&v.name, &v.attrs))
            .map(|v| v.name.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlcast_common::VariableRole;
    use serde_json::json;

    fn coord(name: &str, attrs: &[(&str, &str)]) -> Variable {
        let mut v = Variable::new(name, VariableRole::Coordinate);
        for (k, val) in attrs {
            v.attrs.insert(k.to_string(), json!(val));
        }
        v
    }

    fn matches(category: &str, v: &Variable) -> bool {
        RuleCatalog::coordinates()
            .rule(category)
            .unwrap()
            .matches(&v.name, &v.attrs)
    }

    #[test]
    fn test_bare_name_matches() {
        assert!(matches("lat", &coord("latitude", &[])));
        assert!(matches("lon", &coord("LON", &[])));
        assert!(!matches("lat", &coord("rlat", &[])));
    }

    #[test]
    fn test_standard_name_wins_over_name() {
        assert!(matches("lat", &coord("nav_lat", &[("standard_name", "latitude")])));
        assert!(matches("time", &coord("valid", &[("standard_name", " Time ")])));
    }

    #[test]
    fn test_axis_and_units_are_normalised() {
        let c = coord("phi", &[("axis", "y"), ("units", "degrees_North")]);
        assert!(matches("lat", &c));
        assert!(!matches("y", &c));
    }

    #[test]
    fn test_clause_requires_all_constraints() {
        // axis alone is not enough for lat
        assert!(!matches("lat", &coord("phi", &[("axis", "Y")])));
        assert!(matches("y", &coord("north", &[("axis", "Y"), ("units", "km")])));
    }

    #[test]
    fn test_empty_clause_never_matches() {
        let rule = Rule::new("any", vec![Clause::new()]);
        assert!(!rule.matches("x", &Attributes::new()));
    }

    #[test]
    fn test_find_matches_keeps_input_order() {
        let vars = vec![
            coord("y", &[]),
            coord("lat", &[("standard_name", "latitude")]),
            coord("latitude", &[]),
            coord("x", &[]),
        ];
        let found = RuleCatalog::coordinates().find_matches(&vars, "lat").unwrap();
        assert_eq!(found, vec!["lat", "latitude"]);
    }

    #[test]
    fn test_find_matches_unknown_category() {
        let vars: Vec<Variable> = Vec::new();
        let err = RuleCatalog::coordinates().find_matches(&vars, "height").unwrap_err();
        assert!(matches!(err, ValidatorError::Catalog(_)));
    }
}

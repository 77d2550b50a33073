//! Physical variables known to the naming and units checks.

/// Naming and unit constraints of one CF standard name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfVariableSpec {
    pub standard_name: &'static str,
    /// Variable names accepted for this quantity (CF or ECMWF short names).
    pub aliases: &'static [&'static str],
    pub units: &'static [&'static str],
    pub canonical_unit: &'static str,
}

impl CfVariableSpec {
    /// Case-insensitive alias check.
    pub fn allows_name(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.aliases.iter().any(|a| *a == name)
    }

    /// Units are case significant (`dBZ`), only surrounding whitespace is ignored.
    pub fn allows_unit(&self, units: &str) -> bool {
        self.units.contains(&units.trim())
    }

    pub fn is_canonical_unit(&self, units: &str) -> bool {
        units.trim() == self.canonical_unit
    }
}

const RATE_UNITS: &[&str] = &["kg m-2 h-1", "mm h-1", "mm/h"];
const AMOUNT_ALIASES: &[&str] = &["rainfall_amount", "mm", "precipitation_amount", "tp"];
const AMOUNT_UNITS: &[&str] = &["kg m-2", "mm"];

pub static CF_VARIABLES: &[CfVariableSpec] = &[
    CfVariableSpec {
        standard_name: "rainfall_flux",
        aliases: &["mmh", "rr", "rain_rate", "rainfall_rate", "rainfall_flux"],
        units: RATE_UNITS,
        canonical_unit: "kg m-2 h-1",
    },
    CfVariableSpec {
        standard_name: "precipitation_flux",
        aliases: &["tprate", "prate"],
        units: RATE_UNITS,
        canonical_unit: "kg m-2 h-1",
    },
    CfVariableSpec {
        standard_name: "equivalent_reflectivity_factor",
        aliases: &["equivalent_reflectivity_factor", "dbz", "rare"],
        units: &["dBZ"],
        canonical_unit: "dBZ",
    },
    CfVariableSpec {
        standard_name: "precipitation_amount",
        aliases: AMOUNT_ALIASES,
        units: AMOUNT_UNITS,
        canonical_unit: "kg m-2",
    },
    CfVariableSpec {
        standard_name: "rainfall_amount",
        aliases: AMOUNT_ALIASES,
        units: AMOUNT_UNITS,
        canonical_unit: "kg m-2",
    },
];

/// Look up a standard name (trimmed, case-insensitive).
pub fn lookup(standard_name: &str) -> Option<&'static CfVariableSpec> {
    let key = standard_name.trim().to_lowercase();
    CF_VARIABLES.iter().find(|s| s.standard_name == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(" Rainfall_Flux ").map(|s| s.canonical_unit), Some("kg m-2 h-1"));
        assert!(lookup("air_temperature").is_none());
    }

    #[test]
    fn test_units_are_case_sensitive() {
        let dbz = lookup("equivalent_reflectivity_factor").unwrap();
        assert!(dbz.allows_unit("dBZ"));
        assert!(!dbz.allows_unit("dbz"));
        assert!(dbz.allows_name("DBZ"));
    }

    #[test]
    fn test_rate_units() {
        let rr = lookup("rainfall_flux").unwrap();
        assert!(rr.allows_unit(" mm/h "));
        assert!(!rr.is_canonical_unit("mm/h"));
        assert!(rr.is_canonical_unit("kg m-2 h-1"));
        assert!(!rr.allows_unit("in/h"));
    }
}

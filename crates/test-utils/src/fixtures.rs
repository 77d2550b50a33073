//! Common test fixtures for MLCast validator tests.
//!
//! This module provides pre-defined attribute values that represent common
//! scenarios in radar composite datasets.

/// CRS definitions for testing.
pub mod crs {
    /// ETRS89 / LAEA Europe (EPSG:3035) as WKT2, including a BBOX.
    pub const LAEA_EUROPE_WKT: &str = concat!(
        r#"PROJCRS["ETRS89-extended / LAEA Europe","#,
        r#"BASEGEOGCRS["ETRS89",DATUM["European Terrestrial Reference System 1989","#,
        r#"ELLIPSOID["GRS 1980",6378137,298.257222101,LENGTHUNIT["metre",1]]],"#,
        r#"PRIMEM["Greenwich",0,ANGLEUNIT["degree",0.0174532925199433]]],"#,
        r#"CONVERSION["Europe Equal Area 2001",METHOD["Lambert Azimuthal Equal Area",ID["EPSG",9820]],"#,
        r#"PARAMETER["Latitude of natural origin",52,ANGLEUNIT["degree",0.0174532925199433]],"#,
        r#"PARAMETER["Longitude of natural origin",10,ANGLEUNIT["degree",0.0174532925199433]],"#,
        r#"PARAMETER["False easting",4321000,LENGTHUNIT["metre",1]],"#,
        r#"PARAMETER["False northing",3210000,LENGTHUNIT["metre",1]]],"#,
        r#"CS[Cartesian,2],AXIS["northing (Y)",north,LENGTHUNIT["metre",1]],"#,
        r#"AXIS["easting (X)",east,LENGTHUNIT["metre",1]],"#,
        r#"USAGE[SCOPE["Statistical mapping."],BBOX[27.6,-35.58,81.91,44.83]],"#,
        r#"ID["EPSG",3035]]"#
    );

    /// WGS 84 (EPSG:4326) as WKT1, without a BBOX.
    pub const WGS84_WKT1: &str = concat!(
        r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,"#,
        r#"AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0],"#,
        r#"UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#
    );

    /// Truncated WKT with unbalanced brackets.
    pub const BROKEN_WKT: &str = r#"PROJCRS["broken",BASEGEOGCRS["ETRS89""#;
}

/// MLCast provenance attribute values for testing.
pub mod provenance {
    pub const CREATED_ON: &str = "2025-01-15T10:00:00Z";
    pub const CREATED_BY: &str = "Jane Doe <jane.doe@example.org>";
    pub const CREATED_WITH: &str =
        "https://github.com/mlcast-community/mlcast-dataset-dk-dmi-radar@v0.1.0";
    pub const DATASET_VERSION: &str = "0.1.0";
    pub const SOURCE_ORG_ID: &str = "DK-DMI";

    /// Repository path of [`CREATED_WITH`].
    pub const REPOSITORY: (&str, &str) = ("mlcast-community", "mlcast-dataset-dk-dmi-radar");
    /// Revision of [`CREATED_WITH`].
    pub const REVISION: &str = "v0.1.0";
}

/// Common time values for testing.
pub mod time {
    /// Epoch of the fixture time coordinates.
    pub const EPOCH: &str = "2020-01-01 00:00:00";

    /// Time units of the fixture time coordinates.
    pub const UNITS: &str = "minutes since 2020-01-01 00:00:00";

    /// Hourly steps covering a little over three years.
    pub const THREE_YEARS_HOURLY: usize = 3 * 8766 + 240;
}

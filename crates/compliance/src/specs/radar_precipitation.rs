//! `source_data/radar_precipitation`: 2-D radar precipitation and
//! reflectivity composites.

use crate::checks::{
    CartopyCheck, ChunkingCheck, CompressionCheck, ConditionalAttributesCheck, CoordinateRequirements,
    CoordinatesCheck, DataStructureCheck, FutureTimestepCheck, GdalCheck, GeoreferencingCheck, LicensingCheck,
    MlcastMetadataCheck, NamingCheck, RasterRoundTripCheck, SpatialCheck, TemporalCheck, TriggerRegistry,
    VariableTimestepCheck, ZarrFormatCheck,
};
use crate::error::Result;
use crate::pipeline::Pipeline;

use super::ProductSpec;

pub const STAGE: &str = "source_data";
pub const PRODUCT: &str = "radar_precipitation";

pub const SPEC: ProductSpec = ProductSpec {
    stage: STAGE,
    product: PRODUCT,
    default_version: "0.2.0",
    versions: &[("0.1.0", v0_1_0), ("0.2.0", v0_2_0)],
};

// 3. Coordinates
pub const MAX_FUTURE_YEAR: i32 = 2050;
pub const MAX_RESOLUTION_KM: f64 = 1.0;
pub const MIN_CROP_SIZE: (u64, u64) = (256, 256);
pub const MIN_YEARS: u32 = 3;
pub const ALLOW_VARIABLE_TIMESTEP: bool = true;

// 4. Data variables
pub const TIME_CHUNKSIZE: u64 = 1;
pub const RECOMMENDED_COMPRESSION: &str = "zstd";
pub const COORDINATE_COMPRESSION: &[&str] = &["lz4"];
pub const DIM_ORDER: &[&str] = &["time", "y", "x"];
pub const ALLOWED_DTYPES: &[&str] = &["float16", "float32", "float64"];
pub const ALLOWED_STANDARD_NAMES: &[&str] = &[
    "rainfall_flux",
    "precipitation_flux",
    "equivalent_reflectivity_factor",
    "precipitation_amount",
    "rainfall_amount",
];
pub const CRS_ATTRS: &[&str] = &["spatial_ref", "crs_wkt"];

// 5. Global attributes
pub const CONDITIONAL_ATTRS: &[&str] = &["consistent_timestep_start", "last_valid_timestep"];
pub const RECOMMENDED_LICENSES: &[&str] = &["CC-BY-4.0", "CC-BY-SA-4.0", "OGL-UK-3.0", "OGL-Canada-2.0"];
pub const RESTRICTED_LICENSE_TOKENS: &[&str] = &["NC", "ND"];
pub const ZARR_VERSIONS: &[u8] = &[2, 3];

/// Sections 3 to 5, shared by every version.
fn core(version: &str, coordinates: CoordinateRequirements) -> Result<Pipeline> {
    Ok(Pipeline::new(STAGE, PRODUCT, version)
        .with_check(CoordinatesCheck::new(coordinates)?)
        .with_check(FutureTimestepCheck::new(MAX_FUTURE_YEAR))
        .with_check(SpatialCheck::new(MAX_RESOLUTION_KM, MIN_CROP_SIZE)?)
        .with_check(TemporalCheck::new(MIN_YEARS))
        .with_check(VariableTimestepCheck::new(ALLOW_VARIABLE_TIMESTEP))
        .with_check(ChunkingCheck::new(TIME_CHUNKSIZE))
        .with_check(CompressionCheck::new(true, RECOMMENDED_COMPRESSION, COORDINATE_COMPRESSION))
        .with_check(DataStructureCheck::new(DIM_ORDER, ALLOWED_DTYPES))
        .with_check(NamingCheck::new(ALLOWED_STANDARD_NAMES)?)
        .with_check(GeoreferencingCheck::new(true, CRS_ATTRS))
        .with_check(ConditionalAttributesCheck::new(
            CONDITIONAL_ATTRS,
            &TriggerRegistry::standard(),
        )?)
        .with_check(LicensingCheck::new(true, RECOMMENDED_LICENSES, RESTRICTED_LICENSE_TOKENS))
        .with_check(ZarrFormatCheck::new(ZARR_VERSIONS, true)))
}

/// Time and projected coordinates.
pub fn v0_1_0() -> Result<Pipeline> {
    core(
        "0.1.0",
        CoordinateRequirements {
            time: true,
            projected: true,
            latlon: false,
        },
    )
}

/// Adds lat/lon coordinates, tool compatibility (section 6) and MLCast
/// provenance attributes.
pub fn v0_2_0() -> Result<Pipeline> {
    let coordinates = CoordinateRequirements {
        time: true,
        projected: true,
        latlon: true,
    };
    Ok(core("0.2.0", coordinates)?
        .with_check(MlcastMetadataCheck::new()?)
        .with_check(GdalCheck::new())
        .with_check(RasterRoundTripCheck::new())
        .with_check(CartopyCheck::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_build() {
        let old = v0_1_0().unwrap();
        let new = v0_2_0().unwrap();
        assert_eq!(old.len(), 13);
        assert_eq!(new.len(), 17);
        assert_eq!(new.identity(), "source_data/radar_precipitation@0.2.0");
    }

    #[test]
    fn test_newer_version_only_appends() {
        let old = v0_1_0().unwrap();
        let new = v0_2_0().unwrap();
        assert_eq!(&new.check_ids()[..old.len()], old.check_ids().as_slice());
        assert_eq!(
            &new.check_ids()[old.len()..],
            ["mlcast_metadata", "gdal", "raster_roundtrip", "cartopy"]
        );
    }

    #[test]
    fn test_default_version_is_published() {
        assert!(SPEC.builder(SPEC.default_version).is_some());
        assert_eq!(SPEC.version_ids(), vec!["0.1.0", "0.2.0"]);
    }
}

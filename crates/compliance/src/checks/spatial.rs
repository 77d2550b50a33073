//! Spatial resolution and crop support (section 3.3).

use async_trait::async_trait;
use mlcast_common::{AttributesExt, Dataset, Variable};

use super::{require_categories, time_coordinate, Check, CheckContext};
use crate::error::Result;
use crate::report::{Report, Status};
use crate::rules::RuleCatalog;

const SECTION: &str = "3.3";
const KM_UNITS: &[&str] = &["km", "kilometer", "kilometers", "kilometre", "kilometres"];
const TIME_DIMS: &[&str] = &["time", "t"];

pub struct SpatialCheck {
    max_resolution_km: f64,
    /// Minimum crop as (height, width) in pixels.
    min_crop: (u64, u64),
}

impl SpatialCheck {
    pub fn new(max_resolution_km: f64, min_crop: (u64, u64)) -> Result<Self> {
        require_categories(RuleCatalog::coordinates(), &["x", "y"])?;
        Ok(Self {
            max_resolution_km,
            min_crop,
        })
    }

    fn resolution_requirement(&self) -> String {
        format!("Spatial resolution ≤{}km", self.max_resolution_km)
    }

    fn crop_requirement(&self) -> String {
        format!("{}×{} pixel support", self.min_crop.0, self.min_crop.1)
    }

    fn resolution(&self, dataset: &Dataset, report: &mut Report) {
        let Some(x) = projected_axis(dataset, "x") else { return };
        let Some(y) = projected_axis(dataset, "y") else { return };
        let requirement = self.resolution_requirement();

        match (axis_step_m(x), axis_step_m(y)) {
            (Ok(x_res), Ok(y_res)) => {
                let limit = self.max_resolution_km * 1000.0;
                if x_res <= limit && y_res <= limit {
                    report.add(
                        SECTION,
                        requirement,
                        Status::Pass,
                        format!("Resolution ({x_res:.1}m × {y_res:.1}m) ≤ {}km", self.max_resolution_km),
                    );
                } else {
                    report.add(
                        SECTION,
                        requirement,
                        Status::Fail,
                        format!(
                            "Resolution ({x_res:.1}m × {y_res:.1}m) exceeds {}km limit",
                            self.max_resolution_km
                        ),
                    );
                }
            }
            (Err(e), _) | (_, Err(e)) => report.add(
                SECTION,
                requirement,
                Status::Warning,
                format!("Could not verify spatial resolution: {e}"),
            ),
        }
    }
}

/// First 1-D coordinate of `category` with more than one element.
fn projected_axis<'a>(dataset: &'a Dataset, category: &str) -> Option<&'a Variable> {
    let names = RuleCatalog::coordinates()
        .find_matches(dataset.coords(), category)
        .unwrap_or_default();
    names
        .iter()
        .filter_map(|name| dataset.coord(name))
        .find(|v| v.shape.len() == 1 && v.shape[0] > 1)
}

/// Absolute step between the first two samples, in metres.
fn axis_step_m(axis: &Variable) -> std::result::Result<f64, String> {
    let values = axis
        .values
        .as_deref()
        .ok_or_else(|| format!("values of coordinate '{}' were not loaded", axis.name))?;
    let [first, second, ..] = values else {
        return Err(format!("coordinate '{}' has fewer than two values", axis.name));
    };
    let step = (second - first).abs();
    let in_km = axis
        .attrs
        .text("units")
        .map(|u| KM_UNITS.contains(&u.trim().to_lowercase().as_str()))
        .unwrap_or(false);
    Ok(if in_km { step * 1000.0 } else { step })
}

#[async_trait]
impl Check for SpatialCheck {
    fn id(&self) -> &str {
        "spatial"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        format!(
            "Resolution at most {}km and support for {}×{} pixel crops",
            self.max_resolution_km, self.min_crop.0, self.min_crop.1
        )
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        self.resolution(dataset, &mut report);

        let (h, w) = self.min_crop;
        let crop = self.crop_requirement();
        let time_dim = time_coordinate(dataset).and_then(|t| t.dims.first());
        for var in dataset.qualifying_data_vars() {
            let spatial: Vec<usize> = var
                .dims
                .iter()
                .enumerate()
                .filter(|(_, d)| !TIME_DIMS.contains(&d.as_str()) && Some(*d) != time_dim)
                .map(|(i, _)| i)
                .collect();
            if spatial.len() < 2 {
                report.add(
                    SECTION,
                    "Spatial dimension check",
                    Status::Fail,
                    format!("Need at least 2 spatial dimensions for {} ({:?})", var.name, var.dims),
                );
                continue;
            }
            let sizes: Vec<u64> = spatial.iter().filter_map(|&i| var.shape.get(i).copied()).collect();
            // Trailing dims are (rows, cols); every other non-time dim must
            // still hold the smaller crop side.
            let fits = match sizes.as_slice() {
                [leading @ .., rows, cols] => {
                    *rows >= h && *cols >= w && leading.iter().all(|&s| s >= h.min(w))
                }
                _ => false,
            };
            if fits {
                report.add(
                    SECTION,
                    crop.as_str(),
                    Status::Pass,
                    format!("Spatial dimensions {sizes:?} support {h}×{w} crops"),
                );
            } else {
                report.add(
                    SECTION,
                    crop.as_str(),
                    Status::Fail,
                    format!("Spatial dimensions {sizes:?} too small for {h}×{w} crops"),
                );
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;
    use crate::oracle::StaticRepositoryOracle;
    use serde_json::json;
    use std::sync::Arc;
    use test_utils::{compliant_radar_dataset, projected_coordinate, rainfall_variable, DatasetBuilder};

    fn ctx() -> CheckContext {
        CheckContext::new(Capabilities::none(), Arc::new(StaticRepositoryOracle::new()))
    }

    fn check() -> SpatialCheck {
        SpatialCheck::new(1.0, (256, 256)).unwrap()
    }

    #[tokio::test]
    async fn test_compliant_grid() {
        let report = check().evaluate(&compliant_radar_dataset(), &ctx()).await;
        assert!(report.ok());
        assert_eq!(report.findings()[0].detail, "Resolution (1000.0m × 1000.0m) ≤ 1km");
        assert_eq!(
            report.findings()[1].detail,
            "Spatial dimensions [300, 300] support 256×256 crops"
        );
    }

    #[tokio::test]
    async fn test_coarse_grid_in_km() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .map_variable("x", |v| {
                v.attrs.insert("units".into(), json!("km"));
                v.values = Some(vec![0.0, 2.0, 4.0]);
                v.shape = vec![3];
            })
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        let res = report.by_requirement("Spatial resolution ≤1km").next().unwrap();
        assert_eq!(res.status, Status::Fail);
        assert_eq!(res.detail, "Resolution (2000.0m × 1000.0m) exceeds 1km limit");
    }

    #[tokio::test]
    async fn test_unloaded_axis_warns() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .map_variable("y", |v| v.values = None)
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        let res = report.by_requirement("Spatial resolution ≤1km").next().unwrap();
        assert_eq!(res.status, Status::Warning);
        assert!(res.detail.starts_with("Could not verify spatial resolution: "));
    }

    #[tokio::test]
    async fn test_small_grid_fails() {
        let ds = DatasetBuilder::new("mem://")
            .variable(projected_coordinate("y", 128, 1000.0))
            .variable(projected_coordinate("x", 512, 1000.0))
            .variable(rainfall_variable("rr", 4, 128, 512))
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        let crop = report.by_requirement("256×256 pixel support").next().unwrap();
        assert_eq!(crop.status, Status::Fail);
        assert_eq!(crop.detail, "Spatial dimensions [128, 512] too small for 256×256 crops");
    }

    #[tokio::test]
    async fn test_every_non_time_dimension_is_checked() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .map_variable("rr", |v| {
                v.dims = vec!["time".into(), "level".into(), "y".into(), "x".into()];
                v.shape = vec![10, 3, 300, 300];
            })
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        let crop = report.by_requirement("256×256 pixel support").next().unwrap();
        assert_eq!(crop.status, Status::Fail);
        assert_eq!(crop.detail, "Spatial dimensions [3, 300, 300] too small for 256×256 crops");
    }

    #[tokio::test]
    async fn test_requirement_names_bound_constants() {
        let report = SpatialCheck::new(2.5, (128, 64))
            .unwrap()
            .evaluate(&compliant_radar_dataset(), &ctx())
            .await;
        assert_eq!(report.findings()[0].requirement, "Spatial resolution ≤2.5km");
        assert_eq!(report.findings()[1].requirement, "128×64 pixel support");
        assert!(report.ok());
    }

    #[tokio::test]
    async fn test_renamed_time_dimension_is_not_spatial() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .map_variable("time", |v| {
                v.name = "valid_time".into();
                v.dims = vec!["valid_time".into()];
            })
            .map_variable("rr", |v| v.dims[0] = "valid_time".into())
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        assert_eq!(
            report.by_requirement("256×256 pixel support").next().unwrap().detail,
            "Spatial dimensions [300, 300] support 256×256 crops"
        );
    }

    #[tokio::test]
    async fn test_one_spatial_dimension() {
        let ds = DatasetBuilder::new("mem://")
            .variable(rainfall_variable("rr", 4, 300, 300))
            .map_variable("rr", |v| {
                v.dims = vec!["time".into(), "cell".into()];
                v.shape = vec![4, 90000];
            })
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        assert_eq!(
            report.findings()[0].detail,
            "Need at least 2 spatial dimensions for rr ([\"time\", \"cell\"])"
        );
    }
}

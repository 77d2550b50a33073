//! Dimension order and dtype (section 4.3).

use async_trait::async_trait;
use mlcast_common::Dataset;

use super::{quoted_list, Check, CheckContext};
use crate::report::{Report, Status};

const SECTION: &str = "4.3";

pub struct DataStructureCheck {
    dim_order: Vec<String>,
    allowed_dtypes: Vec<String>,
}

impl DataStructureCheck {
    pub fn new(dim_order: &[&str], allowed_dtypes: &[&str]) -> Self {
        Self {
            dim_order: dim_order.iter().map(|d| d.to_string()).collect(),
            allowed_dtypes: allowed_dtypes.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Check for DataStructureCheck {
    fn id(&self) -> &str {
        "data_structure"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        format!(
            "Dimension order {} with dtype in {}",
            quoted_list(&self.dim_order),
            quoted_list(&self.allowed_dtypes)
        )
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        let expected = quoted_list(&self.dim_order);

        for var in dataset.qualifying_data_vars() {
            let order = format!("Dimension order for {}", var.name);
            if var.dims == self.dim_order {
                report.add(SECTION, order, Status::Pass, format!("Dimension order matches {expected}"));
            } else {
                report.add(
                    SECTION,
                    order,
                    Status::Fail,
                    format!("Expected dimension order {expected}, found {}", quoted_list(&var.dims)),
                );
            }

            let dtype = format!("Data type for {}", var.name);
            if self.allowed_dtypes.contains(&var.dtype) {
                report.add(SECTION, dtype, Status::Pass, format!("Data type '{}' is allowed", var.dtype));
            } else {
                report.add(
                    SECTION,
                    dtype,
                    Status::Fail,
                    format!(
                        "Data type '{}' is not allowed. Allowed types: {}",
                        var.dtype,
                        quoted_list(&self.allowed_dtypes)
                    ),
                );
            }
        }
        report
    }
}

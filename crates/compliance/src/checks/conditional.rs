//! Conditionally required global attributes (section 5.1).
//!
//! Each attribute is paired with a trigger computed from dataset content.
//! When the trigger fires the attribute becomes required; when it does not,
//! nothing is reported.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use mlcast_common::Dataset;
use tracing::{debug, warn};

use super::{time_coordinate, Check, CheckContext};
use crate::error::{Result, ValidatorError};
use crate::report::{Report, Status};

const SECTION: &str = "5.1";

/// Outcome of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Required,
    NotRequired,
    /// The condition cannot be decided yet; carries the reason.
    Unresolved(&'static str),
}

pub type TriggerFn = fn(&Dataset, &CheckContext) -> Trigger;

/// Attribute name to trigger mapping.
#[derive(Clone, Default)]
pub struct TriggerRegistry {
    triggers: BTreeMap<String, TriggerFn>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The triggers of the published products.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("consistent_timestep_start", variable_timesteps);
        registry.register("last_valid_timestep", future_timesteps);
        registry
    }

    pub fn register(&mut self, attr: &str, trigger: TriggerFn) {
        self.triggers.insert(attr.to_string(), trigger);
    }

    pub fn get(&self, attr: &str) -> Option<TriggerFn> {
        self.triggers.get(attr).copied()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.triggers.keys().map(String::as_str)
    }
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.triggers.keys()).finish()
    }
}

/// Required when the time coordinate has more than one distinct interval.
fn variable_timesteps(dataset: &Dataset, ctx: &CheckContext) -> Trigger {
    let Some(time) = time_coordinate(dataset) else {
        return Trigger::NotRequired;
    };
    match ctx.timesteps.analyze(time) {
        Ok(analysis) if analysis.is_variable => Trigger::Required,
        Ok(_) => Trigger::NotRequired,
        Err(e) => {
            debug!(error = %e, "Timestep analysis failed, treating attribute as not required");
            Trigger::NotRequired
        }
    }
}

fn future_timesteps(_dataset: &Dataset, _ctx: &CheckContext) -> Trigger {
    Trigger::Unresolved("detection of future timesteps for this attribute is not implemented")
}

pub struct ConditionalAttributesCheck {
    attrs: Vec<(String, TriggerFn)>,
}

impl ConditionalAttributesCheck {
    /// Bind each attribute to its trigger. An attribute without a registered
    /// trigger is a catalog error.
    pub fn new(attrs: &[&str], registry: &TriggerRegistry) -> Result<Self> {
        let attrs = attrs
            .iter()
            .map(|attr| {
                registry
                    .get(attr)
                    .map(|trigger| (attr.to_string(), trigger))
                    .ok_or_else(|| {
                        ValidatorError::catalog(format!(
                            "conditional attribute check for '{attr}' is not implemented"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { attrs })
    }
}

#[async_trait]
impl Check for ConditionalAttributesCheck {
    fn id(&self) -> &str {
        "conditional_attributes"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.attrs.iter().map(|(a, _)| a.as_str()).collect();
        format!("Conditionally required global attributes: {}", names.join(", "))
    }

    async fn evaluate(&self, dataset: &Dataset, ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        for (attr, trigger) in &self.attrs {
            let requirement = format!("Conditional global attribute '{attr}'");
            match trigger(dataset, ctx) {
                Trigger::NotRequired => {}
                Trigger::Required if dataset.attrs.contains_key(attr) => report.add(
                    SECTION,
                    requirement,
                    Status::Pass,
                    format!("Global attribute '{attr}' is present"),
                ),
                Trigger::Required => report.add(
                    SECTION,
                    requirement,
                    Status::Fail,
                    format!("Global attribute '{attr}' is required but not present"),
                ),
                Trigger::Unresolved(reason) => {
                    warn!(attr = %attr, reason, "Conditional requirement unresolved");
                    report.add(
                        SECTION,
                        requirement,
                        Status::Warning,
                        format!("Could not determine whether '{attr}' is required: {reason}"),
                    );
                }
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
    use test_utils::{regular_minutes, time_coordinate as time_coord, DatasetBuilder};

    fn ctx() -> CheckContext {
        CheckContext::new(Capabilities::none(), Arc::new(StaticRepositoryOracle::new()))
    }

    fn check(attrs: &[&str]) -> ConditionalAttributesCheck {
        ConditionalAttributesCheck::new(attrs, &TriggerRegistry::standard()).unwrap()
    }

    #[tokio::test]
    async fn test_not_required_emits_nothing() {
        let ds = DatasetBuilder::new("mem://")
            .variable(time_coord(&regular_minutes(6, 5.0)))
            .build();
        let report = check(&["consistent_timestep_start"]).evaluate(&ds, &ctx()).await;
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_required_when_variable() {
        let builder = DatasetBuilder::new("mem://").variable(time_coord(&[0.0, 5.0, 15.0]));
        let missing = check(&["consistent_timestep_start"])
            .evaluate(&builder.clone().build(), &ctx())
            .await;
        assert_eq!(
            missing.findings()[0].detail,
            "Global attribute 'consistent_timestep_start' is required but not present"
        );

        let present = builder.attr("consistent_timestep_start", json!("2020-01-01T00:00:00Z")).build();
        let report = check(&["consistent_timestep_start"]).evaluate(&present, &ctx()).await;
        assert_eq!(report.findings()[0].status, Status::Pass);
    }

    #[tokio::test]
    async fn test_unresolved_trigger_warns() {
        let report = check(&["last_valid_timestep"])
            .evaluate(&Dataset::new("mem://"), &ctx())
            .await;
        assert_eq!(report.len(), 1);
        assert_eq!(report.findings()[0].status, Status::Warning);
        assert_eq!(
            report.findings()[0].requirement,
            "Conditional global attribute 'last_valid_timestep'"
        );
    }

    #[test]
    fn test_unknown_attribute_is_a_catalog_error() {
        let err = ConditionalAttributesCheck::new(&["consistent_timestep_start", "frobnicate"], &TriggerRegistry::standard())
            .err()
            .unwrap();
        assert!(err.to_string().contains("'frobnicate'"));
    }

    #[tokio::test]
    async fn test_custom_trigger() {
        fn always(_: &Dataset, _: &CheckContext) -> Trigger {
            Trigger::Required
        }
        let mut registry = TriggerRegistry::new();
        registry.register("institution", always);
        let check = ConditionalAttributesCheck::new(&["institution"], &registry).unwrap();
        assert!(check.evaluate(&Dataset::new("mem://"), &ctx()).await.has_fails());
    }
}

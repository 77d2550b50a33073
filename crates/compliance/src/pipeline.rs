//! Versioned, ordered composition of checks.
//!
//! A [`Pipeline`] is a fixed list of checks for one `stage/product@version`.
//! Running it folds the partial reports of its checks, in definition order,
//! into one report. Each finding is stamped with the id of the check that
//! produced it.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use mlcast_common::Dataset;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::checks::{Check, CheckContext};
use crate::report::{Report, Status};

/// One line of a requirement listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementListing {
    pub section: String,
    pub check: String,
    pub description: String,
}

impl fmt::Display for RequirementListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6} {:<22} {}", self.section, self.check, self.description)
    }
}

#[derive(Clone)]
pub struct Pipeline {
    stage: String,
    product: String,
    version: String,
    checks: Vec<Arc<dyn Check>>,
    check_timeout: Option<Duration>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.checks.iter().map(|c| c.id()).collect();
        f.debug_struct("Pipeline")
            .field("identity", &self.identity())
            .field("checks", &ids)
            .field("check_timeout", &self.check_timeout)
            .finish()
    }
}

impl Pipeline {
    pub fn new(stage: impl Into<String>, product: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            product: product.into(),
            version: version.into(),
            checks: Vec::new(),
            check_timeout: None,
        }
    }

    /// Append a check; checks run in the order they are added.
    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn with_shared_check(mut self, check: Arc<dyn Check>) -> Self {
        self.checks.push(check);
        self
    }

    /// Bound the run time of every check. A check that overruns contributes
    /// a single WARNING instead of its findings.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `stage/product@version`
    pub fn identity(&self) -> String {
        format!("{}/{}@{}", self.stage, self.product, self.version)
    }

    pub fn check_ids(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// The ordered requirements of this pipeline. Touches no dataset.
    pub fn describe(&self) -> Vec<RequirementListing> {
        self.checks
            .iter()
            .map(|c| RequirementListing {
                section: c.section().to_string(),
                check: c.id().to_string(),
                description: c.describe(),
            })
            .collect()
    }

    /// Run every check in order.
    pub async fn run(&self, dataset: &Dataset, ctx: &CheckContext) -> Report {
        info!(pipeline = %self.identity(), dataset = %dataset.location, checks = self.checks.len(), "Validating dataset");
        let mut report = Report::new();
        for check in &self.checks {
            report += self.run_one(check.as_ref(), dataset, ctx).await;
        }
        report
    }

    /// Run every check concurrently. Partial reports are merged in
    /// definition order, so the result equals that of [`Pipeline::run`].
    pub async fn run_concurrent(&self, dataset: &Dataset, ctx: &CheckContext) -> Report {
        info!(
            pipeline = %self.identity(),
            dataset = %dataset.location,
            checks = self.checks.len(),
            "Validating dataset (concurrent)"
        );
        let partials = join_all(
            self.checks
                .iter()
                .map(|check| self.run_one(check.as_ref(), dataset, ctx)),
        )
        .await;
        partials.into_iter().fold(Report::new(), Report::merged)
    }

    /// Run checks in order until `token` is cancelled. The report holds the
    /// findings of every check that completed and is marked interrupted.
    pub async fn run_until_cancelled(
        &self,
        dataset: &Dataset,
        ctx: &CheckContext,
        token: &CancellationToken,
    ) -> Report {
        let mut report = Report::new();
        for (done, check) in self.checks.iter().enumerate() {
            if token.is_cancelled() {
                warn!(pipeline = %self.identity(), completed = done, "Validation cancelled");
                report.mark_interrupted();
                break;
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    warn!(
                        pipeline = %self.identity(),
                        check = %check.id(),
                        completed = done,
                        "Validation cancelled while a check was running"
                    );
                    report.mark_interrupted();
                    break;
                }
                partial = self.run_one(check.as_ref(), dataset, ctx) => {
                    report += partial;
                }
            }
        }
        report
    }

    /// Run every check concurrently until `token` is cancelled. Checks that
    /// completed before the cancellation keep their findings, merged in
    /// definition order; the report is then marked interrupted.
    pub async fn run_concurrent_until_cancelled(
        &self,
        dataset: &Dataset,
        ctx: &CheckContext,
        token: &CancellationToken,
    ) -> Report {
        info!(
            pipeline = %self.identity(),
            dataset = %dataset.location,
            checks = self.checks.len(),
            "Validating dataset (concurrent)"
        );
        let mut slots: Vec<Option<Report>> = vec![None; self.checks.len()];
        let mut pending: FuturesUnordered<_> = self
            .checks
            .iter()
            .enumerate()
            .map(|(idx, check)| async move { (idx, self.run_one(check.as_ref(), dataset, ctx).await) })
            .collect();

        let mut interrupted = false;
        while !pending.is_empty() {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    warn!(
                        pipeline = %self.identity(),
                        completed = slots.iter().flatten().count(),
                        running = pending.len(),
                        "Validation cancelled while checks were running"
                    );
                    interrupted = true;
                    break;
                }
                Some((idx, partial)) = pending.next() => {
                    slots[idx] = Some(partial);
                }
            }
        }
        drop(pending);

        let mut report = slots.into_iter().flatten().fold(Report::new(), Report::merged);
        if interrupted {
            report.mark_interrupted();
        }
        report
    }

    async fn run_one(&self, check: &dyn Check, dataset: &Dataset, ctx: &CheckContext) -> Report {
        let id = check.id();
        debug!(check = %id, section = %check.section(), "Running check");
        let start = Instant::now();

        let mut report = match self.check_timeout {
            Some(limit) => match tokio::time::timeout(limit, check.evaluate(dataset, ctx)).await {
                Ok(report) => report,
                Err(_) => {
                    warn!(check = %id, timeout_secs = limit.as_secs(), "Check timed out");
                    let mut timed_out = Report::new();
                    timed_out.add(
                        check.section(),
                        check.describe(),
                        Status::Warning,
                        format!(
                            "Could not verify: check did not complete within {}s",
                            limit.as_secs()
                        ),
                    );
                    timed_out
                }
            },
            None => check.evaluate(dataset, ctx).await,
        };
        report.stamp_source(id);

        let summary = report.summary();
        info!(
            check = %id,
            findings = report.len(),
            failed = summary.failed,
            warnings = summary.warnings,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Check completed"
        );
        report
    }
}

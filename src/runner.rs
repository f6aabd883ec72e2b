// src/runner.rs
// Seed, run every case in declaration order, tear down

use crate::assertions::{self, BodyChecks, BodyExpectation, Mismatch};
use crate::backend::ForumBackend;
use crate::fixtures::{self, FixtureSpec, Fixtures};
use crate::logger::{get_logger, LogLevel};
use crate::mutator::ConfigMutator;
use crate::probe::{Probe, ProbeError};
use crate::routes::{ConfigOverrides, ResolvedCase, RouteTable};
use crate::shutdown::CancelToken;
use crate::{log_error, log_info, log_warn};
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    Passed,
    Failed(Mismatch),
    /// Transport failure or configuration push failure.
    Errored(String),
    /// Not run because the suite was cancelled.
    Skipped,
}

impl CaseOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub name: String,
    pub path: String,
    pub expected_status: u16,
    pub body: BodyExpectation,
    pub given: ConfigOverrides,
    pub status: Option<u16>,
    pub elapsed: Option<Duration>,
    pub outcome: CaseOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownStatus {
    Completed,
    Failed(String),
    /// Nothing was seeded, so there was nothing to remove.
    NotNeeded,
}

#[derive(Debug, Clone)]
pub struct SuiteRun {
    pub started_at: DateTime<Local>,
    pub duration: Duration,
    pub fixtures: Option<Fixtures>,
    pub setup_error: Option<String>,
    pub cases: Vec<CaseResult>,
    pub teardown: TeardownStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl SuiteRun {
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for case in &self.cases {
            match case.outcome {
                CaseOutcome::Passed => counts.passed += 1,
                CaseOutcome::Failed(_) => counts.failed += 1,
                CaseOutcome::Errored(_) => counts.errored += 1,
                CaseOutcome::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    /// Setup succeeded and every case passed. Teardown does not count.
    pub fn is_success(&self) -> bool {
        self.setup_error.is_none() && self.cases.iter().all(|c| c.outcome.is_passed())
    }
}

pub struct Suite<'a, B, P> {
    backend: &'a B,
    probe: &'a P,
    base_url: String,
    table: RouteTable,
    fixtures: FixtureSpec,
    body_checks: BodyChecks,
    cancel: CancelToken,
}

impl<'a, B: ForumBackend, P: Probe> Suite<'a, B, P> {
    pub fn new(backend: &'a B, probe: &'a P, base_url: &str, table: RouteTable) -> Self {
        Suite {
            backend,
            probe,
            base_url: base_url.trim_end_matches('/').to_string(),
            table,
            fixtures: FixtureSpec::default(),
            body_checks: BodyChecks::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_fixtures(mut self, fixtures: FixtureSpec) -> Self {
        self.fixtures = fixtures;
        self
    }

    pub fn with_body_checks(mut self, body_checks: BodyChecks) -> Self {
        self.body_checks = body_checks;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Seed → cases → teardown. Teardown runs whenever seeding was attempted,
    /// including after a seed failure or cancellation.
    pub async fn run(&self) -> SuiteRun {
        let started_at = Local::now();
        let start = Instant::now();

        if let Err(e) = self.table.check_templates() {
            log_error!("{}", e);
            return SuiteRun {
                started_at,
                duration: start.elapsed(),
                fixtures: None,
                setup_error: Some(e.to_string()),
                cases: Vec::new(),
                teardown: TeardownStatus::NotNeeded,
            };
        }

        let mut mutator = ConfigMutator::new();
        let mut cases = Vec::new();
        let mut setup_error = None;

        let seeded = match fixtures::seed(self.backend, &self.fixtures).await {
            Ok(fixtures) => {
                log_info!(
                    "Seeded category {} ({}), user {} ({}), topic {}",
                    fixtures.cid,
                    fixtures.slug,
                    fixtures.uid,
                    fixtures.username,
                    fixtures.tid
                );
                Some(fixtures)
            }
            Err(e) => {
                log_error!("{}", e);
                setup_error = Some(e.to_string());
                None
            }
        };

        if let Some(ref fixtures) = seeded {
            match self.table.resolve(fixtures) {
                Ok(resolved) => {
                    for case in resolved {
                        let result = self.run_case(case, &mut mutator).await;
                        cases.push(result);
                    }
                }
                Err(e) => setup_error = Some(e.to_string()),
            }
        }

        let teardown = self.teardown(&mut mutator).await;

        SuiteRun {
            started_at,
            duration: start.elapsed(),
            fixtures: seeded,
            setup_error,
            cases,
            teardown,
        }
    }

    async fn run_case(&self, case: ResolvedCase, mutator: &mut ConfigMutator) -> CaseResult {
        let logger = get_logger();
        let mut result = CaseResult {
            name: case.name,
            path: case.path,
            expected_status: case.status,
            body: case.body,
            given: case.given,
            status: None,
            elapsed: None,
            outcome: CaseOutcome::Skipped,
        };

        if self.cancel.is_cancelled() {
            skip(&mut result, "run cancelled before this case started");
            return result;
        }

        if let Err(e) = mutator.apply(self.backend, &result.given).await {
            result.outcome = CaseOutcome::Errored(format!("could not apply configuration: {}", e));
            logger.probe(LogLevel::Error, &result.path, None, None, &result.name);
            logger.detail(&e.to_string());
            return result;
        }

        let url = format!("{}{}", self.base_url, result.path);
        match self.probe.get(&url).await {
            Ok(response) => {
                result.status = Some(response.status);
                result.elapsed = Some(response.elapsed);
                match assertions::check(
                    result.expected_status,
                    &result.body,
                    &response,
                    self.body_checks,
                ) {
                    Ok(()) => {
                        result.outcome = CaseOutcome::Passed;
                        logger.probe(
                            LogLevel::Pass,
                            &result.path,
                            result.status,
                            result.elapsed,
                            &result.name,
                        );
                    }
                    Err(mismatch) => {
                        logger.probe(
                            LogLevel::Fail,
                            &result.path,
                            result.status,
                            result.elapsed,
                            &result.name,
                        );
                        logger.detail(&mismatch.to_string());
                        result.outcome = CaseOutcome::Failed(mismatch);
                    }
                }
            }
            Err(ProbeError::Cancelled) => {
                skip(&mut result, "run cancelled while waiting for a response");
            }
            Err(e) => {
                logger.probe(LogLevel::Error, &result.path, None, None, &result.name);
                logger.detail(&e.to_string());
                result.outcome = CaseOutcome::Errored(e.to_string());
            }
        }

        result
    }

    async fn teardown(&self, mutator: &mut ConfigMutator) -> TeardownStatus {
        match self.backend.wipe().await {
            Ok(()) => {
                mutator.clear();
                log_info!("Teardown complete");
                TeardownStatus::Completed
            }
            Err(e) => {
                log_warn!("Teardown failed: {}", e);
                TeardownStatus::Failed(e.to_string())
            }
        }
    }
}

fn skip(result: &mut CaseResult, reason: &str) {
    let logger = get_logger();
    logger.probe(LogLevel::Skip, &result.path, None, None, &result.name);
    logger.detail(reason);
    result.outcome = CaseOutcome::Skipped;
}

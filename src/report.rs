// src/report.rs
// Machine-readable record of a run, and the exit code derived from it

use crate::assertions::Mismatch;
use crate::fixtures::Fixtures;
use crate::routes::ConfigOverrides;
use crate::runner::{CaseOutcome, CaseResult, Counts, SuiteRun, TeardownStatus};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// Every case passed.
pub const EXIT_OK: i32 = 0;
/// At least one case failed, errored or was skipped.
pub const EXIT_FAILED: i32 = 1;
/// The run could not start: bad configuration, unreachable target or seed failure.
pub const EXIT_SETUP: i32 = 2;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub tool: String,
    pub version: String,
    pub started_at: DateTime<Local>,
    pub duration_ms: u64,
    pub base_url: String,
    pub fixtures: Option<Fixtures>,
    pub setup_error: Option<String>,
    pub summary: ReportCounts,
    pub cases: Vec<CaseReport>,
    pub teardown: TeardownReport,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ReportCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub name: String,
    pub method: &'static str,
    pub path: String,
    pub expected_status: u16,
    pub expected_body: String,
    #[serde(skip_serializing_if = "ConfigOverrides::is_empty")]
    pub given: ConfigOverrides,
    pub status: Option<u16>,
    pub elapsed_ms: Option<u64>,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<Mismatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TeardownReport {
    Completed,
    Failed { message: String },
    NotNeeded,
}

impl From<&CaseResult> for CaseReport {
    fn from(case: &CaseResult) -> Self {
        let (outcome, mismatch, error) = match &case.outcome {
            CaseOutcome::Passed => ("passed", None, None),
            CaseOutcome::Failed(m) => ("failed", Some(m.clone()), None),
            CaseOutcome::Errored(e) => ("errored", None, Some(e.clone())),
            CaseOutcome::Skipped => ("skipped", None, None),
        };

        CaseReport {
            name: case.name.clone(),
            method: "GET",
            path: case.path.clone(),
            expected_status: case.expected_status,
            expected_body: case.body.to_string(),
            given: case.given.clone(),
            status: case.status,
            elapsed_ms: case.elapsed.map(|d| d.as_millis() as u64),
            outcome,
            mismatch,
            error,
        }
    }
}

impl From<&TeardownStatus> for TeardownReport {
    fn from(status: &TeardownStatus) -> Self {
        match status {
            TeardownStatus::Completed => TeardownReport::Completed,
            TeardownStatus::Failed(message) => TeardownReport::Failed {
                message: message.clone(),
            },
            TeardownStatus::NotNeeded => TeardownReport::NotNeeded,
        }
    }
}

impl From<Counts> for ReportCounts {
    fn from(counts: Counts) -> Self {
        ReportCounts {
            total: counts.passed + counts.failed + counts.errored + counts.skipped,
            passed: counts.passed,
            failed: counts.failed,
            errored: counts.errored,
            skipped: counts.skipped,
        }
    }
}

impl SuiteReport {
    pub fn new(run: &SuiteRun, base_url: &str) -> Self {
        SuiteReport {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: run.started_at,
            duration_ms: run.duration.as_millis() as u64,
            base_url: base_url.to_string(),
            fixtures: run.fixtures.clone(),
            setup_error: run.setup_error.clone(),
            summary: run.counts().into(),
            cases: run.cases.iter().map(CaseReport::from).collect(),
            teardown: (&run.teardown).into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}

/// Teardown problems are reported but never change the exit code.
pub fn exit_code(run: &SuiteRun) -> i32 {
    if run.setup_error.is_some() {
        EXIT_SETUP
    } else if run.is_success() {
        EXIT_OK
    } else {
        EXIT_FAILED
    }
}

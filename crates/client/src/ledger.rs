//! Run ledger
//!
//! Caller-owned record of workflow runs, used to build a results report.
//! Nothing here is global: create a ledger, record runs into it, write it
//! out, clear it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use callprobe_common::{Error, Result};

use crate::workflow::WorkflowResult;

/// File name written by [`RunLedger::write_results`]
pub const RESULTS_FILE: &str = "call-results.json";

/// How a recorded run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Pending,
    Finished { result: WorkflowResult },
    Errored { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

impl RunRecord {
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, RunOutcome::Finished { result } if result.succeeded)
    }
}

/// Counts over a ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
}

#[derive(Serialize)]
struct ResultsFile<'a> {
    summary: LedgerSummary,
    runs: Vec<&'a RunRecord>,
}

#[derive(Debug, Default)]
pub struct RunLedger {
    runs: HashMap<Uuid, RunRecord>,
    order: Vec<Uuid>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a pending run
    pub fn create(&mut self, label: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.runs.insert(
            id,
            RunRecord {
                id,
                label: label.into(),
                started_at: Utc::now(),
                finished_at: None,
                outcome: RunOutcome::Pending,
            },
        );
        self.order.push(id);
        id
    }

    /// Close a run with the workflow's outcome
    pub fn record(&mut self, id: Uuid, outcome: &Result<WorkflowResult>) -> Result<()> {
        let record = self
            .runs
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown run {}", id)))?;

        record.finished_at = Some(Utc::now());
        record.outcome = match outcome {
            Ok(result) => RunOutcome::Finished { result: result.clone() },
            Err(e) => RunOutcome::Errored { error: e.to_string() },
        };
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&RunRecord> {
        self.runs.get(&id)
    }

    /// Records in creation order
    pub fn records(&self) -> impl Iterator<Item = &RunRecord> {
        self.order.iter().filter_map(|id| self.runs.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.runs.clear();
        self.order.clear();
    }

    pub fn summary(&self) -> LedgerSummary {
        self.records().fold(LedgerSummary::default(), |mut summary, record| {
            summary.total += 1;
            match record.outcome {
                RunOutcome::Pending => summary.pending += 1,
                _ if record.passed() => summary.passed += 1,
                _ => summary.failed += 1,
            }
            summary
        })
    }

    /// Write the summary and every run to `dir/call-results.json`
    pub fn write_results(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(RESULTS_FILE);
        let file = ResultsFile {
            summary: self.summary(),
            runs: self.records().collect(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&file)?)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

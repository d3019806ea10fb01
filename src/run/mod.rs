//! Billing-run record, line outcomes, and the orchestrator that wires
//! extraction, classification, period inference, duplicate guards and
//! invoice construction into one submission.

mod orchestrator;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{BillingError, ReportKind};

pub use orchestrator::*;

/// Outcome of one usage line. Everything here keeps the run going;
/// only abort-class [`BillingError`]s stop a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Invoice persisted.
    Created,
    /// An invoice with the same customer, title and marker already
    /// exists — skipped, not an error.
    Duplicate,
    /// Identifier unknown to master data after both lookup passes.
    NotFound,
    /// Quantity ≤ 0, filtered before invoice construction.
    ZeroClients,
}

/// Per-run outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub created: u32,
    pub duplicate: u32,
    pub not_found: u32,
    pub error: u32,
}

impl fmt::Display for RunCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Summary: created={}, duplicate={}, not_found={}, error={}",
            self.created, self.duplicate, self.not_found, self.error
        )
    }
}

/// Terminal status of a billing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// At least one invoice was created.
    Created,
    /// The run completed without creating any invoice.
    NoneCreated,
    /// An abort condition fired before line processing completed.
    Failed,
}

impl RunStatus {
    /// User-facing status label on the run record.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Ausgangsrechnungen erstellt",
            Self::NoneCreated => "Keine Rechnungen erstellt",
            Self::Failed => "fehlerhaft",
        }
    }
}

/// One invocation over one archive: what was processed, what came out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRun {
    /// Basename of the submitted archive.
    pub source_archive: String,
    /// Archive member that was billed from.
    pub member_name: String,
    /// System-wide period key, e.g. `"8.2025 (MES)"`. Empty on failed
    /// runs so they never claim a period.
    pub period_key: String,
    pub report_kind: ReportKind,
    pub status: RunStatus,
    pub counters: RunCounters,
    /// Total active clients across created invoices.
    pub total_clients: u64,
    /// Ordered per-step and per-line messages plus the summary line.
    pub log: Vec<String>,
    /// User-facing advisory notifications (skips, pricing fallbacks).
    pub advisories: Vec<String>,
}

impl BillingRun {
    /// Record for an aborted submission, for callers that persist abort
    /// outcomes on their run records. Carries no period key: a failed
    /// run never blocks the period it could not process.
    pub fn failed(source_archive: &str, message: impl Into<String>) -> Self {
        Self {
            source_archive: source_archive.to_string(),
            member_name: String::new(),
            period_key: String::new(),
            report_kind: ReportKind::Unknown,
            status: RunStatus::Failed,
            counters: RunCounters::default(),
            total_clients: 0,
            log: vec![message.into()],
            advisories: Vec::new(),
        }
    }
}

/// Persistence seam for run records.
///
/// Completed runs claim their `period_key` system-wide. Implementations
/// should back [`save`](RunStore::save) with a unique constraint on the
/// key (ignoring failed runs, whose key is empty) so the
/// check-then-write window cannot double-bill a period; the pipeline
/// treats a `save` failure as an abort.
pub trait RunStore {
    /// Name of an existing run record for this period key, if any.
    fn find_run_for_period(&self, period_key: &str) -> Result<Option<String>, BillingError>;

    fn save(&mut self, run: &BillingRun) -> Result<(), BillingError>;
}

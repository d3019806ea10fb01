use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the vendor's report shapes a document is.
///
/// Determined once from the document shape (root tag, ReportEntry
/// presence), never from content. `Unknown` is kept for diagnostics
/// and is never billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    /// Aggregate-by-server report, root element `MesReport`.
    Mes,
    /// Aggregate-by-license MSP report, root element `MxdrMspReport`.
    Mxdr,
    /// Nested legacy report: arbitrary root with one `ReportEntry` child.
    Detailed,
    /// Anything else.
    Unknown,
}

impl ReportKind {
    /// Invoice title prefix. Detailed reports bill like MES.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Mes | Self::Detailed => "MES",
            Self::Mxdr => "MXDR",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Label of the duplicate-detection marker embedded in the invoice body.
    pub fn marker_label(&self) -> &'static str {
        match self {
            Self::Mes | Self::Detailed => "Management Server ID",
            Self::Mxdr => "MXDR Lizenzschlüssel",
            Self::Unknown => "ID",
        }
    }

    /// Wire label used in the run's period key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mes => "MES",
            Self::Mxdr => "MXDR",
            Self::Detailed => "MES-DETAIL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing month and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// 1–12.
    pub month: u32,
    /// Four-digit year. Attribute-derived periods accept any year > 0;
    /// file-name matches additionally require year ≥ 2000.
    pub year: i32,
}

impl BillingPeriod {
    /// Validating constructor: month must be 1–12, year positive.
    pub fn new(month: u32, year: i32) -> Option<Self> {
        if (1..=12).contains(&month) && year > 0 {
            Some(Self { month, year })
        } else {
            None
        }
    }

    /// System-wide run key, e.g. `"8.2025 (MES)"`. Exactly one completed
    /// billing run may exist per key.
    pub fn run_key(&self, kind: ReportKind) -> String {
        format!("{self} ({kind})")
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.month, self.year)
    }
}

/// Invoice title: `"<prefix> <month>.<year> <customerName>"`.
///
/// Exact-matched by the line-level duplicate guard, so the format is
/// load-bearing and must not change between runs.
pub fn invoice_title(kind: ReportKind, period: BillingPeriod, customer_name: &str) -> String {
    format!("{} {} {}", kind.prefix(), period, customer_name)
}

/// Duplicate-detection marker embedded in the invoice introduction,
/// e.g. `"Management Server ID: srv-01#1"`. Recovered by substring
/// search because no deployed invoice schema reserves a field for it.
pub fn marker(kind: ReportKind, identifier: &str) -> String {
    format!("{}: {}", kind.marker_label(), identifier)
}

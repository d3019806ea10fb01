use thiserror::Error;

/// Errors that abort a billing run or surface collaborator failures.
///
/// Line-level conditions (identifier not found, duplicate invoice, zero
/// clients) are not errors — they are [`LineOutcome`](crate::run::LineOutcome)
/// values and the run continues past them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BillingError {
    /// The ZIP container could not be opened or a member could not be read.
    #[error("archive error: {0}")]
    Archive(String),

    /// The archive contains no member with an `.xml` suffix.
    #[error("no XML member found in archive")]
    NoXmlMember,

    /// The chosen XML member could not be parsed.
    #[error("XML error: {0}")]
    Xml(String),

    /// No report attribute or file name yielded a valid billing month/year.
    #[error("billing month/year could not be determined")]
    PeriodUnresolved,

    /// A detailed report must carry exactly one ReportEntry grouping node.
    #[error("detailed report must contain exactly one ReportEntry, found {0}")]
    MalformedDetailedReport(usize),

    /// Root element is neither MesReport nor MxdrMspReport and no
    /// ReportEntry nodes are present.
    #[error(
        "unsupported report shape '{0}': expected MesReport, MxdrMspReport \
         or a document with ReportEntry nodes"
    )]
    UnsupportedReport(String),

    /// An MXDR/MSP report without License entries cannot be billed.
    #[error("MXDR/MSP report contains no License entries; deliver a short report with License nodes")]
    MxdrWithoutLicenses,

    /// A billing run for this period already exists; the submission is
    /// rejected wholesale before any invoice is built.
    #[error("billing run for period {period} already exists: {existing}")]
    PeriodAlreadyBilled { period: String, existing: String },

    /// More than one management server record matches an identifier.
    /// Master data uniqueness is a precondition; this is a data-integrity
    /// failure, never resolved by picking the first match.
    #[error("ambiguous master data: {count} management servers match identifier '{identifier}'")]
    AmbiguousServer { identifier: String, count: usize },

    /// Master-data collaborator failure (server/product/item/customer or
    /// price-list lookup).
    #[error("master data error: {0}")]
    MasterData(String),

    /// Pricing engine failure. Swallowed into an advisory by the pricing
    /// fallback, never fatal on its own.
    #[error("pricing error: {0}")]
    Pricing(String),

    /// Tax-rule resolver failure. Leaves the invoice without tax lines,
    /// never aborts a run.
    #[error("tax resolution error: {0}")]
    Tax(String),

    /// Invoice or run persistence failure.
    #[error("persistence error: {0}")]
    Store(String),
}

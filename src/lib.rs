//! # abrechnung
//!
//! Billing pipeline for vendor usage reports: extract the XML usage
//! document from a delivery ZIP, classify the report shape (MES short,
//! MXDR/MSP, or legacy detailed), infer the billing period, and create
//! one idempotent draft sales invoice per management server or license
//! key against the owning customer account.
//!
//! Master data, pricing, tax rules and document persistence live in the
//! external accounting system and are consumed through the narrow traits
//! in [`masterdata`], [`invoice`] and [`run`]. The pipeline never
//! double-bills: a period is billed by at most one run, and each
//! customer/period/identifier combination is guarded by a marker
//! embedded in the invoice body.
//!
//! ```rust
//! use abrechnung::report::{classify, parse_report, resolve_period};
//! use abrechnung::{BillingPeriod, ReportKind};
//!
//! let xml = r#"<MesReport Month="8" Year="2025">
//!                <ManagementServer Id="srv-01#1" MaxActiveClients="25"/>
//!              </MesReport>"#;
//! let raw = parse_report(xml).unwrap();
//! assert_eq!(classify(&raw), ReportKind::Mes);
//!
//! let (period, _source) = resolve_period(&raw, "9_2024_export.zip", "report.xml").unwrap();
//! assert_eq!(period, BillingPeriod { month: 8, year: 2025 });
//! ```

pub mod core;
pub mod invoice;
pub mod masterdata;
pub mod report;
pub mod run;

// Re-export the shared vocabulary at the crate root for convenience
pub use crate::core::*;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Draft sales invoice handed to the external accounting system.
///
/// Created fresh per usage line; once inserted it belongs to the
/// accounting system and is no longer mutated by this pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftInvoice {
    /// Internal customer record name.
    pub customer: String,
    /// Customer display name (also baked into the title).
    pub customer_name: String,
    /// `"<prefix> <month>.<year> <customerName>"` — exact-matched by the
    /// duplicate guard.
    pub title: String,
    pub company: Option<String>,
    pub posting_date: NaiveDate,
    /// Introductory markup: boilerplate plus the appended period/marker
    /// block. The duplicate guard searches this field for the marker.
    pub introduction: String,
    pub terms_and_conditions: Option<String>,
    pub selling_price_list: Option<String>,
    pub price_list_currency: Option<String>,
    pub currency: Option<String>,
    pub payment_terms_template: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub payment_schedule: Vec<ScheduleEntry>,
    /// Exactly one row per draft in this pipeline.
    pub items: Vec<InvoiceItem>,
    /// Name of the applied tax template, if one resolved.
    pub taxes_template: Option<String>,
    pub taxes: Vec<TaxLine>,
}

/// One invoice line row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub item_code: String,
    pub qty: u32,
    pub uom: Option<String>,
    /// Effective unit rate. Left unset when no price could be resolved;
    /// the draft is still created for manual correction.
    pub rate: Option<Decimal>,
    pub price_list_rate: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
}

/// One tax row, copied verbatim from the resolved tax template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLine {
    pub charge_type: String,
    pub account_head: String,
    pub rate: Decimal,
    pub description: String,
}

/// One payment-schedule portion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub due_date: NaiveDate,
    /// Percentage of the invoice total due at `due_date`.
    pub invoice_portion: Decimal,
}

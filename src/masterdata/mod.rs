//! Master-data records and the collaborator interfaces the pipeline
//! consumes. None of this is owned data: servers, products, items,
//! customers, price lists and tax rules live in the external accounting
//! system and are reached through these narrow traits.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::BillingError;
use crate::invoice::TaxLine;

/// A customer-operated management server instance, keyed by the
/// vendor-issued ID. MXDR license keys are registered under the same
/// record type, with the license key as `server_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Internal record name.
    pub name: String,
    /// Vendor-issued management server ID or MXDR license key.
    pub server_id: String,
    /// Name of the billed product record.
    pub product: String,
    /// Name of the owning customer record.
    pub customer: String,
}

/// The product a server is billed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    /// Sellable item the product resolves to.
    pub item: String,
}

/// Sellable item master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub code: String,
    /// Sales unit of measure, if the item declares one.
    pub uom: Option<String>,
}

/// Customer master record, reduced to the fields billing needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Internal record name.
    pub name: String,
    /// Display name, used in invoice titles.
    pub customer_name: String,
    /// Customer's own default selling price list.
    pub default_price_list: Option<String>,
    /// Customer's payment-terms template.
    pub payment_terms: Option<String>,
}

/// One item→rate row of a named price list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListEntry {
    pub price_list: String,
    pub rate: Decimal,
    pub currency: Option<String>,
}

/// Arguments handed to the external pricing engine.
#[derive(Debug, Clone)]
pub struct PricingArgs {
    pub item_code: String,
    pub customer: String,
    pub company: Option<String>,
    pub price_list: Option<String>,
    pub transaction_date: NaiveDate,
    pub qty: u32,
    pub currency: Option<String>,
}

/// What the external pricing engine resolved for one item row.
#[derive(Debug, Clone, Default)]
pub struct ItemPricing {
    pub rate: Option<Decimal>,
    pub price_list_rate: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub uom: Option<String>,
}

/// App settings singleton: boilerplate texts and billing defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Introductory invoice boilerplate (HTML markup).
    pub introduction_text: String,
    /// MXDR-specific boilerplate; MXDR invoices prefer it and fall back
    /// to `introduction_text`.
    pub introduction_text_mxdr: Option<String>,
    /// Default terms-and-conditions record.
    pub terms_and_conditions: Option<String>,
    /// Default payment-terms template for customers without one.
    pub payment_terms_template: Option<String>,
    /// Billing company.
    pub company: Option<String>,
}

/// Master-data lookup surface.
///
/// `servers_by_id` is the exact, case- and whitespace-sensitive lookup;
/// `servers_by_id_relaxed` is the second-chance lookup with
/// [`relaxed_eq`] semantics. Both return every match so the caller can
/// reject ambiguous data instead of silently picking one.
pub trait MasterData {
    fn servers_by_id(&self, identifier: &str) -> Result<Vec<ServerRecord>, BillingError>;
    fn servers_by_id_relaxed(&self, identifier: &str) -> Result<Vec<ServerRecord>, BillingError>;
    fn product(&self, name: &str) -> Result<ProductRecord, BillingError>;
    fn item(&self, name: &str) -> Result<ItemRecord, BillingError>;
    fn customer(&self, name: &str) -> Result<CustomerRecord, BillingError>;

    /// System-wide default selling price list.
    fn default_selling_price_list(&self) -> Result<Option<String>, BillingError>;
    fn price_list_exists(&self, name: &str) -> Result<bool, BillingError>;
    fn price_list_entry(
        &self,
        item_code: &str,
        price_list: &str,
    ) -> Result<Option<PriceListEntry>, BillingError>;
    /// Any price-list entry for the item, regardless of list. Last
    /// resort of the pricing fallback.
    fn any_price_list_entry(
        &self,
        item_code: &str,
    ) -> Result<Option<PriceListEntry>, BillingError>;
    fn price_list_currency(&self, price_list: &str) -> Result<Option<String>, BillingError>;
    fn company_currency(&self, company: &str) -> Result<Option<String>, BillingError>;
}

/// External pricing/tax-detail engine. Optional collaborator: some
/// deployments run without one, in which case the price-list fallback
/// chain supplies the rate.
pub trait PricingEngine {
    fn item_details(&self, args: &PricingArgs) -> Result<ItemPricing, BillingError>;
}

/// External tax-rule resolver.
pub trait TaxResolver {
    /// Tax template applicable to (customer, posting date, company).
    fn tax_template(
        &self,
        customer: &str,
        posting_date: NaiveDate,
        company: Option<&str>,
    ) -> Result<Option<String>, BillingError>;

    /// Ordered tax-line definitions of a template, copied verbatim onto
    /// the invoice.
    fn template_lines(&self, template: &str) -> Result<Vec<TaxLine>, BillingError>;
}

/// Relaxed identifier comparison used by the second-chance lookup:
/// whitespace-trimmed, case-insensitive.
pub fn relaxed_eq(a: &str, b: &str) -> bool {
    a.trim().to_uppercase() == b.trim().to_uppercase()
}

/// Fully resolved billing target for one usage line.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub server: ServerRecord,
    pub product: ProductRecord,
    pub item: ItemRecord,
    pub customer: CustomerRecord,
}

/// Resolve a report identifier to its billing target: exact lookup
/// first, relaxed second. `None` means not found (line skip). More than
/// one match on either pass is a data-integrity error — master data
/// uniqueness is a precondition, and first-match-wins would bill the
/// wrong customer silently.
pub fn resolve_identifier(
    md: &dyn MasterData,
    identifier: &str,
) -> Result<Option<ResolvedTarget>, BillingError> {
    let mut matches = md.servers_by_id(identifier)?;
    if matches.is_empty() {
        matches = md.servers_by_id_relaxed(identifier)?;
    }

    let count = matches.len();
    let mut matches = matches.into_iter();
    let server = match (matches.next(), matches.next()) {
        (None, _) => return Ok(None),
        (Some(server), None) => server,
        (Some(_), Some(_)) => {
            return Err(BillingError::AmbiguousServer {
                identifier: identifier.to_string(),
                count,
            });
        }
    };

    let product = md.product(&server.product)?;
    let item = md.item(&product.item)?;
    let customer = md.customer(&server.customer)?;
    Ok(Some(ResolvedTarget {
        server,
        product,
        item,
        customer,
    }))
}

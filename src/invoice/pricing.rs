use tracing::warn;

use crate::core::BillingError;
use crate::masterdata::{MasterData, PricingArgs, PricingEngine};

use super::draft::DraftInvoice;

/// Price the draft's item row.
///
/// Resolution order: the external pricing engine (if one is wired and it
/// yields a nonzero rate), then a price-list entry scoped to the draft's
/// selling price list, then any price-list entry for the item (with an
/// advisory naming the list used). When nothing matches, the rate stays
/// unset, an advisory is recorded, and the draft is still created for
/// manual correction.
///
/// Engine failures are swallowed into the fallback chain; master-data
/// lookup failures propagate as line errors.
pub fn apply_item_price(
    draft: &mut DraftInvoice,
    md: &dyn MasterData,
    engine: Option<&dyn PricingEngine>,
    advisories: &mut Vec<String>,
) -> Result<(), BillingError> {
    let Some(row) = draft.items.last() else {
        return Ok(());
    };
    let item_code = row.item_code.clone();
    let qty = row.qty;

    if let Some(engine) = engine {
        let args = PricingArgs {
            item_code: item_code.clone(),
            customer: draft.customer.clone(),
            company: draft.company.clone(),
            price_list: draft.selling_price_list.clone(),
            transaction_date: draft.posting_date,
            qty,
            currency: draft.currency.clone(),
        };
        match engine.item_details(&args) {
            Ok(details) => {
                if let Some(row) = draft.items.last_mut() {
                    if details.uom.is_some() {
                        row.uom = details.uom;
                    }
                    if details.price_list_rate.is_some() {
                        row.price_list_rate = details.price_list_rate;
                    }
                    if details.discount_percentage.is_some() {
                        row.discount_percentage = details.discount_percentage;
                    }
                    if let Some(rate) = details.rate {
                        row.rate = Some(rate);
                        if !rate.is_zero() {
                            return Ok(());
                        }
                    }
                }
            }
            Err(e) => {
                warn!(item = %item_code, error = %e, "pricing engine failed, falling back to price lists");
            }
        }
    }

    let mut entry = match draft.selling_price_list.as_deref() {
        Some(list) => md.price_list_entry(&item_code, list)?,
        None => None,
    };
    if entry.is_none() {
        entry = md.any_price_list_entry(&item_code)?;
        if let Some(e) = &entry {
            advisories.push(format!(
                "Hinweis: Preis für Item '{item_code}' aus Price List '{}' übernommen (Fallback).",
                e.price_list
            ));
        }
    }

    match entry {
        Some(e) => {
            if let Some(row) = draft.items.last_mut() {
                row.price_list_rate = Some(e.rate);
                row.rate = Some(e.rate);
            }
            if draft.currency.is_none() {
                draft.currency = e.currency;
            }
        }
        None => {
            advisories.push(format!(
                "Hinweis: Kein Item Price für Item '{item_code}' gefunden (Price List: {}).",
                draft.selling_price_list.as_deref().unwrap_or("—")
            ));
        }
    }
    Ok(())
}

use crate::core::BillingError;

use super::draft::DraftInvoice;

/// Persistence seam to the external invoicing system.
pub trait InvoiceStore {
    /// Search for a non-cancelled invoice of this customer with an
    /// exactly matching title whose body/remarks contain the literal
    /// marker substring. A hit means the line was already billed.
    fn find_existing(
        &self,
        customer: &str,
        title: &str,
        marker: &str,
    ) -> Result<Option<String>, BillingError>;

    /// Recompute due date and payment schedule from the posting date
    /// using the document's own schedule logic. The default does
    /// nothing, which triggers the pipeline's fixed 7/14-day fallback.
    fn recompute_schedule(&self, draft: &mut DraftInvoice) -> Result<(), BillingError> {
        let _ = draft;
        Ok(())
    }

    /// Insert the draft. Returns the persisted document's name.
    fn insert(&mut self, draft: DraftInvoice) -> Result<String, BillingError>;
}

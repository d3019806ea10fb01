use chrono::Days;
use chrono::NaiveDate;
use tracing::{error, warn};

use crate::core::{BillingError, BillingPeriod, ReportKind, invoice_title, marker};
use crate::masterdata::{MasterData, ResolvedTarget, Settings, TaxResolver};

use super::draft::{DraftInvoice, InvoiceItem};
use super::store::InvoiceStore;

/// Everything needed to prepare one draft invoice.
#[derive(Debug)]
pub struct DraftParams<'a> {
    pub kind: ReportKind,
    pub period: BillingPeriod,
    pub identifier: &'a str,
    pub quantity: u32,
    pub target: &'a ResolvedTarget,
    pub settings: &'a Settings,
    pub posting_date: NaiveDate,
}

/// Build the draft skeleton: title, introduction markup with the
/// duplicate marker, price list, currency, terms, and the single item
/// row (unpriced — pricing runs afterwards).
pub fn prepare_draft(
    md: &dyn MasterData,
    params: &DraftParams<'_>,
) -> Result<DraftInvoice, BillingError> {
    let DraftParams {
        kind,
        period,
        identifier,
        quantity,
        target,
        settings,
        posting_date,
    } = *params;

    let introduction = format!(
        "{}<div><br></div><div>Leistungszeitraum {}<br>{}</div>",
        intro_base(settings, kind),
        period,
        marker(kind, identifier),
    );

    let selling_price_list = resolve_selling_price_list(md, &target.customer)?;
    let price_list_currency = match &selling_price_list {
        Some(list) => md.price_list_currency(list)?,
        None => None,
    };
    let currency = match (&price_list_currency, &settings.company) {
        (Some(c), _) => Some(c.clone()),
        (None, Some(company)) => md.company_currency(company)?,
        (None, None) => None,
    };

    Ok(DraftInvoice {
        customer: target.customer.name.clone(),
        customer_name: target.customer.customer_name.clone(),
        title: invoice_title(kind, period, &target.customer.customer_name),
        company: settings.company.clone(),
        posting_date,
        introduction,
        terms_and_conditions: settings.terms_and_conditions.clone(),
        selling_price_list,
        price_list_currency,
        currency,
        payment_terms_template: target
            .customer
            .payment_terms
            .clone()
            .or_else(|| settings.payment_terms_template.clone()),
        due_date: None,
        payment_schedule: Vec::new(),
        items: vec![InvoiceItem {
            item_code: target.item.code.clone(),
            qty: quantity,
            uom: target.item.uom.clone(),
            rate: None,
            price_list_rate: None,
            discount_percentage: None,
        }],
        taxes_template: None,
        taxes: Vec::new(),
    })
}

/// MXDR prefers the MXDR-specific boilerplate, falling back to the
/// generic one; everything else uses the generic text.
fn intro_base(settings: &Settings, kind: ReportKind) -> &str {
    if kind == ReportKind::Mxdr {
        if let Some(text) = settings
            .introduction_text_mxdr
            .as_deref()
            .filter(|t| !t.is_empty())
        {
            return text;
        }
    }
    &settings.introduction_text
}

/// Customer's own default price list, else the system-wide default,
/// else the literal "Standard Selling" list if it exists by name.
fn resolve_selling_price_list(
    md: &dyn MasterData,
    customer: &crate::masterdata::CustomerRecord,
) -> Result<Option<String>, BillingError> {
    if let Some(list) = customer
        .default_price_list
        .as_deref()
        .filter(|l| !l.is_empty())
    {
        return Ok(Some(list.to_string()));
    }
    if let Some(list) = md.default_selling_price_list()? {
        return Ok(Some(list));
    }
    if md.price_list_exists("Standard Selling")? {
        return Ok(Some("Standard Selling".to_string()));
    }
    Ok(None)
}

/// Copy the resolved tax template's lines onto the draft. Resolver
/// failures leave the invoice without tax lines and log the failure —
/// they never abort the run.
pub fn apply_taxes(draft: &mut DraftInvoice, taxes: &dyn TaxResolver, log: &mut Vec<String>) {
    let template = match taxes.tax_template(&draft.customer, draft.posting_date, draft.company.as_deref())
    {
        Ok(Some(template)) => template,
        Ok(None) => return,
        Err(e) => {
            error!(customer = %draft.customer, error = %e, "tax template resolution failed");
            log.push(format!(
                "FEHLER: Steuervorlage für {} konnte nicht ermittelt werden: {e}",
                draft.customer
            ));
            return;
        }
    };

    draft.taxes_template = Some(template.clone());
    match taxes.template_lines(&template) {
        Ok(lines) => draft.taxes = lines,
        Err(e) => {
            error!(template = %template, error = %e, "tax template could not be loaded");
            log.push(format!(
                "FEHLER: Steuervorlage {template} konnte nicht geladen werden: {e}"
            ));
        }
    }
}

/// Recompute due date and schedule from the posting date via the
/// external document's own logic, then apply the fixed fallback: 7 days
/// when the payment-terms template name contains "7", else 14.
pub fn finalize_terms(draft: &mut DraftInvoice, store: &dyn InvoiceStore) {
    draft.due_date = None;
    draft.payment_schedule.clear();

    if let Err(e) = store.recompute_schedule(draft) {
        warn!(error = %e, "schedule recomputation failed, using fixed fallback terms");
    }

    if draft.due_date.is_none() && draft.payment_schedule.is_empty() {
        let template = draft
            .payment_terms_template
            .as_deref()
            .unwrap_or("")
            .to_lowercase();
        let days = if template.contains('7') { 7 } else { 14 };
        draft.due_date = Some(draft.posting_date + Days::new(days));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::ScheduleEntry;
    use rust_decimal_macros::dec;

    fn settings() -> Settings {
        Settings {
            introduction_text: "<p>Vielen Dank.</p>".to_string(),
            introduction_text_mxdr: Some("<p>MXDR Abrechnung.</p>".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn mxdr_prefers_its_own_boilerplate() {
        let s = settings();
        assert_eq!(intro_base(&s, ReportKind::Mxdr), "<p>MXDR Abrechnung.</p>");
        assert_eq!(intro_base(&s, ReportKind::Mes), "<p>Vielen Dank.</p>");
        assert_eq!(intro_base(&s, ReportKind::Detailed), "<p>Vielen Dank.</p>");

        let mut s = s;
        s.introduction_text_mxdr = Some(String::new());
        assert_eq!(intro_base(&s, ReportKind::Mxdr), "<p>Vielen Dank.</p>");
    }

    struct NoopStore;

    impl InvoiceStore for NoopStore {
        fn find_existing(
            &self,
            _customer: &str,
            _title: &str,
            _marker: &str,
        ) -> Result<Option<String>, BillingError> {
            Ok(None)
        }

        fn insert(&mut self, _draft: DraftInvoice) -> Result<String, BillingError> {
            Ok("SINV-0001".to_string())
        }
    }

    struct SchedulingStore;

    impl InvoiceStore for SchedulingStore {
        fn find_existing(
            &self,
            _customer: &str,
            _title: &str,
            _marker: &str,
        ) -> Result<Option<String>, BillingError> {
            Ok(None)
        }

        fn recompute_schedule(&self, draft: &mut DraftInvoice) -> Result<(), BillingError> {
            draft.payment_schedule.push(ScheduleEntry {
                due_date: draft.posting_date + Days::new(30),
                invoice_portion: dec!(100),
            });
            Ok(())
        }

        fn insert(&mut self, _draft: DraftInvoice) -> Result<String, BillingError> {
            Ok("SINV-0002".to_string())
        }
    }

    fn draft(template: Option<&str>) -> DraftInvoice {
        DraftInvoice {
            customer: "KD-0001".to_string(),
            customer_name: "Kunde AG".to_string(),
            title: "MES 8.2025 Kunde AG".to_string(),
            company: None,
            posting_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            introduction: String::new(),
            terms_and_conditions: None,
            selling_price_list: None,
            price_list_currency: None,
            currency: None,
            payment_terms_template: template.map(str::to_string),
            due_date: None,
            payment_schedule: Vec::new(),
            items: Vec::new(),
            taxes_template: None,
            taxes: Vec::new(),
        }
    }

    #[test]
    fn fallback_due_date_seven_days_when_template_names_seven() {
        let mut d = draft(Some("Zahlung 7 Tage"));
        finalize_terms(&mut d, &NoopStore);
        assert_eq!(d.due_date, NaiveDate::from_ymd_opt(2025, 9, 8));
    }

    #[test]
    fn fallback_due_date_fourteen_days_otherwise() {
        let mut d = draft(Some("Zahlung 30 Tage netto"));
        finalize_terms(&mut d, &NoopStore);
        assert_eq!(d.due_date, NaiveDate::from_ymd_opt(2025, 9, 15));

        let mut d = draft(None);
        finalize_terms(&mut d, &NoopStore);
        assert_eq!(d.due_date, NaiveDate::from_ymd_opt(2025, 9, 15));
    }

    #[test]
    fn external_schedule_suppresses_fallback() {
        let mut d = draft(Some("Zahlung 7 Tage"));
        finalize_terms(&mut d, &SchedulingStore);
        assert!(d.due_date.is_none());
        assert_eq!(d.payment_schedule.len(), 1);
        assert_eq!(
            d.payment_schedule[0].due_date,
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
        );
    }
}

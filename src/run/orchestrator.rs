use std::io::{Read, Seek};

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::core::{BillingError, BillingPeriod, ReportKind, invoice_title, marker};
use crate::invoice::{
    DraftParams, InvoiceStore, apply_item_price, apply_taxes, finalize_terms, prepare_draft,
};
use crate::masterdata::{MasterData, PricingEngine, Settings, TaxResolver, resolve_identifier};
use crate::report::{UsageLine, choose_member, extract_xml_members, parse_report, resolve_period};

use super::{BillingRun, LineOutcome, RunCounters, RunStatus, RunStore};

/// Collaborators one billing run works against.
pub struct BillingContext<'a> {
    pub masterdata: &'a dyn MasterData,
    /// Optional external pricing engine; without one, the price-list
    /// fallback chain supplies rates.
    pub pricing: Option<&'a dyn PricingEngine>,
    pub taxes: &'a dyn TaxResolver,
    pub invoices: &'a mut dyn InvoiceStore,
    pub runs: &'a mut dyn RunStore,
    pub settings: &'a Settings,
}

/// Process one archive submission end to end.
///
/// Aborts (`Err`) on: unreadable archive, no XML member, unparsable
/// document, unresolvable period, malformed detailed report, unsupported
/// shape, an MXDR report without License entries, an already-billed
/// period, or a persistence failure. Nothing is
/// saved on abort; callers wanting an audit record can persist
/// [`BillingRun::failed`]. Every other condition is absorbed into the
/// run's counters and log, and the completed run is saved before it is
/// returned.
pub fn process_archive<R: Read + Seek>(
    ctx: &mut BillingContext<'_>,
    reader: R,
    archive_name: &str,
    posting_date: NaiveDate,
) -> Result<BillingRun, BillingError> {
    let members = extract_xml_members(reader)?;
    let Some(chosen) = choose_member(&members) else {
        return Err(BillingError::NoXmlMember);
    };
    let member_name = chosen.name.clone();

    let xml = String::from_utf8_lossy(&chosen.bytes);
    let raw = parse_report(&xml)?;
    let (period, period_source) = resolve_period(&raw, archive_name, &member_name)?;
    let root_tag = raw.root_tag.clone();
    let report = raw.into_report(period)?;
    let period_key = period.run_key(report.kind);

    if let Some(existing) = ctx.runs.find_run_for_period(&period_key)? {
        debug!(period = %period_key, existing = %existing, "period already billed, rejecting submission");
        return Err(BillingError::PeriodAlreadyBilled {
            period: period_key,
            existing,
        });
    }

    let mut run = BillingRun {
        source_archive: basename(archive_name).to_string(),
        member_name,
        period_key,
        report_kind: report.kind,
        status: RunStatus::Failed,
        counters: RunCounters::default(),
        total_clients: 0,
        log: Vec::new(),
        advisories: Vec::new(),
    };
    run.log.push(format!("Quelle ZIP: {}", run.source_archive));
    run.log.push(format!("Verwendete XML: {}", run.member_name));
    run.log.push(format!(
        "Root: {root_tag} / Monat: {} / Jahr: {} (Quelle: {period_source})",
        period.month, period.year
    ));

    if let Some(detail) = &report.detail {
        run.log.push(format!("Report für Firma: {}", detail.company));
        run.log
            .push(format!("G Data Kundennummer: {}", detail.gd_customer_nr));
        run.log.push(format!("Login Name: {}", detail.login));
        run.log.push(format!("Produkt: {}", detail.product));
        run.log.push(format!(
            "Gesamt (Report) MaxActiveClients: {}",
            detail.max_active_clients
        ));
    }

    for line in &report.entries {
        process_line(ctx, &mut run, report.kind, period, line, posting_date);
    }

    run.log
        .push(format!("Gesamtanzahl Clients gezählt: {}", run.total_clients));
    run.log.push(run.counters.to_string());
    run.status = if run.counters.created > 0 {
        RunStatus::Created
    } else {
        RunStatus::NoneCreated
    };

    ctx.runs.save(&run)?;
    Ok(run)
}

fn process_line(
    ctx: &mut BillingContext<'_>,
    run: &mut BillingRun,
    kind: ReportKind,
    period: BillingPeriod,
    line: &UsageLine,
    posting_date: NaiveDate,
) {
    if line.quantity == 0 {
        skip_zero_clients(run, line);
        return;
    }

    match bill_line(ctx, run, kind, period, line, posting_date) {
        Ok(LineOutcome::Created) => {
            run.log.push(format!(
                "OK: Rechnung erstellt → {} Qty={}",
                line.identifier, line.quantity
            ));
            run.total_clients += u64::from(line.quantity);
            run.counters.created += 1;
        }
        Ok(LineOutcome::Duplicate) => {
            run.log
                .push(format!("Übersprungen (duplicate): {}", line.identifier));
            run.counters.duplicate += 1;
        }
        Ok(LineOutcome::NotFound) => {
            run.log
                .push(format!("Übersprungen (not_found): {}", line.identifier));
            run.counters.not_found += 1;
        }
        Ok(LineOutcome::ZeroClients) => skip_zero_clients(run, line),
        Err(e) => {
            error!(identifier = %line.identifier, error = %e, "invoice creation failed");
            run.log.push(format!("FEHLER: {} → {e}", line.identifier));
            run.counters.error += 1;
        }
    }
}

fn skip_zero_clients(run: &mut BillingRun, line: &UsageLine) {
    let identifier = if line.identifier.is_empty() {
        "(ohne Schlüssel)"
    } else {
        line.identifier.as_str()
    };
    let message = format!("Übersprungen (0 Clients): {identifier}");
    run.log.push(message.clone());
    run.advisories.push(message);
}

/// Bill one usage line: resolve the identifier, check the line-level
/// duplicate guard, build, price, tax and persist the draft.
fn bill_line(
    ctx: &mut BillingContext<'_>,
    run: &mut BillingRun,
    kind: ReportKind,
    period: BillingPeriod,
    line: &UsageLine,
    posting_date: NaiveDate,
) -> Result<LineOutcome, BillingError> {
    if line.quantity == 0 {
        return Ok(LineOutcome::ZeroClients);
    }

    let Some(target) = resolve_identifier(ctx.masterdata, &line.identifier)? else {
        run.advisories.push(match kind {
            ReportKind::Mxdr => format!(
                "MXDR Lizenzschlüssel {} nicht gefunden (als Management Server ID).",
                line.identifier
            ),
            _ => format!("Management Server ID {} nicht gefunden.", line.identifier),
        });
        return Ok(LineOutcome::NotFound);
    };

    let title = invoice_title(kind, period, &target.customer.customer_name);
    let marker = marker(kind, &line.identifier);
    if ctx
        .invoices
        .find_existing(&target.customer.name, &title, &marker)?
        .is_some()
    {
        run.advisories
            .push("Rechnung existiert bereits. Überspringe.".to_string());
        return Ok(LineOutcome::Duplicate);
    }

    let mut draft = prepare_draft(
        ctx.masterdata,
        &DraftParams {
            kind,
            period,
            identifier: &line.identifier,
            quantity: line.quantity,
            target: &target,
            settings: ctx.settings,
            posting_date,
        },
    )?;
    apply_item_price(&mut draft, ctx.masterdata, ctx.pricing, &mut run.advisories)?;
    apply_taxes(&mut draft, ctx.taxes, &mut run.log);
    finalize_terms(&mut draft, &*ctx.invoices);
    ctx.invoices.insert(draft)?;
    Ok(LineOutcome::Created)
}

fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

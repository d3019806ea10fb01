use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

use crate::core::{BillingError, BillingPeriod, ReportKind};

/// One billable unit inside a report: a management server or a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLine {
    /// Management server ID or MXDR license key. Trimmed at parse time;
    /// exact casing is preserved for the first master-data lookup.
    pub identifier: String,
    /// Count of active clients in the billing period.
    pub quantity: u32,
}

/// Header attributes of the single `ReportEntry` grouping node in the
/// legacy detailed format. Retained for the run log only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailHeader {
    pub company: String,
    pub gd_customer_nr: String,
    pub login: String,
    pub product: String,
    pub max_active_clients: String,
}

/// A `ReportEntry` child as captured from the document.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub header: DetailHeader,
    pub month: Option<String>,
    pub year: Option<String>,
    pub servers: Vec<UsageLine>,
}

/// Document shape captured in one streaming pass, before classification.
/// Every candidate child collection is filled regardless of the root tag;
/// [`classify`] and [`RawReport::into_report`] decide which one counts.
#[derive(Debug, Clone, Default)]
pub struct RawReport {
    pub root_tag: String,
    pub root_month: Option<String>,
    pub root_year: Option<String>,
    /// Direct `ManagementServer` children (MES short format).
    pub servers: Vec<UsageLine>,
    /// Direct `License` children (MXDR short format).
    pub licenses: Vec<UsageLine>,
    /// Direct `ReportEntry` children (legacy detailed format).
    pub entries: Vec<RawEntry>,
}

/// The parsed, classified usage report the orchestrator bills from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    pub kind: ReportKind,
    pub period: BillingPeriod,
    /// Ordered billable lines. Zero-quantity lines are kept here and
    /// filtered (with an advisory) by the run loop.
    pub entries: Vec<UsageLine>,
    /// Grouping header, detailed reports only.
    pub detail: Option<DetailHeader>,
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    for a in e.attributes().flatten() {
        if a.key.as_ref() == key.as_bytes() {
            return String::from_utf8(a.value.to_vec()).ok();
        }
    }
    None
}

/// Lenient client-count parse: trims, tolerates garbage and negative
/// values as 0 so they fall into the zero-clients filter.
fn count_attr(e: &BytesStart<'_>, key: &str) -> u32 {
    attr(e, key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn server_line(e: &BytesStart<'_>, id_keys: [&str; 2]) -> UsageLine {
    let identifier = attr(e, id_keys[0])
        .or_else(|| attr(e, id_keys[1]))
        .unwrap_or_default()
        .trim()
        .to_string();
    UsageLine {
        identifier,
        quantity: count_attr(e, "MaxActiveClients"),
    }
}

fn license_line(e: &BytesStart<'_>) -> UsageLine {
    UsageLine {
        identifier: attr(e, "LicenseKey").unwrap_or_default().trim().to_string(),
        quantity: count_attr(e, "ActiveClients"),
    }
}

fn entry_open(e: &BytesStart<'_>) -> RawEntry {
    RawEntry {
        header: DetailHeader {
            company: attr(e, "Company").unwrap_or_default(),
            gd_customer_nr: attr(e, "GDCustomerNr").unwrap_or_default(),
            login: attr(e, "Login").unwrap_or_default(),
            product: attr(e, "Product").unwrap_or_default(),
            max_active_clients: attr(e, "MaxActiveClients").unwrap_or_else(|| "0".to_string()),
        },
        month: attr(e, "Month"),
        year: attr(e, "Year"),
        servers: Vec::new(),
    }
}

/// Parse a usage document into its raw shape in a single streaming pass.
pub fn parse_report(xml: &str) -> Result<RawReport, BillingError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut raw = RawReport::default();
    let mut current_entry: Option<RawEntry> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                open_element(&mut raw, &mut current_entry, e, depth);
                depth += 1;
            }
            Ok(Event::Empty(ref e)) => {
                open_element(&mut raw, &mut current_entry, e, depth);
                // Self-closing ReportEntry carries no nested servers.
                if depth == 1 {
                    if let Some(entry) = current_entry.take() {
                        raw.entries.push(entry);
                    }
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    if let Some(entry) = current_entry.take() {
                        raw.entries.push(entry);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(BillingError::Xml(e.to_string())),
            _ => {}
        }
    }

    if raw.root_tag.is_empty() {
        return Err(BillingError::Xml("document has no root element".to_string()));
    }
    Ok(raw)
}

fn open_element(
    raw: &mut RawReport,
    current_entry: &mut Option<RawEntry>,
    e: &BytesStart<'_>,
    depth: usize,
) {
    let name = e.name();
    match depth {
        0 => {
            raw.root_tag = String::from_utf8_lossy(name.as_ref()).into_owned();
            raw.root_month = attr(e, "Month");
            raw.root_year = attr(e, "Year");
        }
        1 => match name.as_ref() {
            b"ManagementServer" => raw.servers.push(server_line(e, ["Id", "id"])),
            b"License" => raw.licenses.push(license_line(e)),
            b"ReportEntry" => *current_entry = Some(entry_open(e)),
            _ => {}
        },
        2 => {
            if name.as_ref() == b"ManagementServer" {
                if let Some(entry) = current_entry.as_mut() {
                    entry.servers.push(server_line(e, ["id", "Id"]));
                }
            }
        }
        _ => {}
    }
}

/// Classify a document by shape alone: root `MesReport` → MES, root
/// `MxdrMspReport` → MXDR, any `ReportEntry` child → detailed, else
/// unknown.
pub fn classify(raw: &RawReport) -> ReportKind {
    match raw.root_tag.as_str() {
        "MesReport" => ReportKind::Mes,
        "MxdrMspReport" => ReportKind::Mxdr,
        _ if !raw.entries.is_empty() => ReportKind::Detailed,
        _ => ReportKind::Unknown,
    }
}

impl RawReport {
    /// Assemble the billable report for a resolved period.
    ///
    /// Detailed reports must carry exactly one `ReportEntry`; anything
    /// else is a hard failure for the whole report, not a per-line skip.
    /// An MXDR report without `License` entries is rejected with a
    /// guidance message rather than billed as empty.
    pub fn into_report(self, period: BillingPeriod) -> Result<UsageReport, BillingError> {
        let kind = classify(&self);
        match kind {
            ReportKind::Mes => Ok(UsageReport {
                kind,
                period,
                entries: self.servers,
                detail: None,
            }),
            ReportKind::Mxdr => {
                if self.licenses.is_empty() {
                    return Err(BillingError::MxdrWithoutLicenses);
                }
                Ok(UsageReport {
                    kind,
                    period,
                    entries: self.licenses,
                    detail: None,
                })
            }
            ReportKind::Detailed => {
                let count = self.entries.len();
                let mut entries = self.entries.into_iter();
                match (count, entries.next()) {
                    (1, Some(entry)) => Ok(UsageReport {
                        kind,
                        period,
                        entries: entry.servers,
                        detail: Some(entry.header),
                    }),
                    (n, _) => Err(BillingError::MalformedDetailedReport(n)),
                }
            }
            ReportKind::Unknown => Err(BillingError::UnsupportedReport(self.root_tag)),
        }
    }
}

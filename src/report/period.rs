use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::{BillingError, BillingPeriod};

use super::parse::RawReport;

static MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<m>\d{1,2})[_\-.](?P<y>\d{4})").expect("valid pattern"));
static YEAR_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<y>\d{4})[_\-.](?P<m>\d{1,2})").expect("valid pattern"));

/// Where the billing period was found. Kept for the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSource {
    RootAttributes,
    EntryAttributes,
    ArchiveName,
    MemberName,
}

impl fmt::Display for PeriodSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RootAttributes => "MesReport attributes",
            Self::EntryAttributes => "ReportEntry attributes",
            Self::ArchiveName => "zip filename",
            Self::MemberName => "xml filename",
        })
    }
}

/// Infer the billing month/year, in priority order: MES root attributes,
/// first ReportEntry attributes, archive file name, member file name.
/// Report attributes beat file names even when they conflict.
pub fn resolve_period(
    raw: &RawReport,
    archive_name: &str,
    member_name: &str,
) -> Result<(BillingPeriod, PeriodSource), BillingError> {
    if raw.root_tag == "MesReport" {
        if let Some(period) = period_from_attrs(raw.root_month.as_deref(), raw.root_year.as_deref())
        {
            return Ok((period, PeriodSource::RootAttributes));
        }
    }

    if let Some(entry) = raw.entries.first() {
        if let Some(period) = period_from_attrs(entry.month.as_deref(), entry.year.as_deref()) {
            return Ok((period, PeriodSource::EntryAttributes));
        }
    }

    if let Some(period) = scan_name(archive_name) {
        return Ok((period, PeriodSource::ArchiveName));
    }
    if let Some(period) = scan_name(member_name) {
        return Ok((period, PeriodSource::MemberName));
    }

    Err(BillingError::PeriodUnresolved)
}

fn period_from_attrs(month: Option<&str>, year: Option<&str>) -> Option<BillingPeriod> {
    let month = month?.trim().parse::<u32>().ok()?;
    let year = year?.trim().parse::<i32>().ok()?;
    BillingPeriod::new(month, year)
}

/// Scan the lowercased basename for `<month>[sep]<year>` then
/// `<year>[sep]<month>`, separators `_`, `-` or `.`. The four-digit group
/// must be ≥ 2000 to avoid false positives on unrelated digit runs.
fn scan_name(name: &str) -> Option<BillingPeriod> {
    let base = name.rsplit(['/', '\\']).next()?.to_lowercase();
    for re in [&*MONTH_YEAR, &*YEAR_MONTH] {
        if let Some(caps) = re.captures(&base) {
            let month = caps.name("m")?.as_str().parse::<u32>().ok()?;
            let year = caps.name("y")?.as_str().parse::<i32>().ok()?;
            if year >= 2000 {
                if let Some(period) = BillingPeriod::new(month, year) {
                    return Some(period);
                }
            }
        }
    }
    None
}

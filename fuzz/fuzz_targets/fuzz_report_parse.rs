#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Must not panic — errors are fine, panics are bugs.
        if let Ok(raw) = abrechnung::report::parse_report(s) {
            let _ = abrechnung::report::resolve_period(&raw, "fuzz.zip", "fuzz.xml");
            let _ = raw.into_report(abrechnung::BillingPeriod {
                month: 1,
                year: 2025,
            });
        }
    }
});

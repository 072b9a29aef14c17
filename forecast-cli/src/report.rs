//! Plain-text rendering of a forecast for the `summary` command.

use std::fmt::Write;

use forecast_core::calculations::common::format_cents;
use forecast_core::{ClassResult, ForecastResponse};

const RULE_WIDTH: usize = 96;

fn class_line(
    out: &mut String,
    name: &str,
    result: &ClassResult,
) {
    let _ = writeln!(
        out,
        "{:<28} {:>8} {:>8} {:>24} {:>24}",
        name,
        result.parcel_count,
        result.exemption_count,
        format_cents(result.certified_value),
        format_cents(result.certified_revenue),
    );
}

/// One line per class with its tier rows indented beneath, then the totals.
/// Amounts are rounded half-up to cents.
pub fn render_summary(response: &ForecastResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<28} {:>8} {:>8} {:>24} {:>24}",
        "Class", "Parcels", "Exempt", "Certified value", "Certified revenue"
    );
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

    for (class, result) in &response.results_by_class {
        class_line(&mut out, class.name(), result);
        for row in result.tier_breakdown.iter().flatten() {
            let _ = writeln!(
                out,
                "    {:<58} {:>8} {:>24}",
                row.label,
                row.rate.normalize().to_string(),
                format_cents(row.revenue),
            );
        }
    }

    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    class_line(&mut out, "TOTAL", &response.totals);
    out
}

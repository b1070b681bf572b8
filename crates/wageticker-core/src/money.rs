//! Parsing and formatting of amounts as the user types and reads them.

/// Parse a number written with either `.` or `,` as decimal separator.
///
/// Returns `None` for empty or unparsable input and for non-finite values.
pub fn parse_localized(input: &str) -> Option<f64> {
    let standardized = input.trim().replace(',', ".");
    if standardized.is_empty() {
        return None;
    }
    standardized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `€12.34` style rendering with a fixed number of decimals.
pub fn format_currency(value: f64, symbol: &str, decimals: usize) -> String {
    format!("{symbol}{value:.decimals$}")
}

use crate::models::Labels;

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use viz_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    // Handle the sign separately so the thousands grouping works on the
    // absolute value.
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Round to the requested decimal places.
    // Add a tiny epsilon (half ULP at the target precision) before rounding
    // to avoid IEEE 754 binary-representation issues at exact midpoints.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    // Build the thousands-separated integer portion.
    let int_str = integer_part.to_string();
    let grouped = group_thousands(&int_str);

    let result = if decimals == 0 {
        grouped
    } else {
        // Format the fractional part to the exact number of decimals.
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // `frac_str` starts with "0.", e.g. "0.50". Strip the leading "0".
        let decimal_digits = &frac_str[1..]; // ".50"
        format!("{}{}", grouped, decimal_digits)
    };

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format an amount with two decimals, thousands separators and the
/// locale's currency suffix.
///
/// # Examples
///
/// ```
/// use viz_core::formatting::format_amount;
/// use viz_core::models::Labels;
///
/// assert_eq!(format_amount(1234.5, &Labels::zh()), "1,234.50元");
/// assert_eq!(format_amount(32.0, &Labels::en()), "32.00");
/// ```
pub fn format_amount(amount: f64, labels: &Labels) -> String {
    format!("{}{}", format_number(amount, 2), labels.currency)
}

/// Format a percentage with one decimal, as shown on the proportion chart.
///
/// ```
/// use viz_core::formatting::format_percent;
///
/// assert_eq!(format_percent(58.44), "58.4%");
/// ```
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Relative slack allowed by [`share_at_least`].
///
/// Two-decimal amounts are not exact in binary, so a share that is exactly
/// on a threshold on paper can land a few ulps below it.
const SHARE_TOLERANCE: f64 = 1e-9;

/// Unrounded share of `part` in `whole`, in percent.
///
/// Returns `0.0` if `whole` is zero.  The result carries ordinary `f64`
/// rounding error (0.57 of 19.00 gives `2.9999999999999996`), so use
/// [`share_at_least`] for threshold decisions.
pub fn share_percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    part * 100.0 / whole
}

/// `true` when `part` is at least `threshold_percent` of `whole`.
///
/// Compares `part * 100` against `threshold_percent * whole` without
/// dividing and treats a relative difference below 1e-9 as equal.
///
/// ```
/// use viz_core::formatting::share_at_least;
///
/// assert!(share_at_least(0.57, 19.0, 3.0));
/// assert!(!share_at_least(2.99, 100.0, 3.0));
/// ```
pub fn share_at_least(part: f64, whole: f64, threshold_percent: f64) -> bool {
    let scaled = part * 100.0;
    let bound = threshold_percent * whole;
    scaled >= bound || (bound - scaled) <= SHARE_TOLERANCE * bound.abs().max(scaled.abs())
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use viz_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Rounds half away from zero to `decimals` fraction digits.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Formats a number with one or two fraction digits: `6.0`, `97.5`, `65.43`.
pub fn format_decimal(value: f64) -> String {
    let s = format!("{:.2}", value);
    match s.strip_suffix('0') {
        Some(trimmed) => trimmed.to_string(),
        None => s,
    }
}

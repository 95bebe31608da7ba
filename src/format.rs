//! Brazilian number formatting used across the proposal.
//!
//! Thousands are separated with `.` and decimals with `,`, currency values carry
//! the `R$` prefix.

/// Formats `value` with `decimals` fractional digits, e.g. `1.234,56`.
pub fn format_number_br(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match rendered.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (rendered.as_str(), None),
    };

    let mut output = String::with_capacity(rendered.len() + integer.len() / 3 + 1);
    if value < 0.0 && has_nonzero_digit(&rendered) {
        output.push('-');
    }
    output.push_str(&group_thousands(integer));
    if let Some(fraction) = fraction {
        output.push(',');
        output.push_str(fraction);
    }
    output
}

/// Whether `value` still reads as negative once rounded to `decimals` places.
///
/// `-0.001` at two decimals prints as `0,00` and is not negative.
pub fn is_negative_at(value: f64, decimals: usize) -> bool {
    value < 0.0 && has_nonzero_digit(&format!("{:.*}", decimals, value.abs()))
}

fn has_nonzero_digit(rendered: &str) -> bool {
    rendered.bytes().any(|b| matches!(b, b'1'..=b'9'))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let len = digits.len();
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

/// Formats a monetary value, e.g. `R$ 1.234,56`.
pub fn format_currency_br(value: f64) -> String {
    format!("R$ {}", format_number_br(value, 2))
}

/// Formats a monetary value with the sign in front of the currency marker,
/// e.g. `-R$ 1.234,56`.
pub fn format_signed_currency_br(value: f64) -> String {
    if is_negative_at(value, 2) {
        format!("-{}", format_currency_br(value.abs()))
    } else {
        format_currency_br(value)
    }
}

/// `4.560 kWh`
pub fn format_energy_kwh(value: f64) -> String {
    format!("{} kWh", format_number_br(value, 0))
}

/// `20,00 kW`
pub fn format_power_kw(value: f64) -> String {
    format!("{} kW", format_number_br(value, 2))
}

/// `37,20 kWp`
pub fn format_power_kwp(value: f64) -> String {
    format!("{} kWp", format_number_br(value, 2))
}

/// Portuguese masculine ordinal, e.g. `4º`.
pub fn ordinal(number: u32) -> String {
    format!("{number}º")
}

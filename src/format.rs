//! Locale-aware presentation helpers used by the read-only templates

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::settings::LocaleSettings;

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

/// Format an ISO date (or datetime) as a locale date. Unparseable input is
/// returned unchanged.
pub fn format_date(raw: &str, locale: &LocaleSettings) -> String {
    match parse_date(raw.trim()) {
        Some(date) => date.format(&locale.date_format).to_string(),
        None => raw.to_string(),
    }
}

/// Format an ISO datetime as a locale date + time. A bare date is formatted
/// as a date.
pub fn format_datetime(raw: &str, locale: &LocaleSettings) -> String {
    let raw = raw.trim();
    if let Some(dt) = parse_datetime(raw) {
        return dt.format(&locale.datetime_format).to_string();
    }
    format_date(raw, locale)
}

/// Insert the locale thousands separator into a run of digits
pub fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.chars().count();
    let mut out = String::with_capacity(digits.len() + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

/// `1234.5` -> `R$ 1.234,50`
pub fn format_currency(amount: f64, locale: &LocaleSettings) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = group_thousands(&(cents / 100).to_string(), &locale.thousands_separator);
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}{} {}{}{:02}",
        sign,
        locale.currency_symbol,
        whole,
        locale.decimal_separator,
        cents % 100
    )
}

/// Locale number with up to two decimals, trailing zeros dropped
pub fn format_number(value: f64, locale: &LocaleSettings) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", value.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac.trim_end_matches('0');
    let whole = group_thousands(whole, &locale.thousands_separator);
    if frac.is_empty() {
        format!("{}{}", sign, whole)
    } else {
        format!("{}{}{}{}", sign, whole, locale.decimal_separator, frac)
    }
}

/// Numeric reading of a JSON value. Strings accept a comma decimal separator.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<f64>().ok().or_else(|| s.replace('.', "").replace(',', ".").parse().ok())
        }
        _ => None,
    }
}

/// `tel:` target for a phone number: digits plus a leading `+`
pub fn phone_href(raw: &str) -> String {
    let mut out = String::from("tel:");
    for (i, c) in raw.trim().chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn br() -> LocaleSettings {
        LocaleSettings::default()
    }

    #[test]
    fn test_format_date_variants() {
        assert_eq!(format_date("2024-03-05", &br()), "05/03/2024");
        assert_eq!(format_date("2024-03-05T14:30:00Z", &br()), "05/03/2024");
        assert_eq!(format_date("amanhã", &br()), "amanhã");
    }

    #[test]
    fn test_format_datetime() {
        assert_eq!(format_datetime("2024-03-05T14:30", &br()), "05/03/2024 14:30");
        assert_eq!(format_datetime("2024-03-05", &br()), "05/03/2024");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1234.5, &br()), "R$ 1.234,50");
        assert_eq!(format_currency(0.0, &br()), "R$ 0,00");
        assert_eq!(format_currency(-1_000_000.0, &br()), "-R$ 1.000.000,00");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1500.0, &br()), "1.500");
        assert_eq!(format_number(2.5, &br()), "2,5");
    }

    #[test]
    fn test_value_as_f64() {
        assert_eq!(value_as_f64(&json!(3)), Some(3.0));
        assert_eq!(value_as_f64(&json!("1.234,56")), Some(1234.56));
        assert_eq!(value_as_f64(&json!("12.5")), Some(12.5));
        assert_eq!(value_as_f64(&json!(true)), None);
    }

    #[test]
    fn test_phone_href() {
        assert_eq!(phone_href("+55 (11) 91234-5678"), "tel:+5511912345678");
    }
}

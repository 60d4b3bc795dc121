use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Formats accepted for entry and operation dates, tried in order.
const DATE_FORMATS: [&str; 9] = [
    "%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%y", "%Y/%m/%d", "%d.%m.%Y", "%Y.%m.%d",
    "%d %m %Y", "%Y %m %d",
];

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.,\-]").unwrap());

/// Parses an amount from a raw JSON value.
///
/// Numbers pass through. Strings are cleaned of anything outside `[0-9.,-]`,
/// then the decimal separator is decided: when both `,` and `.` occur, the
/// rightmost of the two is decimal and the other is grouping; a lone comma is
/// decimal only when followed by one or two digits. Empty, `N/A`, null and
/// unparsable values all collapse to `0.0`.
pub fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_amount_str(s),
        _ => 0.0,
    }
}

pub fn parse_amount_str(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "N/A" {
        return 0.0;
    }

    let mut cleaned = NON_NUMERIC.replace_all(trimmed, "").into_owned();
    if cleaned.is_empty() || cleaned == "-" {
        return 0.0;
    }

    match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                // European style: 1.234,56
                cleaned = cleaned.replace('.', "").replace(',', ".");
            } else {
                // English style: 1,234.56
                cleaned = cleaned.replace(',', "");
            }
        }
        (Some(comma), None) => {
            let fractional_digits = cleaned.len() - comma - 1;
            if (1..=2).contains(&fractional_digits) {
                cleaned = cleaned.replace(',', ".");
            } else {
                cleaned = cleaned.replace(',', "");
            }
        }
        _ => {}
    }

    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Parses a date in any of the supported wire formats. First format that
/// matches wins; anything else is `None` and ends up counted in
/// `entries_without_date`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "N/A" {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Renders a date in the `DD/MM/YYYY` form used inside GL and RL documents.
pub fn to_wire_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Strict parse of the GL/RL wire form `DD/MM/YYYY`.
pub fn from_wire_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

static ACCOUNT_ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*\d{3,}\s*\)").unwrap());
static EDGE_TRIM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\w&]+|[^\w&.\-]+$").unwrap());
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Extracts the counterparty (client or supplier) name carried in a ledger
/// label.
///
/// `"Encaissement FAC2025010102 - InfoVista Ltd"` yields `"InfoVista Ltd"`;
/// account annotations such as `"(411)"` are stripped. Labels with no
/// plausible name yield `"Inconnu"`.
pub fn extract_counterparty_name(label: &str) -> String {
    let name_part = match label.rsplit_once(" - ") {
        Some((_, tail)) => tail.trim(),
        None => label.trim(),
    };

    let without_annotation = ACCOUNT_ANNOTATION.replace_all(name_part, "");
    let trimmed = EDGE_TRIM.replace_all(without_annotation.trim(), "");
    let collapsed = MULTI_SPACE.replace_all(trimmed.trim(), " ").into_owned();

    if collapsed.chars().count() > 2 {
        collapsed
    } else {
        "Inconnu".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locale_amounts() {
        assert_eq!(parse_amount_str("1 234,56"), 1234.56);
        assert_eq!(parse_amount_str("1,234.56"), 1234.56);
        assert_eq!(parse_amount_str("1234.56"), 1234.56);
        assert_eq!(parse_amount_str("1.234,56"), 1234.56);
        assert_eq!(parse_amount_str("-1 234,56"), -1234.56);
    }

    #[test]
    fn test_amount_defaults_to_zero() {
        assert_eq!(parse_amount_str(""), 0.0);
        assert_eq!(parse_amount_str("N/A"), 0.0);
        assert_eq!(parse_amount_str("-"), 0.0);
        assert_eq!(parse_amount(&Value::Null), 0.0);
        assert_eq!(parse_amount(&json!(true)), 0.0);
    }

    #[test]
    fn test_amount_from_number() {
        assert_eq!(parse_amount(&json!(42)), 42.0);
        assert_eq!(parse_amount(&json!(-12.5)), -12.5);
    }

    #[test]
    fn test_lone_comma_heuristic() {
        // One or two digits after the comma: decimal separator.
        assert_eq!(parse_amount_str("123,4"), 123.4);
        assert_eq!(parse_amount_str("123,45"), 123.45);
        // Three digits: grouping separator.
        assert_eq!(parse_amount_str("1,234"), 1234.0);
        assert_eq!(parse_amount_str("1,234,567"), 1234567.0);
    }

    #[test]
    fn test_currency_noise_is_stripped() {
        assert_eq!(parse_amount_str("1 234,56 €"), 1234.56);
        assert_eq!(parse_amount_str("EUR 99.90"), 99.90);
    }

    #[test]
    fn test_amount_round_trip() {
        for raw in ["1 234,56", "-42", "0,5", "1.234.567,89"] {
            let once = parse_amount_str(raw);
            let again = parse_amount_str(&format!("{once}"));
            assert_eq!(once, again, "round-trip failed for {raw}");
        }
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        for raw in [
            "15/03/2024",
            "2024-03-15",
            "15-03-2024",
            "15/03/24",
            "2024/03/15",
            "15.03.2024",
            "2024.03.15",
            "15 03 2024",
            "2024 03 15",
        ] {
            assert_eq!(parse_date(raw), Some(expected), "failed for {raw}");
        }
    }

    #[test]
    fn test_unparsable_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("N/A"), None);
        assert_eq!(parse_date("pas une date"), None);
        assert_eq!(parse_date("32/13/2024"), None);
    }

    #[test]
    fn test_wire_date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(from_wire_date(&to_wire_date(date)), Some(date));
        assert_eq!(to_wire_date(date), "03/01/2024");
    }

    #[test]
    fn test_counterparty_extraction() {
        assert_eq!(
            extract_counterparty_name("Encaissement FAC2025010102 - InfoVista Ltd"),
            "InfoVista Ltd"
        );
        assert_eq!(
            extract_counterparty_name("Chèque encaissé N°6593816 - Crédit Mutuel"),
            "Crédit Mutuel"
        );
        assert_eq!(extract_counterparty_name("InfoVista Ltd (411)"), "InfoVista Ltd");
        assert_eq!(extract_counterparty_name(""), "Inconnu");
        assert_eq!(extract_counterparty_name("AB"), "Inconnu");
    }
}

//! Text normalization and locale-aware parsing for note text.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Amount in the note locale: "1.234,56", "0,71", "4.850,0000"
pub static RE_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d.]*,\d+").unwrap());

/// Remove diacritics ("Negócios" -> "Negocios")
pub fn remove_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Accent-free, lowercase, single-spaced text for keyword checks
pub fn fold(text: &str) -> String {
    let lowered = remove_accents(text).to_lowercase();
    RE_WHITESPACE.replace_all(lowered.trim(), " ").into_owned()
}

/// Parse a Brazilian decimal number (1.234,56 -> 1234.56)
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let cleaned = s
        .trim()
        .replace('.', "")
        .replace(',', ".");

    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Parse an integer quantity, tolerating thousand separators ("1.000")
pub fn parse_quantity(s: &str) -> Option<u64> {
    s.trim().replace('.', "").parse::<u64>().ok()
}

/// Parse a note date (DD/MM/YYYY -> NaiveDate)
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y").ok()
}

/// Round to the currency's minor unit
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_remove_accents() {
        assert_eq!(remove_accents("Negócios realizados"), "Negocios realizados");
        assert_eq!(remove_accents("Ajuste de posição"), "Ajuste de posicao");
        assert_eq!(remove_accents("ITAÚ"), "ITAU");
        assert_eq!(remove_accents("plain"), "plain");
    }

    #[test]
    fn test_fold_collapses_whitespace() {
        assert_eq!(fold("  Resumo  dos\nNegócios \t"), "resumo dos negocios");
        assert_eq!(fold("C/V Mercadoria\r\nVencimento"), "c/v mercadoria vencimento");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1.234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_decimal("2850,00"), Some(dec!(2850.00)));
        assert_eq!(parse_decimal("0,01"), Some(dec!(0.01)));
        assert_eq!(parse_decimal("4.850,0000"), Some(dec!(4850)));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("100"), Some(100));
        assert_eq!(parse_quantity("1.000"), Some(1000));
        assert_eq!(parse_quantity("1,5"), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("04/01/2024"), NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(parse_date("31/02/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_amount_regex() {
        let found: Vec<&str> = RE_AMOUNT
            .find_iter("0,00 1.234,56 C 12 4.850,0000")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["0,00", "1.234,56", "4.850,0000"]);
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(dec!(-0.009)), dec!(-0.01));
        assert_eq!(round_cents(dec!(0.004)), dec!(0.00));
    }
}

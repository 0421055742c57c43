//! Note metadata: invoice number, trading date, client tax id.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::fold;

static RE_INLINE_INVOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)nota\s*(?:nº|no|n°|num)?[\s:]*\s*(\d{4,})").unwrap());
static RE_LONG_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4,}").unwrap());
static RE_TABLE_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}|\d+").unwrap());

static RE_CPF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{3}[.\s]?\d{3}[.\s]?\d{3}[-\s]?\d{2})").unwrap());
static RE_CNPJ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2})").unwrap());

/// Labels whose following line carries the note number
const INVOICE_LABELS: &[&str] = &["nr. nota", "nr nota", "nº nota", "nota de negociacao"];

/// Invoice number from the header table at the top of the note.
///
/// Tried before the broker patterns since most layouts share it.
pub fn extract_top_invoice(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        let folded = fold(line);
        let next = lines.get(i + 1);

        // "Nr.nota Folha Data pregão" followed by "123456 1 04/01/2024"
        if folded.contains("nr.nota") && folded.contains("data pregao") {
            let number = next.and_then(|n| {
                RE_TABLE_CELL
                    .find_iter(n)
                    .map(|m| m.as_str())
                    .find(|cell| !cell.contains('/'))
            });
            if let Some(number) = number {
                return Some(number.to_string());
            }
        }

        if let Some(caps) = RE_INLINE_INVOICE.captures(line) {
            return Some(caps[1].to_string());
        }

        if INVOICE_LABELS.iter().any(|l| folded.contains(l)) {
            if let Some(m) = next.and_then(|n| RE_LONG_NUMBER.find(n)) {
                return Some(m.as_str().to_string());
            }
        }
    }

    None
}

/// Capture group 1 of the first pattern that matches, or ""
pub fn first_match(text: &str, patterns: &[Regex]) -> String {
    patterns
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .unwrap_or_default()
}

/// CPF on the line labelled "CPF" or the line below it, CNPJ as fallback
pub fn extract_client_tax_id(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        if !line.to_lowercase().contains("cpf") {
            continue;
        }
        let candidates: Vec<&str> = std::iter::once(*line)
            .chain(lines.get(i + 1).copied())
            .collect();

        let found = candidates
            .iter()
            .find_map(|l| RE_CPF.captures(l))
            .or_else(|| candidates.iter().find_map(|l| RE_CNPJ.captures(l)));

        if let Some(caps) = found {
            return caps[1].replace(' ', "").trim().to_string();
        }
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_table_with_date_line() {
        let text = "Nr.nota Folha Data pregão\n98765 1 05/02/2024\n";
        assert_eq!(extract_top_invoice(text), Some("98765".to_string()));
    }

    #[test]
    fn test_inline_invoice() {
        assert_eq!(
            extract_top_invoice("Nota nº: 445566"),
            Some("445566".to_string())
        );
        assert_eq!(extract_top_invoice("Nota 12"), None);
    }

    #[test]
    fn test_label_then_number_line() {
        let text = "NOTA DE NEGOCIAÇÃO\nNr. nota Folha Data pregão\n123456 1 04/01/2024";
        assert_eq!(extract_top_invoice(text), Some("123456".to_string()));
    }

    #[test]
    fn test_first_match_order() {
        let patterns = vec![
            Regex::new(r"Data\s+pregao\s*(\d{2}/\d{2}/\d{4})").unwrap(),
            Regex::new(r"(\d{2}/\d{2}/\d{4})").unwrap(),
        ];
        assert_eq!(first_match("01/01/2020 Data pregao 04/01/2024", &patterns), "04/01/2024");
        assert_eq!(first_match("emitido 01/01/2020", &patterns), "01/01/2020");
        assert_eq!(first_match("sem data", &patterns), "");
    }

    #[test]
    fn test_cpf_on_next_line() {
        let text = "Cliente CPF\nJOAO DA SILVA 123.456.789-00\n";
        assert_eq!(extract_client_tax_id(text), "123.456.789-00");
    }

    #[test]
    fn test_cpf_with_spaces_is_compacted() {
        assert_eq!(extract_client_tax_id("C.P.F./CPF: 123 456 789 00"), "12345678900");
    }

    #[test]
    fn test_cnpj_fallback() {
        let text = "CPF/CNPJ\nEMPRESA LTDA 12.345.678/0001-90";
        assert_eq!(extract_client_tax_id(text), "12.345.678/0001-90");
    }

    #[test]
    fn test_no_tax_id() {
        assert_eq!(extract_client_tax_id("Cliente 12345"), "");
    }
}

//! Spot vs futures classification of note text.
//!
//! Works on a single page or on a whole document; callers pass whatever
//! granularity they need.

use crate::models::MarketKind;
use crate::normalize::fold;

const SPOT_PHRASES: &[&str] = &[
    "negocios realizados",
    "resumo dos negocios",
    "negocios efetuados",
];

/// Phrases that never show up on a spot note
const FUTURES_ONLY_PHRASES: &[&str] = &[
    "c/v mercadoria",
    "ajuste de posicao",
    "ajuste day trade",
    "taxa registro bmf",
    "taxa registro bm&f",
    "irrf day trade",
];

const FUTURES_HEADER: &str = "c/v mercadoria vencimento";
const FUTURES_ADJUSTMENT: &str = "ajuste de posicao";

/// Broader futures vocabulary, used as a last resort
const FUTURES_VOCABULARY: &[&str] = &[
    "ajuste day trade",
    "taxa registro bmf",
    "taxa registro bm&f",
    "irrf day trade",
    "vencimento",
    "c/v mercadoria",
];

/// Classify raw note text. Accents, case and line breaks are ignored.
pub fn classify(text: &str) -> MarketKind {
    classify_folded(&fold(text))
}

/// Classify text that already went through [`fold`]
pub fn classify_folded(normalized: &str) -> MarketKind {
    let has_spot = SPOT_PHRASES.iter().any(|p| normalized.contains(p));
    let has_futures_only = FUTURES_ONLY_PHRASES.iter().any(|p| normalized.contains(p));

    if has_spot && !has_futures_only {
        return MarketKind::Spot;
    }

    if normalized.contains(FUTURES_HEADER) && normalized.contains(FUTURES_ADJUSTMENT) {
        return MarketKind::Futures;
    }

    if FUTURES_VOCABULARY.iter().any(|p| normalized.contains(p)) {
        return MarketKind::Futures;
    }

    MarketKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_note() {
        let text = "NOTA DE NEGOCIAÇÃO\nNegócios realizados\nB3 RV LISTADO C VISTA PETR4 100 28,50 2850,00 D\nResumo dos Negócios";
        assert_eq!(classify(text), MarketKind::Spot);
        assert_eq!(classify("NEGÓCIOS EFETUADOS"), MarketKind::Spot);
    }

    #[test]
    fn test_futures_note() {
        let text = "C/V Mercadoria\nVencimento Quantidade Preço/Ajuste\nAjuste de posição 0,00";
        assert_eq!(classify(text), MarketKind::Futures);
    }

    #[test]
    fn test_spot_phrase_with_futures_vocabulary_is_futures() {
        let text = "Resumo dos Negócios\nAjuste day trade 242,50 C";
        assert_eq!(classify(text), MarketKind::Futures);
    }

    #[test]
    fn test_fallback_vocabulary() {
        assert_eq!(classify("IRRF Day Trade (proj.) 2,42"), MarketKind::Futures);
        assert_eq!(classify("Taxa registro BM&F 0,00"), MarketKind::Futures);
        assert_eq!(classify("Data de vencimento"), MarketKind::Futures);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify("Informe de rendimentos 2023"), MarketKind::Unknown);
        assert_eq!(classify(""), MarketKind::Unknown);
    }
}

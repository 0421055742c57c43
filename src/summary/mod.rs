//! Note summary ("Resumo") extraction.
//!
//! Two layouts exist in the wild. Most spot notes print each label next to
//! its amount, so a label-anchored regex finds it. Futures notes print a
//! row of labels followed by a row of amounts, which needs positional
//! parsing.

mod label;
mod positional;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::extract::ParseContext;
use crate::models::{MarketKind, SummaryField};

pub use label::{extract_label_anchored, label_pattern};
pub use positional::{extract_positional, FUTURES_LAYOUT};

/// How a broker prints the summary of a given record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStrategy {
    /// "label amount [C|D]" on the same line
    LabelAnchored,
    /// Label rows followed by rows of amounts, matched by position
    Positional,
}

/// A canonical summary key and the labels it appears under
#[derive(Debug, Clone, Copy)]
pub struct SummaryKey {
    pub key: &'static str,
    /// Accent-free labels, tried in order
    pub aliases: &'static [&'static str],
}

/// Amount to be settled, printed as "Líquido para <date> <amount>"
pub const LIQUIDATED_KEY: &str = "Valor a ser Liquidado";

/// Miscellaneous costs; some layouts print the amount above the label
pub const OTHER_KEY: &str = "Outras";

/// Keys holding the gross traded value, in order of preference
pub const DECLARED_TOTAL_KEYS: &[&str] = &["Valor das operações", "Valor dos negócios"];

pub const SPOT_VOCABULARY: &[SummaryKey] = &[
    SummaryKey { key: "Debêntures", aliases: &["Debentures"] },
    SummaryKey { key: "Vendas à Vista", aliases: &["Vendas a vista", "Venda a Vista"] },
    SummaryKey { key: "Compras à Vista", aliases: &["Compras a vista", "Compra a Vista"] },
    SummaryKey { key: "Opções - compras", aliases: &["Opcoes - compras", "Compra Opcoes"] },
    SummaryKey { key: "Opções - vendas", aliases: &["Opcoes - vendas", "Venda Opcoes"] },
    SummaryKey { key: "Operações à termo", aliases: &["Operacoes a termo", "Operacao a Termo"] },
    SummaryKey {
        key: "Valor das oper. c/ títulos públ. (v. nom.)",
        aliases: &[
            "Valor das oper. c/ titulos publ. (v. nom.)",
            "Valor das oper. com titulos publicos",
            "Valor das operacoes com titulos publicos",
        ],
    },
    SummaryKey { key: "Valor das operações", aliases: &["Valor das operacoes", "Total das operacoes"] },
    SummaryKey {
        key: "Valor líquido das operações",
        aliases: &["Valor liquido das operacoes", "Liquido operacoes"],
    },
    SummaryKey { key: "Taxa de liquidação", aliases: &["Taxa de liquidacao", "Taxa liquidacao"] },
    SummaryKey { key: "Taxa de Registro", aliases: &["Taxa de Registro", "Registro"] },
    SummaryKey { key: "Total CBLC", aliases: &["Total CBLC"] },
    SummaryKey { key: "Taxa de termo/opções", aliases: &["Taxa de termo/opcoes", "Taxa termo/opcoes"] },
    SummaryKey { key: "Taxa A.N.A.", aliases: &["Taxa A.N.A.", "Taxa ANA"] },
    SummaryKey { key: "Emolumentos", aliases: &["Emolumentos"] },
    SummaryKey { key: "Total Bovespa / Soma", aliases: &["Total Bovespa / Soma", "Total Bovespa/Soma"] },
    SummaryKey { key: "Clearing", aliases: &["Clearing", "Taxa Operacional"] },
    SummaryKey { key: "Execução", aliases: &["Execucao"] },
    SummaryKey { key: "Execução casa", aliases: &["Execucao casa", "Taxa de Custodia"] },
    SummaryKey { key: "Corretagem", aliases: &["Corretagem"] },
    SummaryKey {
        key: "ISS",
        aliases: &["ISS(SAO PAULO)", "ISS (SAO PAULO)", "ISS* (SAO PAULO - SP)", "ISS", "Impostos"],
    },
    SummaryKey {
        key: "IRRF sobre operações",
        aliases: &[
            "I.R.R.F s/operacoes",
            "IRRF s/operacoes",
            "I.R.R.F. s/ operacoes",
            "IRRF s/ operacoes",
        ],
    },
    SummaryKey { key: OTHER_KEY, aliases: &["Outras", "Outros"] },
    SummaryKey {
        key: "Total corretagem / Despesas",
        aliases: &["Total corretagem / Despesas", "Total Custos / Despesas"],
    },
    SummaryKey { key: LIQUIDATED_KEY, aliases: &["Valor a ser Liquidado", "Liquido para"] },
];

pub const FUTURES_VOCABULARY: &[SummaryKey] = &[
    SummaryKey { key: "Venda disponível", aliases: &["Venda disponivel"] },
    SummaryKey { key: "Compra disponível", aliases: &["Compra disponivel"] },
    SummaryKey { key: "Venda Opções", aliases: &["Venda Opcoes"] },
    SummaryKey { key: "Compra Opções", aliases: &["Compra Opcoes"] },
    SummaryKey { key: "Valor dos negócios", aliases: &["Valor dos negocios"] },
    SummaryKey { key: "IRRF", aliases: &["IRRF"] },
    SummaryKey { key: "IRRF Day Trade (proj.)", aliases: &["IRRF Day Trade (proj.)", "IRRF Day Trade"] },
    SummaryKey { key: "Taxa operacional", aliases: &["Taxa operacional"] },
    SummaryKey { key: "Taxa registro BM&F", aliases: &["Taxa registro BM&F", "Taxa registro BMF"] },
    SummaryKey { key: "Taxas BM&F (emol+f.gar)", aliases: &["Taxas BM&F (emol+f.gar)", "Taxas BMF"] },
    SummaryKey { key: "Outros Custos", aliases: &["Outros Custos"] },
    SummaryKey { key: "ISS", aliases: &["ISS"] },
    SummaryKey { key: "Ajuste de posição", aliases: &["Ajuste de posicao"] },
    SummaryKey { key: "Ajuste day trade", aliases: &["Ajuste day trade"] },
    SummaryKey { key: "Total das despesas", aliases: &["Total das despesas"] },
    SummaryKey { key: "Outros", aliases: &["Outros"] },
    SummaryKey { key: "IRRF Corretagem", aliases: &["IRRF Corretagem"] },
    SummaryKey { key: "Total Conta Investimento", aliases: &["Total Conta Investimento"] },
    SummaryKey { key: "Total Conta Normal", aliases: &["Total Conta Normal"] },
    SummaryKey { key: "Total líquido (#)", aliases: &["Total liquido (#)"] },
    SummaryKey { key: "Total líquido da nota", aliases: &["Total liquido da nota"] },
];

/// Canonical vocabulary for a record kind
pub fn vocabulary(kind: MarketKind) -> &'static [SummaryKey] {
    match kind {
        MarketKind::Futures => FUTURES_VOCABULARY,
        _ => SPOT_VOCABULARY,
    }
}

/// Extract every canonical key of `kind` from the note pages.
///
/// The returned map always holds the full vocabulary; keys that could not
/// be located are [`SummaryField::missing`].
pub fn extract_summary(
    strategy: SummaryStrategy,
    kind: MarketKind,
    pages: &[String],
    ctx: &mut ParseContext,
) -> BTreeMap<String, SummaryField> {
    let vocab = vocabulary(kind);
    let mut fields = match strategy {
        SummaryStrategy::LabelAnchored => extract_label_anchored(vocab, pages, ctx),
        SummaryStrategy::Positional => extract_positional(vocab, pages, ctx),
    };

    for entry in vocab {
        fields
            .entry(entry.key.to_string())
            .or_insert_with(SummaryField::missing);
    }

    let missing = fields.values().filter(|f| !f.found).count();
    if missing == vocab.len() {
        ctx.warn("summary", "no summary values found", "");
    } else if missing > 0 {
        log::debug!("Summary: {} of {} keys not found", missing, vocab.len());
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_vocabulary_sizes() {
        assert_eq!(SPOT_VOCABULARY.len(), 25);
        assert_eq!(FUTURES_VOCABULARY.len(), 21);
        assert_eq!(FUTURES_LAYOUT.len(), FUTURES_VOCABULARY.len());
    }

    #[test]
    fn test_every_key_present_even_without_summary() {
        let mut ctx = ParseContext::new();
        let pages = vec!["nothing to see here".to_string()];
        for (strategy, kind) in [
            (SummaryStrategy::LabelAnchored, MarketKind::Spot),
            (SummaryStrategy::Positional, MarketKind::Futures),
        ] {
            let fields = extract_summary(strategy, kind, &pages, &mut ctx);
            assert_eq!(fields.len(), vocabulary(kind).len());
            assert!(fields.values().all(|f| !f.found && f.value == dec!(0)));
        }
        assert!(!ctx.warnings.is_empty());
    }

    #[test]
    fn test_declared_zero_differs_from_missing() {
        let mut ctx = ParseContext::new();
        let pages = vec!["Corretagem 0,00 D\n".to_string()];
        let fields = extract_summary(SummaryStrategy::LabelAnchored, MarketKind::Spot, &pages, &mut ctx);

        let corretagem = &fields["Corretagem"];
        assert!(corretagem.found);
        assert_eq!(corretagem.value, dec!(0));

        let emolumentos = &fields["Emolumentos"];
        assert!(!emolumentos.found);
        assert_eq!(emolumentos.value, dec!(0));
    }
}

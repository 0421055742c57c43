//! Positional summary extraction for block layouts:
//!
//! ```text
//! Venda disponível Compra disponível Venda Opções Compra Opções Valor dos negócios
//! 0,00 0,00 0,00 0,00 242,50 C
//! IRRF IRRF Day Trade (proj.) Taxa operacional Taxa registro BM&F Taxas BM&F (emol+f.gar)
//! 0,00 2,42 0,00 0,00 0,92
//! ```
//!
//! Every label line opens a new block, the amounts printed below it are
//! appended to that block, and each canonical key is resolved by its
//! (block, position) coordinate.

use std::collections::BTreeMap;

use super::SummaryKey;
use crate::extract::ParseContext;
use crate::models::{DebitCredit, SummaryField};
use crate::normalize::{fold, RE_AMOUNT};

/// Canonical key -> (block index, position within block)
pub const FUTURES_LAYOUT: &[(&str, usize, usize)] = &[
    ("Venda disponível", 0, 0),
    ("Compra disponível", 0, 1),
    ("Venda Opções", 0, 2),
    ("Compra Opções", 0, 3),
    ("Valor dos negócios", 0, 4),
    ("IRRF", 1, 0),
    ("IRRF Day Trade (proj.)", 1, 1),
    ("Taxa operacional", 1, 2),
    ("Taxa registro BM&F", 1, 3),
    ("Taxas BM&F (emol+f.gar)", 1, 4),
    ("Outros Custos", 2, 0),
    ("ISS", 2, 1),
    ("Ajuste de posição", 2, 2),
    ("Ajuste day trade", 2, 3),
    ("Total das despesas", 2, 4),
    ("Outros", 3, 0),
    ("IRRF Corretagem", 3, 1),
    ("Total Conta Investimento", 3, 2),
    ("Total Conta Normal", 3, 3),
    ("Total líquido (#)", 3, 4),
    ("Total líquido da nota", 3, 5),
];

/// Summary parsing starts at the first line holding this label
const ANCHOR: &str = "venda disponivel";

/// An amount token and the C/D token printed right after it, if any
type Slot = (String, Option<DebitCredit>);

fn is_label_line(folded: &str, labels: &[String]) -> bool {
    labels.iter().any(|l| folded.contains(l.as_str()))
}

/// Amount tokens of a line, each with the C/D token that follows it
fn tokenize_numbers(line: &str) -> Vec<Slot> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut slots = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let is_amount = RE_AMOUNT
            .find(token)
            .map(|m| m.start() == 0 && m.end() == token.len())
            .unwrap_or(false);
        if !is_amount {
            continue;
        }
        let flag = tokens.get(i + 1).and_then(|t| DebitCredit::from_code(t));
        slots.push((token.to_string(), flag));
    }

    slots
}

/// Split one page into blocks of amounts, starting at the summary anchor
fn page_blocks(page: &str, labels: &[String]) -> Vec<Vec<Slot>> {
    let mut blocks: Vec<Vec<Slot>> = Vec::new();
    let mut started = false;

    for line in page.lines() {
        let folded = fold(line);
        if folded.is_empty() {
            continue;
        }
        if !started {
            if !folded.contains(ANCHOR) {
                continue;
            }
            started = true;
        }

        if is_label_line(&folded, labels) {
            blocks.push(Vec::new());
        } else if line.chars().any(|c| c.is_ascii_digit()) {
            if let Some(current) = blocks.last_mut() {
                current.extend(tokenize_numbers(line));
            }
        }
    }

    blocks
}

/// Resolve each key of the layout from the first page carrying a summary.
pub fn extract_positional(
    vocab: &[SummaryKey],
    pages: &[String],
    ctx: &mut ParseContext,
) -> BTreeMap<String, SummaryField> {
    let labels: Vec<String> = vocab
        .iter()
        .flat_map(|k| k.aliases.iter().map(|a| fold(a)))
        .collect();
    let mut fields = BTreeMap::new();

    for page in pages {
        let blocks = page_blocks(page, &labels);
        if blocks.is_empty() {
            continue;
        }

        for (key, block, position) in FUTURES_LAYOUT {
            if fields.contains_key(*key) || !vocab.iter().any(|k| k.key == *key) {
                continue;
            }
            let slot = blocks.get(*block).and_then(|b| b.get(*position));
            if let Some((raw, flag)) = slot {
                let value = ctx.parse_amount(key, raw);
                fields.insert(key.to_string(), SummaryField::found(value, *flag));
            }
        }
    }

    fields
}

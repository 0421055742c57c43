//! Label-anchored summary extraction: "Corretagem ... R$ 15,00 D".

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use super::{SummaryKey, FUTURES_VOCABULARY, LIQUIDATED_KEY, OTHER_KEY, SPOT_VOCABULARY};
use crate::extract::ParseContext;
use crate::models::{DebitCredit, SummaryField};
use crate::normalize::{remove_accents, RE_AMOUNT};

static RE_LIQUIDATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)L[ií]quido\s+para\s+\d{2}/\d{2}/\d{4}(?:\s+\d{2}:\d{2}(?::\d{2})?)?\s+(?P<amount>\d[\d.]*,\d+)(?:[ \t]+(?P<flag>[CD])\b)?",
    )
    .unwrap()
});

static RE_OTHER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*outr[ao]s\b").unwrap());

/// Regex for one alias: the label, a separator without letters or digits
/// (optionally "R$"), the amount and an optional trailing C/D.
pub fn label_pattern(alias: &str) -> Option<Regex> {
    let boundary = if alias.starts_with(|c: char| c.is_alphanumeric()) {
        r"\b"
    } else {
        ""
    };
    let pattern = format!(
        r"(?i){}{}[^\w\n]*(?:R\$[^\w\n]*)?(?P<amount>\d[\d.]*,\d+)(?:[ \t]+(?P<flag>[CD])\b)?",
        boundary,
        regex::escape(alias)
    );
    Regex::new(&pattern).ok()
}

/// Alias patterns of the built-in vocabularies, compiled once
static ALIAS_PATTERNS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    SPOT_VOCABULARY
        .iter()
        .chain(FUTURES_VOCABULARY)
        .flat_map(|entry| entry.aliases.iter())
        .filter_map(|alias| label_pattern(alias).map(|re| (*alias, re)))
        .collect()
});

fn alias_pattern(alias: &str) -> Option<Cow<'static, Regex>> {
    match ALIAS_PATTERNS.get(alias) {
        Some(re) => Some(Cow::Borrowed(re)),
        None => label_pattern(alias).map(Cow::Owned),
    }
}

fn field_from_captures(
    caps: &regex::Captures<'_>,
    key: &str,
    ctx: &mut ParseContext,
) -> SummaryField {
    let value = ctx.parse_amount(key, &caps["amount"]);
    let flag = caps
        .name("flag")
        .and_then(|m| DebitCredit::from_code(m.as_str()));
    SummaryField::found(value, flag)
}

/// Look up every key of the vocabulary by its aliases; first alias wins.
pub fn extract_label_anchored(
    vocab: &[SummaryKey],
    pages: &[String],
    ctx: &mut ParseContext,
) -> BTreeMap<String, SummaryField> {
    let text = remove_accents(&pages.join("\n"));
    let mut fields = BTreeMap::new();

    for entry in vocab {
        if entry.key == LIQUIDATED_KEY {
            if let Some(caps) = RE_LIQUIDATED.captures(&text) {
                fields.insert(entry.key.to_string(), field_from_captures(&caps, entry.key, ctx));
                continue;
            }
        }

        let found = entry.aliases.iter().find_map(|alias| {
            let re = alias_pattern(alias)?;
            re.captures(&text).map(|caps| field_from_captures(&caps, entry.key, ctx))
        });

        let found = match found {
            Some(field) => Some(field),
            None if entry.key == OTHER_KEY => amount_above_label(&text, ctx),
            None => None,
        };

        if let Some(field) = found {
            fields.insert(entry.key.to_string(), field);
        }
    }

    fields
}

/// Some layouts print the "Outras" amount on the line above its label.
fn amount_above_label(text: &str, ctx: &mut ParseContext) -> Option<SummaryField> {
    let lines: Vec<&str> = text.lines().collect();
    let idx = lines.iter().position(|l| RE_OTHER_LABEL.is_match(l))?;
    if idx == 0 {
        return None;
    }

    let previous = lines[idx - 1];
    let amount = RE_AMOUNT.find_iter(previous).last()?;
    let flag = previous[amount.end()..]
        .split_whitespace()
        .next()
        .and_then(DebitCredit::from_code);

    log::debug!("Summary: '{}' taken from line above its label", OTHER_KEY);
    Some(SummaryField::found(
        ctx.parse_amount(OTHER_KEY, amount.as_str()),
        flag,
    ))
}

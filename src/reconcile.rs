//! Consistency check between trade lines and declared note totals.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::models::{
    ConsistencyRow, ConsistencyStatus, DebitCredit, MarketKind, SummaryRecord, Trade,
};
use crate::normalize::round_cents;

type GroupKey = (MarketKind, String, String);

#[derive(Default)]
struct Group {
    trade_total: Decimal,
    has_trades: bool,
    declared: Option<Decimal>,
    has_summary: bool,
}

/// First found key of `keys`, in order of preference.
///
/// Futures totals follow the sign of [`Trade::comparable_value`]: a
/// declared credit is negative.
fn declared_total(summary: &SummaryRecord, keys: &[&str]) -> Option<Decimal> {
    let field = keys
        .iter()
        .filter_map(|k| summary.field(k))
        .find(|f| f.found)?;

    match (summary.kind, field.flag) {
        (MarketKind::Futures, Some(DebitCredit::Credit)) => Some(-field.value),
        _ => Some(field.value),
    }
}

/// Compare summed trade values with the declared total per
/// (invoice, broker, kind).
///
/// Both sides are outer-joined: a group with only trades or only a summary
/// still gets a row, with zero on the missing side. Rows come out ordered
/// by kind, broker and invoice.
pub fn reconcile(
    trades: &[Trade],
    summaries: &[SummaryRecord],
    declared_keys: &[&str],
    tolerance: Decimal,
) -> Vec<ConsistencyRow> {
    let mut groups: BTreeMap<GroupKey, Group> = BTreeMap::new();

    for trade in trades {
        let key = (trade.kind, trade.broker.clone(), trade.invoice.clone());
        let group = groups.entry(key).or_default();
        group.trade_total += trade.comparable_value();
        group.has_trades = true;
    }

    for summary in summaries {
        let key = (summary.kind, summary.broker.clone(), summary.invoice.clone());
        let group = groups.entry(key).or_default();
        group.has_summary = true;
        if group.declared.is_none() {
            group.declared = declared_total(summary, declared_keys);
        }
    }

    groups
        .into_iter()
        .map(|((kind, broker, invoice), group)| {
            let declared = group.declared.unwrap_or(Decimal::ZERO);
            let exact = group.trade_total - declared;
            let status = if exact.abs() < tolerance {
                ConsistencyStatus::Ok
            } else {
                ConsistencyStatus::Inconsistent
            };

            if status == ConsistencyStatus::Inconsistent {
                log::warn!(
                    "Inconsistent note {} ({} {}): trades {} vs declared {}",
                    invoice,
                    broker,
                    kind.label(),
                    group.trade_total,
                    declared
                );
            }

            ConsistencyRow {
                invoice,
                broker,
                kind,
                trade_total: round_cents(group.trade_total),
                declared_total: declared,
                difference: round_cents(exact),
                status,
                has_trades: group.has_trades,
                summary_found: group.has_summary && group.declared.is_some(),
            }
        })
        .collect()
}

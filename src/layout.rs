//! Tabular layout of a batch for renderers.
//!
//! Three sheets: trades ("Negócios"), summaries ("Resumo") and consistency
//! ("Consistência"). Each sheet holds one block per record kind, spot
//! first, with a fixed column set per kind.

use serde::Serialize;

use crate::models::{BatchResult, ConsistencyRow, MarketKind, SummaryRecord, Trade};
use crate::summary::vocabulary;

const BROKER: &str = "Corretora";
const INVOICE: &str = "Número da Nota";

/// Block order within a sheet
const KINDS: [MarketKind; 2] = [MarketKind::Spot, MarketKind::Futures];

pub const SPOT_TRADE_COLUMNS: &[&str] = &[
    "CPF",
    "Tipo",
    BROKER,
    "Data da Operação",
    INVOICE,
    "Negociação",
    "C/V",
    "Tipo Mercado",
    "Especificação do Título",
    "Quantidade",
    "Preço / Ajuste",
    "Valor Operação / Ajuste",
    "D/C",
];

pub const FUTURES_TRADE_COLUMNS: &[&str] = &[
    "CPF",
    "Tipo",
    BROKER,
    "Data da Operação",
    INVOICE,
    "C/V",
    "Mercadoria",
    "Vencimento",
    "Quantidade",
    "Preço / Ajuste",
    "Tipo Negócio",
    "Valor Operação",
    "D/C",
    "Taxa Operacional",
];

pub fn trade_columns(kind: MarketKind) -> &'static [&'static str] {
    match kind {
        MarketKind::Futures => FUTURES_TRADE_COLUMNS,
        _ => SPOT_TRADE_COLUMNS,
    }
}

/// Broker, invoice, then every canonical summary key of the kind
pub fn summary_columns(kind: MarketKind) -> Vec<String> {
    [BROKER, INVOICE]
        .into_iter()
        .map(str::to_string)
        .chain(vocabulary(kind).iter().map(|k| k.key.to_string()))
        .collect()
}

pub fn consistency_columns(kind: MarketKind) -> Vec<String> {
    let trade_value = match kind {
        MarketKind::Futures => "Valor Operação\n (Negócios Individuais)",
        _ => "Valor Operação / Ajuste\n (Negócios Individuais)",
    };
    [
        BROKER,
        INVOICE,
        "Tipo",
        trade_value,
        "Valor das Operações\n (Resumo da Nota)",
        "Diferença",
        "Status",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// One titled block of a sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableBlock {
    pub kind: MarketKind,
    /// e.g. "*** A VISTA ***"
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub trades: Vec<TableBlock>,
    pub summaries: Vec<TableBlock>,
    pub consistency: Vec<TableBlock>,
}

fn block_title(kind: MarketKind) -> String {
    format!("*** {} ***", kind.label().to_uppercase())
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn trade_row(trade: &Trade) -> Vec<String> {
    let head = vec![
        trade.client_tax_id.clone(),
        trade.kind.label().to_string(),
        trade.broker.clone(),
        trade.document_date.clone(),
        trade.invoice.clone(),
    ];

    let tail = match trade.kind {
        MarketKind::Futures => vec![
            trade.side.as_str().to_string(),
            trade.instrument.clone(),
            opt(&trade.maturity),
            trade.quantity.to_string(),
            trade.price.to_string(),
            opt(&trade.trade_subtype),
            trade.value.to_string(),
            trade.debit_credit.as_str().to_string(),
            trade.operational_fee.map(|f| f.to_string()).unwrap_or_default(),
        ],
        _ => vec![
            opt(&trade.venue),
            trade.side.as_str().to_string(),
            opt(&trade.market_type),
            trade.instrument.clone(),
            trade.quantity.to_string(),
            trade.price.to_string(),
            trade.value.to_string(),
            trade.debit_credit.as_str().to_string(),
        ],
    };

    head.into_iter().chain(tail).collect()
}

fn summary_row(summary: &SummaryRecord) -> Vec<String> {
    let mut row = vec![summary.broker.clone(), summary.invoice.clone()];
    row.extend(
        vocabulary(summary.kind)
            .iter()
            .map(|k| summary.value(k.key).to_string()),
    );
    row
}

fn consistency_row(row: &ConsistencyRow) -> Vec<String> {
    vec![
        row.broker.clone(),
        row.invoice.clone(),
        row.kind.label().to_string(),
        row.trade_total.to_string(),
        row.declared_total.to_string(),
        row.difference.to_string(),
        row.status.as_str().to_string(),
    ]
}

/// Trades per kind, ordered by broker then document date
pub fn trade_blocks(trades: &[Trade]) -> Vec<TableBlock> {
    KINDS
        .iter()
        .filter_map(|kind| {
            let mut block: Vec<&Trade> = trades.iter().filter(|t| t.kind == *kind).collect();
            if block.is_empty() {
                return None;
            }
            block.sort_by(|a, b| {
                a.broker
                    .cmp(&b.broker)
                    .then_with(|| a.parsed_date().cmp(&b.parsed_date()))
            });
            Some(TableBlock {
                kind: *kind,
                title: block_title(*kind),
                columns: trade_columns(*kind).iter().map(|c| c.to_string()).collect(),
                rows: block.into_iter().map(trade_row).collect(),
            })
        })
        .collect()
}

/// Summaries per kind, ordered by broker then note number
pub fn summary_blocks(summaries: &[SummaryRecord]) -> Vec<TableBlock> {
    KINDS
        .iter()
        .filter_map(|kind| {
            let mut block: Vec<&SummaryRecord> =
                summaries.iter().filter(|s| s.kind == *kind).collect();
            if block.is_empty() {
                return None;
            }
            block.sort_by(|a, b| (&a.broker, &a.invoice).cmp(&(&b.broker, &b.invoice)));
            Some(TableBlock {
                kind: *kind,
                title: block_title(*kind),
                columns: summary_columns(*kind),
                rows: block.into_iter().map(summary_row).collect(),
            })
        })
        .collect()
}

pub fn consistency_blocks(rows: &[ConsistencyRow]) -> Vec<TableBlock> {
    KINDS
        .iter()
        .filter_map(|kind| {
            let mut block: Vec<&ConsistencyRow> = rows.iter().filter(|r| r.kind == *kind).collect();
            if block.is_empty() {
                return None;
            }
            block.sort_by(|a, b| (&a.broker, &a.invoice).cmp(&(&b.broker, &b.invoice)));
            Some(TableBlock {
                kind: *kind,
                title: block_title(*kind),
                columns: consistency_columns(*kind),
                rows: block.into_iter().map(consistency_row).collect(),
            })
        })
        .collect()
}

pub fn build_report(batch: &BatchResult) -> Report {
    Report {
        trades: trade_blocks(&batch.trades),
        summaries: summary_blocks(&batch.summaries),
        consistency: consistency_blocks(&batch.consistency),
    }
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalize::parse_date;

/// Record kind of a note: spot market ("à vista") or futures (BM&F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarketKind {
    #[serde(rename = "A Vista")]
    Spot,
    #[serde(rename = "BM&F")]
    Futures,
    Unknown,
}

impl MarketKind {
    /// Label used in the output tables
    pub fn label(&self) -> &'static str {
        match self {
            Self::Spot => "A Vista",
            Self::Futures => "BM&F",
            Self::Unknown => "Unknown",
        }
    }

    /// Short tag used in split file names
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Spot => "avista",
            Self::Futures => "bmf",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Buy ("C", compra) or sell ("V", venda)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    #[serde(rename = "C")]
    Buy,
    #[serde(rename = "V")]
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "C",
            Self::Sell => "V",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "C" => Some(Self::Buy),
            "V" => Some(Self::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebitCredit {
    #[serde(rename = "D")]
    Debit,
    #[serde(rename = "C")]
    Credit,
}

impl DebitCredit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "D",
            Self::Credit => "C",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "D" => Some(Self::Debit),
            "C" => Some(Self::Credit),
            _ => None,
        }
    }
}

/// One executed order line of a note.
///
/// `value` is always a magnitude; the direction of the cash flow is only
/// carried by `debit_credit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub kind: MarketKind,
    pub side: TradeSide,
    /// Spot only: trading venue column ("Negociação"), e.g. "1-BOVESPA"
    pub venue: Option<String>,
    /// Spot only: market type ("Tipo Mercado"), e.g. "VISTA"
    pub market_type: Option<String>,
    /// Ticker / title specification (spot) or commodity code (futures)
    pub instrument: String,
    /// Futures only
    pub maturity: Option<String>,
    pub quantity: u64,
    pub price: Decimal,
    /// Futures only: "Tipo Negócio", e.g. "DAY TRADE"
    pub trade_subtype: Option<String>,
    pub value: Decimal,
    pub debit_credit: DebitCredit,
    /// Futures only: "Taxa Operacional"
    pub operational_fee: Option<Decimal>,

    pub broker: String,
    pub document_date: String,
    pub invoice: String,
    pub client_tax_id: String,
}

impl Trade {
    /// Value used when summing trades against the declared note total.
    ///
    /// Futures credits offset the position and are negated; spot values
    /// are taken as they are.
    pub fn comparable_value(&self) -> Decimal {
        match (self.kind, self.debit_credit) {
            (MarketKind::Futures, DebitCredit::Credit) => -self.value,
            _ => self.value,
        }
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.document_date)
    }
}

/// A declared total of a note summary.
///
/// `found == false` means the label was not located in the document; the
/// value is then zero but must not be read as a declared zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryField {
    pub value: Decimal,
    pub flag: Option<DebitCredit>,
    pub found: bool,
}

impl SummaryField {
    pub fn missing() -> Self {
        Self {
            value: Decimal::ZERO,
            flag: None,
            found: false,
        }
    }

    pub fn found(value: Decimal, flag: Option<DebitCredit>) -> Self {
        Self {
            value: value.abs(),
            flag,
            found: true,
        }
    }
}

/// Declared totals of one note, keyed by canonical label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub invoice: String,
    pub broker: String,
    pub kind: MarketKind,
    pub document_date: String,
    pub fields: BTreeMap<String, SummaryField>,
}

impl SummaryRecord {
    pub fn field(&self, key: &str) -> Option<&SummaryField> {
        self.fields.get(key)
    }

    /// Value of a canonical key, zero when absent
    pub fn value(&self, key: &str) -> Decimal {
        self.fields
            .get(key)
            .map(|f| f.value)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.document_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "Inconsistência")]
    Inconsistent,
}

impl ConsistencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Inconsistent => "Inconsistência",
        }
    }
}

/// Trade total vs declared total for one (invoice, broker, kind) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyRow {
    pub invoice: String,
    pub broker: String,
    pub kind: MarketKind,
    pub trade_total: Decimal,
    pub declared_total: Decimal,
    /// `trade_total - declared_total`, rounded to cents
    pub difference: Decimal,
    pub status: ConsistencyStatus,
    pub has_trades: bool,
    pub summary_found: bool,
}

/// Warning severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}

/// Non-fatal problem found while processing a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseWarning {
    pub severity: WarningSeverity,
    pub field: String,
    pub message: String,
    pub raw_value: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            WarningSeverity::Info => "info",
            WarningSeverity::Warning => "warning",
            WarningSeverity::Error => "error",
        };
        write!(f, "[{}] {}: {}", severity, self.field, self.message)?;
        if !self.raw_value.is_empty() {
            write!(f, " (value: '{}')", self.raw_value)?;
        }
        Ok(())
    }
}

/// Everything produced by one `process_directory` run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub trades: Vec<Trade>,
    pub summaries: Vec<SummaryRecord>,
    pub consistency: Vec<ConsistencyRow>,
    pub warnings: Vec<ParseWarning>,
}

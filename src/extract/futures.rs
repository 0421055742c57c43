//! Futures (BM&F) trade lines.
//!
//! ```text
//! C WDO F24 02/01/2024 1 4.850,0000 DAY TRADE 242,50 C 0,00
//! ```
//!
//! Side, commodity, maturity, quantity, price/adjustment, trade type,
//! value, D/C and an optional operational fee.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ParseContext;
use crate::models::{DebitCredit, MarketKind, Trade, TradeSide};

static RE_FUTURES_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<side>[CV])\s+(?P<commodity>.+?)\s+(?P<maturity>\d{2}/\d{2}/\d{4})\s+(?P<qty>\d[\d.]*)\s+(?P<price>[\d.,]+)\s+(?P<subtype>[A-Z][A-Z ]*?)\s+(?P<value>[\d.,]+)\s+(?P<dc>[CD])(?:\s+(?P<fee>[\d.,]+))?$",
    )
    .unwrap()
});

pub fn parse_futures_line(line: &str, ctx: &mut ParseContext) -> Option<Trade> {
    let caps = RE_FUTURES_LINE.captures(line)?;

    let side = TradeSide::from_code(&caps["side"])?;
    let debit_credit = DebitCredit::from_code(&caps["dc"])?;
    let quantity = ctx.parse_quantity(&caps["qty"])?;

    let price = ctx.parse_amount("price", &caps["price"]);
    let value = ctx.parse_amount("value", &caps["value"]).abs();
    let operational_fee = caps
        .name("fee")
        .map(|m| ctx.parse_amount("operational_fee", m.as_str()));

    Some(Trade {
        kind: MarketKind::Futures,
        side,
        venue: None,
        market_type: None,
        instrument: caps["commodity"].trim().to_string(),
        maturity: Some(caps["maturity"].to_string()),
        quantity,
        price,
        trade_subtype: Some(caps["subtype"].trim().to_string()),
        value,
        debit_credit,
        operational_fee,
        broker: String::new(),
        document_date: String::new(),
        invoice: String::new(),
        client_tax_id: String::new(),
    })
}

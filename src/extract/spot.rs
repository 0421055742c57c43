//! Spot ("à vista") trade lines.
//!
//! ```text
//! B3 RV LISTADO C VISTA PETR4 100 28,50 2850,00 D
//! ```

use regex::Regex;

use super::ParseContext;
use crate::models::{DebitCredit, MarketKind, Trade, TradeSide};

/// Parse one line with the broker's spot line pattern.
///
/// Lines that do not look like a trade are ignored silently; a trade line
/// with an invalid quantity is dropped with a warning.
pub fn parse_spot_line(line: &str, pattern: &Regex, ctx: &mut ParseContext) -> Option<Trade> {
    let caps = pattern.captures(line)?;

    let side = TradeSide::from_code(&caps["side"])?;
    let debit_credit = DebitCredit::from_code(&caps["dc"])?;
    let quantity = ctx.parse_quantity(&caps["qty"])?;

    let price = ctx.parse_amount("price", &caps["price"]);
    let value = ctx.parse_amount("value", &caps["value"]).abs();

    Some(Trade {
        kind: MarketKind::Spot,
        side,
        venue: caps.name("venue").map(|m| m.as_str().trim().to_string()),
        market_type: Some(caps["market"].trim().to_uppercase()),
        instrument: caps["title"].trim().to_string(),
        maturity: None,
        quantity,
        price,
        trade_subtype: None,
        value,
        debit_credit,
        operational_fee: None,
        broker: String::new(),
        document_date: String::new(),
        invoice: String::new(),
        client_tax_id: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::{CompiledProfile, BTG, XP};
    use rust_decimal_macros::dec;

    fn pattern(profile: &'static crate::brokers::BrokerProfile) -> Regex {
        CompiledProfile::compile(profile).unwrap().spot_line
    }

    #[test]
    fn test_single_spot_line() {
        let mut ctx = ParseContext::new();
        let trade = parse_spot_line(
            "B3 RV LISTADO C VISTA PETR4 100 28,50 2850,00 D",
            &pattern(&XP),
            &mut ctx,
        )
        .unwrap();

        assert_eq!(trade.side, TradeSide::Buy);
        assert_eq!(trade.venue.as_deref(), Some("B3 RV LISTADO"));
        assert_eq!(trade.market_type.as_deref(), Some("VISTA"));
        assert_eq!(trade.instrument, "PETR4");
        assert_eq!(trade.quantity, 100);
        assert_eq!(trade.price, dec!(28.50));
        assert_eq!(trade.value, dec!(2850.00));
        assert_eq!(trade.debit_credit, DebitCredit::Debit);
    }

    #[test]
    fn test_multi_word_title_and_thousands() {
        let mut ctx = ParseContext::new();
        let trade = parse_spot_line(
            "1-BOVESPA V VISTA PETROBRAS PN N2 1.000 30,10 30.100,00 C",
            &pattern(&BTG),
            &mut ctx,
        )
        .unwrap();

        assert_eq!(trade.side, TradeSide::Sell);
        assert_eq!(trade.instrument, "PETROBRAS PN N2");
        assert_eq!(trade.quantity, 1000);
        assert_eq!(trade.value, dec!(30100.00));
        assert_eq!(trade.debit_credit, DebitCredit::Credit);
    }

    #[test]
    fn test_non_trade_lines_are_ignored() {
        let mut ctx = ParseContext::new();
        let re = pattern(&XP);
        assert!(parse_spot_line("Resumo dos Negocios", &re, &mut ctx).is_none());
        assert!(parse_spot_line("NYSE C VISTA PETR4 100 28,50 2850,00 D", &re, &mut ctx).is_none());
        assert!(ctx.warnings.is_empty());
    }
}

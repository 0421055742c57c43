//! Trade extraction from note text.
//!
//! One generic parser is composed with a broker profile (patterns as data)
//! and a record kind. The registry keys them by (broker, kind).

pub mod futures;
pub mod metadata;
pub mod spot;

use regex::Regex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::brokers::CompiledProfile;
use crate::error::{ImportError, Result};
use crate::models::{MarketKind, ParseWarning, SummaryField, SummaryRecord, Trade, WarningSeverity};
use crate::normalize::{parse_decimal, parse_quantity, remove_accents};
use crate::summary::extract_summary;

/// Collects warnings while parsing a single document
#[derive(Debug, Default)]
pub struct ParseContext {
    pub warnings: Vec<ParseWarning>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning; this is the only place warnings are logged
    pub fn warn(&mut self, field: &str, message: &str, raw: &str) {
        let warning = ParseWarning {
            severity: WarningSeverity::Warning,
            field: field.to_string(),
            message: message.to_string(),
            raw_value: raw.to_string(),
        };
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Parse an amount; an unparseable value counts as zero and is reported
    pub fn parse_amount(&mut self, field: &str, raw: &str) -> Decimal {
        match parse_decimal(raw) {
            Some(value) => value,
            None => {
                self.warn(field, "could not parse amount, using 0", raw);
                Decimal::ZERO
            }
        }
    }

    /// Parse a trade quantity; zero and garbage are both rejected
    pub fn parse_quantity(&mut self, raw: &str) -> Option<u64> {
        match parse_quantity(raw) {
            Some(qty) if qty > 0 => Some(qty),
            _ => {
                self.warn("quantity", "invalid quantity, line skipped", raw);
                None
            }
        }
    }
}

/// Everything one parser reads from one sub-document
#[derive(Debug, Clone)]
pub struct ParsedNote {
    pub trades: Vec<Trade>,
    pub summary: SummaryRecord,
}

/// Note parser for one (broker, kind) pair
pub trait NoteParser: Send + Sync {
    fn broker_name(&self) -> &'static str;

    fn kind(&self) -> MarketKind;

    /// Trade lines in document order. `text` is accent-free.
    fn extract_trades(&self, text: &str, ctx: &mut ParseContext) -> Vec<Trade>;

    fn extract_invoice_number(&self, text: &str) -> String;

    fn extract_date(&self, text: &str) -> String;

    fn extract_client_tax_id(&self, text: &str) -> String;

    fn extract_summary(
        &self,
        pages: &[String],
        ctx: &mut ParseContext,
    ) -> BTreeMap<String, SummaryField>;

    /// Run every extraction over the pages and tag the trades with the
    /// note metadata.
    fn parse(&self, pages: &[String], ctx: &mut ParseContext) -> ParsedNote {
        let text = remove_accents(&pages.join("\n"));
        let invoice = self.extract_invoice_number(&text);
        let document_date = self.extract_date(&text);
        let client_tax_id = self.extract_client_tax_id(&text);

        if invoice.is_empty() {
            ctx.warn("invoice", "note number not found", "");
        }
        if document_date.is_empty() {
            ctx.warn("date", "trading date not found", "");
        }

        let mut trades = self.extract_trades(&text, ctx);
        for trade in &mut trades {
            trade.broker = self.broker_name().to_string();
            trade.document_date = document_date.clone();
            trade.invoice = invoice.clone();
            trade.client_tax_id = client_tax_id.clone();
        }

        let summary = SummaryRecord {
            invoice,
            broker: self.broker_name().to_string(),
            kind: self.kind(),
            document_date,
            fields: self.extract_summary(pages, ctx),
        };

        ParsedNote { trades, summary }
    }
}

/// Column-label keywords of the trade table header, spaces removed
const SPOT_HEADER_KEYWORDS: &[&str] = &[
    "negociacao",
    "c/v",
    "tipomercado",
    "especificacaodotitulo",
    "quantidade",
    "valoroperacao",
];

const FUTURES_HEADER_KEYWORDS: &[&str] = &[
    "c/v",
    "mercadoria",
    "vencimento",
    "quantidade",
    "preco/ajuste",
    "tiponegocio",
];

/// Keywords that must appear in a two-line window to call it a header
const HEADER_THRESHOLD: usize = 4;

/// Regex for a section marker: literal words, any whitespace between them
pub fn marker_regex(marker: &str) -> std::result::Result<Regex, regex::Error> {
    let words: Vec<String> = marker.split_whitespace().map(regex::escape).collect();
    Regex::new(&format!(r"(?i){}", words.join(r"\s+")))
}

/// Text from the start of the line holding `start` up to `end`.
///
/// Either marker missing gives an empty section.
pub fn isolate_section<'a>(text: &'a str, start: &Regex, end: &Regex) -> &'a str {
    let Some(found) = start.find(text) else {
        return "";
    };
    let line_start = text[..found.start()].rfind('\n').map(|i| i + 1).unwrap_or(0);

    match end.find(&text[found.end()..]) {
        Some(stop) => &text[line_start..found.end() + stop.start()],
        None => "",
    }
}

/// Index of the first line after the table header start, if a header is found
pub fn find_header(lines: &[&str], keywords: &[&str]) -> Option<usize> {
    let squashed: Vec<String> = lines
        .iter()
        .map(|l| remove_accents(l).to_lowercase().split_whitespace().collect())
        .collect();

    (0..squashed.len()).find_map(|i| {
        let window = match squashed.get(i + 1) {
            Some(next) => format!("{}{}", squashed[i], next),
            None => squashed[i].clone(),
        };
        let hits = keywords.iter().filter(|k| window.contains(*k)).count();
        (hits >= HEADER_THRESHOLD).then_some(i + 1)
    })
}

/// Generic parser: the layout comes entirely from the broker profile
pub struct BrokerNoteParser {
    profile: Arc<CompiledProfile>,
    kind: MarketKind,
    start: Regex,
    end: Regex,
}

impl BrokerNoteParser {
    pub fn new(profile: Arc<CompiledProfile>, kind: MarketKind) -> Result<Self> {
        let (start, end) = match kind {
            MarketKind::Futures => (
                profile.profile.futures_start_marker,
                profile.profile.futures_end_marker,
            ),
            _ => (
                profile.profile.trade_start_marker,
                profile.profile.trade_end_marker,
            ),
        };
        let compile = |marker: &str| {
            marker_regex(marker).map_err(|source| ImportError::Pattern {
                profile: profile.name().to_string(),
                pattern: marker.to_string(),
                source,
            })
        };

        Ok(Self {
            start: compile(start)?,
            end: compile(end)?,
            profile,
            kind,
        })
    }

    fn header_keywords(&self) -> &'static [&'static str] {
        match self.kind {
            MarketKind::Futures => FUTURES_HEADER_KEYWORDS,
            _ => SPOT_HEADER_KEYWORDS,
        }
    }
}

impl NoteParser for BrokerNoteParser {
    fn broker_name(&self) -> &'static str {
        self.profile.name()
    }

    fn kind(&self) -> MarketKind {
        self.kind
    }

    fn extract_trades(&self, text: &str, ctx: &mut ParseContext) -> Vec<Trade> {
        let section = isolate_section(text, &self.start, &self.end);
        if section.is_empty() {
            log::debug!(
                "{}: no {} trade section found",
                self.broker_name(),
                self.kind.label()
            );
            return Vec::new();
        }

        let lines: Vec<&str> = section.lines().collect();
        let first = find_header(&lines, self.header_keywords()).unwrap_or(0);

        lines[first..]
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .filter_map(|line| match self.kind {
                MarketKind::Futures => futures::parse_futures_line(line, ctx),
                _ => spot::parse_spot_line(line, &self.profile.spot_line, ctx),
            })
            .collect()
    }

    fn extract_invoice_number(&self, text: &str) -> String {
        metadata::extract_top_invoice(text)
            .unwrap_or_else(|| metadata::first_match(text, &self.profile.invoice_patterns))
    }

    fn extract_date(&self, text: &str) -> String {
        metadata::first_match(text, &self.profile.date_patterns)
    }

    fn extract_client_tax_id(&self, text: &str) -> String {
        metadata::extract_client_tax_id(text)
    }

    fn extract_summary(
        &self,
        pages: &[String],
        ctx: &mut ParseContext,
    ) -> BTreeMap<String, SummaryField> {
        extract_summary(self.profile.profile.summary_strategy(self.kind), self.kind, pages, ctx)
    }
}

/// Parsers keyed by (broker name, record kind)
pub struct ParserRegistry {
    parsers: HashMap<(String, MarketKind), Box<dyn NoteParser>>,
}

impl ParserRegistry {
    /// One spot and one futures parser per profile
    pub fn build(profiles: &[Arc<CompiledProfile>]) -> Result<Self> {
        let mut parsers: HashMap<(String, MarketKind), Box<dyn NoteParser>> = HashMap::new();
        for profile in profiles {
            for kind in [MarketKind::Spot, MarketKind::Futures] {
                let parser = BrokerNoteParser::new(Arc::clone(profile), kind)?;
                parsers.insert((profile.name().to_ascii_uppercase(), kind), Box::new(parser));
            }
        }
        Ok(Self { parsers })
    }

    pub fn get(&self, broker: &str, kind: MarketKind) -> Option<&dyn NoteParser> {
        self.parsers
            .get(&(broker.to_ascii_uppercase(), kind))
            .map(|parser| &**parser)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::{get_all_profiles, XP};
    use crate::models::{DebitCredit, TradeSide};
    use rust_decimal_macros::dec;

    fn xp(kind: MarketKind) -> BrokerNoteParser {
        let profile = Arc::new(CompiledProfile::compile(&XP).unwrap());
        BrokerNoteParser::new(profile, kind).unwrap()
    }

    const XP_SPOT_NOTE: &str = "\
XP INVESTIMENTOS CORRETORA DE CAMBIO, TITULOS E VALORES MOBILIARIOS S.A.
NOTA DE NEGOCIAÇÃO
Nr. nota Folha Data pregão
123456 1 04/01/2024
Cliente CPF
JOAO DA SILVA 123.456.789-00
Negócios realizados
Q Negociação C/V Tipo mercado Prazo Especificação do título Obs. (*) Quantidade Preço / Ajuste Valor Operação / Ajuste D/C
B3 RV LISTADO C VISTA PETR4 100 28,50 2850,00 D
Resumo dos Negócios
Valor das operações 2.850,00
";

    #[test]
    fn test_spot_note_single_trade() {
        let parser = xp(MarketKind::Spot);
        let mut ctx = ParseContext::new();
        let note = parser.parse(&[XP_SPOT_NOTE.to_string()], &mut ctx);

        assert_eq!(note.trades.len(), 1);
        let trade = &note.trades[0];
        assert_eq!(trade.side, TradeSide::Buy);
        assert_eq!(trade.market_type.as_deref(), Some("VISTA"));
        assert_eq!(trade.instrument, "PETR4");
        assert_eq!(trade.quantity, 100);
        assert_eq!(trade.price, dec!(28.50));
        assert_eq!(trade.value, dec!(2850.00));
        assert_eq!(trade.debit_credit, DebitCredit::Debit);

        assert_eq!(trade.broker, "XP");
        assert_eq!(trade.invoice, "123456");
        assert_eq!(trade.document_date, "04/01/2024");
        assert_eq!(trade.client_tax_id, "123.456.789-00");

        assert_eq!(note.summary.value("Valor das operações"), dec!(2850.00));
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn test_missing_marker_gives_no_trades() {
        let parser = xp(MarketKind::Spot);
        let mut ctx = ParseContext::new();
        let text = "Negocios realizados\nB3 RV LISTADO C VISTA PETR4 100 28,50 2850,00 D\n";
        assert!(parser.extract_trades(text, &mut ctx).is_empty());
    }

    #[test]
    fn test_isolate_section_starts_at_marker_line() {
        let start = marker_regex("C/V Mercadoria").unwrap();
        let end = marker_regex("Venda disponivel").unwrap();
        let text = "topo\nC/V Mercadoria Vencimento\nC WDO F24\nVenda disponivel Compra";
        assert_eq!(
            isolate_section(text, &start, &end),
            "C/V Mercadoria Vencimento\nC WDO F24\n"
        );
    }

    #[test]
    fn test_marker_tolerates_line_breaks() {
        let re = marker_regex("Resumo dos Negocios").unwrap();
        assert!(re.is_match("resumo dos\nnegocios"));
    }

    #[test]
    fn test_find_header_over_two_lines() {
        let lines = [
            "Negocios realizados",
            "Q Negociacao C/V Tipo mercado",
            "Prazo Especificacao do titulo Quantidade",
            "B3 RV LISTADO C VISTA PETR4 100 28,50 2850,00 D",
        ];
        assert_eq!(find_header(&lines, SPOT_HEADER_KEYWORDS), Some(2));
        assert_eq!(find_header(&lines[3..], SPOT_HEADER_KEYWORDS), None);
    }

    #[test]
    fn test_invalid_quantity_skips_line_only() {
        let parser = xp(MarketKind::Spot);
        let mut ctx = ParseContext::new();
        let text = "\
Negocios realizados
B3 RV LISTADO C VISTA PETR4 0 28,50 2850,00 D
B3 RV LISTADO V VISTA VALE3 10 60,00 600,00 C
Resumo dos Negocios
";
        let trades = parser.extract_trades(text, &mut ctx);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].instrument, "VALE3");
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.warnings[0].field, "quantity");
    }

    #[test]
    fn test_futures_note() {
        let parser = xp(MarketKind::Futures);
        let mut ctx = ParseContext::new();
        let text = "\
C/V Mercadoria Vencimento Quantidade Preco/Ajuste Tipo Negocio Vlr de Operacao/Ajuste D/C Taxa Operacional
C WDO F24 02/01/2024 1 4.850,0000 DAY TRADE 242,50 C 0,00
V WIN G24 14/02/2024 2 132.000,0000 NORMAL 52,00 D 1,10
Venda disponivel Compra disponivel Venda Opcoes Compra Opcoes Valor dos negocios
0,00 0,00 0,00 0,00 190,50 C
";
        let trades = parser.extract_trades(text, &mut ctx);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].instrument, "WIN G24");
        assert_eq!(trades[1].operational_fee, Some(dec!(1.10)));
    }

    #[test]
    fn test_registry_keys() {
        let profiles: Vec<Arc<CompiledProfile>> = get_all_profiles()
            .into_iter()
            .map(|p| Arc::new(CompiledProfile::compile(p).unwrap()))
            .collect();
        let registry = ParserRegistry::build(&profiles).unwrap();

        assert_eq!(registry.len(), 8);
        let parser = registry.get("itau", MarketKind::Futures).unwrap();
        assert_eq!(parser.broker_name(), "ITAU");
        assert_eq!(parser.kind(), MarketKind::Futures);
        assert!(registry.get("XP", MarketKind::Unknown).is_none());
    }

    #[test]
    fn test_parse_amount_zero_with_warning() {
        let mut ctx = ParseContext::new();
        assert_eq!(ctx.parse_amount("price", "abc"), dec!(0));
        assert_eq!(ctx.warnings[0].raw_value, "abc");
        assert_eq!(ctx.parse_amount("price", "1.234,56"), dec!(1234.56));
        assert_eq!(ctx.warnings.len(), 1);
    }

    #[test]
    fn test_warn_records_once() {
        let mut ctx = ParseContext::new();
        ctx.warn("kind", "unknown record kind, document skipped", "/notas/informe.txt");
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(
            ctx.warnings[0].to_string(),
            "[warning] kind: unknown record kind, document skipped (value: '/notas/informe.txt')"
        );
    }
}

//! Broker profiles for note import.
//!
//! Each brokerage is described by a static table of patterns: how to
//! recognise its notes, where the trade listing starts and ends, and how a
//! trade line is laid out. Patterns are matched against accent-free text,
//! so they are written without diacritics.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};
use crate::models::MarketKind;
use crate::summary::SummaryStrategy;

/// A brokerage with its detection patterns and note layout.
#[derive(Debug, Clone)]
pub struct BrokerProfile {
    pub name: &'static str,
    pub description: &'static str,
    /// Any match identifies the brokerage (case-insensitive)
    pub signature_patterns: &'static [&'static str],
    /// Most specific first; capture group 1 is the note number
    pub invoice_patterns: &'static [&'static str],
    /// Most specific first; capture group 1 is the trading date
    pub date_patterns: &'static [&'static str],
    pub trade_start_marker: &'static str,
    pub trade_end_marker: &'static str,
    pub futures_start_marker: &'static str,
    pub futures_end_marker: &'static str,
    /// Spot trade line with named groups venue, side, market, title, qty,
    /// price, value, dc
    pub spot_line_pattern: &'static str,
    pub spot_summary: SummaryStrategy,
    pub futures_summary: SummaryStrategy,
}

impl BrokerProfile {
    pub fn summary_strategy(&self, kind: MarketKind) -> SummaryStrategy {
        match kind {
            MarketKind::Futures => self.futures_summary,
            _ => self.spot_summary,
        }
    }
}

// ============================================================================
// Broker Profiles
// ============================================================================

/// Spot trade line: broker-specific venue column followed by the common
/// "C/V, tipo mercado, título, quantidade, preço, valor, D/C" layout.
macro_rules! concat_spot_line {
    ($venue:literal) => {
        concat!(
            "^",
            $venue,
            r"\s+(?P<side>[CV])\s+(?P<market>VISTA|FRACIONARIO|OPCAO DE COMPRA|OPCAO DE VENDA|EXERC OPC COMPRA|EXERC OPC VENDA|TERMO|LEILAO)\s+(?P<title>.+?)\s+(?P<qty>\d[\d.]*)\s+(?P<price>\d[\d.]*,\d+)\s+(?P<value>\d[\d.]*,\d+)\s+(?P<dc>[CD])$"
        )
    };
}

const DATE_PATTERNS: &[&str] = &[
    r"Data\s+preg[aã]o\s*(\d{2}/\d{2}/\d{4})",
    r"(\d{2}/\d{2}/\d{4})",
];

/// BTG Pactual
pub const BTG: BrokerProfile = BrokerProfile {
    name: "BTG",
    description: "BTG Pactual CTVM S.A.",
    signature_patterns: &[r"BTG\s+Pactual", r"BTG\s+Corretora"],
    invoice_patterns: &[
        r"Nota\s+de\s+Negociacao\s+N(?:º|o|°)?\s*[:\-]?\s*(\d+)",
        r"Nr\.?\s*nota\s*[:\-]?\s*(\d+)",
        r"Nota\s*[:\-]?\s*(\d+)",
    ],
    date_patterns: DATE_PATTERNS,
    trade_start_marker: "Negocios realizados",
    trade_end_marker: "Resumo dos Negocios",
    futures_start_marker: "C/V Mercadoria",
    futures_end_marker: "Venda disponivel",
    spot_line_pattern: concat_spot_line!(r"(?P<venue>1-BOVESPA|B3 RV LISTADO|BOVESPA)"),
    spot_summary: SummaryStrategy::LabelAnchored,
    futures_summary: SummaryStrategy::Positional,
};

/// Itaú Corretora
pub const ITAU: BrokerProfile = BrokerProfile {
    name: "ITAU",
    description: "Itaú Corretora de Valores S.A.",
    signature_patterns: &[r"Ita[úu]\s+Corretora", r"ITA[ÚU] UNIBANCO"],
    invoice_patterns: &[r"Nr\.?\s*Nota\s*(?:Folha)?\s*(?:\d+\s+)?(\d+)"],
    date_patterns: DATE_PATTERNS,
    trade_start_marker: "Negocios Realizados",
    trade_end_marker: "Resumo de negocios",
    futures_start_marker: "C/V Mercadoria",
    futures_end_marker: "Venda disponivel",
    spot_line_pattern: concat_spot_line!(r"(?P<venue>BOVESPA|B3 RV LISTADO|B3)"),
    spot_summary: SummaryStrategy::LabelAnchored,
    futures_summary: SummaryStrategy::LabelAnchored,
};

/// Ágora Investimentos
pub const AGORA: BrokerProfile = BrokerProfile {
    name: "AGORA",
    description: "Ágora CTVM S.A.",
    signature_patterns: &[r"AGORA\s+CORRETORA", r"agorainvestimentos\.com\.br"],
    invoice_patterns: &[
        r"Nota\s+de\s+Corretagem\s*Nr\.?\s*Nota\s*(?:Folha)?\s*(?:\d+\s+)?(\d+)",
        r"Nr\.?\s*Nota\s*(?:\d+\s+)?(\d+)",
    ],
    date_patterns: DATE_PATTERNS,
    trade_start_marker: "Negocios Realizados",
    trade_end_marker: "Resumo dos Negocios",
    futures_start_marker: "C/V Mercadoria",
    futures_end_marker: "Venda disponivel",
    spot_line_pattern: concat_spot_line!(r"(?P<venue>1-BOVESPA|BOVESPA|B3 RV LISTADO)"),
    spot_summary: SummaryStrategy::LabelAnchored,
    futures_summary: SummaryStrategy::Positional,
};

/// XP Investimentos
pub const XP: BrokerProfile = BrokerProfile {
    name: "XP",
    description: "XP Investimentos CCTVM S.A.",
    signature_patterns: &[r"XP\s+INVESTIMENTOS\s+CORRETORA", r"xpi\.com\.br"],
    invoice_patterns: &[
        r"NOTA\s+DE\s+NEGOCIA[ÇC][AÃ]O\s*Nr\.?\s*nota\s*(\d+)",
        r"Nr\.?\s*nota\s*(\d+)",
    ],
    date_patterns: DATE_PATTERNS,
    trade_start_marker: "Negocios realizados",
    trade_end_marker: "Resumo dos Negocios",
    futures_start_marker: "C/V Mercadoria",
    futures_end_marker: "Venda disponivel",
    spot_line_pattern: concat_spot_line!(r"(?P<venue>B3 RV LISTADO|1-BOVESPA)"),
    spot_summary: SummaryStrategy::LabelAnchored,
    futures_summary: SummaryStrategy::Positional,
};

// ============================================================================
// Profile Registry
// ============================================================================

/// All built-in profiles, in detection priority order
pub fn get_all_profiles() -> Vec<&'static BrokerProfile> {
    vec![&BTG, &ITAU, &AGORA, &XP]
}

/// Get a profile by broker name (case-insensitive)
pub fn get_profile(name: &str) -> Option<&'static BrokerProfile> {
    get_all_profiles()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// A profile with its patterns compiled once.
#[derive(Debug)]
pub struct CompiledProfile {
    pub profile: &'static BrokerProfile,
    pub signatures: Vec<Regex>,
    pub invoice_patterns: Vec<Regex>,
    pub date_patterns: Vec<Regex>,
    pub spot_line: Regex,
}

impl CompiledProfile {
    pub fn compile(profile: &'static BrokerProfile) -> Result<Self> {
        let compile_all = |patterns: &[&str], flags: &str| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| compile_pattern(profile.name, &format!("{}{}", flags, p)))
                .collect()
        };

        Ok(Self {
            profile,
            signatures: compile_all(profile.signature_patterns, "(?i)")?,
            invoice_patterns: compile_all(profile.invoice_patterns, "(?ims)")?,
            date_patterns: compile_all(profile.date_patterns, "(?ims)")?,
            spot_line: compile_spot_line(profile)?,
        })
    }

    pub fn name(&self) -> &'static str {
        self.profile.name
    }
}

/// Named groups a spot line pattern must define; `venue` is optional
const SPOT_LINE_GROUPS: &[&str] = &["side", "market", "title", "qty", "price", "value", "dc"];

fn compile_spot_line(profile: &BrokerProfile) -> Result<Regex> {
    let re = compile_pattern(profile.name, &format!("(?i){}", profile.spot_line_pattern))?;
    let missing = SPOT_LINE_GROUPS
        .iter()
        .find(|group| !re.capture_names().flatten().any(|name| name == **group));

    match missing {
        Some(group) => Err(ImportError::MissingGroup {
            profile: profile.name.to_string(),
            pattern: profile.spot_line_pattern.to_string(),
            group: group.to_string(),
        }),
        None => Ok(re),
    }
}

fn compile_pattern(profile: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| ImportError::Pattern {
        profile: profile.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

/// True if any signature pattern of the profile occurs in the text
pub fn match_broker(text: &str, profile: &CompiledProfile) -> bool {
    profile.signatures.iter().any(|re| re.is_match(text))
}

/// Outcome of broker detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerMatch {
    /// First matching profile in table order
    pub broker: Option<String>,
    /// Every profile whose signature occurs in the text
    pub candidates: Vec<String>,
}

impl BrokerMatch {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Try profiles in priority order; the first match wins.
pub fn detect_broker<'a, I>(text: &str, profiles: I) -> BrokerMatch
where
    I: IntoIterator<Item = &'a CompiledProfile>,
{
    let candidates: Vec<String> = profiles
        .into_iter()
        .filter(|p| match_broker(text, p))
        .map(|p| p.name().to_string())
        .collect();

    BrokerMatch {
        broker: candidates.first().cloned(),
        candidates,
    }
}

//! Parser configuration, built once per process and shared read-only.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::brokers::{get_all_profiles, BrokerProfile, CompiledProfile};
use crate::error::Result;
use crate::extract::ParserRegistry;
use crate::summary::DECLARED_TOTAL_KEYS;

/// Two totals closer than this are considered equal
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub struct ParserConfig {
    /// Detection order: the first matching profile wins
    pub profiles: Vec<Arc<CompiledProfile>>,
    pub registry: ParserRegistry,
    pub tolerance: Decimal,
    /// Summary keys holding the declared gross total, in order of preference
    pub declared_total_keys: &'static [&'static str],
}

impl ParserConfig {
    /// Configuration with every built-in broker profile
    pub fn builtin() -> Result<Self> {
        Self::from_profiles(&get_all_profiles())
    }

    pub fn from_profiles(profiles: &[&'static BrokerProfile]) -> Result<Self> {
        let compiled = profiles
            .iter()
            .map(|p| CompiledProfile::compile(*p).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        let registry = ParserRegistry::build(&compiled)?;

        log::debug!(
            "Parser config: {} profiles, {} parsers",
            compiled.len(),
            registry.len()
        );

        Ok(Self {
            profiles: compiled,
            registry,
            tolerance: DEFAULT_TOLERANCE,
            declared_total_keys: DECLARED_TOTAL_KEYS,
        })
    }

    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn profile_names(&self) -> Vec<&'static str> {
        self.profiles.iter().map(|p| p.name()).collect()
    }
}

//! Import of Brazilian brokerage notes ("notas de corretagem").
//!
//! Reads note files (PDF or text dumps), splits bundles into single notes,
//! extracts trades and declared totals with broker-specific profiles and
//! checks that both agree.

pub mod brokers;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod layout;
pub mod models;
pub mod normalize;
pub mod pdf_import;
pub mod processor;
pub mod reconcile;
pub mod split;
pub mod summary;

pub use config::ParserConfig;
pub use error::{ImportError, Result};
pub use models::{BatchResult, ConsistencyRow, MarketKind, SummaryRecord, Trade};
pub use processor::TradeProcessor;

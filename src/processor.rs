//! Batch processing of a directory of notes.
//!
//! Split, then per note: broker detection, classification, trade and
//! summary extraction. Results are aggregated and reconciled at the end.
//! A failing note is reported as a warning and never aborts the batch.

use std::fs;
use std::path::{Path, PathBuf};

use crate::brokers::detect_broker;
use crate::classify::classify;
use crate::config::ParserConfig;
use crate::error::{ImportError, Result};
use crate::extract::{ParseContext, ParsedNote};
use crate::models::{BatchResult, MarketKind};
use crate::normalize::remove_accents;
use crate::pdf_import::{DocumentFormat, FileTextSource, PageTextSource};
use crate::reconcile::reconcile;
use crate::split::{prepare_for_processing, SubDocument};

pub struct TradeProcessor<S: PageTextSource = FileTextSource> {
    config: ParserConfig,
    source: S,
}

impl TradeProcessor<FileTextSource> {
    pub fn new(config: ParserConfig) -> Self {
        Self::with_source(config, FileTextSource)
    }
}

impl<S: PageTextSource> TradeProcessor<S> {
    pub fn with_source(config: ParserConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Process every `.pdf` / `.txt` file of `dir`, in file name order.
    ///
    /// Split files live in a temp directory that is removed when this
    /// returns.
    pub fn process_directory(&self, dir: &Path) -> Result<BatchResult> {
        if !dir.is_dir() {
            return Err(ImportError::DirectoryNotFound(dir.to_path_buf()));
        }

        let files = list_documents(dir)?;
        if files.is_empty() {
            log::warn!("Import: no note files found in {}", dir.display());
            return Ok(BatchResult::default());
        }
        log::info!("Import: {} files in {}", files.len(), dir.display());

        let temp_dir = tempfile::Builder::new()
            .prefix("notas-")
            .tempdir()
            .map_err(|e| ImportError::io(std::env::temp_dir(), e))?;

        let mut ctx = ParseContext::new();
        let documents = prepare_for_processing(&files, &self.source, temp_dir.path(), &mut ctx);

        let mut result = self.process_documents(&documents);
        ctx.warnings.append(&mut result.warnings);
        result.warnings = ctx.warnings;

        Ok(result)
    }

    /// Parse already split notes, aggregate and reconcile them.
    pub fn process_documents(&self, documents: &[SubDocument]) -> BatchResult {
        let mut ctx = ParseContext::new();
        let mut result = BatchResult::default();

        for doc in documents {
            if let Some(note) = self.process_document(doc, &mut ctx) {
                result.trades.extend(note.trades);
                result.summaries.push(note.summary);
            }
        }

        // Stable: trades keep document order within (broker, date)
        result.trades.sort_by(|a, b| {
            a.broker
                .cmp(&b.broker)
                .then_with(|| a.parsed_date().cmp(&b.parsed_date()))
        });
        result.summaries.sort_by(|a, b| {
            a.broker
                .cmp(&b.broker)
                .then_with(|| a.parsed_date().cmp(&b.parsed_date()))
        });

        result.consistency = reconcile(
            &result.trades,
            &result.summaries,
            self.config.declared_total_keys,
            self.config.tolerance,
        );
        result.warnings = ctx.warnings;

        log::info!(
            "Import: {} trades, {} summaries, {} consistency rows",
            result.trades.len(),
            result.summaries.len(),
            result.consistency.len()
        );

        result
    }

    fn process_document(&self, doc: &SubDocument, ctx: &mut ParseContext) -> Option<ParsedNote> {
        let origin = doc.path.display().to_string();
        let text = remove_accents(&doc.pages.join("\n"));

        let detected = detect_broker(&text, self.config.profiles.iter().map(|p| &**p));
        let Some(broker) = detected.broker.clone() else {
            ctx.warn(
                "broker",
                &format!(
                    "no broker profile matches, tried {}",
                    self.config.profile_names().join(", ")
                ),
                &origin,
            );
            return None;
        };
        if detected.is_ambiguous() {
            ctx.warn(
                "broker",
                &format!(
                    "several broker profiles match ({}), using {}",
                    detected.candidates.join(", "),
                    broker
                ),
                &origin,
            );
        }

        let kind = if doc.kind.is_known() {
            doc.kind
        } else {
            classify(&text)
        };
        if kind == MarketKind::Unknown {
            ctx.warn("kind", "neither a spot nor a futures note, skipped", &origin);
            return None;
        }

        let Some(parser) = self.config.registry.get(&broker, kind) else {
            ctx.warn(
                "parser",
                &format!("no parser for {} {}", broker, kind.label()),
                &origin,
            );
            return None;
        };

        let note = parser.parse(&doc.pages, ctx);
        log::info!(
            "Import: {} {} note {} from {}: {} trades",
            broker,
            kind.label(),
            note.summary.invoice,
            origin,
            note.trades.len()
        );

        Some(note)
    }
}

/// Note files of `dir`, sorted by name
fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ImportError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ImportError::io(dir, e))?.path();
        if path.is_file() && DocumentFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

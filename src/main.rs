use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use notas_lib::layout::build_report;
use notas_lib::{ParserConfig, TradeProcessor};

#[derive(Parser, Debug)]
#[command(name = "notas", version, about = "Extract trades and totals from brokerage notes")]
struct Cli {
    /// Directory holding the note files (.pdf or .txt)
    dir: PathBuf,

    /// Output file (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Emit the sheet layout (Negócios / Resumo / Consistência) instead of raw records
    #[arg(long)]
    tables: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notas_lib=info,notas=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ParserConfig::builtin().context("building broker profiles")?;
    let processor = TradeProcessor::new(config);
    let batch = processor
        .process_directory(&cli.dir)
        .with_context(|| format!("processing {}", cli.dir.display()))?;

    // Each warning was already logged where it was raised
    if !batch.warnings.is_empty() {
        log::info!("{} warnings in batch", batch.warnings.len());
    }

    let json = if cli.tables {
        serde_json::to_string_pretty(&build_report(&batch))?
    } else {
        serde_json::to_string_pretty(&batch)?
    };

    let mut writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    writeln!(writer, "{}", json)?;

    Ok(())
}

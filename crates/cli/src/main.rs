use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use passbook_engine::{Engine, ProfileStore};

/// Parse a bank statement with a declarative bank profile and print one
/// JSON object per normalized row.
#[derive(Debug, Parser)]
#[command(name = "passbook", version, about)]
struct Args {
    /// YAML profile file (top-level `banks:` map).
    #[arg(long)]
    profiles: PathBuf,

    /// Parser key of the bank profile to use (case-insensitive).
    #[arg(long)]
    bank: String,

    /// MIME hint, consulted when the file extension is inconclusive.
    #[arg(long)]
    content_type: Option<String>,

    /// Account number override; passed through to the output unchanged.
    #[arg(long)]
    account_no: Option<String>,

    /// Statement file (.csv, .xls, .xlsx or .pdf).
    file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let profiles = ProfileStore::from_path(&args.profiles)
        .with_context(|| format!("loading profiles from {}", args.profiles.display()))?;
    let engine = Engine::new(profiles);

    let file = File::open(&args.file)
        .with_context(|| format!("opening {}", args.file.display()))?;
    let filename = args.file.file_name().and_then(|name| name.to_str());

    let rows = engine.parse(
        file,
        filename,
        args.content_type.as_deref(),
        &args.bank,
        args.account_no.as_deref(),
    )?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for row in &rows {
        serde_json::to_writer(&mut out, row)?;
        writeln!(out)?;
    }
    let summary = serde_json::json!({
        "parsed": rows.len(),
        "bank": args.bank,
        "accountNo": args.account_no,
    });
    serde_json::to_writer(&mut out, &summary)?;
    writeln!(out)?;
    Ok(())
}

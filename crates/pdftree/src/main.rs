use std::fs;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use memmap2::Mmap;
use pdftree_pdf::{Document, ParseOptions};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Dump a PDF's page object trees, then every object each page reaches
/// through indirect references.
#[derive(Parser)]
#[command(name = "pdftree")]
struct Args {
    /// PDF file to dump
    pdf: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    match run(&args.pdf) {
        Ok(()) => {
            println!("Parsing succeeded");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, path = %args.pdf, "Dump failed");
            println!("Parsing failed");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str) -> Result<()> {
    let mmap = mmap_file(path)?;
    let doc = Document::parse(&mmap, ParseOptions::default())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    pdftree_core::print_report(&mut out, &doc)
}

fn mmap_file(path: &str) -> Result<Mmap> {
    let f = fs::File::open(path)?;
    unsafe { Mmap::map(&f).map_err(|e| anyhow!(e)) }
}

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;

use pesym::{logging, AnalysisOptions, AnalysisResult, Analyzer, ImportedFunction};

#[derive(Parser, Debug)]
#[command(version)]
#[command(about = "List the exports and imports of Windows PE images", long_about = None)]
struct Args {
    /// Images to inspect
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Print a JSON array instead of text
    #[arg(long)]
    json: bool,

    /// JSON file overriding analysis limits
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, conflicts_with = "imports_only")]
    exports_only: bool,

    #[arg(long)]
    imports_only: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn write_text(out: &mut impl Write, result: &AnalysisResult) -> std::io::Result<()> {
    writeln!(out, "{}", result.file_path().display())?;
    writeln!(
        out,
        "  machine: {}  {}-bit  {}",
        result.machine(),
        if result.is_64bit() { 64 } else { 32 },
        if result.is_dll() { "DLL" } else { "EXE" }
    )?;

    if !result.exports().is_empty() {
        writeln!(out, "  exports ({}):", result.exports().len())?;
        for export in result.exports() {
            write!(
                out,
                "    {:>5}  0x{:08x}  {}",
                export.ordinal,
                export.rva,
                export.name.as_deref().unwrap_or("<unnamed>")
            )?;
            match &export.forwarder {
                Some(target) => writeln!(out, " -> {}", target)?,
                None => writeln!(out)?,
            }
        }
    }

    if !result.imports().is_empty() {
        writeln!(out, "  imports ({}):", result.import_count())?;
        for module in result.imports() {
            writeln!(out, "    {}", module.name)?;
            for function in &module.functions {
                match function {
                    ImportedFunction::ByName { name, hint } => {
                        writeln!(out, "      {:>5}  {}", hint, name)?
                    }
                    ImportedFunction::ByOrdinal { ordinal } => {
                        writeln!(out, "             #{}", ordinal)?
                    }
                }
            }
        }
        if let Some(hash) = result.import_hash() {
            writeln!(out, "  imphash: {}", hash)?;
        }
    }

    Ok(())
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.log_json {
        logging::init_tracing_json();
    } else {
        logging::init_tracing();
    }

    let mut options = match &args.config {
        Some(path) => AnalysisOptions::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AnalysisOptions::default(),
    };
    if args.exports_only {
        options.parse.parse_imports = false;
    }
    if args.imports_only {
        options.parse.parse_exports = false;
    }

    let analyzer = Analyzer::new(options);
    let results: Vec<_> = args
        .paths
        .par_iter()
        .map(|path| (path, analyzer.try_analyze_path(path)))
        .collect();

    let mut failed = false;
    let mut analyzed = Vec::new();
    for (path, result) in results {
        match result {
            Ok(result) => analyzed.push(result),
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                failed = true;
            }
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &analyzed)?;
        writeln!(out)?;
    } else {
        for result in &analyzed {
            write_text(&mut out, result)?;
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

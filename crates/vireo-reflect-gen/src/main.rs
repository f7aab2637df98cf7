//! `gen-member-reflection`: one-shot generator invoked by the build system.
//!
//! Exits 0 on success and 1 on any argument, parse, or I/O failure.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use vireo_reflect_gen::{generate, scan_reflectables, REFLECTABLES};

#[derive(Parser)]
#[command(name = "gen-member-reflection")]
#[command(about = "Generate member reflection helpers from debug-info", long_about = None)]
struct Args {
    /// Filename to read debug-info from
    #[arg(long, value_name = "FILE")]
    source_file: PathBuf,

    /// Filename of generated code
    #[arg(long, value_name = "FILE")]
    output_file: PathBuf,

    /// Directory to put generated code in
    #[arg(long, value_name = "DIR")]
    install_dir: Option<PathBuf>,

    /// Number of parallel threads
    #[arg(long, default_value_t = 24)]
    num_threads: i64,

    /// Ignored
    #[arg(long, value_name = "DIR")]
    fbcode_dir: Option<String>,

    /// Just here so callers can declare dependencies
    #[arg(long)]
    dep: Vec<String>,
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.num_threads <= 0 {
        anyhow::bail!("illegal num_threads={}", args.num_threads);
    }

    let output_path = match &args.install_dir {
        Some(dir) => dir.join(&args.output_file),
        None => args.output_file.clone(),
    };

    let objects = scan_reflectables(&args.source_file, args.num_threads as usize, REFLECTABLES)
        .with_context(|| format!("reading debug-info from {}", args.source_file.display()))?;

    let file = File::create(&output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;
    let mut out = BufWriter::new(file);
    generate(&mut out, &objects).with_context(|| format!("writing {}", output_path.display()))?;
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Includes --help output; the build system treats any non-run
            // as a failure.
            let _ = err.print();
            return ExitCode::from(1);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("\nError generating member reflection utilities:\n{err:#}\n");
            ExitCode::from(1)
        }
    }
}

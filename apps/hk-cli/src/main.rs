use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use hk_bc::{dialect_for_path, read_blocks, write_blocks, BcError};
use hk_forcing::{insert_boundary_data, ForcingError};
use thiserror::Error;

#[derive(Parser)]
#[command(name = "hk-cli")]
#[command(about = "hydrokit CLI - boundary-condition file tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a boundary file and report what a full import would accept
    Validate {
        /// Path to the .bc/.bcm file
        path: PathBuf,
    },
    /// List the blocks of a boundary file
    Blocks {
        /// Path to the .bc/.bcm file
        path: PathBuf,
        /// Dump blocks as JSON instead of a summary table
        #[arg(long)]
        json: bool,
    },
    /// Read a boundary file and write it back out
    Rewrite {
        /// Path to the input .bc/.bcm file
        input: PathBuf,
        /// Path to the output file; its extension picks the output dialect
        output: PathBuf,
        /// Append to the output file instead of replacing it
        #[arg(long)]
        append: bool,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    File(#[from] BcError),
    #[error(transparent)]
    Forcing(#[from] ForcingError),
    #[error("cannot encode blocks as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => cmd_validate(&path),
        Commands::Blocks { path, json } => cmd_blocks(&path, json),
        Commands::Rewrite {
            input,
            output,
            append,
        } => cmd_rewrite(&input, &output, append),
    }
}

fn cmd_validate(path: &Path) -> CliResult<()> {
    println!("Validating boundary file: {}", path.display());
    let dialect = dialect_for_path(path);
    let blocks = read_blocks(path, dialect)?;

    let mut fields = Vec::new();
    let report = insert_boundary_data(&mut fields, &blocks)?;

    println!("  Dialect: {}", dialect.name());
    println!("  Blocks read: {}", blocks.len());
    println!("  Support points resolved: {}", fields.len());
    if report.all_succeeded() {
        println!("✓ All blocks resolved");
    } else {
        println!("✗ {} block(s) rejected during resolution", report.rejected);
    }
    Ok(())
}

fn cmd_blocks(path: &Path, json: bool) -> CliResult<()> {
    let dialect = dialect_for_path(path);
    let blocks = read_blocks(path, dialect)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    if blocks.is_empty() {
        println!("No blocks found in {}", path.display());
    } else {
        println!("Blocks in {}:", path.display());
        for block in &blocks {
            println!(
                "  line {:>4}  {} - {} ({} columns, {} rows)",
                block.line_number,
                block.support_point,
                block.function_type,
                block.quantities.len(),
                block.row_count().unwrap_or(0),
            );
        }
    }
    Ok(())
}

fn cmd_rewrite(input: &Path, output: &Path, append: bool) -> CliResult<()> {
    let blocks = read_blocks(input, dialect_for_path(input))?;
    write_blocks(output, dialect_for_path(output), &blocks, append)?;
    println!(
        "✓ Wrote {} block(s) to {}",
        blocks.len(),
        output.display()
    );
    Ok(())
}

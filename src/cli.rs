use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Batch ETL for travel spending and places records",
    long_about = None
)]
pub struct Cli {
    /// Append log output to this file instead of stderr
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract, validate, clean and load records into the relational store
    Run(RunArgs),
    /// Extract, validate and clean local files, exporting cleaned and missing rows
    Process(ProcessArgs),
    /// Summarize cleaned spending and places exports
    Analyze(AnalyzeArgs),
    /// Create the permanent store tables when they do not exist
    CreateTables(CreateTablesArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Pipeline configuration file (.json, .yml or .yaml)
    #[arg(short, long)]
    pub config: PathBuf,
    /// Store connection string (defaults to TRAVEL_LEDGER_STORE_URL)
    #[arg(long)]
    pub store: Option<String>,
    /// Also export the validated tables to the configured cleaned outputs
    #[arg(long = "export-validated")]
    pub export_validated: bool,
    /// Do not export the rows that failed the required-column check
    #[arg(long = "skip-missing-export")]
    pub skip_missing_export: bool,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Pipeline configuration file (.json, .yml or .yaml)
    #[arg(short, long)]
    pub config: PathBuf,
    /// CSV delimiter character for the inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Cleaned spending CSV
    #[arg(long)]
    pub spending: PathBuf,
    /// Cleaned places CSV
    #[arg(long)]
    pub places: PathBuf,
    /// Number of cities listed per ranking
    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

#[derive(Debug, Args)]
pub struct CreateTablesArgs {
    /// Store connection string (defaults to TRAVEL_LEDGER_STORE_URL)
    #[arg(long)]
    pub store: Option<String>,
    /// Schema that holds the permanent tables
    #[arg(long, default_value = "main")]
    pub schema: String,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub mod analysis;
pub mod clean;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod gate;
pub mod io_utils;
pub mod kinds;
pub mod load;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod table;
pub mod validate;
pub mod verify;

use std::{
    env,
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, error, info, warn};

use crate::{
    cli::{Cli, Commands},
    config::PipelineConfig,
    error::EtlError,
    pipeline::RunSummary,
    source::{
        DirectoryObjectStore, LocalFileSource, ObjectStoreSource, ReadOptions, RecordSource,
    },
    store::SqliteStore,
};

pub const STORE_URL_ENV: &str = "TRAVEL_LEDGER_STORE_URL";

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging(log_file: Option<&Path>) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("travel_ledger", LevelFilter::Info);
        }
        if let Some(path) = log_file {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(err) => eprintln!("warning: cannot open log file {path:?}: {err}"),
            }
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let log_file = cli.log_file.as_deref();
    match &cli.command {
        Commands::Run(args) => handle_run(args, log_file),
        Commands::Process(args) => handle_process(args, log_file),
        Commands::Analyze(args) => {
            init_logging(log_file);
            handle_analyze(args)
        }
        Commands::CreateTables(args) => {
            init_logging(log_file);
            handle_create_tables(args)
        }
    }
}

fn load_config(path: &Path, log_file: Option<&Path>) -> Result<PipelineConfig> {
    let config = PipelineConfig::load(path)
        .with_context(|| format!("Loading configuration from {path:?}"))?;
    init_logging(log_file.or(config.log_file.as_deref()));
    Ok(config)
}

/// Connection string from the flag, else from the environment (`.env` honoured).
fn resolve_store_url(provided: Option<&str>) -> Result<String> {
    if let Some(url) = provided {
        return Ok(url.to_string());
    }
    let _ = dotenvy::dotenv();
    env::var(STORE_URL_ENV)
        .map_err(|_| anyhow!("No store given: pass --store or set {STORE_URL_ENV}"))
}

fn halt_on_stage_error(outcome: Result<RunSummary, EtlError>) -> Result<RunSummary> {
    outcome.map_err(|err| {
        error!("Run halted at the {} stage: {err}", err.stage());
        err.into()
    })
}

fn handle_run(args: &cli::RunArgs, log_file: Option<&Path>) -> Result<()> {
    let mut config = load_config(&args.config, log_file)?;
    if args.export_validated {
        config.export_validated = true;
    }
    if args.skip_missing_export {
        config.export_missing = false;
    }
    let options = config.read_options()?;
    let url = resolve_store_url(args.store.as_deref())?;
    let mut store =
        SqliteStore::open(&url).with_context(|| format!("Opening store '{url}'"))?;
    info!("Connected to store; loading into schema '{}'", config.store_schema);

    let source: Box<dyn RecordSource> = match &config.bucket {
        Some(bucket) => {
            let root = config
                .object_store_root
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            Box::new(ObjectStoreSource::new(
                DirectoryObjectStore::new(root),
                bucket.clone(),
                options,
            ))
        }
        None => Box::new(LocalFileSource::new(options)),
    };
    let summary = halt_on_stage_error(pipeline::run_warehouse(
        source.as_ref(),
        &config,
        &mut store,
    ))?;
    print!("{}", table::render_summary(&summary));
    if let Some(load) = &summary.load
        && !load.is_complete()
    {
        for (name, reason) in &load.failed {
            warn!("{name} was staged but not appended: {reason}");
        }
    }
    Ok(())
}

fn handle_process(args: &cli::ProcessArgs, log_file: Option<&Path>) -> Result<()> {
    let config = load_config(&args.config, log_file)?;
    let options = ReadOptions {
        delimiter: args.delimiter,
        ..config.read_options()?
    };
    let source = LocalFileSource::new(options);
    let summary = halt_on_stage_error(pipeline::run_local(&source, &config))?;
    print!("{}", table::render_summary(&summary));
    Ok(())
}

fn handle_analyze(args: &cli::AnalyzeArgs) -> Result<()> {
    let source = LocalFileSource::default();
    let spending = source.fetch("spending", &args.spending.to_string_lossy())?;
    let places = source.fetch("places", &args.places.to_string_lossy())?;
    let analysis = analysis::summarize(&spending, &places, args.top)
        .context("An error occurred while performing the analysis")?;
    let headers = vec!["metric".to_string(), "value".to_string()];
    print!("{}", table::render_table(&headers, &analysis.render_rows()));
    Ok(())
}

fn handle_create_tables(args: &cli::CreateTablesArgs) -> Result<()> {
    let url = resolve_store_url(args.store.as_deref())?;
    let mut store =
        SqliteStore::open(&url).with_context(|| format!("Opening store '{url}'"))?;
    load::create_tables(&mut store, &args.schema)?;
    info!("Store tables ready in schema '{}'", args.schema);
    Ok(())
}

//! Stage orchestration for both pipeline generations.
//!
//! Both runs share the same front half: extract → check → threshold gate →
//! clean. The local run then exports CSV files; the warehouse run adds the
//! post-clean validation gate and loads the store. Any stage error halts the run
//! before a sink is touched.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::{
    clean::{self, CleanReport},
    config::PipelineConfig,
    data::TableSet,
    error::EtlError,
    gate,
    load::{self, LoadReport},
    source::{self, RecordSource},
    store::RelationalStore,
    validate::{self, RequiredColumns},
    verify,
};

/// Output of the shared front half of a run.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub original_sizes: BTreeMap<String, usize>,
    pub missing: TableSet,
    pub cleaned: TableSet,
    pub report: CleanReport,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub rows_read: BTreeMap<String, usize>,
    pub rows_missing: BTreeMap<String, usize>,
    pub rows_cleaned: BTreeMap<String, usize>,
    pub sentinels: usize,
    pub export_failures: usize,
    pub load: Option<LoadReport>,
}

impl RunSummary {
    fn from_prepared(prepared: &Prepared) -> Self {
        let counts = |tables: &TableSet| {
            tables
                .iter()
                .map(|(name, table)| (name.clone(), table.len()))
                .collect()
        };
        Self {
            rows_read: prepared.original_sizes.clone(),
            rows_missing: counts(&prepared.missing),
            rows_cleaned: counts(&prepared.cleaned),
            sentinels: prepared.report.total(),
            export_failures: 0,
            load: None,
        }
    }
}

/// Check → gate → clean over already extracted tables.
pub fn prepare(
    raw: &TableSet,
    required: &RequiredColumns,
    threshold: f64,
) -> Result<Prepared, EtlError> {
    let original_sizes = gate::original_sizes(raw);
    let partition = validate::check(raw, required)?;
    gate::enforce(&partition.missing, &original_sizes, threshold)?;
    let (cleaned, report) = clean::clean(&partition.checked)?;
    Ok(Prepared {
        original_sizes,
        missing: partition.missing,
        cleaned,
        report,
    })
}

/// Local generation: export cleaned and missing rows as CSV files.
///
/// Export failures are logged per table and do not fail the run.
pub fn run_local(
    source: &dyn RecordSource,
    config: &PipelineConfig,
) -> Result<RunSummary, EtlError> {
    let raw = source::extract(source, &config.sources)?;
    let prepared = prepare(&raw, &config.required_columns(), config.missing_data_threshold)?;
    let mut summary = RunSummary::from_prepared(&prepared);

    let mut failures = load::persist_lenient(&prepared.cleaned, &config.cleaned_outputs);
    if config.export_missing {
        failures.extend(load::persist_lenient(
            &prepared.missing,
            &config.missing_outputs,
        ));
    }
    if !failures.is_empty() {
        warn!("{} export(s) failed", failures.len());
    }
    summary.export_failures = failures.len();
    info!("Local run finished.");
    Ok(summary)
}

/// Warehouse generation: validate after cleaning, export, then load the store.
pub fn run_warehouse(
    source: &dyn RecordSource,
    config: &PipelineConfig,
    store: &mut dyn RelationalStore,
) -> Result<RunSummary, EtlError> {
    let raw = source::extract(source, &config.sources)?;
    let prepared = prepare(&raw, &config.required_columns(), config.missing_data_threshold)?;
    let mut summary = RunSummary::from_prepared(&prepared);
    let validated = verify::validate(prepared.cleaned, &config.validation_options())?;

    if config.export_validated {
        load::persist(&validated, &config.cleaned_outputs)?;
    }
    if config.export_missing {
        load::persist(&prepared.missing, &config.missing_outputs)?;
    }

    let report = load::load_to_store(store, &validated, &config.store_schema)?;
    if !report.is_complete() {
        warn!(
            "{} table(s) could not be appended to the store",
            report.failed.len()
        );
    }
    summary.load = Some(report);
    info!("Warehouse run finished.");
    Ok(summary)
}

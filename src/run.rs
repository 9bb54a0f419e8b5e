//! The reconciliation pipeline for the files of one date, and for every date found in a directory.
use crate::discover::{self, FileKind, Inputs};
use crate::reconcile::{EstimateSchema, FlowSchema};
use crate::report::ReportSchema;
use crate::table::{self, Table};
use crate::{config, Config};
use std::path::{Path, PathBuf};
use time::Date;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Discover(#[from] discover::Error),
    #[error(transparent)]
    Table(#[from] table::Error),
}

/// What happened while processing the files of one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub date: Date,
    pub flows_output: PathBuf,
    /// The amount of times an estimate was applied to a flow row.
    pub modified_rows: usize,
    /// The amount of flow rows whose amounts actually changed.
    pub changed_rows: usize,
    pub unmatched_estimates: usize,
    /// Flow and estimate rows that couldn't be read and were left out.
    pub skipped_rows: usize,
    pub report: Option<ReportOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub output: PathBuf,
    pub updated_rows: usize,
    pub unmatched_rows: usize,
}

/// The results of processing every date of a directory.
#[derive(Debug, Default)]
pub struct Batch {
    pub outcomes: Vec<Outcome>,
    pub failures: Vec<Error>,
}

/// Reconcile the flows of `inputs` with their estimates, roll them up into the report if there is one,
/// and write the results to `output_dir`.
///
/// Both required tables are loaded and checked for their columns before any row is processed.
pub fn process(inputs: &Inputs, output_dir: &Path, config: &Config) -> Result<Outcome, Error> {
    let span = tracing::info_span!("process", date = %inputs.date);
    let _enter = span.enter();
    let delimiter = config.delimiter_byte()?;

    let mut flows_table = Table::load(&inputs.flows, delimiter, &config.encodings)?;
    let estimates_table = Table::load(&inputs.estimates, delimiter, &config.encodings)?;
    let flow_schema = FlowSchema::resolve(&flows_table, &config.flows)?;
    let estimate_schema = EstimateSchema::resolve(&estimates_table, &config.estimates, config.rule)?;

    let flows = flow_schema.load(&flows_table);
    let estimates = estimate_schema.load(&estimates_table);
    for (name, err) in flows
        .skipped
        .iter()
        .map(|err| (&flows_table.name, err))
        .chain(estimates.skipped.iter().map(|err| (&estimates_table.name, err)))
    {
        tracing::warn!("skipping row of '{name}': {err}");
    }

    let reconciliation = crate::reconcile(&flows.records, &estimates.records, config.rule);
    if !reconciliation.unmatched_estimates.is_empty() {
        tracing::warn!(
            "{} of {} estimate rows matched no flow row by contract and date, at lines {:?}",
            reconciliation.unmatched_estimates.len(),
            estimates.records.len(),
            reconciliation.unmatched_estimates
        );
    }
    let changed_rows =
        flow_schema.write_back(&mut flows_table, &flows.records, &reconciliation.flows);
    tracing::info!(
        rule = ?config.rule,
        modified = reconciliation.modified_rows,
        changed_rows,
        "reconciled flows"
    );

    let flows_output = output_dir.join(FileKind::Flows.output_name(inputs.date));
    flows_table.save(&flows_output, delimiter)?;

    let report = match &inputs.report {
        Some(path) => {
            let mut report_table = Table::load(path, delimiter, &config.encodings)?;
            let schema = ReportSchema::resolve(&report_table, &config.report)?;
            let aggregation = crate::aggregate(
                &schema.requests(&report_table),
                &flow_schema.present_values(&flows_table),
            );
            for record in &aggregation.records {
                tracing::debug!(
                    code = %record.operation_code,
                    coupon = record.coupon,
                    coupon_alt = record.coupon_alt,
                    "aggregated"
                );
            }
            if !aggregation.unmatched.is_empty() {
                tracing::warn!(
                    "report rows without flows keep their coupons: {:?}",
                    aggregation.unmatched
                );
            }
            schema.write_back(&mut report_table, &aggregation.records);
            let output = output_dir.join(FileKind::Report.output_name(inputs.date));
            report_table.save(&output, delimiter)?;
            tracing::info!(updated = aggregation.records.len(), "aggregated report");
            Some(ReportOutcome {
                output,
                updated_rows: aggregation.records.len(),
                unmatched_rows: aggregation.unmatched.len(),
            })
        }
        None => {
            tracing::info!("no report file, skipping aggregation");
            None
        }
    };

    Ok(Outcome {
        date: inputs.date,
        flows_output,
        modified_rows: reconciliation.modified_rows,
        changed_rows,
        unmatched_estimates: reconciliation.unmatched_estimates.len(),
        skipped_rows: flows.skipped.len() + estimates.skipped.len(),
        report,
    })
}

/// Process every date for which `data_dir` holds a flows file. Dates are independent of each other,
/// a failing date is recorded and the next one is processed.
pub fn process_all(data_dir: &Path, output_dir: &Path, config: &Config) -> Result<Batch, Error> {
    let mut batch = Batch::default();
    for inputs in discover::all(data_dir)? {
        match inputs
            .map_err(Error::from)
            .and_then(|inputs| process(&inputs, output_dir, config))
        {
            Ok(outcome) => batch.outcomes.push(outcome),
            Err(err) => {
                tracing::error!("{err}");
                batch.failures.push(err);
            }
        }
    }
    Ok(batch)
}

use crate::options::{Args, Subcommands};
use anyhow::{bail, Context};
use clap::Parser;
use swapflow::{discover, normalize, run, Config};

mod options {
    use std::path::PathBuf;

    #[derive(Debug, clap::Parser)]
    #[command(
        name = "swapflow",
        about = "Reconcile swap cash flows with estimates and clean up text files"
    )]
    pub struct Args {
        /// A RON file to override column names, the delimiter, the reconciliation rule or the encodings to try.
        #[clap(long, short = 'c', global = true)]
        pub config: Option<PathBuf>,
        /// A directory to write 'procesamiento.log' into, in addition to logging to the console.
        #[clap(long, global = true)]
        pub log_dir: Option<PathBuf>,
        #[clap(subcommand)]
        pub cmd: Subcommands,
    }

    #[derive(Debug, clap::Subcommand)]
    pub enum Subcommands {
        /// Overwrite the amounts of flow rows with the estimates of the same contract and date, and roll the
        /// result up into the report.
        ///
        /// Without `--date` or explicit files, every flows file of the data directory is processed with the
        /// estimates and report files of its date.
        Reconcile {
            /// The directory holding the input files.
            #[clap(long, short = 'd', default_value = "data")]
            data_dir: PathBuf,
            /// The directory to write processed files into.
            #[clap(long, short = 'o', default_value = "procesados")]
            output_dir: PathBuf,
            /// Only process the files of this date, given as YYYYMMDD.
            #[clap(long, conflicts_with = "flows")]
            date: Option<String>,
            /// The flows file to use instead of looking it up in the data directory.
            #[clap(long, requires = "estimates")]
            flows: Option<PathBuf>,
            /// The estimates file belonging to `--flows`.
            #[clap(long, requires = "flows")]
            estimates: Option<PathBuf>,
            /// The report file belonging to `--flows`.
            #[clap(long, requires = "flows")]
            report: Option<PathBuf>,
        },
        /// Replace accented vowels and 'ñ' in every CSV file of the data directory, and strip the leading zeros
        /// of the codes 033 and 011001.
        Normalize {
            /// The directory holding the CSV files.
            #[clap(long, short = 'd', default_value = "data")]
            data_dir: PathBuf,
            /// The directory to write normalized files into, under their original names.
            #[clap(long, short = 'o', default_value = "procesados")]
            output_dir: PathBuf,
            #[clap(long, value_enum, default_value_t = Mode::Cells)]
            mode: Mode,
        },
    }

    #[derive(Debug, Clone, Copy, clap::ValueEnum)]
    pub enum Mode {
        /// Normalize each cell of the parsed table.
        Cells,
        /// Normalize each raw line.
        Lines,
    }
}

mod logging {
    use anyhow::Context;
    use std::path::Path;
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    /// Log to the console, and to `log_dir` if given. Logs are flushed when the returned guard is dropped.
    pub fn init(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("swapflow=info"));
        let (file_layer, guard) = match log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Could not create log directory at '{}'", dir.display())
                })?;
                let appender = tracing_appender::rolling::never(dir, "procesamiento.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (
                    Some(fmt::layer().with_ansi(false).with_writer(writer)),
                    Some(guard),
                )
            }
            None => (None, None),
        };
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stdout))
            .with(file_layer)
            .init();
        Ok(guard)
    }
}

fn main() -> anyhow::Result<()> {
    let args = options::Args::parse();
    let _guard = logging::init(args.log_dir.as_deref())?;
    let result = execute(args);
    match &result {
        Ok(()) => tracing::info!("processing completed"),
        Err(err) => tracing::error!("{err:#}"),
    }
    result
}

fn execute(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    match args.cmd {
        Subcommands::Reconcile {
            data_dir,
            output_dir,
            date,
            flows,
            estimates,
            report,
        } => {
            let inputs = match (flows, estimates, date) {
                (Some(flows), Some(estimates), _) => {
                    Some(discover::Inputs::from_paths(flows, estimates, report)?)
                }
                (_, _, Some(date)) => Some(discover::for_date(
                    &data_dir,
                    discover::parse_reference_date(&date)?,
                )?),
                _ => None,
            };
            match inputs {
                Some(inputs) => {
                    let outcome = run::process(&inputs, &output_dir, &config).with_context(|| {
                        format!("Failed to process the files of {}", inputs.date)
                    })?;
                    tracing::info!(
                        output = %outcome.flows_output.display(),
                        modified = outcome.modified_rows,
                        "done"
                    );
                }
                None => {
                    let batch = run::process_all(&data_dir, &output_dir, &config)?;
                    if batch.outcomes.is_empty() && batch.failures.is_empty() {
                        tracing::info!(dir = %data_dir.display(), "no flows files to process");
                    }
                    if !batch.failures.is_empty() {
                        bail!(
                            "{} of {} dates could not be processed",
                            batch.failures.len(),
                            batch.failures.len() + batch.outcomes.len()
                        );
                    }
                }
            }
        }
        Subcommands::Normalize {
            data_dir,
            output_dir,
            mode,
        } => {
            let outcome = normalize::normalize_dir(
                &data_dir,
                &output_dir,
                &normalize::Options {
                    mode: match mode {
                        options::Mode::Cells => normalize::Mode::Cells,
                        options::Mode::Lines => normalize::Mode::Lines,
                    },
                    delimiter: config.delimiter_byte()?,
                    encodings: config.encodings.clone(),
                },
            )?;
            if !outcome.failed.is_empty() {
                bail!(
                    "{} of {} files could not be normalized",
                    outcome.failed.len(),
                    outcome.failed.len() + outcome.written.len()
                );
            }
        }
    }
    Ok(())
}

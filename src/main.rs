/*!
 * dataload CLI - Command Line Interface
 *
 * Exit codes: 0 success, 1 job failed, 2 fatal error, 3 timed out waiting.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use dataload::{
    config::LoaderConfig,
    core::{DataDumper, DataLoader, LoadRequest},
    error::{LoadError, Result, EXIT_SUCCESS},
    logging,
    protocol::http::ApiClient,
    CsvOptions, JobKind, LogLevel,
};
use secrecy::SecretString;
use tracing::debug;

#[derive(Parser)]
#[command(name = "dataload")]
#[command(version, about = "Load CSV files into datasets and dump datasets to CSV", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// API base address, e.g. https://api.example.com/rest
    #[arg(long, global = true, env = "DATALOAD_HOST")]
    host: Option<String>,

    /// Bearer token for the API
    #[arg(long, global = true, env = "DATALOAD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a CSV file and load it into a dataset
    Upload {
        #[arg(long)]
        project: String,

        /// CSV file to upload
        #[arg(long, value_name = "PATH")]
        file: PathBuf,

        #[arg(long)]
        dataset: String,

        /// Loading mode: full or incremental
        #[arg(long, default_value = "full")]
        mode: String,

        /// Return after submitting the load job instead of waiting for it
        #[arg(long)]
        no_wait: bool,

        /// Files up to this many bytes are uploaded in one request
        #[arg(long, value_name = "BYTES")]
        threshold: Option<u64>,

        /// Target multipart part size
        #[arg(long, value_name = "BYTES")]
        part_size: Option<u64>,

        /// Upload multipart parts without gzip
        #[arg(long)]
        no_compress: bool,

        /// Seconds between job status checks
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,

        /// Give up waiting after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Field separator passed to the load job
        #[arg(long)]
        csv_separator: Option<String>,

        /// Quote character passed to the load job
        #[arg(long)]
        csv_quote: Option<String>,

        /// Escape character passed to the load job
        #[arg(long)]
        csv_escape: Option<String>,

        /// The file has no header row
        #[arg(long)]
        no_header: bool,
    },

    /// Export a dataset to <OUTPUT>/<DATASET>.csv
    Dump {
        #[arg(long)]
        project: String,

        #[arg(long)]
        dataset: String,

        /// Output directory (created if missing)
        #[arg(long, value_name = "DIR")]
        output: PathBuf,

        /// Seconds between job status checks
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,

        /// Give up waiting after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Show the current status of a job
    Status {
        #[arg(long)]
        job: String,

        #[arg(long, value_enum, default_value = "data-pull")]
        kind: JobKindArg,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum JobKindArg {
    DataPull,
    DataDump,
}

impl From<JobKindArg> for JobKind {
    fn from(arg: JobKindArg) -> Self {
        match arg {
            JobKindArg::DataPull => JobKind::DataPull,
            JobKindArg::DataDump => JobKind::DataDump,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    };
    if let Some(host) = cli.host.clone() {
        config.host = Some(host);
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;

    logging::init_logging(&config)?;

    let token = cli
        .token
        .clone()
        .map(SecretString::from)
        .ok_or_else(|| {
            LoadError::Config("API token is required (--token or DATALOAD_TOKEN)".to_string())
        })?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| LoadError::Config(format!("Failed to start async runtime: {}", e)))?;

    match cli.command {
        Commands::Upload {
            project,
            file,
            dataset,
            mode,
            no_wait,
            threshold,
            part_size,
            no_compress,
            poll_interval,
            timeout,
            csv_separator,
            csv_quote,
            csv_escape,
            no_header,
        } => {
            if let Some(threshold) = threshold {
                config.single_part_threshold = threshold;
            }
            if let Some(part_size) = part_size {
                config.target_part_size = part_size;
            }
            if no_compress {
                config.compress_parts = false;
            }
            apply_poll_overrides(&mut config, poll_interval, timeout);
            config.validate()?;

            let request = LoadRequest {
                project,
                file,
                dataset,
                mode,
                wait: !no_wait,
                csv_options: CsvOptions {
                    header: no_header.then_some(false),
                    separator: csv_separator,
                    quote: csv_quote,
                    escape: csv_escape,
                    ..Default::default()
                },
            };
            runtime.block_on(handle_upload(&config, token, &request))
        }

        Commands::Dump {
            project,
            dataset,
            output,
            poll_interval,
            timeout,
        } => {
            apply_poll_overrides(&mut config, poll_interval, timeout);
            config.validate()?;
            runtime.block_on(handle_dump(&config, token, &project, &dataset, &output))
        }

        Commands::Status { job, kind } => {
            config.validate()?;
            runtime.block_on(handle_status(&config, token, &job, kind.into()))
        }
    }
}

fn apply_poll_overrides(config: &mut LoaderConfig, poll_interval: Option<u64>, timeout: Option<u64>) {
    if let Some(interval) = poll_interval {
        config.poll_interval_secs = interval;
    }
    if timeout.is_some() {
        config.timeout_secs = timeout;
    }
}

async fn handle_upload(config: &LoaderConfig, token: SecretString, request: &LoadRequest) -> Result<()> {
    let api = ApiClient::from_config(config, token)?;
    let api = Arc::new(api);
    let loader = DataLoader::new(api.clone(), api.clone(), Arc::new(api.transfer()), config);

    let job = loader.upload(request).await?;
    debug!("Upload finished, job {}", job.id);
    println!("{}", job.id);
    Ok(())
}

async fn handle_dump(
    config: &LoaderConfig,
    token: SecretString,
    project: &str,
    dataset: &str,
    output: &Path,
) -> Result<()> {
    let api = Arc::new(ApiClient::from_config(config, token)?);
    let dumper = DataDumper::new(
        api.clone(),
        Arc::new(api.transfer()),
        api.base_url(),
        config,
    );

    let path = dumper.dump(project, dataset, output).await?;
    println!("{}", path.display());
    Ok(())
}

async fn handle_status(config: &LoaderConfig, token: SecretString, job: &str, kind: JobKind) -> Result<()> {
    let api = Arc::new(ApiClient::from_config(config, token)?);
    let detail = match kind {
        JobKind::DataPull => {
            DataLoader::new(api.clone(), api.clone(), Arc::new(api.transfer()), config)
                .job_status(job)
                .await?
        }
        JobKind::DataDump => {
            DataDumper::new(api.clone(), Arc::new(api.transfer()), api.base_url(), config)
                .job_status(job)
                .await?
        }
    };
    println!("{}", serde_json::to_string_pretty(&detail)?);
    Ok(())
}

//! MLCast dataset validator CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use compliance::export::ExportDocument;
use compliance::Catalog;
use dataset_validator::{exit, exit_code_for, validate_location, ReportRenderer, RuntimeConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "mlcast-validate")]
#[command(about = "Validate a dataset against an MLCast data specification", long_about = None)]
struct Cli {
    /// Data stage (e.g. source_data). Use --list to view options.
    stage: Option<String>,

    /// Product within the stage (e.g. radar_precipitation)
    product: Option<String>,

    /// Path or s3:// URL of the Zarr dataset
    dataset: Option<String>,

    /// Specification version (default: latest published)
    #[arg(long = "version")]
    spec_version: Option<String>,

    /// List available stage/product combinations and exit
    #[arg(long)]
    list: bool,

    /// Print the requirements of STAGE/PRODUCT without loading a dataset
    #[arg(long)]
    print_spec: bool,

    /// Report format on stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run checks concurrently
    #[arg(long)]
    concurrent: bool,

    /// Per-check timeout in seconds
    #[arg(long)]
    check_timeout_secs: Option<u64>,

    /// Runtime configuration YAML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// S3 endpoint URL for the dataset
    #[arg(long)]
    s3_endpoint_url: Option<String>,

    /// Use anonymous S3 access
    #[arg(long)]
    s3_anon: bool,
}

fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = init_tracing(&cli.log_level, cli.log_json) {
        eprintln!("error: failed to initialise logging: {e}");
        return ExitCode::from(exit::USAGE);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::from(exit::USAGE);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "Validation aborted");
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Logs go to stderr so the report on stdout stays machine readable.
fn init_tracing(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let catalog = Catalog::standard();

    if cli.list {
        println!("{}", ReportRenderer::format_catalog(&catalog.list()));
        return Ok(exit::SUCCESS);
    }

    let (Some(stage), Some(product)) = (cli.stage.as_deref(), cli.product.as_deref()) else {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "STAGE and PRODUCT are required (or use --list)",
            )
            .exit();
    };
    let pipeline = catalog.resolve(stage, product, cli.spec_version.as_deref())?;

    if cli.print_spec {
        println!(
            "{}",
            ReportRenderer::format_requirements(&pipeline.identity(), &pipeline.describe())
        );
        return Ok(exit::SUCCESS);
    }

    let Some(location) = cli.dataset.as_deref() else {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "DATASET is required")
            .exit();
    };

    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };
    config.apply_env();
    if let Some(endpoint) = cli.s3_endpoint_url {
        config.s3.endpoint = Some(endpoint);
    }
    if cli.s3_anon {
        config.s3.anonymous = true;
    }
    if let Some(secs) = cli.check_timeout_secs {
        config.check_timeout_secs = Some(secs);
    }
    if cli.concurrent {
        config.concurrent = true;
    }
    config.validate()?;

    info!(
        pipeline = %pipeline.identity(),
        dataset = location,
        validator = %compliance::export::validator_identity(),
        "Running validator"
    );

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing with a partial report");
            interrupt.cancel();
        }
    });

    let report = validate_location(location, &pipeline, &config, &token).await?;

    match cli.format {
        OutputFormat::Table => println!("{}", ReportRenderer::format_table(location, &report)),
        OutputFormat::Json => println!(
            "{}",
            ExportDocument::new(location, &pipeline.identity(), &report, Utc::now()).to_json()?
        ),
    }

    if let Some(path) = &cli.output {
        let doc = ExportDocument::new(location, &pipeline.identity(), &report, Utc::now());
        std::fs::write(path, doc.to_json()?)?;
        info!(path = %path.display(), "Report saved");
    }

    if report.has_fails() || report.interrupted() {
        Ok(exit::FAILURES)
    } else {
        Ok(exit::SUCCESS)
    }
}

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use vamos_export::app::{App, RunOptions};
use vamos_export::client::VamosHttpClient;
use vamos_export::config::ConfigLoader;
use vamos_export::error::VamosError;
use vamos_export::output::{ConsoleOutput, JsonOutput, OutputMode};
use vamos_export::staging::StagingStore;

#[derive(Parser)]
#[command(name = "vamos-export")]
#[command(about = "Export VAMOS emission point data for one date as per-variable CSV files")]
#[command(version, author)]
struct Cli {
    /// Date to export, as listed by the service (e.g. 2017-01-12)
    #[arg(short = 'd', long)]
    date: String,

    /// Configuration file (default: ./vamos-export.json if present)
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Directory for the per-variable CSV files
    #[arg(short = 'o', long)]
    output_dir: Option<Utf8PathBuf>,

    /// Also write the mapped location points as `id,lat,lon` CSV
    #[arg(long)]
    points_csv: Option<Utf8PathBuf>,

    /// Also write the mapped location points as a point shapefile
    #[arg(long)]
    shapefile: Option<Utf8PathBuf>,

    /// Print the run summary as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(vamos) = report.downcast_ref::<VamosError>() {
            return ExitCode::from(map_exit_code(vamos));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &VamosError) -> u8 {
    match error {
        VamosError::InvalidDate { .. } => 2,
        VamosError::Network(_) | VamosError::ServiceStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let output_dir = cli.output_dir.unwrap_or(config.output_dir);
    let client = VamosHttpClient::new(&config.service)?;
    let app = App::new(client, config.densified_locations, output_dir);
    let options = RunOptions {
        points_csv: cli.points_csv,
        shapefile: cli.shapefile,
    };

    let mut store = StagingStore::open(&config.staging_path)?;
    let result = match output_mode {
        OutputMode::Console => app.run(&mut store, &cli.date, &options, &ConsoleOutput),
        OutputMode::Json => app.run(&mut store, &cli.date, &options, &JsonOutput),
    }?;
    store.close()?;

    match output_mode {
        OutputMode::Console => ConsoleOutput::print_run(&result),
        OutputMode::Json => JsonOutput::print_run(&result).into_diagnostic()?,
    }
    Ok(())
}

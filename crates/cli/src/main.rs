use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use api_types::{catalog::CatalogDocument, job::JobDocument};
use clap::{Args, Parser, Subcommand};
use costing_engine::{Currency, Job};
use serde::de::DeserializeOwned;

use crate::{
    documents::LoadedJob,
    error::{AppError, Result},
    settings::{Overrides, Settings},
};

mod documents;
mod error;
mod report;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "jobcost")]
#[command(about = "Prices job lines and allocates their material costs")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print each line's breakdown and the job totals.
    Quote(QuoteArgs),
    /// Print the totals recorded when the job is saved, as JSON.
    Snapshot(Inputs),
}

#[derive(Args, Debug)]
struct Inputs {
    /// Catalog document (JSON).
    #[arg(long)]
    catalog: PathBuf,
    /// Job document (JSON).
    #[arg(long)]
    job: PathBuf,
}

#[derive(Args, Debug)]
struct QuoteArgs {
    #[command(flatten)]
    inputs: Inputs,
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.overrides)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "jobcost={level},costing_engine={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Quote(args) => {
            let (job, currency) = load(&args.inputs, &settings, &cli.overrides)?;
            if args.json {
                let quote = report::QuoteJson::new(&job, currency);
                println!("{}", serde_json::to_string_pretty(&quote)?);
            } else {
                print!("{}", report::Quote::new(&job, currency));
            }
        }
        Command::Snapshot(inputs) => {
            let (job, currency) = load(&inputs, &settings, &cli.overrides)?;
            let snapshot = job.save(currency, chrono::Utc::now());
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Loads both documents and computes the job.
///
/// Tax mode, VAT and currency flags given on the command line win over the
/// job document.
fn load(inputs: &Inputs, settings: &Settings, overrides: &Overrides) -> Result<(Job, Currency)> {
    let catalog = documents::catalog_from_document(read_json::<CatalogDocument>(&inputs.catalog)?);
    let mut document: JobDocument = read_json(&inputs.job)?;
    if overrides.tax_mode.is_some() {
        document.tax_mode = None;
    }
    if overrides.default_vat_rate.is_some() {
        document.default_vat_rate = None;
    }
    if overrides.currency.is_some() {
        document.currency = None;
    }

    let LoadedJob { job, currency } =
        documents::job_from_document(document, &catalog, settings.context()?)?;
    let currency = match currency {
        Some(currency) => currency,
        None => settings.currency()?,
    };
    Ok((job, currency))
}

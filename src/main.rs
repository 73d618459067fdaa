use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use log::warn;

use cmip_characterise::{Bound, Characteriser, Expectations};

#[derive(Parser)]
#[command(name = "cmip-characterise")]
#[command(about = "Check a climate-model output directory before it enters the archive")]
struct Cli {
    /// Directory holding the dataset files.
    path: String,
    /// Project label expected as the second path segment.
    #[arg(long, default_value = "cmip5")]
    project: String,
    /// Extension of the dataset files, without the dot.
    #[arg(long, default_value = "nc")]
    extension: String,
    /// Indexes the variable may be laid out along.
    #[arg(long, value_delimiter = ',', default_value = "time,lat,lon")]
    coords: Vec<String>,
    /// Latitude range the `lat` axis must cover.
    #[arg(
        long,
        num_args = 2,
        value_names = ["LOWER", "UPPER"],
        allow_negative_numbers = true,
        default_values_t = [-90.0, 90.0]
    )]
    lat: Vec<f64>,
    /// Longitude range the `lon` axis must cover.
    #[arg(
        long,
        num_args = 2,
        value_names = ["LOWER", "UPPER"],
        allow_negative_numbers = true,
        default_values_t = [0.0, 360.0]
    )]
    lon: Vec<f64>,
    /// Units the variable must carry.
    #[arg(long)]
    units: Option<String>,
    /// Reopen the dataset files for every check.
    #[arg(long, default_value_t = false)]
    no_cache: bool,
    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

/// `RUST_LOG` wins; otherwise each `-v` lowers the threshold one step.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Run every check and print the report. Returns the issue count.
fn run(cli: &Cli) -> Result<usize> {
    if !Path::new(&cli.path).is_dir() {
        warn!("{} is not a readable directory", cli.path);
    }

    let mut characteriser = Characteriser::new(cli.path.clone())
        .with_project(cli.project.clone())
        .with_extension(cli.extension.clone());
    if cli.no_cache {
        characteriser = characteriser.without_cache();
    }

    let expected = Expectations {
        coords: cli.coords.clone(),
        lat: bounds(&cli.lat).context("--lat")?,
        lon: bounds(&cli.lon).context("--lon")?,
        units: cli.units.clone(),
    };
    characteriser.run_all(&expected);

    let report = characteriser.report();
    if cli.json {
        let text = serde_json::to_string_pretty(&report).context("serializing report")?;
        println!("{text}");
    } else {
        println!("{report}");
    }
    Ok(report.issues)
}

fn bounds(values: &[f64]) -> Result<(Bound, Bound)> {
    match values {
        [lower, upper] => Ok((Bound::from(*lower), Bound::from(*upper))),
        other => bail!("expected LOWER UPPER, got {} value(s)", other.len()),
    }
}

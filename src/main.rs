
// USAGE
//   nc_time_remap apply --times times.txt --step 2 "data/*.json"
//   nc_time_remap apply --times times.txt --time -86400 --out-dir remapped a.json b.json
//   nc_time_remap info  --times times.txt
//   nc_time_remap label --units "years since 0001-01-01" -5 0 2024
//
// Log level via RUST_LOG (default: info)

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use log::{error, info};
use netcdf_time_remapper::{format_current_date, CalendarOrigin, Dataset, TimeList, TimeRemapper, CURRENT_DATE};
use rayon::prelude::*;
use serde::Serialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

// ─────────────────────────────────────────────────────────────────────
// Simple timing helper
// ─────────────────────────────────────────────────────────────────────
fn timeit<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let t0 = Instant::now();
    let out = f();
    info!("{label:<20}{:?}", t0.elapsed());
    out
}

// ─────────────────────────────────────────────────────────────────────
// Command line
// ─────────────────────────────────────────────────────────────────────
#[derive(Parser)]
#[command(version, about = "Replace the time axis of NetCDF-derived datasets with user-supplied time values")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// remap the time steps of dataset JSON files and add the current_date label
    Apply(ApplyArgs),

    /// show the parsed time list
    Info {
        /// time list file, one value or date-time per line
        #[arg(long)]
        times: PathBuf,
    },

    /// format raw time values as dates
    Label {
        /// CF style units, e.g. "days since -4000-01-01 00:00:00"
        #[arg(long)]
        units: String,

        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },
}

#[derive(Args)]
struct ApplyArgs {
    /// time list file, one value or date-time per line
    #[arg(long)]
    times: PathBuf,

    /// index of the step to label
    #[arg(long, conflicts_with = "time")]
    step: Option<usize>,

    /// remapped time of the step to label (first step if it isn't one)
    #[arg(long, allow_negative_numbers = true)]
    time: Option<f64>,

    /// where to write <name>_remapped.json (default: next to the input)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// dataset JSON files or glob patterns
    #[arg(required = true)]
    datasets: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────
fn expand_datasets(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut v = Vec::new();
    for pattern in patterns {
        let matched: Vec<_> = glob(pattern)?.filter_map(Result::ok).collect();
        if matched.is_empty() {
            bail!("no dataset matches {pattern:?}");
        }
        v.extend(matched);
    }
    v.sort();
    v.dedup();
    Ok(v)
}

fn output_path(input: &Path, out_dir: Option<&Path>) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("bad file name {}", input.display()))?;
    let dir = match out_dir {
        Some(dir) => dir,
        None => input.parent().unwrap_or(Path::new(".")),
    };
    Ok(dir.join(format!("{stem}_remapped.json")))
}

/// pair every input with its output file, refusing inputs that would write the same file
fn plan_outputs(datasets: &[PathBuf], out_dir: Option<&Path>) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut seen = HashMap::<PathBuf, &Path>::new();
    let mut plan = Vec::with_capacity(datasets.len());
    for input in datasets {
        let out = output_path(input, out_dir)?;
        if let Some(other) = seen.insert(out.clone(), input.as_path()) {
            bail!("{} and {} would both be written to {}", other.display(), input.display(), out.display());
        }
        plan.push((input.clone(), out));
    }
    Ok(plan)
}

fn remap_dataset(path: &Path, out_path: &Path, args: &ApplyArgs) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let dataset: Dataset = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let remapper = TimeRemapper::configure(&args.times, &dataset.time_steps)?;
    let step = match args.step {
        Some(step) => step,
        None => remapper.request_update_extent(args.time).step_index,
    };
    let output = remapper.apply(&dataset, step)?;

    fs::write(out_path, serde_json::to_string_pretty(&output)?)
        .with_context(|| format!("writing {}", out_path.display()))?;

    info!(
        "{} step {step}: {} = {}",
        path.display(),
        CURRENT_DATE,
        output.string_field(CURRENT_DATE).unwrap_or_default()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────
fn run_apply(args: &ApplyArgs) -> Result<()> {
    let datasets = timeit("expand_datasets", || expand_datasets(&args.datasets))?;
    let plan = plan_outputs(&datasets, args.out_dir.as_deref())?;
    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    // datasets are independent, each gets its own remapper
    let results: Vec<Result<()>> = timeit("remap_datasets", || {
        plan.par_iter().map(|(path, out)| remap_dataset(path, out, args)).collect()
    });

    let mut failed = 0;
    for ((path, out), result) in plan.iter().zip(&results) {
        match result {
            Ok(()) => println!("{} → {}", path.display(), out.display()),
            Err(e) => {
                error!("{}: {e:#}", path.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} datasets could not be remapped", results.len());
    }
    Ok(())
}

#[derive(Serialize)]
struct TimeListReport<'a> {
    file: &'a Path,
    steps: usize,
    time_range: Option<(f64, f64)>,
    labels: Vec<String>,
    #[serde(flatten)]
    list: &'a TimeList,
}

fn run_info(times: &Path) -> Result<()> {
    let list = TimeList::read(times)?;
    let labels = (0..list.len()).map(|i| list.label(i)).collect::<Result<Vec<_>, _>>()?;

    let report = TimeListReport {
        file: times,
        steps: list.len(),
        time_range: list.time_range(),
        labels,
        list: &list,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_label(units: &str, values: &[f64]) -> Result<()> {
    let origin = CalendarOrigin::parse(units)?;
    for &v in values {
        println!("{v}\t{}", format_current_date(v, &origin)?);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Apply(args) => run_apply(args),
        Command::Info { times } => run_info(times),
        Command::Label { units, values } => run_label(units, values),
    }
}

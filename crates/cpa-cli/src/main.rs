// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::Utc;
use cpa_core::{validate, AlgorithmConfig, AlgorithmId, CpaError, ParamValue, Series};
use cpa_pipeline::{
    export, export_file_name, filter_results, run, ExportFormat, FilterMode, RunRequest,
    SourcedChangePoint,
};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process;

const USAGE: &str = "\
cpa - change-point analysis over delimited time-series data

USAGE:
    cpa --input <path> [options]

OPTIONS:
    --input <path>           Delimited input file (index,value[,timestamp] per line)
    --dataset <name>         Dataset name for reports (default: input file stem)
    --algorithms <list|all>  Comma-separated algorithms to run (default: all)
                             CUSUM, PELT, BinarySegmentation, KernelChangeDetection
    --set ALGO.param=value   Override one parameter; repeatable
    --min-confidence <f>     Confidence threshold for the printed view (default: 0)
    --view <all|ALGO>        Restrict the printed view to one algorithm (default: all)
    --format <csv|json|txt>  Export format (default: json)
    --output <path>          Export destination (default: changepoints_<dataset>.<ext>)
    --no-export              Skip writing the export file
    --quiet                  Suppress the stdout summary
    --help                   Show this help
";

#[derive(Debug)]
struct Cli {
    input: PathBuf,
    dataset: Option<String>,
    algorithms: Vec<AlgorithmId>,
    overrides: Vec<(AlgorithmId, String, ParamValue)>,
    min_confidence: f64,
    view: FilterMode,
    format: ExportFormat,
    output: Option<PathBuf>,
    no_export: bool,
    quiet: bool,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            dataset: None,
            algorithms: AlgorithmId::ALL.to_vec(),
            overrides: vec![],
            min_confidence: 0.0,
            view: FilterMode::All,
            format: ExportFormat::Json,
            output: None,
            no_export: false,
            quiet: false,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Cpa(CpaError),
    Io {
        context: String,
        source: std::io::Error,
    },
    InvalidArgs(String),
}

impl CliError {
    fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Cpa(err) => err.code(),
            Self::Io { .. } => "io_error",
            Self::InvalidArgs(_) => "invalid_args",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpa(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidArgs(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<CpaError> for CliError {
    fn from(err: CpaError) -> Self {
        Self::Cpa(err)
    }
}

fn parse_number_or_choice(raw: &str) -> ParamValue {
    match raw.parse::<f64>() {
        Ok(number) if number.is_finite() => ParamValue::Number(number),
        _ => ParamValue::Choice(raw.to_string()),
    }
}

fn parse_set_override(raw: &str) -> Result<(AlgorithmId, String, ParamValue), CliError> {
    let (target, value) = raw.split_once('=').ok_or_else(|| {
        CliError::invalid_args(format!("invalid --set '{raw}'; expected ALGO.param=value"))
    })?;
    let (algorithm, param) = target.split_once('.').ok_or_else(|| {
        CliError::invalid_args(format!("invalid --set '{raw}'; expected ALGO.param=value"))
    })?;
    if param.is_empty() || value.is_empty() {
        return Err(CliError::invalid_args(format!(
            "invalid --set '{raw}'; expected ALGO.param=value"
        )));
    }
    Ok((
        AlgorithmId::parse(algorithm)?,
        param.to_string(),
        parse_number_or_choice(value),
    ))
}

fn parse_algorithm_list(raw: &str) -> Result<Vec<AlgorithmId>, CliError> {
    if raw.eq_ignore_ascii_case("all") {
        return Ok(AlgorithmId::ALL.to_vec());
    }
    let mut algorithms = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let id = AlgorithmId::parse(entry)?;
        if !algorithms.contains(&id) {
            algorithms.push(id);
        }
    }
    if algorithms.is_empty() {
        return Err(CliError::invalid_args(
            "--algorithms needs at least one algorithm",
        ));
    }
    Ok(algorithms)
}

#[derive(Debug)]
enum Parsed {
    Help,
    Run(Box<Cli>),
}

fn parse_args(args: &[String]) -> Result<Parsed, CliError> {
    let mut cli = Cli::default();
    let mut input: Option<PathBuf> = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value_for = |flag: &str| {
            iter.next()
                .ok_or_else(|| CliError::invalid_args(format!("{flag} needs a value")))
        };
        match arg.as_str() {
            "--help" | "-h" => return Ok(Parsed::Help),
            "--input" => input = Some(PathBuf::from(value_for("--input")?)),
            "--dataset" => cli.dataset = Some(value_for("--dataset")?.clone()),
            "--algorithms" => cli.algorithms = parse_algorithm_list(value_for("--algorithms")?)?,
            "--set" => cli.overrides.push(parse_set_override(value_for("--set")?)?),
            "--min-confidence" => {
                let raw = value_for("--min-confidence")?;
                cli.min_confidence = raw.parse().map_err(|_| {
                    CliError::invalid_args(format!("invalid --min-confidence '{raw}'"))
                })?;
            }
            "--view" => cli.view = FilterMode::parse(value_for("--view")?)?,
            "--format" => cli.format = ExportFormat::parse(value_for("--format")?)?,
            "--output" => cli.output = Some(PathBuf::from(value_for("--output")?)),
            "--no-export" => cli.no_export = true,
            "--quiet" => cli.quiet = true,
            other => {
                return Err(CliError::invalid_args(format!(
                    "unknown argument '{other}'; see --help"
                )));
            }
        }
    }

    let input = input.ok_or_else(|| CliError::invalid_args("--input is required; see --help"))?;
    cli.input = input;
    Ok(Parsed::Run(Box::new(cli)))
}

fn build_configs(cli: &Cli) -> Result<Vec<AlgorithmConfig>, CliError> {
    let mut supplied: BTreeMap<AlgorithmId, BTreeMap<String, ParamValue>> = BTreeMap::new();
    for (algorithm, param, value) in &cli.overrides {
        if !cli.algorithms.contains(algorithm) {
            return Err(CliError::invalid_args(format!(
                "--set targets {algorithm}, which is not in --algorithms"
            )));
        }
        supplied
            .entry(*algorithm)
            .or_default()
            .insert(param.clone(), value.clone());
    }

    let empty = BTreeMap::new();
    cli.algorithms
        .iter()
        .map(|&id| {
            let params = supplied.get(&id).unwrap_or(&empty);
            validate(id, params).map_err(CliError::from)
        })
        .collect()
}

fn dataset_name(cli: &Cli) -> String {
    if let Some(dataset) = &cli.dataset {
        return dataset.clone();
    }
    cli.input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}

fn render_summary(view: &[SourcedChangePoint], min_confidence: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} change points at confidence >= {:.2}",
        view.len(),
        min_confidence
    );
    for sourced in view {
        let cp = &sourced.change_point;
        let _ = writeln!(
            out,
            "  {:<22} index {:>6}  confidence {:.3}  {:<11} value {:.3}",
            sourced.algorithm.as_str(),
            cp.index,
            cp.confidence,
            cp.kind.as_str(),
            cp.value
        );
    }
    out
}

fn execute(cli: &Cli) -> Result<(), CliError> {
    let raw = fs::read_to_string(&cli.input)
        .map_err(|err| CliError::io(format!("reading {}", cli.input.display()), err))?;
    let series = Series::parse_delimited(&raw)?;
    log::info!(
        "ingested {} points from {}",
        series.len(),
        cli.input.display()
    );

    let configs = build_configs(cli)?;
    let request = RunRequest {
        series,
        configs,
    };
    let results = run(&request)?;

    if !cli.quiet {
        for result in &results {
            println!(
                "{:<22} {:>3} change points  avg confidence {:.3}  {:.3} ms",
                result.algorithm.as_str(),
                result.change_points.len(),
                result.confidence,
                result.execution_time_ms
            );
        }
        let view = filter_results(&results, cli.view, cli.min_confidence)?;
        print!("{}", render_summary(&view, cli.min_confidence));
    }

    if !cli.no_export {
        let dataset = dataset_name(cli);
        let bytes = export(&dataset, &results, cli.format, Utc::now())?;
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(export_file_name(&dataset, cli.format)));
        fs::write(&path, bytes)
            .map_err(|err| CliError::io(format!("writing {}", path.display()), err))?;
        log::info!("export written to {}", path.display());
        if !cli.quiet {
            println!("export written to {}", path.display());
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args) {
        Ok(Parsed::Help) => print!("{USAGE}"),
        Ok(Parsed::Run(cli)) => {
            if let Err(err) = execute(&cli) {
                eprintln!("error[{}]: {err}", err.code());
                process::exit(2);
            }
        }
        Err(err) => {
            eprintln!("error[{}]: {err}", err.code());
            eprintln!();
            eprint!("{USAGE}");
            process::exit(2);
        }
    }
}

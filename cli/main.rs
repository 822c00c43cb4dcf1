#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use fnacast::assemble::PolicyKind;
use fnacast::config::AppConfig;
use fnacast::dataset::load_batch_inputs;
use fnacast::features::{PartialInput, parse_assignment};
use fnacast::present::{FieldSet, FormOutcome, render_result, run_form};
use fnacast::verify::verify_reference;
use fnacast::{DiagnosisContext, PredictionResult};

#[derive(Clone, Copy, ValueEnum)]
pub enum PolicyCli {
    /// Unfilled features are 0.0
    Zero,
    /// Unfilled features take the values of reference sample 842302
    Literal,
    /// Unfilled features take the reference dataset mean
    DatasetMean,
}

impl From<PolicyCli> for PolicyKind {
    fn from(value: PolicyCli) -> Self {
        match value {
            PolicyCli::Zero => PolicyKind::Zero,
            PolicyCli::Literal => PolicyKind::Literal,
            PolicyCli::DatasetMean => PolicyKind::DatasetMean,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FieldsCli {
    /// Mean radius, mean texture and mean perimeter
    Key,
    /// All thirty features
    All,
}

impl From<FieldsCli> for FieldSet {
    fn from(value: FieldsCli) -> Self {
        match value {
            FieldsCli::Key => FieldSet::Key,
            FieldsCli::All => FieldSet::All,
        }
    }
}

/// Options shared by every command that loads a classifier. Each one overrides the
/// corresponding entry of the configuration file.
#[derive(Args)]
pub struct SessionArgs {
    /// Configuration file (defaults to ./fnacast.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Classifier artifact (TOML)
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Local copy of the reference dataset (raw wdbc.data format)
    #[arg(long, value_name = "PATH")]
    pub dataset: Option<PathBuf>,

    /// Directory where a downloaded reference dataset is cached
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Never download the reference dataset
    #[arg(long)]
    pub offline: bool,

    /// Values used for features that are not supplied
    #[arg(long, value_enum)]
    pub policy: Option<PolicyCli>,
}

#[derive(Args)]
pub struct FormArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Which features the form asks for
    #[arg(long, value_enum)]
    pub fields: Option<FieldsCli>,
}

#[derive(Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// A feature value, e.g. --set mean_radius=17.99 (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub assignments: Vec<String>,
}

#[derive(Args)]
pub struct BatchArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// TSV file with an optional sample_id column and any subset of feature columns
    pub input: PathBuf,

    /// Where to write the predictions
    #[arg(long, default_value = "predictions.tsv")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Parser)]
#[command(
    name = "fnacast",
    about = "Breast-mass diagnosis form for fitted FNA classifiers",
    long_about = "Loads a fitted support-vector classifier, fits the feature scaler on the \
                 Breast Cancer Wisconsin (Diagnostic) reference dataset and predicts \
                 Jinak (benign) or Ganas (malignant) from tumor measurements."
)]
struct Cli {
    /// Log lifecycle events (equivalent to RUST_LOG=info)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill in the diagnosis form interactively
    #[command(about = "Interactive diagnosis form")]
    Form(FormArgs),

    /// Predict from values given on the command line
    #[command(about = "Predict a single diagnosis from --set name=value pairs")]
    Predict(PredictArgs),

    /// Score every row of a TSV file
    #[command(about = "Predict diagnoses for a TSV file (outputs: predictions.tsv)")]
    Batch(BatchArgs),

    /// Check the classifier against the reference dataset labels
    #[command(about = "Compare predictions with the reference dataset diagnoses")]
    Verify(VerifyArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn main() {
    let cli = Cli::parse();
    let Cli { verbose, command } = cli;
    init_logging(verbose);

    let result = match command {
        Some(Commands::Form(args)) => run_form_command(args),
        Some(Commands::Predict(args)) => run_predict(args),
        Some(Commands::Batch(args)) => run_batch(args),
        Some(Commands::Verify(args)) => run_verify(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(|e| e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Reads the configuration file and applies command-line overrides on top.
fn resolve_config(
    session: &SessionArgs,
    fields: Option<FieldsCli>,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load(session.config.as_deref())?;
    if let Some(model) = &session.model {
        config.model_path = model.clone();
    }
    if let Some(dataset) = &session.dataset {
        config.dataset.path = Some(dataset.clone());
    }
    if let Some(cache_dir) = &session.cache_dir {
        config.dataset.cache_dir = cache_dir.clone();
    }
    if session.offline {
        config.dataset.offline = true;
    }
    if let Some(policy) = session.policy {
        config.defaults.policy = policy.into();
    }
    if let Some(fields) = fields {
        config.form.fields = fields.into();
    }
    Ok(config)
}

fn run_form_command(args: FormArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args.session, args.fields)?;
    let context = DiagnosisContext::load(&config)?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    if run_form(&context, config.form.fields, &mut reader, &mut writer)? == FormOutcome::Aborted {
        eprintln!("> Input ended before a prediction was requested.");
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = PartialInput::new();
    for text in &args.assignments {
        let (feature, value) = parse_assignment(text)?;
        input.set(feature, value)?;
    }

    let config = resolve_config(&args.session, None)?;
    let context = DiagnosisContext::load(&config)?;
    match context.predict(&input) {
        Ok(result) => print!("{}", render_result(&result)),
        Err(e) => println!("Prediction failed: {e}"),
    }
    Ok(())
}

fn run_batch(args: BatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args.session, None)?;
    let context = DiagnosisContext::load(&config)?;

    eprintln!("> Loading batch input from: {}", args.input.display());
    let batch = load_batch_inputs(&args.input)?;
    eprintln!(
        "> Loaded {} samples with {} supplied feature(s)",
        batch.inputs.len(),
        batch.features.len()
    );

    let results = batch
        .inputs
        .par_iter()
        .map(|input| context.predict(input))
        .collect::<Result<Vec<_>, _>>()?;

    save_predictions(&batch.sample_ids, &results, &args.output)?;
    eprintln!("> Predictions saved to: {}", args.output.display());
    Ok(())
}

fn save_predictions(
    sample_ids: &[String],
    results: &[PredictionResult],
    output_path: &Path,
) -> Result<(), std::io::Error> {
    let mut file = io::BufWriter::new(std::fs::File::create(output_path)?);
    writeln!(file, "sample_id\tlabel\tdiagnosis\tdecision_score")?;
    for (id, result) in sample_ids.iter().zip(results) {
        writeln!(
            file,
            "{}\t{}\t{}\t{}",
            id,
            result.label(),
            result.diagnosis,
            result.decision_score
        )?;
    }
    file.flush()
}

fn run_verify(args: VerifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args.session, None)?;
    let context = DiagnosisContext::load(&config)?;
    let report = verify_reference(&context)?;
    print!("{report}");
    if !report.sign_convention_holds() {
        return Err(format!(
            "{} reference samples have a decision score on the wrong side of their label; \
             check the classes order in '{}'",
            report.sign_violations.len(),
            config.model_path.display()
        )
        .into());
    }
    Ok(())
}

/// Format seconds into a human-readable duration like "2.4 hours ago"
fn format_duration_ago(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    if seconds < MINUTE {
        format!("{seconds} seconds ago")
    } else if seconds < HOUR {
        format!("{:.1} minutes ago", seconds as f64 / MINUTE as f64)
    } else if seconds < DAY {
        format!("{:.1} hours ago", seconds as f64 / HOUR as f64)
    } else {
        format!("{:.1} days ago", seconds as f64 / DAY as f64)
    }
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    let release_tag = option_env!("FNACAST_RELEASE_TAG");
    let build_timestamp: u64 = env!("FNACAST_BUILD_TIMESTAMP").parse().unwrap_or(0);

    println!("fnacast {version}");

    match release_tag {
        Some(tag) => println!("Release: {tag}"),
        None => println!("Release: development build"),
    }

    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if now > build_timestamp {
            println!("Built: {}", format_duration_ago(now - build_timestamp));
        } else {
            println!("Built: just now");
        }
    }
}

// ABOUTME: CLI binary for the statement miner.
// ABOUTME: Runs the submission pipeline, prints normalized statements, or merges metrics files.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use statement_miner::{pipeline, read_dataset, service, Backend, Config, ConfigBuilder};
use statement_text::Normalizer;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "statement-miner")]
#[command(about = "Normalize question statements and collect their readability metrics")]
struct Args {
    /// TOML configuration file (missing keys use defaults)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit every pending statement, then merge the metrics files
    Run(RunArgs),
    /// Print normalized statements without submitting anything
    Normalize(NormalizeArgs),
    /// Merge the metrics directory into one CSV
    Merge(MergeArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Statement dataset file
    #[arg(long = "dataset")]
    dataset: Option<PathBuf>,

    /// Directory for normalized statement texts
    #[arg(long = "txt-dir")]
    txt_dir: Option<PathBuf>,

    /// Directory for per-statement metrics files
    #[arg(long = "metrics-dir")]
    metrics_dir: Option<PathBuf>,

    /// Merged metrics CSV
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Submission backend: http or command
    #[arg(long = "backend")]
    backend: Option<String>,

    /// Metrics service page URL (http backend)
    #[arg(long = "service-url")]
    service_url: Option<String>,

    /// Skip the merge step
    #[arg(long = "no-merge")]
    no_merge: bool,

    /// Print the run summary as JSON
    #[arg(long = "json")]
    json_output: bool,
}

#[derive(clap::Args, Debug)]
struct NormalizeArgs {
    /// Statement dataset file (defaults to the configured one)
    #[arg(long = "dataset", conflicts_with = "html")]
    dataset: Option<PathBuf>,

    /// A single HTML statement file
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// Output JSON instead of tab-separated lines
    #[arg(long = "json")]
    json_output: bool,
}

#[derive(clap::Args, Debug)]
struct MergeArgs {
    /// Directory with per-statement metrics files
    #[arg(long = "metrics-dir")]
    metrics_dir: Option<PathBuf>,

    /// Merged metrics CSV
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,statement_miner={level},statement_text={level}"
        ))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ConfigBuilder> {
    let config = match path {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };
    Ok(ConfigBuilder::from_config(config))
}

fn run(config_path: Option<&PathBuf>, args: RunArgs) -> Result<()> {
    let mut builder = load_config(config_path)?;
    if let Some(dataset) = args.dataset {
        builder = builder.dataset_file(dataset);
    }
    if let Some(dir) = args.txt_dir {
        builder = builder.txt_dir(dir);
    }
    if let Some(dir) = args.metrics_dir {
        builder = builder.metrics_dir(dir);
    }
    if let Some(output) = args.output {
        builder = builder.output_file(output);
    }
    if let Some(backend) = args.backend.as_deref() {
        builder = builder.backend(Backend::from(backend));
    }
    if let Some(url) = args.service_url {
        builder = builder.service_url(url);
    }
    let config = builder.build();

    let normalizer = Normalizer::new(config.transliteration_table()?);
    let mut service = service::from_config(&config)?;
    let summary = if args.no_merge {
        pipeline::run(&config, &normalizer, service.as_mut())?
    } else {
        pipeline::run_and_merge(&config, &normalizer, service.as_mut())?
    };

    if args.json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "processed: {}, skipped: {}",
            summary.processed.len(),
            summary.skipped.len()
        );
        if let Some(rows) = summary.merged_rows {
            println!("merged {} rows into {}", rows, config.output_file.display());
        }
    }
    Ok(())
}

fn normalize(config_path: Option<&PathBuf>, args: NormalizeArgs) -> Result<()> {
    let mut builder = load_config(config_path)?;
    if let Some(dataset) = args.dataset {
        builder = builder.dataset_file(dataset);
    }
    let config = builder.build();
    let normalizer = Normalizer::new(config.transliteration_table()?);

    if let Some(html_path) = &args.html {
        let html = fs::read_to_string(html_path)
            .with_context(|| format!("error reading file {:?}", html_path))?;
        let text = normalizer.clean_statement(&html);
        if args.json_output {
            println!("{}", serde_json::to_string_pretty(&json!({ "text": text }))?);
        } else {
            println!("{}", text);
        }
        return Ok(());
    }

    let statements = read_dataset(&config.dataset_file, &config.delimiters)?;
    let normalized: Vec<_> = statements
        .iter()
        .map(|s| (s.id.as_str(), normalizer.clean_statement(&s.raw_markup)))
        .collect();

    if args.json_output {
        let items: Vec<_> = normalized
            .iter()
            .map(|(id, text)| json!({ "id": id, "text": text }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for (id, text) in &normalized {
            println!("{}\t{}", id, text);
        }
    }
    Ok(())
}

fn merge(config_path: Option<&PathBuf>, args: MergeArgs) -> Result<()> {
    let mut builder = load_config(config_path)?;
    if let Some(dir) = args.metrics_dir {
        builder = builder.metrics_dir(dir);
    }
    if let Some(output) = args.output {
        builder = builder.output_file(output);
    }
    let config = builder.build();

    let rows = pipeline::merge(&config)?;
    println!("merged {} rows into {}", rows, config.output_file.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    let config_path = args.config.as_ref();
    let result = match args.command {
        Command::Run(run_args) => run(config_path, run_args),
        Command::Normalize(normalize_args) => normalize(config_path, normalize_args),
        Command::Merge(merge_args) => merge(config_path, merge_args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{Config, LogLevel};
use core_types::{OptimizationRequest, Period, ProblemSpec};
use indicatif::{ProgressBar, ProgressStyle};
use optimizer::{Optimizer, PlanResponse};
use std::fs;
use std::path::{Path, PathBuf};

/// The main entry point for the Horizon rebalancing planner.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; it only carries optional overrides.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => configuration::load_config_from(path)?,
        None => configuration::load_config()?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    let _guard = configuration::init_tracing(&config.logging)?;

    match cli.command {
        Commands::Solve(args) => handle_solve(args, &config),
        Commands::Batch(args) => handle_batch(args, &config),
        Commands::Serve(args) => handle_serve(args, config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Plans a cost-aware liquidation of a portfolio into cash over a forecast horizon.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults to `config.toml` if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `logging.level` from the configuration.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single optimization request.
    Solve(SolveArgs),
    /// Solve every `*.json` request in a directory in parallel.
    Batch(BatchArgs),
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

#[derive(Parser)]
struct SolveArgs {
    /// JSON request with `initial_weights`, `estimated_returns` and `parameters`.
    #[arg(long)]
    input: PathBuf,

    /// Write the response here instead of printing it.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the generated linear program to stderr before solving.
    #[arg(long)]
    dump_lp: bool,

    /// Print the first-period trades as a table.
    #[arg(long)]
    table: bool,
}

#[derive(Parser)]
struct BatchArgs {
    #[arg(long)]
    input_dir: PathBuf,

    /// Receives one `<name>.json` response per request file.
    #[arg(long)]
    output_dir: PathBuf,
}

#[derive(Parser)]
struct ServeArgs {
    /// Overrides `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Overrides `server.port`.
    #[arg(long)]
    port: Option<u16>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn handle_solve(args: SolveArgs, config: &Config) -> anyhow::Result<()> {
    let optimizer = Optimizer::from_config(config);
    let request = read_request(&args.input)?;
    let spec = optimizer.validate(&request)?;

    if args.dump_lp {
        eprintln!("{}", optimizer.build_model(&spec)?);
    }

    let plan = optimizer.run(&spec)?;
    if args.table {
        println!("{}", first_period_table(&spec, &plan));
    }

    let body = serde_json::to_string_pretty(&plan)?;
    match args.output {
        Some(path) => {
            fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), status = plan.status, "Plan written.");
        }
        None => println!("{}", body),
    }
    Ok(())
}

fn handle_batch(args: BatchArgs, config: &Config) -> anyhow::Result<()> {
    let optimizer = Optimizer::from_config(config);
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let inputs = request_files(&args.input_dir)?;
    let mut names = Vec::with_capacity(inputs.len());
    let mut specs = Vec::with_capacity(inputs.len());
    let mut rejected = 0;
    for path in &inputs {
        let spec = read_request(path).and_then(|request| Ok(optimizer.validate(&request)?));
        match spec {
            Ok(spec) => {
                names.push(file_name(path));
                specs.push(spec);
            }
            Err(e) => {
                rejected += 1;
                tracing::warn!(path = %path.display(), error = %e, "Skipping invalid request.");
            }
        }
    }

    let progress_bar = ProgressBar::new(specs.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Solving...");

    let results = optimizer.run_batch_with(&specs, || progress_bar.inc(1));
    progress_bar.finish_with_message("Batch complete!");

    let mut optimal = 0;
    let mut failed = 0;
    for (name, result) in names.iter().zip(results) {
        match result {
            Ok(plan) => {
                if plan.is_optimal() {
                    optimal += 1;
                }
                let path = args.output_dir.join(name);
                fs::write(&path, serde_json::to_string_pretty(&plan)?)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            Err(e) => {
                failed += 1;
                tracing::error!(request = %name, error = %e, "Solve failed.");
            }
        }
    }

    println!(
        "{} requests: {} optimal, {} not optimal, {} failed, {} rejected",
        inputs.len(),
        optimal,
        specs.len() - optimal - failed,
        failed,
        rejected
    );
    Ok(())
}

async fn handle_serve(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let addr = web_server::listen_addr(&config)?;
    web_server::run_server(addr, &config).await
}

// ==============================================================================
// Helpers
// ==============================================================================

fn read_request(path: &Path) -> anyhow::Result<OptimizationRequest> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let request = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(request)
}

/// Lists `*.json` files directly inside `dir`, sorted by name.
fn request_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// What the planner would do right now: first-period weight, trade and resulting weight.
fn first_period_table(spec: &ProblemSpec, plan: &PlanResponse) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Asset", "Weight", "Trade", "Post-trade"]);

    if !plan.is_optimal() {
        table.add_row(vec!["(no optimal plan)", "", "", ""]);
        return table;
    }

    let period = Period::FIRST.get();
    for (_, asset) in spec.assets().iter() {
        let weight = plan.weight(asset.as_str(), period).unwrap_or_default();
        let trade = plan.trade(asset.as_str(), period).unwrap_or_default();
        table.add_row(vec![
            asset.to_string(),
            format!("{:.6}", weight),
            format!("{:+.6}", trade),
            format!("{:.6}", weight + trade),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_request_files_only_lists_json() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            fs::File::create(dir.path().join(name)).unwrap();
        }

        let names: Vec<String> = request_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_read_request_reports_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"initial_weights\": ").unwrap();

        let err = read_request(file.path()).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }

    #[test]
    fn test_cli_parses_solve_flags() {
        let cli = Cli::try_parse_from([
            "horizon", "--log-level", "debug", "solve", "--input", "req.json", "--dump-lp", "--table",
        ])
        .unwrap();

        assert!(matches!(cli.log_level, Some(LogLevel::Debug)));
        match cli.command {
            Commands::Solve(args) => {
                assert_eq!(args.input, PathBuf::from("req.json"));
                assert!(args.dump_lp && args.table);
                assert!(args.output.is_none());
            }
            _ => panic!("expected the solve command"),
        }
    }
}

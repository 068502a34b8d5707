#![forbid(unsafe_code)]

//! `issue-search`: command-line front end for the search tool client.
//!
//! Runs one query given on the command line, or reads one query per line
//! from stdin. Results go to stdout; logs go to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use issue_search::{AppError, Result, SearchClient, SearchConfig, SearchResult};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "issue-search", about = "Search issues, pull requests and discussions", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Search tool executable; overrides the config file.
    #[arg(long)]
    executable: Option<PathBuf>,

    /// Search tool data directory, passed as `-m`; overrides the config file.
    #[arg(long)]
    home: Option<PathBuf>,

    /// Response deadline in seconds; overrides the config file.
    #[arg(long)]
    timeout: Option<u64>,

    /// Result output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Query words. When omitted, queries are read from stdin, one per line.
    query: Vec<String>,
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<ExitCode> {
    let config = load_config(&args)?;
    info!(executable = %config.executable.display(), "configuration loaded");
    let client = SearchClient::new(&config);

    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_ct.cancel();
    });

    if !args.query.is_empty() {
        let query = args.query.join(" ");
        let ok = run_query(&client, &query, args.format, ct.child_token()).await?;
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            () = ct.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        run_query(&client, &line, args.format, ct.child_token()).await?;
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(args: &Cli) -> Result<SearchConfig> {
    let mut config = match (&args.config, &args.executable) {
        (Some(path), _) => SearchConfig::load_from_path(path)?,
        (None, Some(executable)) => SearchConfig::new(executable.clone()),
        (None, None) => {
            return Err(AppError::Config(
                "either --config or --executable is required".into(),
            ))
        }
    };

    if let Some(executable) = &args.executable {
        config.executable.clone_from(executable);
    }
    if let Some(home) = &args.home {
        config.home_dir = Some(home.clone());
    }
    if let Some(timeout) = args.timeout {
        config.timeout_seconds = timeout;
    }
    config.validate()?;
    Ok(config)
}

/// Run one query and print its outcome. Returns whether it succeeded.
async fn run_query(
    client: &SearchClient,
    query: &str,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<bool> {
    if query.trim().is_empty() {
        println!("Type a query to search issues, pull requests and discussions.");
        return Ok(true);
    }

    match client.search_with_cancel(query, cancel).await {
        Ok(results) => {
            print_results(query, &results, format)?;
            Ok(true)
        }
        Err(err) => {
            warn!(%err, "query failed");
            eprintln!("error: {err}");
            Ok(false)
        }
    }
}

fn print_results(query: &str, results: &[SearchResult], format: OutputFormat) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(results)
                .map_err(|err| AppError::Io(format!("failed to encode results: {err}")))?;
            writeln!(stdout, "{json}")?;
        }
        OutputFormat::Text if results.is_empty() => {
            writeln!(stdout, "No results for \"{query}\".")?;
        }
        OutputFormat::Text => {
            for result in results {
                writeln!(stdout, "{}", render_result(result))?;
            }
        }
    }
    Ok(())
}

fn render_result(result: &SearchResult) -> String {
    let mut meta: Vec<&str> = vec![result.kind.as_str(), result.state.as_str()];
    for extra in [&result.repository, &result.author, &result.created_at] {
        if !extra.is_empty() {
            meta.push(extra);
        }
    }
    format!("{}\n    {}\n    {}", result.title, meta.join(" · "), result.url)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}

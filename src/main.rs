use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scholar_aggregator::client::providers::SourceProvider;
use scholar_aggregator::config::LogFormat;
use scholar_aggregator::{
    Config, ConfigOverrides, Credentials, ExportFormat, ProviderStatus, SearchOutput, SearchTool,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "scholar-aggregator", version, about = "Search academic papers across multiple sources")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `scholar_aggregator=trace`; RUST_LOG wins
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format: pretty or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// HTTP timeout per provider request, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search all providers and print ranked results
    Search {
        keyword: String,

        /// Maximum number of results (1 to 1000)
        #[arg(short = 'n', long)]
        max_results: Option<u32>,

        /// Elsevier API key; falls back to SCHOLAR_AGGREGATOR_SCIENCE_DIRECT_KEY
        #[arg(long)]
        science_direct_key: Option<String>,

        /// IEEE Xplore API key; falls back to SCHOLAR_AGGREGATOR_IEEE_KEY
        #[arg(long)]
        ieee_key: Option<String>,

        /// Output format: table, json or csv
        #[arg(short, long, default_value = "table")]
        format: ExportFormat,

        /// Write results to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List providers and their credential requirements
    Providers,
    /// Check whether every provider endpoint is reachable
    Health,
    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        timeout_secs: cli.timeout,
        log_level: cli.log_level.clone(),
        log_format: cli.log_format,
        default_max_results: None,
    };
    let config = Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .apply_overrides(&overrides)
        .context("Invalid command line overrides")?;

    init_tracing(&config);
    debug!("Effective configuration: {:?}", config);

    let config = Arc::new(config);
    match cli.command {
        Command::Search {
            keyword,
            max_results,
            science_direct_key,
            ieee_key,
            format,
            output,
        } => {
            let credentials = Credentials::new(science_direct_key, ieee_key)
                .or(Credentials::from_env().context("Failed to read credentials")?);
            let max_results = max_results.unwrap_or(config.search.default_max_results);

            let tool = SearchTool::new(Arc::clone(&config))?;
            let result = tool
                .search_with_report(&keyword, max_results, credentials)
                .await?;

            report_providers(&result);
            write_results(&result, format, output)?;
        }
        Command::Providers => {
            let tool = SearchTool::new(Arc::clone(&config))?;
            let credentials = Credentials::from_env().context("Failed to read credentials")?;
            for provider in tool.client().providers() {
                print_provider(provider.as_ref(), &credentials);
            }
        }
        Command::Health => {
            let tool = SearchTool::new(Arc::clone(&config))?;
            let checks = tool.client().health_check().await;
            let reachable = checks.iter().filter(|(_, ok)| *ok).count();

            for (source, ok) in &checks {
                println!("{:<18} {}", source, if *ok { "reachable" } else { "unreachable" });
            }
            info!("{}/{} providers reachable", reachable, checks.len());
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn print_provider(provider: &dyn SourceProvider, credentials: &Credentials) {
    let key = match (provider.requires_credential(), provider.has_credential(credentials)) {
        (false, _) => "no key required",
        (true, true) => "key present",
        (true, false) => "key missing",
    };
    println!("{:<18} {:<16} {}", provider.source(), key, provider.description());
}

fn report_providers(result: &SearchOutput) {
    for report in &result.providers {
        match &report.status {
            ProviderStatus::Completed { count } => {
                debug!("{}: {} records in {:?}", report.source, count, report.elapsed);
            }
            ProviderStatus::Skipped { reason } => {
                eprintln!("{}: skipped ({})", report.source, reason);
            }
            ProviderStatus::Failed { message, partial } => {
                eprintln!("{}: failed after {} records: {}", report.source, partial, message);
            }
        }
    }
}

fn write_results(result: &SearchOutput, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    if result.is_empty() {
        eprintln!("No results found for '{}'", result.query);
        if format == ExportFormat::Table {
            return Ok(());
        }
    }

    let rendered = format.render(&result.records)?;
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write results to {}", path.display()))?;
            info!("Wrote {} results to {}", result.records.len(), path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

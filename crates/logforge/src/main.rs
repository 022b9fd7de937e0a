//! LogForge - container log watcher.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use logforge::config::{ConfigSource, FileConfigSource};
use logforge::docker::{DockerInventory, DockerLogSource};
use logforge::server::{build_router, ServerState};
use logforge::{Config, CycleReport, Engine, Scheduler};
use notify::{Notifier, NotifierSettings, NotifyEvent};

/// LogForge - keyword alerts for container logs.
#[derive(Parser)]
#[command(name = "logforge")]
#[command(about = "Watch container logs for keywords and alert without flooding")]
#[command(version)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true, env = "LOGFORGE_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the periodic scanner and the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "LOGFORGE_BIND", default_value = "0.0.0.0:8000")]
        bind: String,
    },

    /// Run a single scan cycle and print what happened
    Scan,

    /// Inspect or edit the keyword list
    Keywords {
        #[command(subcommand)]
        action: KeywordAction,
    },

    /// Send a test message through every configured channel
    NotifyTest {
        /// Recipient addresses (defaults to the `default` list)
        #[arg(long, value_delimiter = ',')]
        to: Vec<String>,
    },
}

#[derive(Subcommand)]
enum KeywordAction {
    /// Print the configured keywords
    List,
    /// Add comma-separated keywords
    Add { keywords: String },
    /// Remove comma-separated keywords
    Remove { keywords: String },
    /// Replace the keyword list
    Replace { keywords: String },
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("logforge=debug,notify=debug,tower_http=debug,info")
        } else {
            EnvFilter::new("logforge=info,notify=info,warn")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

/// Load the config once at startup, falling back to defaults.
async fn startup_config(source: &FileConfigSource) -> Config {
    match source.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, path = %source.path().display(), "Starting with default configuration");
            Config::default()
        }
    }
}

fn build_notifier(config: &Config) -> Notifier {
    Notifier::from_settings(&NotifierSettings {
        email: config.email_settings(),
        slack_webhook_url: None,
    })
}

fn build_engine(config_file: Arc<FileConfigSource>, config: &Config) -> Engine {
    Engine::new(
        Arc::new(DockerInventory::new()),
        Arc::new(DockerLogSource::new()),
        config_file,
        Arc::new(build_notifier(config)),
    )
}

async fn serve(config_file: Arc<FileConfigSource>, bind: &str) -> Result<()> {
    let config = startup_config(&config_file).await;
    let engine = Arc::new(build_engine(Arc::clone(&config_file), &config));

    let period = Duration::from_secs(config.engine.scan_interval_secs.max(1));
    let scheduler = Scheduler::start(Arc::clone(&engine), period);

    let app = build_router(ServerState {
        engine,
        config_file,
    });
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(address = %bind, "LogForge listening");

    let shutdown = scheduler.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                () = shutdown.cancelled() => {}
            }
        })
        .await
        .context("HTTP server failed")?;

    scheduler.stop().await;
    info!("LogForge stopped");
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("{}", "SCAN RESULTS".bold().cyan());
    println!("  workloads scanned: {}", report.workloads);
    let rows: [(&str, &[String]); 7] = [
        ("restarted", &report.restarted),
        ("cooling down", &report.cooling_down),
        ("fetch failed", &report.fetch_failed),
        ("alerted", &report.alerted),
        ("duplicate", &report.suppressed),
        ("throttled", &report.throttled),
        ("notified", &report.notified),
    ];
    for (label, ids) in rows {
        if ids.is_empty() {
            continue;
        }
        let line = format!("  {label}: {}", ids.join(", "));
        match label {
            "alerted" => println!("{}", line.red().bold()),
            "fetch failed" => println!("{}", line.yellow()),
            "notified" => println!("{}", line.green()),
            _ => println!("{line}"),
        }
    }
    if !report.notify_failed.is_empty() {
        println!(
            "{}",
            format!("  notify failed: {}", report.notify_failed.join(", ")).red()
        );
    }
}

async fn keywords(config_file: &FileConfigSource, action: KeywordAction) -> Result<()> {
    match action {
        KeywordAction::List => {
            let config = config_file.load().await?;
            for keyword in config.keywords() {
                println!("{keyword}");
            }
        }
        KeywordAction::Add { keywords } => {
            let change = config_file.add_keywords(&keywords).await?;
            for k in &change.applied {
                println!("{} {k}", "+".green());
            }
            for k in &change.unchanged {
                println!("{} {k} (already present)", "=".dimmed());
            }
        }
        KeywordAction::Remove { keywords } => {
            let change = config_file.remove_keywords(&keywords).await?;
            for k in &change.applied {
                println!("{} {k}", "-".red());
            }
            for k in &change.unchanged {
                println!("{} {k} (not configured)", "=".dimmed());
            }
        }
        KeywordAction::Replace { keywords } => {
            let keywords = config_file.replace_keywords(&keywords).await?;
            println!("keywords: {}", keywords.join(", "));
        }
    }
    Ok(())
}

async fn notify_test(config_file: &FileConfigSource, to: Vec<String>) -> Result<()> {
    let config = config_file.load().await.context("Failed to load config")?;
    let recipients = if to.is_empty() {
        config.recipients_for(logforge::config::DEFAULT_RECIPIENTS_KEY)
    } else {
        to
    };

    let notifier = build_notifier(&config);
    if !notifier.has_channels() {
        println!("{}", "No notification channels configured".yellow());
        return Ok(());
    }

    let results = notifier
        .notify_and_wait(NotifyEvent::DeliveryTest {
            recipients,
            timestamp: chrono::Utc::now(),
        })
        .await;
    for (channel, result) in results {
        match result {
            Ok(()) => println!("{} {channel}", "ok".green()),
            Err(e) => println!("{} {channel}: {e}", "failed".red()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let config_file = Arc::new(FileConfigSource::new(cli.config));

    match cli.command {
        Commands::Serve { bind } => serve(config_file, &bind).await,
        Commands::Scan => {
            let config = startup_config(&config_file).await;
            let engine = build_engine(config_file, &config);
            let report = engine.run_cycle_once().await?;
            print_report(&report);
            Ok(())
        }
        Commands::Keywords { action } => keywords(&config_file, action).await,
        Commands::NotifyTest { to } => notify_test(&config_file, to).await,
    }
}

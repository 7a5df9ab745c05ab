//! GEX service CLI and server binary
//!
//! Wires configuration, logging, metrics and the upstream providers into a
//! refresh pipeline, then either serves it over HTTP or prints one report.

mod providers;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{generate_default_config, load_config, save_config, validate_config, GexConfig};
use gex_engine::{greeks_model, GexPipeline, InMemoryHistoryStore, PipelineSettings, RetentionPolicy};
use observability::{init_logging, init_metrics, LogFormat, PipelineMetrics};
use server::{create_router, ApiState, HttpServer, ServerConfig, ShutdownController};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Serve { config, host, port } => {
            let config = resolve_config(config.as_deref())?;
            init_service_logging(&config, cli.log_format.as_deref())?;
            info!("Executing 'serve' command");
            serve_command(config, host, port).await
        }
        Commands::Snapshot {
            config,
            asset,
            pretty,
        } => {
            let config = resolve_config(config.as_deref())?;
            init_service_logging(&config, cli.log_format.as_deref())?;
            info!("Executing 'snapshot' command");
            snapshot_command(config, &asset, pretty).await
        }
        Commands::Validate { config } => {
            init_cli_logging(cli.log_format.as_deref())?;
            info!("Executing 'validate' command");
            validate_command(&config)
        }
        Commands::Init { output } => {
            init_cli_logging(cli.log_format.as_deref())?;
            info!("Executing 'init' command");
            init_command(&output)
        }
    }
}

fn parse_log_format(raw: &str) -> LogFormat {
    LogFormat::parse(raw).unwrap_or_else(|| {
        eprintln!("unknown log format '{}', using pretty", raw);
        LogFormat::Pretty
    })
}

fn init_service_logging(config: &GexConfig, cli_format: Option<&str>) -> Result<()> {
    let format = parse_log_format(cli_format.unwrap_or(&config.service.log_format));
    init_logging(&config.service.name, format)
}

fn init_cli_logging(cli_format: Option<&str>) -> Result<()> {
    init_logging("gexd", cli_format.map(parse_log_format).unwrap_or_default())
}

/// Load and validate the config file, or fall back to built-in defaults.
///
/// Runs before logging is initialised, so problems go to stderr.
fn resolve_config(path: Option<&Path>) -> Result<GexConfig> {
    let Some(path) = path else {
        return Ok(generate_default_config());
    };

    let config = load_config(path)?;
    let report = validate_config(&config);

    for warning in &report.warnings {
        eprintln!("[warn] [{}] {}", warning.field, warning.message);
    }

    if !report.is_valid() {
        for err in &report.errors {
            eprintln!("[error] {}", err);
        }
        anyhow::bail!("Cannot start due to configuration errors in {:?}", path);
    }

    Ok(config)
}

fn build_pipeline(config: &GexConfig) -> Result<Arc<GexPipeline>> {
    let providers = providers::build_providers(&config.upstream)?;

    let history = Arc::new(InMemoryHistoryStore::new(RetentionPolicy::new(
        config.history.retention_minutes,
        config.history.max_entries,
    )));

    let settings = PipelineSettings::from_config(&config.engine)?;
    debug!(?settings, "Pipeline settings");

    Ok(Arc::new(GexPipeline::new(
        providers.snapshots,
        providers.tickers,
        greeks_model(&config.engine),
        history,
        settings,
        PipelineMetrics::new(&config.service.name),
    )))
}

async fn serve_command(config: GexConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if config.metrics.enabled {
        init_metrics(config.metrics.port)?;
    }

    let pipeline = build_pipeline(&config)?;

    let server_config = ServerConfig::new(
        host.unwrap_or_else(|| config.server.host.clone()),
        port.unwrap_or(config.server.port),
    )
    .with_cors(config.server.cors_allow_origins.clone());

    let state = Arc::new(ApiState::new(
        pipeline,
        &config.service.name,
        &config.engine.assets,
    ));
    let router = create_router(state, server_config.cors_layer());

    info!(
        service = %config.service.name,
        host = %server_config.host,
        port = server_config.port,
        assets = ?config.engine.assets,
        "Starting GEX service"
    );

    let shutdown = ShutdownController::with_signals();
    let server = HttpServer::new(server_config, router);
    server
        .run(shutdown.child_token())
        .await
        .context("HTTP server failed")?;

    info!("GEX service stopped");
    Ok(())
}

async fn snapshot_command(config: GexConfig, asset: &str, pretty: bool) -> Result<()> {
    let pipeline = build_pipeline(&config)?;
    let asset = asset.to_uppercase();

    let report = match pipeline.refresh(&asset).await {
        Ok(report) => report,
        Err(e) => {
            error!(%asset, error = %e, "Snapshot failed");
            anyhow::bail!(e);
        }
    };

    if let Some(skipped) = report.skipped_instruments.filter(|&n| n > 0) {
        warn!(%asset, skipped, "Some instruments were skipped");
    }

    let json = if pretty {
        serde_json::to_string_pretty(report.as_ref())?
    } else {
        serde_json::to_string(report.as_ref())?
    };
    println!("{}", json);

    Ok(())
}

fn validate_command(config_path: &Path) -> Result<()> {
    info!(path = ?config_path, "Validating configuration");

    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Service: {}", config.service.name);
    println!("Provider: {:?}", config.upstream.provider);
    println!("Greeks source: {:?}", config.engine.greeks_source);
    println!("Assets: {}", config.engine.assets.join(", "));
    println!(
        "Listen: {}:{}",
        config.server.host, config.server.port
    );

    Ok(())
}

fn init_command(output_path: &Path) -> Result<()> {
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("This configuration includes:");
    println!("  - Deribit as the upstream provider");
    println!("  - Black-Scholes Greeks for {}", config.engine.assets.join(", "));
    println!(
        "  - {} minutes of exposure history",
        config.history.retention_minutes
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit the configuration file to customize settings");
    println!(
        "  2. Run 'gexd validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'gexd serve --config {:?}' to start the service",
        output_path
    );

    Ok(())
}

mod config;

use clap::{Args, Parser};
use config::{CommonConfig, Config, ConfigError};
use discovery::backend::{BackendError, HttpBackend};
use discovery::cascade::CascadeOptions;
use discovery::filter::split_path;
use discovery::{Discovery, api::DiscoveryApiError, resolve_route};
use metrics_exporter_statsd::StatsdBuilder;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, prelude::*};
use url::form_urlencoded;

#[derive(Parser)]
enum CliCommand {
    /// Run the discovery API
    Serve(ServeArgs),
    /// Resolve a browse path offline and print its canonical filter
    Resolve(ResolveArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// Browse path with an optional query string, e.g. `/barcelona/avui?search=jazz`
    path: String,
    /// Category slugs to treat as known
    #[arg(long = "category")]
    categories: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Api(#[from] DiscoveryApiError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not install metrics recorder: {0}")]
    Metrics(String),
    #[error("could not serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

fn main() -> Result<(), CliError> {
    match CliCommand::parse() {
        CliCommand::Serve(args) => serve(args),
        CliCommand::Resolve(args) => resolve(args),
    }
}

fn serve(args: ServeArgs) -> Result<(), CliError> {
    let config = Config::from_file(&args.config_file_path)?;

    // Keep the guard alive so pending events are flushed on exit.
    let _sentry = init_logging(&config.common);
    init_metrics(&config.common)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_server(config))
}

async fn run_server(config: Config) -> Result<(), CliError> {
    let config = config.discovery;
    tracing::info!(backend = %config.backend.url, "Starting discovery service");

    let backend = HttpBackend::new(&config.backend)?;
    let service = Arc::new(Discovery::new(
        backend,
        &config.cache,
        CascadeOptions {
            min_results: config.cascade.min_results,
        },
    ));

    // Readiness flips once the place list loads; a failure here is retried on
    // the first request that needs it.
    let warm = service.clone();
    tokio::spawn(async move {
        if let Err(e) = warm.warm_up().await {
            tracing::warn!(error = %e, "Could not warm up directory caches");
        }
    });

    discovery::serve(config.listener, service).await?;
    Ok(())
}

fn init_logging(common: &CommonConfig) -> Option<sentry::ClientInitGuard> {
    let guard = common.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(common: &CommonConfig) -> Result<(), CliError> {
    let Some(metrics_config) = &common.metrics else {
        return Ok(());
    };

    let recorder = StatsdBuilder::from(
        metrics_config.statsd_host.as_str(),
        metrics_config.statsd_port,
    )
    .build(Some("esdeveniments"))
    .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    shared::metrics_defs::describe_all(discovery::metrics_defs::ALL_METRICS);
    Ok(())
}

fn resolve(args: ResolveArgs) -> Result<(), CliError> {
    let (path, query) = args.path.split_once('?').unwrap_or((args.path.as_str(), ""));
    let params: HashMap<String, String> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let categories: HashSet<String> = args.categories.into_iter().collect();

    let resolution = resolve_route(&split_path(path), &params, &categories);
    let output = serde_json::json!({
        "filter": resolution.filter,
        "canonicalUrl": resolution.filter.to_url(),
        "dropped": resolution.dropped,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

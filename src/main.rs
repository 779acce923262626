//! Zabbix connectivity monitoring binary entry point.
//!
//! `zabbix-monitoring <mode>` runs one mode against the live API or a
//! collected snapshot and writes its reports to `OUTPUT_DIR`.
//! All logs go to stderr.
//!
//! Coverage is excluded because the main function needs a live Zabbix
//! server or a snapshot directory on disk.

// Enable the coverage attribute when running with nightly for llvm-cov exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use zabbix_monitoring::config::{Config, DataSource, LogFormat, DEFAULT_LOG_LEVEL};
use zabbix_monitoring::error::AppError;
use zabbix_monitoring::pipeline::{Pipeline, RunMode};
use zabbix_monitoring::report::ReportStore;
use zabbix_monitoring::rules::TemplateCatalog;
use zabbix_monitoring::snapshot::SnapshotSource;
use zabbix_monitoring::traits::{MonitoringSource, RealTimeProvider};
use zabbix_monitoring::zabbix::ZabbixClient;

#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() {
    let config = Config::from_env();
    match &config {
        Ok(config) => init_logging(&config.log_level, config.log_format),
        Err(_) => init_logging(
            &std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            LogFormat::Text,
        ),
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let mode = match std::env::args().nth(1).map(|arg| arg.parse::<RunMode>()) {
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
        None => {
            let modes: Vec<&str> = RunMode::all().iter().map(|m| m.as_str()).collect();
            tracing::error!("Usage: zabbix-monitoring <{}>", modes.join("|"));
            std::process::exit(1);
        }
    };

    tracing::info!(
        mode = %mode,
        data_source = %config.data_source,
        output = %config.output_dir.display(),
        "zabbix-monitoring starting"
    );

    if let Err(e) = run(&config, mode).await {
        tracing::error!("Run failed: {e}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = level
        .parse()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(DEFAULT_LOG_LEVEL));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.compact().init(),
    }
}

async fn run(config: &Config, mode: RunMode) -> Result<(), AppError> {
    let catalog = if mode.requires_catalog() {
        TemplateCatalog::from_path(&config.template_mapping)?
    } else {
        TemplateCatalog::default()
    }
    .with_threshold_overrides(&config.threshold_overrides);

    match config.data_source {
        DataSource::Api => {
            let client =
                ZabbixClient::connect(config.client_config(), config.credentials()?).await?;
            run_pipeline(client, catalog, config, mode).await
        }
        DataSource::Snapshot => {
            let source = SnapshotSource::open(&config.input_dir)?;
            run_pipeline(source, catalog, config, mode).await
        }
    }
}

async fn run_pipeline<S: MonitoringSource>(
    source: S,
    catalog: TemplateCatalog,
    config: &Config,
    mode: RunMode,
) -> Result<(), AppError> {
    let pipeline = Pipeline::new(
        source,
        catalog,
        ReportStore::new(&config.output_dir),
        RealTimeProvider,
    )
    .with_settings(config.pipeline_settings());
    pipeline.run(mode).await
}

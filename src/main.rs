use std::sync::Arc;

use speedaudit::config::Config;
use speedaudit::db::PgDocumentStore;
use speedaudit::services::{
    AuditConfig, ChromeLauncher, LighthouseCli, Orchestrator, PageSpeedClient,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    log::info!("Auditing {}", config.target_url);

    let audit_config = AuditConfig {
        max_wait_for_load_ms: config.lighthouse.max_wait_for_load_ms,
        ..AuditConfig::default()
    };

    let orchestrator = Orchestrator::new(
        Arc::new(PageSpeedClient::new(config.pagespeed.clone())),
        Arc::new(ChromeLauncher::new(config.chrome.clone())),
        Arc::new(LighthouseCli::new(config.lighthouse.executable.clone())),
        Arc::new(PgDocumentStore::new(config.database_url.clone())),
    )
    .with_audit_config(audit_config)
    .with_raw_report_dir(config.raw_report_dir.clone())
    .with_run_log(config.run_log.clone());

    let summary = orchestrator.run(&config.target_url).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.failures() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

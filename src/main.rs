use std::sync::Arc;

use anyhow::Context;

use campaign_assist::campaign::CampaignService;
use campaign_assist::config::AppConfig;
use campaign_assist::llm::create_provider;
use campaign_assist::sequence::routes::SequenceRouteState;
use campaign_assist::{cli, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("  export CAMPAIGN_LLM_API_KEY=sk-...");
            std::process::exit(1);
        }
    };

    eprintln!("📣 Campaign Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} ({})", config.llm.model, config.llm.backend);
    eprintln!("   Sender accounts: {}", config.senders.accounts().len());
    eprintln!("   Campaign API: http://0.0.0.0:{}/api/campaign", config.http_port);
    eprintln!("   Sequence API: http://0.0.0.0:{}/api/sequence", config.http_port);

    let llm = create_provider(&config.llm).context("creating LLM provider")?;
    let service = Arc::new(CampaignService::new(
        llm,
        Arc::new(config.senders.clone()),
        config.llm.timeout,
    ));

    let app = server::app_router(Arc::clone(&service), SequenceRouteState::default());
    let addr = format!("0.0.0.0:{}", config.http_port);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::serve(&addr, app).await {
            tracing::error!(error = %e, "HTTP server stopped");
        }
    });

    if config.cli_enabled {
        cli::run(service).await;
        server_handle.abort();
    } else {
        server_handle.await.context("HTTP server task panicked")?;
    }

    Ok(())
}

//! Alpha Hunter - Token Discovery & Scoring Pipeline
//!
//! Composition root: parses the CLI, loads configuration, wires the
//! provider clients, stores, engines and services together, and runs the
//! selected command.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use alpha_hunter::adapters::cli::{AssessCmd, CliApp, Command, RunCmd, SourcesCmd};
use alpha_hunter::adapters::persistence::JsonlStore;
use alpha_hunter::adapters::providers::{
    BirdeyeClient, DexscreenerClient, FetchClient, FetchClientConfig, RugcheckClient,
};
use alpha_hunter::adapters::sources::{
    ChatScanner, FeedScanner, RepositoryScanner, ScannerRouter, SocialScanner,
};
use alpha_hunter::application::{
    AlertEngine, BroadcastHub, GateOverrides, MarketAggregator, MonitorError, MonitorOrchestrator,
    RiskEngine, RiskEngineConfig, ScannerService,
};
use alpha_hunter::config::{load_config, Config};
use alpha_hunter::domain::scoring::Scorer;
use alpha_hunter::domain::trend::{TrendEngine, TrendSignals};
use alpha_hunter::ports::persistence::TokenStore;
use alpha_hunter::ports::provider::{MarketDataProvider, SecurityProvider, SocialProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (API keys live here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug);

    match app.command {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Assess(cmd) => assess_command(cmd).await,
        Command::Sources(cmd) => sources_command(cmd).await,
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Everything the run and assess commands share.
struct Pipeline {
    aggregator: Arc<MarketAggregator>,
    risk_engine: Arc<RiskEngine>,
    security: Arc<dyn SecurityProvider>,
    social: Arc<dyn SocialProvider>,
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let dexscreener_client = Arc::new(
        FetchClient::new(config.providers.dexscreener.client_config("dexscreener"))
            .context("Failed to create Dexscreener client")?,
    );
    let birdeye_client = Arc::new(
        FetchClient::new(config.providers.birdeye.client_config("birdeye"))
            .context("Failed to create Birdeye client")?,
    );
    let rugcheck_client = Arc::new(
        FetchClient::new(config.providers.rugcheck.client_config("rugcheck"))
            .context("Failed to create Rugcheck client")?,
    );

    let dexscreener = Arc::new(DexscreenerClient::new(dexscreener_client));
    let birdeye = Arc::new(BirdeyeClient::new(birdeye_client));
    let rugcheck = Arc::new(RugcheckClient::new(rugcheck_client));

    let aggregator = Arc::new(MarketAggregator::new(vec![
        dexscreener as Arc<dyn MarketDataProvider>,
        Arc::clone(&birdeye) as Arc<dyn MarketDataProvider>,
    ]));

    let security: Arc<dyn SecurityProvider> = rugcheck;
    let social: Arc<dyn SocialProvider> = birdeye;

    let risk_engine = Arc::new(RiskEngine::new(
        Arc::clone(&security),
        Arc::clone(&social),
        Arc::clone(&aggregator),
        RiskEngineConfig {
            cache_ttl: std::time::Duration::from_secs(config.risk.cache_ttl_secs),
            min_lp_lock_days: config.risk.min_lp_lock_days,
            min_liquidity_usd: config.risk.min_liquidity_usd,
        },
    ));

    Ok(Pipeline {
        aggregator,
        risk_engine,
        security,
        social,
    })
}

fn build_scanner_router(config: &Config) -> Result<Arc<ScannerRouter>> {
    let chat_client = Arc::new(
        FetchClient::new(FetchClientConfig::new(
            "chat-relay",
            &config.scanner.chat_relay_url,
        ))
        .context("Failed to create chat relay client")?,
    );
    let feed_client = Arc::new(
        FetchClient::new(FetchClientConfig::new("feeds", ""))
            .context("Failed to create feed client")?,
    );
    let repo_client = Arc::new(
        FetchClient::new(FetchClientConfig::new(
            "repositories",
            &config.scanner.repository_api_url,
        ))
        .context("Failed to create repository client")?,
    );
    let social_client = Arc::new(
        FetchClient::new(FetchClientConfig::new(
            "social",
            &config.scanner.social_api_url,
        ))
        .context("Failed to create social client")?,
    );

    Ok(Arc::new(
        ScannerRouter::new()
            .register(Arc::new(ChatScanner::new(chat_client)))
            .register(Arc::new(FeedScanner::new(feed_client)))
            .register(Arc::new(RepositoryScanner::new(repo_client)))
            .register(Arc::new(SocialScanner::new(social_client))),
    ))
}

async fn run_command(cmd: RunCmd) -> Result<()> {
    tracing::info!("Starting Alpha Hunter pipeline...");

    let config = load_config(&cmd.config).context("Failed to load configuration")?;

    let data_dir = cmd
        .data_dir
        .clone()
        .unwrap_or_else(|| Path::new(&config.storage.data_dir).to_path_buf());
    let store: Arc<dyn TokenStore> =
        Arc::new(JsonlStore::open(&data_dir).context("Failed to open data directory")?);

    let pipeline = build_pipeline(&config)?;
    let hub = Arc::new(BroadcastHub::new());
    let alert_engine = Arc::new(AlertEngine::new(Arc::clone(&store), config.alerts.clone()));

    let orchestrator = Arc::new(MonitorOrchestrator::new(
        Arc::clone(&pipeline.aggregator),
        Arc::clone(&pipeline.risk_engine),
        TrendEngine::new(config.trend.clone()),
        Scorer::new(config.verdict_thresholds()),
        alert_engine,
        Arc::clone(&pipeline.security),
        Arc::clone(&pipeline.social),
        Arc::clone(&store),
        Arc::clone(&hub),
        config.monitor_config(),
    ));

    // Aged alerts are purged once per boot
    let purged = store
        .purge_alerts_older_than(config.storage.alert_retention_days)
        .await
        .unwrap_or(0);
    if purged > 0 {
        tracing::info!(purged, "Purged old alerts");
    }

    // Discovery: scanner feeds candidate addresses into the gate
    if !cmd.no_scan {
        let router = build_scanner_router(&config)?;
        let (scanner, mut mentions) = ScannerService::new(
            router,
            config.monitored_sources(),
            config.scanner.queue_capacity,
        )
        .context("Invalid source configuration")?;
        Arc::clone(&scanner).start().await;

        let gate_orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            while let Some(event) = mentions.recv().await {
                for address in event.addresses {
                    match gate_orchestrator
                        .add(&address, GateOverrides::default())
                        .await
                    {
                        Ok(()) => {}
                        Err(MonitorError::AlreadyTracked(_)) => {}
                        Err(e) => tracing::debug!(%address, error = %e, "Candidate rejected"),
                    }
                }
            }
        });

        let stop_scanner = scanner;
        let stop_orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
            stop_scanner.stop().await;
            stop_orchestrator.stop().await;
        });
    } else {
        tracing::warn!("Source scanning disabled; refreshing tracked tokens only");
        let stop_orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
            stop_orchestrator.stop().await;
        });
    }

    orchestrator.run().await;
    tracing::info!("Alpha Hunter stopped");
    Ok(())
}

async fn assess_command(cmd: AssessCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let pipeline = build_pipeline(&config)?;

    let snapshot = pipeline.aggregator.snapshot(&cmd.address).await;
    if snapshot.is_empty() {
        anyhow::bail!("No provider returned market data for {}", cmd.address);
    }

    let assessment = pipeline.risk_engine.assess(&cmd.address).await;

    // One-shot scoring has no prior snapshot; trend signals use cold starts
    let trend_engine = TrendEngine::new(config.trend.clone());
    let social = pipeline.social.social_stats(&cmd.address).await.ok();
    let signals = TrendSignals {
        volume: trend_engine.volume_score(snapshot.volume_24h, None),
        holders: trend_engine.holder_score(snapshot.holder_count, None),
        whale: trend_engine.whale_score(
            social
                .as_ref()
                .and_then(|s| s.whale_volume_24h)
                .unwrap_or(0.0),
            snapshot.volume_24h,
        ),
        social: trend_engine.social_score(
            social
                .as_ref()
                .map(|s| s.mention_count() as usize)
                .unwrap_or(0),
            social.as_ref().and_then(|s| s.sentiment).unwrap_or(0.0),
        ),
    };
    let score = Scorer::new(config.verdict_thresholds()).score(&assessment, &signals, &snapshot);

    match cmd.format.as_str() {
        "json" => {
            let payload = serde_json::json!({
                "snapshot": snapshot,
                "assessment": assessment.as_ref(),
                "score": score,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        _ => {
            println!("Token: {}", cmd.address);
            for (provider, healthy) in pipeline.aggregator.health().await {
                println!(
                    "  provider {provider}: {}",
                    if healthy { "healthy" } else { "degraded" }
                );
            }
            println!(
                "Price: ${:.6}  Liquidity: ${:.0}  Volume 24h: ${:.0}  Holders: {}",
                snapshot.price, snapshot.liquidity, snapshot.volume_24h, snapshot.holder_count
            );
            println!(
                "Risk score: {:.1}/100 (confidence {:.2})",
                assessment.overall_score,
                assessment.data_confidence()
            );
            for warning in &assessment.warnings {
                println!("  ! {warning}");
            }
            for recommendation in &assessment.recommendations {
                println!("  > {recommendation}");
            }
            println!(
                "Safety: {:.1}  Hype: {:.1}  Total: {:.1}  Verdict: {}  Confidence: {:.2}",
                score.safety_composite,
                score.hype_composite,
                score.total,
                score.verdict,
                score.confidence
            );
        }
    }

    Ok(())
}

async fn sources_command(cmd: SourcesCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let sources = config.monitored_sources();

    if sources.is_empty() {
        println!("No discovery sources configured");
        return Ok(());
    }

    println!(
        "{:<12} {:<40} {:>10} {:>8}",
        "KIND", "IDENTIFIER", "INTERVAL", "FILTERS"
    );
    for source in sources {
        println!(
            "{:<12} {:<40} {:>9}s {:>8}",
            source.kind.to_string(),
            source.identifier,
            source.scan_interval_secs,
            source.keywords.len() + source.patterns.len()
        );
    }

    Ok(())
}

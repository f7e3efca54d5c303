use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod api;
mod config;
mod error;
mod models;
mod solana;
mod trading;

use crate::api::launchpad::LaunchpadClient;
use crate::api::CurveOracle;
use crate::config::Config;
use crate::solana::client::SolanaClient;
use crate::solana::wallet::WalletManager;
use crate::solana::LedgerRpc;
use crate::trading::curve::parse_program_id;
use crate::trading::{
    Accountant, CurveMonitor, CurveMonitorConfig, CurveNotification, DecisionEngine, DryRunExecutor,
    EngineSettings, ExitRules, FreshnessFilter, LiveAccountant, Outcome, RetryPolicy,
    SimulatedAccountant, TradeExecution, TradeExecutor,
};

const NOTIFICATION_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load environment variables
    dotenv().ok();

    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let commitment = config.commitment_config()?;
    let program_id = parse_program_id(&config.launchpad_program_id)?;

    let solana_client = Arc::new(SolanaClient::new(&config.rpc_endpoint, commitment)?);
    let rpc: Arc<dyn LedgerRpc> = solana_client;
    let oracle: Arc<dyn CurveOracle> = Arc::new(
        LaunchpadClient::new(&config.trade_api_url).context("Failed to create launchpad client")?,
    );

    // Simulation swaps both the executor and the accountant, once
    let mut live_accountant = None;
    let (executor, accountant): (Arc<dyn TradeExecution>, Arc<dyn Accountant>) = if config.simulate {
        info!("🔍 Simulation mode: trades are evaluated but never submitted");
        (
            Arc::new(DryRunExecutor),
            Arc::new(SimulatedAccountant::new(config.simulate_balance_lamports())),
        )
    } else {
        let private_key = config
            .private_key
            .as_deref()
            .context("PRIVATE_KEY missing")?;
        let wallet = Arc::new(WalletManager::new(private_key)?);
        info!("Wallet initialized with address: {}", wallet.get_public_key());
        let live = Arc::new(LiveAccountant::new());
        live_accountant = Some(live.clone());
        (
            Arc::new(TradeExecutor::new(
                oracle.clone(),
                rpc.clone(),
                wallet,
                config.priority_fee_micro_lamports,
                config.slippage_bps,
            )),
            live,
        )
    };

    let settings = EngineSettings {
        buy_lamports: config.buy_lamports(),
        exit_rules: ExitRules::from_config(&config),
        retry: RetryPolicy::new(config.retry_attempts, config.retry_interval_ms),
    };
    info!(
        "Buy {} lamports | TP {}% | SL {}% | timeout {}m below {}% | {} accounting",
        settings.buy_lamports,
        config.take_profit_percent,
        config.stop_loss_percent,
        config.timeout_minutes,
        config.timeout_profit_percent,
        accountant.label()
    );

    let freshness = FreshnessFilter::new(rpc, config.max_staleness_minutes, config.freshness_reference);
    let engine = Arc::new(DecisionEngine::new(settings, oracle, executor, freshness, accountant));

    let (tx, mut rx) = mpsc::channel::<CurveNotification>(NOTIFICATION_BUFFER);
    let monitor = CurveMonitor::new(
        CurveMonitorConfig {
            watch_logs: config.watch_logs,
            ..CurveMonitorConfig::new(&config.wss_endpoint, commitment, program_id)
        },
        tx,
    );
    monitor.start().await?;

    info!("Starting curve sniper...");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }

            notification = rx.recv() => {
                let Some(notification) = notification else {
                    warn!("Notification stream closed");
                    break;
                };
                let engine = engine.clone();
                tokio::spawn(async move {
                    handle(&engine, notification).await;
                });
            }
        }
    }

    if monitor.is_running().await {
        monitor.stop().await?;
    }
    let stats = monitor.get_stats().await;
    let summary = engine.summary().await;
    info!(
        "Notifications: {} received, {} forwarded, {} undecodable | reconnects: {} ({} cooldowns)",
        stats.notifications_received,
        stats.notifications_forwarded,
        stats.decode_failures,
        stats.reconnect_attempts,
        stats.circuit_breaks
    );
    if config.watch_logs {
        info!("Launchpad logs: {} received, {} token mints", stats.logs_received, stats.token_mints_seen);
    }
    info!(
        "Discovered {} | open {} | finished {} | realized {} lamports",
        summary.discovered, summary.open_positions, summary.finished_trades, summary.realized_earn
    );
    if let Some(balance) = summary.balance {
        info!("🔍 [SIMULATE] Final balance: {} lamports", balance);
    }
    if let Some(live) = live_accountant {
        info!("Spent {} lamports, received {} lamports", live.spent(), live.received());
    }

    Ok(())
}

async fn handle(engine: &DecisionEngine, notification: CurveNotification) {
    match engine.handle_notification(&notification).await {
        Ok(Outcome::Ignored) | Ok(Outcome::Holding { .. }) => {}
        Ok(Outcome::Stale) => debug!("Stale curve {}", notification.account),
        Ok(outcome) => debug!("Curve {}: {:?}", notification.account, outcome),
        Err(e) => error!("Notification for {} dropped: {:#}", notification.account, e),
    }
}

// src/trading/monitor.rs
//
// Launchpad curve account stream over WebSocket programSubscribe, plus an
// optional logsSubscribe watcher that classifies launchpad instructions.

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    nonblocking::pubsub_client::PubsubClient,
    rpc_config::{
        RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcTransactionLogsConfig,
        RpcTransactionLogsFilter,
    },
    rpc_response::{Response, RpcKeyedAccount, RpcLogsResponse},
};
use solana_sdk::{account::Account, commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::trading::engine::CurveNotification;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CurveMonitorConfig {
    /// Pubsub WebSocket URL
    pub websocket_url: String,
    pub commitment: CommitmentConfig,
    pub program_id: Pubkey,
    /// Also subscribe to program logs and classify instructions
    pub watch_logs: bool,
    /// Consecutive failures before reconnects pause for the cooldown
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub circuit_breaker_cooldown_ms: u64,
}

impl CurveMonitorConfig {
    pub fn new(websocket_url: &str, commitment: CommitmentConfig, program_id: Pubkey) -> Self {
        Self {
            websocket_url: websocket_url.to_string(),
            commitment,
            program_id,
            watch_logs: false,
            max_reconnect_attempts: 10,
            reconnect_delay_ms: 5000,
            circuit_breaker_cooldown_ms: 60_000,
        }
    }
}

/// Consecutive connection failures for one subscription.
///
/// Running out of attempts pauses reconnects for the cooldown and then starts
/// over; the subscription itself is never given up.
#[derive(Debug)]
struct ReconnectBackoff {
    consecutive_failures: u32,
    max_failures: u32,
    delay: Duration,
    cooldown: Duration,
}

impl ReconnectBackoff {
    fn new(config: &CurveMonitorConfig) -> Self {
        Self {
            consecutive_failures: 0,
            max_failures: config.max_reconnect_attempts.max(1),
            delay: Duration::from_millis(config.reconnect_delay_ms),
            cooldown: Duration::from_millis(config.circuit_breaker_cooldown_ms),
        }
    }

    /// Called once a subscription is established.
    fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Record a failure; returns the wait before the next attempt and whether
    /// the breaker tripped.
    fn record_failure(&mut self) -> (Duration, bool) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.max_failures {
            self.consecutive_failures = 0;
            (self.cooldown, true)
        } else {
            (self.delay, false)
        }
    }
}

// ============================================================================
// LOG CLASSIFIER
// ============================================================================

/// Launchpad instruction named in a transaction's logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchpadInstruction {
    TokenMint,
    Buy,
    Sell,
    Unknown,
}

impl fmt::Display for LaunchpadInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchpadInstruction::TokenMint => "TokenMint",
            LaunchpadInstruction::Buy => "Buy",
            LaunchpadInstruction::Sell => "Sell",
            LaunchpadInstruction::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// First recognised instruction line wins.
pub fn classify_logs<S: AsRef<str>>(logs: &[S]) -> LaunchpadInstruction {
    for line in logs {
        let line = line.as_ref();
        if line.contains("Instruction: TokenMint") {
            return LaunchpadInstruction::TokenMint;
        }
        if line.contains("Instruction: Buy") {
            return LaunchpadInstruction::Buy;
        }
        if line.contains("Instruction: Sell") {
            return LaunchpadInstruction::Sell;
        }
    }
    LaunchpadInstruction::Unknown
}

/// Turn a programSubscribe item into a notification with the raw account bytes.
pub fn to_notification(keyed: &RpcKeyedAccount) -> Result<CurveNotification> {
    let account = Pubkey::from_str(&keyed.pubkey)
        .with_context(|| format!("Invalid account key in notification: {}", keyed.pubkey))?;
    let decoded: Account = keyed
        .account
        .decode()
        .ok_or_else(|| anyhow!("Undecodable account data for {}", account))?;
    Ok(CurveNotification {
        account,
        data: decoded.data,
    })
}

// ============================================================================
// CURVE MONITOR
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct MonitorStats {
    pub notifications_received: u64,
    pub notifications_forwarded: u64,
    /// Items whose account payload could not be decoded
    pub decode_failures: u64,
    pub logs_received: u64,
    pub token_mints_seen: u64,
    /// Failed connection attempts over the process lifetime
    pub reconnect_attempts: u32,
    /// Times reconnects were paused for the cooldown
    pub circuit_breaks: u32,
}

pub struct CurveMonitor {
    config: CurveMonitorConfig,
    sender: mpsc::Sender<CurveNotification>,
    running: Arc<RwLock<bool>>,
    shutdown_tx: broadcast::Sender<()>,
    stats: Arc<RwLock<MonitorStats>>,
}

impl CurveMonitor {
    pub fn new(config: CurveMonitorConfig, sender: mpsc::Sender<CurveNotification>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            sender,
            running: Arc::new(RwLock::new(false)),
            shutdown_tx,
            stats: Arc::new(RwLock::new(MonitorStats::default())),
        }
    }

    /// Spawn the subscription task(s) and return.
    pub async fn start(&self) -> Result<()> {
        let mut running = self.running.write().await;
        if *running {
            return Err(anyhow!("Curve monitor is already running"));
        }
        *running = true;
        drop(running);

        info!("🚀 Starting launchpad curve monitor...");
        info!("📡 Subscribing to program: {}", self.config.program_id);

        let config = self.config.clone();
        let sender = self.sender.clone();
        let running = self.running.clone();
        let stats = self.stats.clone();
        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            Self::reconnect_loop("Curve account", &config, &running, &stats, |connected| {
                let mut shutdown_rx = shutdown_tx.subscribe();
                let config = config.clone();
                let sender = sender.clone();
                let stats = stats.clone();
                async move {
                    Self::run_accounts(&config, &sender, &stats, &connected, &mut shutdown_rx).await
                }
            })
            .await;
        });

        if self.config.watch_logs {
            let config = self.config.clone();
            let running = self.running.clone();
            let stats = self.stats.clone();
            let shutdown_tx = self.shutdown_tx.clone();
            tokio::spawn(async move {
                Self::reconnect_loop("Launchpad log", &config, &running, &stats, |connected| {
                    let mut shutdown_rx = shutdown_tx.subscribe();
                    let config = config.clone();
                    let stats = stats.clone();
                    async move { Self::run_logs(&config, &stats, &connected, &mut shutdown_rx).await }
                })
                .await;
            });
        }

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping curve monitor...");
        *self.running.write().await = false;
        let _ = self.shutdown_tx.send(());
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn get_stats(&self) -> MonitorStats {
        self.stats.read().await.clone()
    }

    /// Rerun `subscribe` after errors until it ends cleanly or the monitor is
    /// stopped. `subscribe` sets the flag it is given once it is subscribed.
    async fn reconnect_loop<F, Fut>(
        name: &str,
        config: &CurveMonitorConfig,
        running: &Arc<RwLock<bool>>,
        stats: &Arc<RwLock<MonitorStats>>,
        mut subscribe: F,
    ) where
        F: FnMut(Arc<AtomicBool>) -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let mut backoff = ReconnectBackoff::new(config);

        loop {
            if !*running.read().await {
                info!("{} subscription stopped by request", name);
                break;
            }

            let connected = Arc::new(AtomicBool::new(false));
            let result = subscribe(connected.clone()).await;
            if connected.load(Ordering::SeqCst) {
                backoff.reset();
            }

            match result {
                Ok(_) => {
                    info!("{} subscription ended normally", name);
                    break;
                }
                Err(e) => {
                    error!("{} WebSocket error: {:?}", name, e);
                    stats.write().await.reconnect_attempts += 1;

                    let (wait, tripped) = backoff.record_failure();
                    if tripped {
                        stats.write().await.circuit_breaks += 1;
                        error!(
                            "{} subscription failed {} times in a row, pausing reconnects for {:?}",
                            name, backoff.max_failures, wait
                        );
                    } else {
                        warn!(
                            "Reconnecting in {:?} (attempt {}/{})",
                            wait, backoff.consecutive_failures, backoff.max_failures
                        );
                    }
                    sleep(wait).await;
                }
            }
        }
    }

    async fn run_accounts(
        config: &CurveMonitorConfig,
        sender: &mpsc::Sender<CurveNotification>,
        stats: &Arc<RwLock<MonitorStats>>,
        connected: &AtomicBool,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<()> {
        info!("Connecting to pubsub endpoint...");
        let pubsub_client = PubsubClient::new(&config.websocket_url).await?;

        let subscribe_config = RpcProgramAccountsConfig {
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(config.commitment),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mut accounts_stream, unsubscribe) = pubsub_client
            .program_subscribe(&config.program_id, Some(subscribe_config))
            .await?;
        connected.store(true, Ordering::SeqCst);

        info!("✅ Subscribed! Listening for curve account changes...");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }

                item = accounts_stream.next() => {
                    match item {
                        Some(response) => {
                            if !Self::forward_account(response, sender, stats).await {
                                info!("Notification receiver dropped, ending subscription");
                                break;
                            }
                        }
                        None => {
                            warn!("Account stream ended unexpectedly");
                            unsubscribe().await;
                            return Err(anyhow!("Account stream closed"));
                        }
                    }
                }
            }
        }

        unsubscribe().await;
        Ok(())
    }

    async fn forward_account(
        response: Response<RpcKeyedAccount>,
        sender: &mpsc::Sender<CurveNotification>,
        stats: &Arc<RwLock<MonitorStats>>,
    ) -> bool {
        stats.write().await.notifications_received += 1;

        let notification = match to_notification(&response.value) {
            Ok(notification) => notification,
            Err(e) => {
                debug!("Skipping notification: {:?}", e);
                stats.write().await.decode_failures += 1;
                return true;
            }
        };

        // A closed receiver means the process is shutting down
        if sender.send(notification).await.is_err() {
            return false;
        }
        stats.write().await.notifications_forwarded += 1;
        true
    }

    async fn run_logs(
        config: &CurveMonitorConfig,
        stats: &Arc<RwLock<MonitorStats>>,
        connected: &AtomicBool,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<()> {
        let pubsub_client = PubsubClient::new(&config.websocket_url).await?;
        let (mut logs_stream, unsubscribe) = pubsub_client
            .logs_subscribe(
                RpcTransactionLogsFilter::Mentions(vec![config.program_id.to_string()]),
                RpcTransactionLogsConfig {
                    commitment: Some(config.commitment),
                },
            )
            .await?;
        connected.store(true, Ordering::SeqCst);

        info!("✅ Watching launchpad logs for {}", config.program_id);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,

                item = logs_stream.next() => {
                    match item {
                        Some(response) => Self::record_logs(response, stats).await,
                        None => {
                            warn!("Log stream ended unexpectedly");
                            unsubscribe().await;
                            return Err(anyhow!("Log stream closed"));
                        }
                    }
                }
            }
        }

        unsubscribe().await;
        Ok(())
    }

    async fn record_logs(response: Response<RpcLogsResponse>, stats: &Arc<RwLock<MonitorStats>>) {
        let logs = response.value;
        let mut s = stats.write().await;
        s.logs_received += 1;
        if logs.err.is_some() {
            return;
        }

        match classify_logs(&logs.logs) {
            LaunchpadInstruction::TokenMint => {
                s.token_mints_seen += 1;
                info!("🪙 New launchpad token minted | tx {}", logs.signature);
            }
            LaunchpadInstruction::Unknown => {}
            instruction => debug!("Launchpad {} | tx {}", instruction, logs.signature),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use solana_account_decoder::{UiAccount, UiAccountData};

    fn keyed(pubkey: String, data: UiAccountData) -> RpcKeyedAccount {
        RpcKeyedAccount {
            pubkey,
            account: UiAccount {
                lamports: 1_000_000,
                data,
                owner: Pubkey::new_unique().to_string(),
                executable: false,
                rent_epoch: 0,
                space: None,
            },
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = CurveMonitorConfig::new("wss://example.invalid", CommitmentConfig::confirmed(), Pubkey::new_unique());
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.reconnect_delay_ms, 5000);
        assert_eq!(config.circuit_breaker_cooldown_ms, 60_000);
        assert!(!config.watch_logs);
    }

    fn backoff_config() -> CurveMonitorConfig {
        CurveMonitorConfig {
            max_reconnect_attempts: 3,
            reconnect_delay_ms: 10,
            circuit_breaker_cooldown_ms: 500,
            ..CurveMonitorConfig::new("ws://127.0.0.1:1", CommitmentConfig::confirmed(), Pubkey::new_unique())
        }
    }

    #[test]
    fn test_backoff_trips_then_starts_over() {
        let mut backoff = ReconnectBackoff::new(&backoff_config());

        assert_eq!(backoff.record_failure(), (Duration::from_millis(10), false));
        assert_eq!(backoff.record_failure(), (Duration::from_millis(10), false));
        assert_eq!(backoff.record_failure(), (Duration::from_millis(500), true));
        // after the cooldown the budget is full again
        assert_eq!(backoff.record_failure(), (Duration::from_millis(10), false));
    }

    #[test]
    fn test_backoff_reset_after_connect() {
        let mut backoff = ReconnectBackoff::new(&backoff_config());

        // failures spread across healthy connections never trip the breaker
        for _ in 0..10 {
            let (_, tripped) = backoff.record_failure();
            assert!(!tripped);
            backoff.reset();
        }
    }

    #[tokio::test]
    async fn test_subscription_survives_repeated_failures() {
        let (tx, _rx) = mpsc::channel(8);
        let config = CurveMonitorConfig {
            max_reconnect_attempts: 2,
            reconnect_delay_ms: 1,
            circuit_breaker_cooldown_ms: 1,
            ..CurveMonitorConfig::new("ws://127.0.0.1:1", CommitmentConfig::confirmed(), Pubkey::new_unique())
        };
        let monitor = CurveMonitor::new(config, tx);
        monitor.start().await.unwrap();

        let waited = tokio::time::timeout(Duration::from_secs(10), async {
            while monitor.get_stats().await.reconnect_attempts < 6 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await;

        assert!(waited.is_ok(), "reconnects stopped early");
        assert!(monitor.is_running().await);
        assert!(monitor.get_stats().await.circuit_breaks >= 2);
        monitor.stop().await.unwrap();
    }

    #[test]
    fn test_classify_logs() {
        let mint = vec![
            "Program MoonCVVNZFSYkqNXP6bxHLPL6QQJiMagDL3qcqUQTrG invoke [1]",
            "Program log: Instruction: TokenMint",
        ];
        assert_eq!(classify_logs(&mint), LaunchpadInstruction::TokenMint);
        assert_eq!(classify_logs(&["Program log: Instruction: Buy"]), LaunchpadInstruction::Buy);
        assert_eq!(classify_logs(&["Program log: Instruction: Sell"]), LaunchpadInstruction::Sell);
        assert_eq!(classify_logs(&["Program log: transfer"]), LaunchpadInstruction::Unknown);
        assert_eq!(classify_logs::<&str>(&[]), LaunchpadInstruction::Unknown);
    }

    #[test]
    fn test_classify_first_instruction_wins() {
        let logs = vec![
            "Program log: Instruction: Sell".to_string(),
            "Program log: Instruction: TokenMint".to_string(),
        ];
        assert_eq!(classify_logs(&logs), LaunchpadInstruction::Sell);
    }

    #[test]
    fn test_to_notification_decodes_base64() {
        let account = Pubkey::new_unique();
        let bytes = vec![1u8, 2, 3, 4, 5];
        let item = keyed(
            account.to_string(),
            UiAccountData::Binary(STANDARD.encode(&bytes), UiAccountEncoding::Base64),
        );

        let notification = to_notification(&item).unwrap();
        assert_eq!(notification.account, account);
        assert_eq!(notification.data, bytes);
    }

    #[test]
    fn test_to_notification_rejects_bad_key() {
        let item = keyed(
            "not-a-key".to_string(),
            UiAccountData::Binary(STANDARD.encode([0u8]), UiAccountEncoding::Base64),
        );
        assert!(to_notification(&item).is_err());
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (tx, _rx) = mpsc::channel(8);
        let config = CurveMonitorConfig {
            max_reconnect_attempts: 1,
            ..CurveMonitorConfig::new("ws://127.0.0.1:1", CommitmentConfig::confirmed(), Pubkey::new_unique())
        };
        let monitor = CurveMonitor::new(config, tx);

        monitor.start().await.unwrap();
        assert!(monitor.start().await.is_err());
        monitor.stop().await.unwrap();
        assert!(!monitor.is_running().await);
    }

    #[tokio::test]
    async fn test_stats_default() {
        let (tx, _rx) = mpsc::channel(1);
        let monitor = CurveMonitor::new(
            CurveMonitorConfig::new("ws://127.0.0.1:1", CommitmentConfig::confirmed(), Pubkey::new_unique()),
            tx,
        );
        let stats = monitor.get_stats().await;
        assert_eq!(stats.notifications_received, 0);
        assert_eq!(stats.reconnect_attempts, 0);
    }
}

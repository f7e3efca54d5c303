// src/trading/engine.rs
//
// Per-notification decision flow: decode the curve account, then either
// evaluate exits for a held mint or run discovery and entry for a new one.
//
// Handlers for the same mint are serialized with a keyed async mutex held for
// the whole handler body; different mints run concurrently. The ledger lock is
// only taken for short sections and never across an await on the network.

use anyhow::Result;
use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, error, info, warn};

use crate::api::CurveOracle;
use crate::models::{ExitReason, OpenPosition, TradeDirection, TradeRecord};
use crate::trading::accounting::Accountant;
use crate::trading::curve::{CurveRecord, CURVE_ACCOUNT_OFFSET};
use crate::trading::executor::TradeExecution;
use crate::trading::freshness::FreshnessFilter;
use crate::trading::ledger::{AssetLifecycle, PositionLedger};
use crate::trading::retry::{self, RetryPolicy};
use crate::trading::strategy::ExitRules;

/// A raw account-change event for a launchpad curve account.
#[derive(Debug, Clone)]
pub struct CurveNotification {
    pub account: Pubkey,
    pub data: Vec<u8>,
}

/// What handling one notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stale, closed or otherwise nothing to do
    Ignored,
    /// First look found the market stale; the mint is abandoned
    Stale,
    Entered { price: u64, token_amount: u64 },
    /// Buy failed after all retries; the next sighting retries discovery
    EntryFailed,
    /// Held and no exit rule fired
    Holding { price: u64 },
    Exited { reason: ExitReason, earn: i64 },
    /// Sell failed after all retries; the position stays open
    ExitFailed { reason: ExitReason },
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub buy_lamports: u64,
    pub exit_rules: ExitRules,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct EngineSummary {
    pub discovered: usize,
    pub open_positions: usize,
    pub finished_trades: usize,
    pub realized_earn: i64,
    pub balance: Option<i64>,
}

/// Async mutex per mint. An entry lives only while a handler holds or waits on it.
#[derive(Default)]
struct AssetLocks {
    locks: StdMutex<HashMap<Pubkey, Arc<Mutex<()>>>>,
}

impl AssetLocks {
    async fn acquire(&self, mint: Pubkey) -> AssetGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(mint).or_default().clone()
        };
        AssetGuard {
            locks: self,
            mint,
            guard: Some(lock.lock_owned().await),
        }
    }
}

struct AssetGuard<'a> {
    locks: &'a AssetLocks,
    mint: Pubkey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AssetGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map's own handle left: nobody holds or waits on this mint
        if locks.get(&self.mint).map_or(false, |lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.mint);
        }
    }
}

pub struct DecisionEngine {
    settings: EngineSettings,
    oracle: Arc<dyn CurveOracle>,
    executor: Arc<dyn TradeExecution>,
    freshness: FreshnessFilter,
    accountant: Arc<dyn Accountant>,
    ledger: RwLock<PositionLedger>,
    locks: AssetLocks,
}

impl DecisionEngine {
    pub fn new(
        settings: EngineSettings,
        oracle: Arc<dyn CurveOracle>,
        executor: Arc<dyn TradeExecution>,
        freshness: FreshnessFilter,
        accountant: Arc<dyn Accountant>,
    ) -> Self {
        Self {
            settings,
            oracle,
            executor,
            freshness,
            accountant,
            ledger: RwLock::new(PositionLedger::new()),
            locks: AssetLocks::default(),
        }
    }

    /// Handle one curve account notification.
    ///
    /// Errors are decode failures and price lookups that abort an exit check;
    /// both leave the ledger untouched.
    pub async fn handle_notification(&self, notification: &CurveNotification) -> Result<Outcome> {
        let record = CurveRecord::decode(&notification.data, CURVE_ACCOUNT_OFFSET)?;
        let mint = record.mint();

        let _guard = self.locks.acquire(mint).await;

        let lifecycle = self.ledger.read().await.lifecycle(&mint);
        match lifecycle {
            AssetLifecycle::Held => self.evaluate_exit(&mint).await,
            AssetLifecycle::Unseen | AssetLifecycle::EntryFailed => {
                self.discover(&notification.account, &record).await
            }
            AssetLifecycle::Discovered | AssetLifecycle::Closed => Ok(Outcome::Ignored),
        }
    }

    async fn discover(&self, curve_account: &Pubkey, record: &CurveRecord) -> Result<Outcome> {
        let mint = record.mint();
        let first_sighting = self.ledger.write().await.discover(mint);
        if !first_sighting {
            debug!("Retrying entry for {} after an earlier failure", mint);
        }

        if !self.freshness.is_fresh(curve_account).await {
            debug!("Curve {} for {} is stale, ignoring", curve_account, mint);
            return Ok(Outcome::Stale);
        }

        info!("🚀 Discovered new curve: {}", curve_account);
        info!(
            "   curveAccount: {}, totalSupply: {}, curveAmount: {}, mint: {}",
            curve_account, record.total_supply, record.curve_amount, mint
        );

        Ok(self.enter(&mint).await)
    }

    async fn enter(&self, mint: &Pubkey) -> Outcome {
        let cost = self.settings.buy_lamports;

        // Quote before submitting so a failed lookup never leaves an untracked buy
        let quote = async {
            let price = self.oracle.price(mint).await?;
            let token_amount = self.oracle.amount_for(mint, cost, TradeDirection::Buy).await?;
            anyhow::Ok((price, token_amount))
        };
        let (price, token_amount) = match quote.await {
            Ok(quote) => quote,
            Err(e) => {
                error!("Buy {} aborted, pricing failed: {:#}", mint, e);
                self.ledger.write().await.mark_entry_failed(*mint);
                return Outcome::EntryFailed;
            }
        };

        let submitted = retry::execute_with(
            || self.executor.execute(mint, TradeDirection::Buy, cost),
            self.settings.retry,
        )
        .await;
        let signature = match submitted {
            Ok(signature) => signature,
            Err(e) => {
                error!(
                    "Buy {} failed after {} attempts: {:#}",
                    mint, self.settings.retry.max_attempts, e
                );
                self.ledger.write().await.mark_entry_failed(*mint);
                return Outcome::EntryFailed;
            }
        };

        let position = OpenPosition {
            mint: *mint,
            entry_time: Utc::now(),
            entry_price: price,
            entry_token_amount: token_amount,
        };
        let trade = TradeRecord::open(*mint, cost, price, signature.to_string());
        if let Err(e) = self.ledger.write().await.open(position, trade) {
            error!("Bought {} but could not record the position: {}", mint, e);
            return Outcome::EntryFailed;
        }
        self.accountant.record_buy(cost);

        info!(
            "✅ Buy {} success: {} lamports for {} tokens @ {} | sig {}",
            mint, cost, token_amount, price, signature
        );
        Outcome::Entered { price, token_amount }
    }

    async fn evaluate_exit(&self, mint: &Pubkey) -> Result<Outcome> {
        let position = match self.ledger.read().await.position(mint).cloned() {
            Some(position) => position,
            None => return Ok(Outcome::Ignored),
        };

        let price = self.oracle.price(mint).await?;
        let reason = match self
            .settings
            .exit_rules
            .evaluate(&position, price, Utc::now())
        {
            Some(reason) => reason,
            None => {
                debug!("Holding {}: price {} (entry {})", mint, price, position.entry_price);
                return Ok(Outcome::Holding { price });
            }
        };

        info!("{} hit for {}: price {} (entry {})", reason, mint, price, position.entry_price);
        Ok(self.exit(&position, price, reason).await)
    }

    async fn exit(&self, position: &OpenPosition, price: u64, reason: ExitReason) -> Outcome {
        let mint = &position.mint;
        let tokens = position.entry_token_amount;

        let proceeds = match self.oracle.quote(mint, tokens, TradeDirection::Sell).await {
            Ok(proceeds) => proceeds,
            Err(e) => {
                error!("Sell {} ({}) aborted, pricing failed: {:#}", mint, reason, e);
                return Outcome::ExitFailed { reason };
            }
        };

        let submitted = retry::execute_with(
            || self.executor.execute(mint, TradeDirection::Sell, tokens),
            self.settings.retry,
        )
        .await;
        let signature = match submitted {
            Ok(signature) => signature,
            Err(e) => {
                // Position stays open; the next notification for this mint retries the exit
                error!(
                    "Sell {} ({}) failed after {} attempts, position kept open: {:#}",
                    mint, reason, self.settings.retry.max_attempts, e
                );
                return Outcome::ExitFailed { reason };
            }
        };

        let closed = self
            .ledger
            .write()
            .await
            .close(mint, price, proceeds, signature.to_string(), reason);
        let trade = match closed {
            Ok(trade) => trade,
            Err(e) => {
                warn!("Sold {} but the ledger had no open position: {}", mint, e);
                return Outcome::Ignored;
            }
        };
        self.accountant.record_sell(proceeds);

        match self.accountant.balance() {
            Some(balance) => info!(
                "💰 Sold {} ({}): earn {} lamports, balance is {}",
                mint, reason, trade.earn, balance
            ),
            None => info!("💰 Sold {} ({}): earn {} lamports | sig {}", mint, reason, trade.earn, signature),
        }
        Outcome::Exited { reason, earn: trade.earn }
    }

    pub async fn summary(&self) -> EngineSummary {
        let ledger = self.ledger.read().await;
        EngineSummary {
            discovered: ledger.discovered_count(),
            open_positions: ledger.open_count(),
            finished_trades: ledger.finished_trades().count(),
            realized_earn: ledger.realized_earn(),
            balance: self.accountant.balance(),
        }
    }
}

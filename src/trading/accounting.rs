// src/trading/accounting.rs
//
// Balance bookkeeping for completed buys and sells. One implementation is
// picked at startup: a virtual balance for simulation, or a flow tally for
// live trading where the real balance lives on chain.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::info;

pub trait Accountant: Send + Sync {
    fn record_buy(&self, cost_lamports: u64);

    fn record_sell(&self, proceeds_lamports: u64);

    /// Current virtual balance in lamports, if this accountant keeps one.
    fn balance(&self) -> Option<i64>;

    fn label(&self) -> &'static str;
}

/// Virtual balance used when trades are not submitted.
#[derive(Debug)]
pub struct SimulatedAccountant {
    balance: AtomicI64,
}

impl SimulatedAccountant {
    pub fn new(starting_balance_lamports: i64) -> Self {
        info!("🔍 [SIMULATE] Starting balance: {} lamports", starting_balance_lamports);
        Self {
            balance: AtomicI64::new(starting_balance_lamports),
        }
    }
}

impl Accountant for SimulatedAccountant {
    fn record_buy(&self, cost_lamports: u64) {
        self.balance.fetch_sub(cost_lamports as i64, Ordering::SeqCst);
    }

    fn record_sell(&self, proceeds_lamports: u64) {
        self.balance.fetch_add(proceeds_lamports as i64, Ordering::SeqCst);
    }

    fn balance(&self) -> Option<i64> {
        Some(self.balance.load(Ordering::SeqCst))
    }

    fn label(&self) -> &'static str {
        "simulated"
    }
}

/// Tracks lamports spent and received by submitted trades.
#[derive(Debug, Default)]
pub struct LiveAccountant {
    spent: AtomicU64,
    received: AtomicU64,
}

impl LiveAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spent(&self) -> u64 {
        self.spent.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }
}

impl Accountant for LiveAccountant {
    fn record_buy(&self, cost_lamports: u64) {
        self.spent.fetch_add(cost_lamports, Ordering::SeqCst);
    }

    fn record_sell(&self, proceeds_lamports: u64) {
        self.received.fetch_add(proceeds_lamports, Ordering::SeqCst);
    }

    fn balance(&self) -> Option<i64> {
        None
    }

    fn label(&self) -> &'static str {
        "live"
    }
}

// src/trading/ledger.rs
//
// In-memory tables for discovered curves, open positions and trade accounting.
// Owned by the decision engine; nothing here is persisted.

use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};

use crate::error::TraderError;
use crate::models::{ExitReason, OpenPosition, TradeRecord};

/// Where an asset is in its discover/hold/close lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLifecycle {
    /// Never seen on the stream
    Unseen,
    /// Seen; either stale and abandoned or an entry is in flight
    Discovered,
    /// Seen, but the last buy attempt failed; discovery may run again
    EntryFailed,
    /// Position is open
    Held,
    /// Round-trip finished; never re-entered
    Closed,
}

#[derive(Debug, Default)]
pub struct PositionLedger {
    discovered: HashSet<Pubkey>,
    failed_entries: HashSet<Pubkey>,
    open_positions: HashMap<Pubkey, OpenPosition>,
    trades: HashMap<Pubkey, TradeRecord>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self, mint: &Pubkey) -> AssetLifecycle {
        if self.open_positions.contains_key(mint) {
            AssetLifecycle::Held
        } else if self.trades.get(mint).map_or(false, |t| t.is_finished) {
            AssetLifecycle::Closed
        } else if self.failed_entries.contains(mint) {
            AssetLifecycle::EntryFailed
        } else if self.discovered.contains(mint) {
            AssetLifecycle::Discovered
        } else {
            AssetLifecycle::Unseen
        }
    }

    /// Record a sighting. Returns true the first time a mint is seen.
    pub fn discover(&mut self, mint: Pubkey) -> bool {
        self.failed_entries.remove(&mint);
        self.discovered.insert(mint)
    }

    /// Flag an entry that failed after all retries so the next sighting retries it.
    pub fn mark_entry_failed(&mut self, mint: Pubkey) {
        self.failed_entries.insert(mint);
    }

    /// Create the position and its trade record together.
    pub fn open(&mut self, position: OpenPosition, trade: TradeRecord) -> Result<(), TraderError> {
        let mint = position.mint;
        if self.open_positions.contains_key(&mint) {
            return Err(TraderError::PositionError(format!(
                "Position for {} is already open",
                mint
            )));
        }
        if self.trades.contains_key(&mint) {
            return Err(TraderError::PositionError(format!(
                "Trade record for {} already exists",
                mint
            )));
        }

        self.discovered.insert(mint);
        self.failed_entries.remove(&mint);
        self.open_positions.insert(mint, position);
        self.trades.insert(mint, trade);
        Ok(())
    }

    pub fn position(&self, mint: &Pubkey) -> Option<&OpenPosition> {
        self.open_positions.get(mint)
    }

    pub fn trade(&self, mint: &Pubkey) -> Option<&TradeRecord> {
        self.trades.get(mint)
    }

    /// Finalize the trade record, then drop the open position.
    pub fn close(
        &mut self,
        mint: &Pubkey,
        sell_price: u64,
        sell_proceeds: u64,
        sell_signature: String,
        reason: ExitReason,
    ) -> Result<TradeRecord, TraderError> {
        if !self.open_positions.contains_key(mint) {
            return Err(TraderError::PositionError(format!(
                "No open position for {}",
                mint
            )));
        }
        let trade = self.trades.get_mut(mint).ok_or_else(|| {
            TraderError::PositionError(format!("No trade record for {}", mint))
        })?;

        trade.finish(sell_price, sell_proceeds, sell_signature, reason);
        let finished = trade.clone();
        self.open_positions.remove(mint);
        Ok(finished)
    }

    pub fn open_count(&self) -> usize {
        self.open_positions.len()
    }

    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    pub fn finished_trades(&self) -> impl Iterator<Item = &TradeRecord> {
        self.trades.values().filter(|t| t.is_finished)
    }

    /// Sum of realized gains over finished round-trips, in lamports.
    pub fn realized_earn(&self) -> i64 {
        self.finished_trades().map(|t| t.earn).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn position(mint: Pubkey) -> OpenPosition {
        OpenPosition {
            mint,
            entry_time: Utc::now(),
            entry_price: 1_000,
            entry_token_amount: 5_000_000,
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut ledger = PositionLedger::new();
        let mint = Pubkey::new_unique();
        assert_eq!(ledger.lifecycle(&mint), AssetLifecycle::Unseen);

        assert!(ledger.discover(mint));
        assert!(!ledger.discover(mint));
        assert_eq!(ledger.lifecycle(&mint), AssetLifecycle::Discovered);

        ledger
            .open(position(mint), TradeRecord::open(mint, 10_000_000, 1_000, "buy".into()))
            .unwrap();
        assert_eq!(ledger.lifecycle(&mint), AssetLifecycle::Held);

        let trade = ledger
            .close(&mint, 1_300, 13_000_000, "sell".into(), ExitReason::TakeProfit)
            .unwrap();
        assert_eq!(trade.earn, 3_000_000);
        assert_eq!(ledger.lifecycle(&mint), AssetLifecycle::Closed);
        assert!(ledger.position(&mint).is_none());
        assert!(ledger.trade(&mint).unwrap().is_finished);
        // closing never forgets the sighting
        assert_eq!(ledger.discovered_count(), 1);
    }

    #[test]
    fn test_failed_entry_is_retryable() {
        let mut ledger = PositionLedger::new();
        let mint = Pubkey::new_unique();
        ledger.discover(mint);
        ledger.mark_entry_failed(mint);
        assert_eq!(ledger.lifecycle(&mint), AssetLifecycle::EntryFailed);

        // rediscovery clears the flag but the mint stays discovered
        assert!(!ledger.discover(mint));
        assert_eq!(ledger.lifecycle(&mint), AssetLifecycle::Discovered);
        assert_eq!(ledger.discovered_count(), 1);
    }

    #[test]
    fn test_single_position_per_mint() {
        let mut ledger = PositionLedger::new();
        let mint = Pubkey::new_unique();
        ledger
            .open(position(mint), TradeRecord::open(mint, 1, 1, "a".into()))
            .unwrap();
        let err = ledger
            .open(position(mint), TradeRecord::open(mint, 1, 1, "b".into()))
            .unwrap_err();
        assert!(matches!(err, TraderError::PositionError(_)));
        assert_eq!(ledger.open_count(), 1);
    }

    #[test]
    fn test_no_reentry_after_round_trip() {
        let mut ledger = PositionLedger::new();
        let mint = Pubkey::new_unique();
        ledger
            .open(position(mint), TradeRecord::open(mint, 1, 1, "a".into()))
            .unwrap();
        ledger.close(&mint, 1, 2, "s".into(), ExitReason::Timeout).unwrap();

        assert!(ledger
            .open(position(mint), TradeRecord::open(mint, 1, 1, "b".into()))
            .is_err());
    }

    #[test]
    fn test_close_without_position_fails() {
        let mut ledger = PositionLedger::new();
        let mint = Pubkey::new_unique();
        assert!(ledger.close(&mint, 1, 1, "s".into(), ExitReason::StopLoss).is_err());
    }

    #[test]
    fn test_realized_earn_sums_finished() {
        let mut ledger = PositionLedger::new();
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let c = Pubkey::new_unique();
        for mint in [a, b, c] {
            ledger
                .open(position(mint), TradeRecord::open(mint, 100, 1, "buy".into()))
                .unwrap();
        }
        ledger.close(&a, 1, 150, "s".into(), ExitReason::TakeProfit).unwrap();
        ledger.close(&b, 1, 80, "s".into(), ExitReason::StopLoss).unwrap();

        assert_eq!(ledger.realized_earn(), 30);
        assert_eq!(ledger.finished_trades().count(), 2);
        assert_eq!(ledger.open_count(), 1);
    }
}

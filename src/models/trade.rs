use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Side of a curve trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    /// Wire name used by the launchpad builder.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a held position was sold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Timeout,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TakeProfit => write!(f, "Take Profit"),
            Self::StopLoss => write!(f, "Stop Loss"),
            Self::Timeout => write!(f, "Timeout"),
        }
    }
}

/// A currently held curve position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub mint: Pubkey,
    pub entry_time: DateTime<Utc>,
    /// Collateral (lamports) for `PRICE_PROBE_TOKENS` at entry
    pub entry_price: u64,
    /// Raw token units received for the buy
    pub entry_token_amount: u64,
}

/// Round-trip accounting for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub mint: Pubkey,

    // Buy side
    pub buy_cost: u64,
    pub buy_price: u64,
    pub buy_signature: String,
    pub opened_at: DateTime<Utc>,

    // Sell side, zero until finished
    pub sell_proceeds: u64,
    pub sell_price: u64,
    pub sell_signature: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,

    /// Realized gain in lamports: `sell_proceeds - buy_cost`
    pub earn: i64,
    pub is_finished: bool,
}

impl TradeRecord {
    pub fn open(mint: Pubkey, buy_cost: u64, buy_price: u64, buy_signature: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mint,
            buy_cost,
            buy_price,
            buy_signature,
            opened_at: Utc::now(),
            sell_proceeds: 0,
            sell_price: 0,
            sell_signature: None,
            closed_at: None,
            exit_reason: None,
            earn: 0,
            is_finished: false,
        }
    }

    /// Populate the sell side and mark the round-trip finished.
    pub fn finish(&mut self, sell_price: u64, sell_proceeds: u64, sell_signature: String, reason: ExitReason) {
        self.sell_price = sell_price;
        self.sell_proceeds = sell_proceeds;
        self.sell_signature = Some(sell_signature);
        self.exit_reason = Some(reason);
        self.closed_at = Some(Utc::now());
        self.earn = sell_proceeds as i64 - self.buy_cost as i64;
        self.is_finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_computes_earn() {
        let mut record = TradeRecord::open(Pubkey::new_unique(), 10_000_000, 1_000, "buy".to_string());
        assert!(!record.is_finished);
        assert_eq!(record.earn, 0);

        record.finish(1_300, 12_500_000, "sell".to_string(), ExitReason::TakeProfit);
        assert!(record.is_finished);
        assert_eq!(record.earn, 2_500_000);
        assert_eq!(record.exit_reason, Some(ExitReason::TakeProfit));
        assert!(record.closed_at.is_some());
    }

    #[test]
    fn test_finish_records_loss() {
        let mut record = TradeRecord::open(Pubkey::new_unique(), 10_000_000, 1_000, "buy".to_string());
        record.finish(850, 8_000_000, "sell".to_string(), ExitReason::StopLoss);
        assert_eq!(record.earn, -2_000_000);
    }

    #[test]
    fn test_direction_wire_names() {
        assert_eq!(TradeDirection::Buy.to_string(), "BUY");
        assert_eq!(TradeDirection::Sell.as_str(), "SELL");
    }
}

// src/trading/strategy.rs
//
// Exit rules for held curve positions. All ratios are whole percentages in
// integer arithmetic, truncated toward zero.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::config::Config;
use crate::models::{ExitReason, OpenPosition};

#[derive(Debug, Clone, Copy)]
pub struct ExitRules {
    pub take_profit_percent: i64,
    pub stop_loss_percent: i64,
    pub timeout: ChronoDuration,
    pub timeout_profit_percent: i64,
}

impl ExitRules {
    pub fn from_config(config: &Config) -> Self {
        Self {
            take_profit_percent: config.take_profit_percent,
            stop_loss_percent: config.stop_loss_percent,
            timeout: ChronoDuration::minutes(config.timeout_minutes),
            timeout_profit_percent: config.timeout_profit_percent,
        }
    }

    /// First rule that fires, checked as take-profit, stop-loss, timeout.
    pub fn evaluate(
        &self,
        position: &OpenPosition,
        current_price: u64,
        now: DateTime<Utc>,
    ) -> Option<ExitReason> {
        let gain = gain_percent(position.entry_price, current_price);

        if let Some(gain) = gain {
            if gain > self.take_profit_percent as i128 {
                return Some(ExitReason::TakeProfit);
            }
        }

        if current_price < position.entry_price {
            if let Some(loss) = loss_percent(position.entry_price, current_price) {
                if loss > self.stop_loss_percent as i128 {
                    return Some(ExitReason::StopLoss);
                }
            }
        }

        // An unknown gain (zero entry price) counts as insufficient
        let held = now.signed_duration_since(position.entry_time);
        let under_target = gain.map_or(true, |g| g < self.timeout_profit_percent as i128);
        if held > self.timeout && under_target {
            return Some(ExitReason::Timeout);
        }

        None
    }
}

/// `(current - entry) * 100 / entry`, or None when the entry price is zero.
pub fn gain_percent(entry_price: u64, current_price: u64) -> Option<i128> {
    if entry_price == 0 {
        return None;
    }
    let entry = entry_price as i128;
    Some((current_price as i128 - entry) * 100 / entry)
}

/// `(entry - current) * 100 / entry`, or None when the entry price is zero.
pub fn loss_percent(entry_price: u64, current_price: u64) -> Option<i128> {
    if entry_price == 0 {
        return None;
    }
    let entry = entry_price as i128;
    Some((entry - current_price as i128) * 100 / entry)
}

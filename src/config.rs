use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use std::env;
use std::str::FromStr;

use crate::error::TraderError;
use crate::trading::curve::LAUNCHPAD_PROGRAM_ID;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Which signature timestamp the freshness filter compares against.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum FreshnessReference {
    /// Newest signature on the curve account.
    Latest,
    /// Oldest signature in the returned page, i.e. roughly the market's age.
    Earliest,
}

impl FromStr for FreshnessReference {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "earliest" => Ok(Self::Earliest),
            other => Err(TraderError::ConfigError(format!(
                "FRESHNESS_REFERENCE must be 'latest' or 'earliest', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub rpc_endpoint: String,
    pub wss_endpoint: String,
    pub commitment: String,
    pub private_key: Option<String>,
    pub trade_api_url: String,
    pub launchpad_program_id: String,

    pub buy_sol: f64,
    pub take_profit_percent: i64,
    pub stop_loss_percent: i64,
    pub timeout_minutes: i64,
    pub timeout_profit_percent: i64,
    pub priority_fee_micro_lamports: u64,
    pub slippage_bps: u32,

    pub simulate: bool,
    pub simulate_balance_sol: f64,

    pub max_staleness_minutes: i64,
    pub freshness_reference: FreshnessReference,

    pub retry_attempts: u32,
    pub retry_interval_ms: u64,

    pub watch_logs: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let simulate = env::var("SIMULATE")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        // A signing key is only needed when trades are actually submitted
        let private_key = env::var("PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty());
        if !simulate && private_key.is_none() {
            return Err(TraderError::ConfigError(
                "PRIVATE_KEY must be set unless SIMULATE=true".to_string(),
            )
            .into());
        }

        let config = Self {
            rpc_endpoint: env::var("RPC_ENDPOINT")
                .context("RPC_ENDPOINT not set in environment")?,
            wss_endpoint: env::var("WSS_ENDPOINT")
                .context("WSS_ENDPOINT not set in environment")?,
            commitment: env::var("COMMITMENT").unwrap_or_else(|_| "confirmed".to_string()),
            private_key,
            trade_api_url: env::var("TRADE_API_URL")
                .context("TRADE_API_URL not set in environment")?,
            launchpad_program_id: env::var("LAUNCHPAD_PROGRAM_ID")
                .unwrap_or_else(|_| LAUNCHPAD_PROGRAM_ID.to_string()),

            buy_sol: env::var("BUY_SOL")
                .unwrap_or_else(|_| "0.01".to_string())
                .parse()
                .context("Failed to parse BUY_SOL")?,
            take_profit_percent: env::var("TAKE_PROFIT")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("Failed to parse TAKE_PROFIT")?,
            stop_loss_percent: env::var("STOP_LOSS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Failed to parse STOP_LOSS")?,
            timeout_minutes: env::var("TIMEOUT_TIME")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Failed to parse TIMEOUT_TIME")?,
            timeout_profit_percent: env::var("TIMEOUT_PROFIT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Failed to parse TIMEOUT_PROFIT")?,
            priority_fee_micro_lamports: env::var("MICRO_LAMPORTS")
                .unwrap_or_else(|_| "50000".to_string()) // Default 50k
                .parse()
                .context("Failed to parse MICRO_LAMPORTS")?,
            slippage_bps: env::var("SLIPPAGE_BPS")
                .unwrap_or_else(|_| "100".to_string()) // Default 1%
                .parse()
                .context("Failed to parse SLIPPAGE_BPS")?,

            simulate,
            simulate_balance_sol: env::var("SIMULATE_BALANCE")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("Failed to parse SIMULATE_BALANCE")?,

            max_staleness_minutes: env::var("LAST_TRANSACTION")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Failed to parse LAST_TRANSACTION")?,
            freshness_reference: env::var("FRESHNESS_REFERENCE")
                .unwrap_or_else(|_| "latest".to_string())
                .parse()?,

            retry_attempts: env::var("RETRY_ATTEMPTS")
                .unwrap_or_else(|_| "11".to_string()) // First try plus 10 retries
                .parse()
                .context("Failed to parse RETRY_ATTEMPTS")?,
            retry_interval_ms: env::var("RETRY_INTERVAL_MS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("Failed to parse RETRY_INTERVAL_MS")?,

            watch_logs: env::var("WATCH_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        };

        if config.buy_sol <= 0.0 {
            return Err(TraderError::ConfigError(format!(
                "BUY_SOL must be positive, got {}",
                config.buy_sol
            ))
            .into());
        }

        Ok(config)
    }

    /// Buy size converted to lamports.
    pub fn buy_lamports(&self) -> u64 {
        sol_to_lamports(self.buy_sol)
    }

    pub fn commitment_config(&self) -> Result<CommitmentConfig, TraderError> {
        CommitmentConfig::from_str(&self.commitment)
            .map_err(|_| TraderError::ConfigError(format!("Invalid COMMITMENT '{}'", self.commitment)))
    }

    /// Starting simulated balance in lamports.
    pub fn simulate_balance_lamports(&self) -> i64 {
        (self.simulate_balance_sol * LAMPORTS_PER_SOL as f64).round() as i64
    }
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

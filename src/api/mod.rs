pub mod launchpad;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::models::TradeDirection;
use crate::trading::curve::PRICE_PROBE_TOKENS;

/// Everything the instruction builder needs to prepare one swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeParams {
    #[serde(with = "pubkey_string")]
    pub mint: Pubkey,
    pub direction: TradeDirection,
    pub token_amount: u64,
    pub collateral_amount: u64,
    pub slippage_bps: u32,
    #[serde(with = "pubkey_string")]
    pub payer: Pubkey,
}

/// Pricing oracle and instruction builder for launchpad curves.
///
/// The curve math lives behind this boundary; callers only see amounts.
#[async_trait]
pub trait CurveOracle: Send + Sync {
    /// Collateral (lamports) exchanged for `token_amount` raw tokens.
    async fn quote(&self, mint: &Pubkey, token_amount: u64, direction: TradeDirection) -> Result<u64>;

    /// Raw tokens exchanged for `collateral` lamports.
    async fn amount_for(&self, mint: &Pubkey, collateral: u64, direction: TradeDirection) -> Result<u64>;

    /// Swap instructions for the given trade, without compute budget instructions.
    async fn instructions_for(&self, params: &TradeParams) -> Result<Vec<Instruction>>;

    /// Current curve price: collateral for a buy of `PRICE_PROBE_TOKENS`.
    async fn price(&self, mint: &Pubkey) -> Result<u64> {
        self.quote(mint, PRICE_PROBE_TOKENS, TradeDirection::Buy).await
    }
}

mod pubkey_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(serde::de::Error::custom)
    }
}

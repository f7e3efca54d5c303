// src/trading/executor.rs
//
// Builds, signs and submits curve swaps. Submission success is the success
// condition; confirmation is not awaited.

use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction, pubkey::Pubkey, signature::Signature,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{CurveOracle, TradeParams};
use crate::error::TraderError;
use crate::models::TradeDirection;
use crate::solana::wallet::WalletManager;
use crate::solana::LedgerRpc;

/// One attempt at a buy or sell.
///
/// For a buy `amount` is collateral in lamports; for a sell it is raw tokens.
#[async_trait]
pub trait TradeExecution: Send + Sync {
    async fn execute(&self, mint: &Pubkey, direction: TradeDirection, amount: u64) -> Result<Signature>;
}

pub struct TradeExecutor {
    oracle: Arc<dyn CurveOracle>,
    rpc: Arc<dyn LedgerRpc>,
    wallet: Arc<WalletManager>,
    priority_fee_micro_lamports: u64,
    slippage_bps: u32,
}

impl TradeExecutor {
    pub fn new(
        oracle: Arc<dyn CurveOracle>,
        rpc: Arc<dyn LedgerRpc>,
        wallet: Arc<WalletManager>,
        priority_fee_micro_lamports: u64,
        slippage_bps: u32,
    ) -> Self {
        Self {
            oracle,
            rpc,
            wallet,
            priority_fee_micro_lamports,
            slippage_bps,
        }
    }
}

#[async_trait]
impl TradeExecution for TradeExecutor {
    async fn execute(&self, mint: &Pubkey, direction: TradeDirection, amount: u64) -> Result<Signature> {
        let (token_amount, collateral_amount) = match direction {
            TradeDirection::Buy => (self.oracle.amount_for(mint, amount, direction).await?, amount),
            TradeDirection::Sell => (amount, self.oracle.quote(mint, amount, direction).await?),
        };
        debug!(
            "{} {}: {} tokens <-> {} lamports",
            direction, mint, token_amount, collateral_amount
        );

        let params = TradeParams {
            mint: *mint,
            direction,
            token_amount,
            collateral_amount,
            slippage_bps: self.slippage_bps,
            payer: self.wallet.get_public_key(),
        };
        let swap_instructions = self.oracle.instructions_for(&params).await?;

        let mut instructions = Vec::with_capacity(swap_instructions.len() + 1);
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(
            self.priority_fee_micro_lamports,
        ));
        instructions.extend(swap_instructions);

        let blockhash = self.rpc.latest_blockhash().await?;
        let transaction = self.wallet.sign_instructions(&instructions, blockhash)?;

        let signature = self.rpc.submit(&transaction).await.map_err(|e| {
            TraderError::SubmissionError(format!("{} {} not submitted: {:#}", direction, mint, e))
        })?;
        info!("Transaction {} submitted for {}: {}", direction, mint, signature);
        Ok(signature)
    }
}

/// Stands in for [`TradeExecutor`] when trading is simulated; nothing is built or sent.
#[derive(Debug, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl TradeExecution for DryRunExecutor {
    async fn execute(&self, mint: &Pubkey, direction: TradeDirection, amount: u64) -> Result<Signature> {
        info!("🔍 [SIMULATE] Skipping {} submission for {} (amount {})", direction, mint, amount);
        Ok(Signature::default())
    }
}

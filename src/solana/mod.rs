pub mod client;
pub mod wallet;

use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction};

/// One entry from a signatures-for-address lookup.
#[derive(Debug, Clone)]
pub struct SignatureInfo {
    pub signature: String,
    /// Unix seconds, when the node knows it
    pub block_time: Option<i64>,
}

/// The RPC operations the bot needs from the ledger service.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Send without waiting for confirmation.
    async fn submit(&self, transaction: &VersionedTransaction) -> Result<Signature>;

    /// Signatures touching `account`, newest first.
    async fn recent_signatures_for(&self, account: &Pubkey) -> Result<Vec<SignatureInfo>>;
}

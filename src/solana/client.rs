use anyhow::Result;
use async_trait::async_trait;
use solana_client::{rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::TraderError;
use crate::solana::{LedgerRpc, SignatureInfo};

// Use Arc for shared ownership if the client needs to be shared across threads
#[derive(Clone)]
pub struct SolanaClient {
    rpc_client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaClient {
    pub fn new(rpc_url: &str, commitment: CommitmentConfig) -> Result<Self> {
        let rpc_client = RpcClient::new_with_commitment(rpc_url.to_string(), commitment);
        match rpc_client.get_latest_blockhash() {
            Ok(_) => info!("Successfully connected to Solana RPC: {}", rpc_url),
            Err(e) => {
                error!("Failed to connect to Solana RPC {}: {}", rpc_url, e);
                return Err(TraderError::QueryError(format!(
                    "Failed to connect to RPC {}: {}",
                    rpc_url, e
                ))
                .into());
            }
        }

        Ok(Self {
            rpc_client: Arc::new(rpc_client),
            commitment,
        })
    }

    // Helper to run blocking RPC calls in a tokio task
    async fn run_blocking<F, T>(&self, f: F) -> Result<T, TraderError>
    where
        F: FnOnce(Arc<RpcClient>) -> solana_client::client_error::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let client = self.rpc_client.clone();
        tokio::task::spawn_blocking(move || f(client))
            .await
            .map_err(|e| TraderError::QueryError(format!("RPC task failed: {}", e)))?
            .map_err(|e| {
                error!("Solana RPC client error: {:?}", e);
                TraderError::QueryError(format!("RPC Client Error: {}", e))
            })
    }
}

#[async_trait]
impl LedgerRpc for SolanaClient {
    async fn latest_blockhash(&self) -> Result<Hash> {
        let blockhash = self
            .run_blocking(|client| client.get_latest_blockhash())
            .await?;
        Ok(blockhash)
    }

    async fn submit(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment.commitment),
            encoding: Some(solana_transaction_status::UiTransactionEncoding::Base64),
            max_retries: Some(0), // Resubmission is driven by the retry executor
            min_context_slot: None,
        };
        let transaction = transaction.clone();
        let signature = self
            .run_blocking(move |client| client.send_transaction_with_config(&transaction, config))
            .await
            .map_err(|e| TraderError::SubmissionError(format!("Send failed: {}", e)))?;

        debug!("Transaction sent with signature: {}", signature);
        Ok(signature)
    }

    async fn recent_signatures_for(&self, account: &Pubkey) -> Result<Vec<SignatureInfo>> {
        let account = *account;
        let statuses = self
            .run_blocking(move |client| client.get_signatures_for_address(&account))
            .await?;

        Ok(statuses
            .into_iter()
            .map(|s| SignatureInfo {
                signature: s.signature,
                block_time: s.block_time,
            })
            .collect())
    }
}

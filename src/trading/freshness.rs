// src/trading/freshness.rs
//
// Decides whether a newly seen curve is still live by looking at the age of
// its on-chain activity.

use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::debug;

use crate::config::FreshnessReference;
use crate::solana::LedgerRpc;

#[derive(Clone)]
pub struct FreshnessFilter {
    rpc: Arc<dyn LedgerRpc>,
    max_staleness_secs: i64,
    reference: FreshnessReference,
}

impl FreshnessFilter {
    pub fn new(rpc: Arc<dyn LedgerRpc>, max_staleness_minutes: i64, reference: FreshnessReference) -> Self {
        Self {
            rpc,
            max_staleness_secs: max_staleness_minutes.saturating_mul(60),
            reference,
        }
    }

    /// True when the account's reference activity is younger than the window.
    ///
    /// Any lookup failure, an empty history or a missing block time counts as
    /// fresh: a curve with no history yet is a new market.
    pub async fn is_fresh(&self, account: &Pubkey) -> bool {
        let signatures = match self.rpc.recent_signatures_for(account).await {
            Ok(signatures) => signatures,
            Err(e) => {
                debug!("Signature lookup for {} failed, assuming fresh: {:?}", account, e);
                return true;
            }
        };

        let reference = match self.reference {
            FreshnessReference::Latest => signatures.first(),
            FreshnessReference::Earliest => signatures.last(),
        };
        let Some((signature, block_time)) = reference.and_then(|s| Some((&s.signature, s.block_time?))) else {
            debug!("No dated activity for {}, assuming fresh", account);
            return true;
        };

        let age_secs = Utc::now().timestamp() - block_time;
        debug!(
            "Account {} activity {} was {}s ago (window {}s)",
            account, signature, age_secs, self.max_staleness_secs
        );
        age_secs < self.max_staleness_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solana::SignatureInfo;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use solana_sdk::{hash::Hash, signature::Signature, transaction::VersionedTransaction};

    struct StubRpc {
        signatures: Option<Vec<SignatureInfo>>,
    }

    #[async_trait]
    impl LedgerRpc for StubRpc {
        async fn latest_blockhash(&self) -> Result<Hash> {
            Ok(Hash::default())
        }

        async fn submit(&self, _transaction: &VersionedTransaction) -> Result<Signature> {
            Ok(Signature::default())
        }

        async fn recent_signatures_for(&self, _account: &Pubkey) -> Result<Vec<SignatureInfo>> {
            self.signatures.clone().ok_or_else(|| anyhow!("account has no history"))
        }
    }

    fn sig(age_secs: i64) -> SignatureInfo {
        SignatureInfo {
            signature: "sig".to_string(),
            block_time: Some(Utc::now().timestamp() - age_secs),
        }
    }

    fn filter(signatures: Option<Vec<SignatureInfo>>, reference: FreshnessReference) -> FreshnessFilter {
        FreshnessFilter::new(Arc::new(StubRpc { signatures }), 5, reference)
    }

    #[tokio::test]
    async fn test_query_failure_falls_back_to_fresh() {
        let filter = filter(None, FreshnessReference::Latest);
        assert!(filter.is_fresh(&Pubkey::new_unique()).await);
    }

    #[tokio::test]
    async fn test_empty_history_is_fresh() {
        let filter = filter(Some(vec![]), FreshnessReference::Latest);
        assert!(filter.is_fresh(&Pubkey::new_unique()).await);
    }

    #[tokio::test]
    async fn test_missing_block_time_is_fresh() {
        let undated = SignatureInfo {
            signature: "sig".to_string(),
            block_time: None,
        };
        let filter = filter(Some(vec![undated]), FreshnessReference::Latest);
        assert!(filter.is_fresh(&Pubkey::new_unique()).await);
    }

    #[tokio::test]
    async fn test_recent_activity_is_fresh() {
        let filter = filter(Some(vec![sig(30)]), FreshnessReference::Latest);
        assert!(filter.is_fresh(&Pubkey::new_unique()).await);
    }

    #[tokio::test]
    async fn test_old_activity_is_stale() {
        let filter = filter(Some(vec![sig(6 * 60)]), FreshnessReference::Latest);
        assert!(!filter.is_fresh(&Pubkey::new_unique()).await);
    }

    #[tokio::test]
    async fn test_reference_selects_signature() {
        // newest first
        let history = vec![sig(10), sig(3_600)];
        let latest = filter(Some(history.clone()), FreshnessReference::Latest);
        let earliest = filter(Some(history), FreshnessReference::Earliest);

        assert!(latest.is_fresh(&Pubkey::new_unique()).await);
        assert!(!earliest.is_fresh(&Pubkey::new_unique()).await);
    }
}

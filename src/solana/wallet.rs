use anyhow::Result;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::TraderError;

#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    pub fn new(private_key_bs58: &str) -> Result<Self> {
        // Decode base58 private key
        let bytes = bs58::decode(private_key_bs58.trim())
            .into_vec()
            .map_err(|e| {
                error!("Failed to decode base58 private key: {}", e);
                TraderError::WalletError(format!("Invalid private key format: {}", e))
            })?;

        let keypair = Keypair::from_bytes(&bytes).map_err(|e| {
            error!("Failed to create keypair from bytes: {}", e);
            TraderError::WalletError(format!("Invalid private key data: {}", e))
        })?;

        info!("WalletManager initialized. Pubkey: {}", keypair.pubkey());

        Ok(Self {
            keypair: Arc::new(keypair),
        })
    }

    pub fn get_public_key(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Compile `instructions` into a v0 message paid by this wallet and sign it.
    pub fn sign_instructions(
        &self,
        instructions: &[Instruction],
        recent_blockhash: Hash,
    ) -> Result<VersionedTransaction, TraderError> {
        let message = v0::Message::try_compile(&self.get_public_key(), instructions, &[], recent_blockhash)
            .map_err(|e| TraderError::SubmissionError(format!("Failed to compile message: {}", e)))?;

        VersionedTransaction::try_new(VersionedMessage::V0(message), &[self.keypair.as_ref()])
            .map_err(|e| {
                error!("Failed to sign versioned transaction: {}", e);
                TraderError::WalletError(format!("Signing failed: {}", e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::AccountMeta;

    #[test]
    fn test_wallet_from_base58() {
        let keypair = Keypair::new();
        let wallet = WalletManager::new(&keypair.to_base58_string()).unwrap();
        assert_eq!(wallet.get_public_key(), keypair.pubkey());
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(WalletManager::new("0OIl").is_err());
        assert!(WalletManager::new("3xyz").is_err());
    }

    #[test]
    fn test_sign_instructions() {
        let keypair = Keypair::new();
        let wallet = WalletManager::new(&keypair.to_base58_string()).unwrap();
        let program = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            program,
            &[1, 2, 3],
            vec![AccountMeta::new(wallet.get_public_key(), true)],
        );

        let blockhash = Hash::new_unique();
        let tx = wallet.sign_instructions(&[ix], blockhash).unwrap();

        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(*tx.message.recent_blockhash(), blockhash);
        assert_eq!(tx.message.static_account_keys()[0], wallet.get_public_key());
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
    }
}

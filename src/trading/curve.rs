// src/trading/curve.rs
//
// Launchpad bonding-curve account layout and decoding.
// Only the leading fields the bot needs are decoded; the on-chain account
// carries more (decimals, currency, curve type, thresholds, fees, bump) which
// are skipped.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::error::TraderError;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Moonshot token launchpad program ID
pub const LAUNCHPAD_PROGRAM_ID: &str = "MoonCVVNZFSYkqNXP6bxHLPL6QQJiMagDL3qcqUQTrG";

/// Curve account fields start after the 8-byte Anchor account discriminator
pub const CURVE_ACCOUNT_OFFSET: usize = 8;

/// Token amount (raw units) used to probe the curve price
pub const PRICE_PROBE_TOKENS: u64 = 1_000_000_000;

// ============================================================================
// CURVE RECORD
// ============================================================================

/// Snapshot of a launchpad curve account, decoded from one notification.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveRecord {
    /// Total token supply of the curve
    pub total_supply: u64,
    /// Tokens still held by the curve
    pub curve_amount: u64,
    /// The SPL token mint traded on this curve
    pub mint: [u8; 32],
}

impl CurveRecord {
    /// Bytes consumed from the offset: u64 + u64 + 32-byte key
    pub const LEN: usize = 8 + 8 + 32;

    /// Decode the record starting at `offset`.
    ///
    /// Anything after the decoded fields is ignored, so newer account layouts
    /// that append fields keep decoding.
    pub fn decode(data: &[u8], offset: usize) -> Result<Self, TraderError> {
        let required = offset.saturating_add(Self::LEN);
        if data.len() < required {
            return Err(TraderError::DecodeError(format!(
                "curve account too short: {} bytes, need at least {}",
                data.len(),
                required
            )));
        }

        let mut slice = &data[offset..];
        CurveRecord::deserialize(&mut slice)
            .map_err(|e| TraderError::DecodeError(format!("curve account decode failed: {}", e)))
    }

    pub fn mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.mint)
    }
}

/// Get the launchpad program ID as a Pubkey.
pub fn parse_program_id(program_id: &str) -> Result<Pubkey, TraderError> {
    Pubkey::from_str(program_id).map_err(|e| {
        TraderError::ConfigError(format!("Invalid launchpad program id {}: {}", program_id, e))
    })
}

// ============================================================================
// TESTS
// ============================================================================

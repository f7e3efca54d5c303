use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use std::{str::FromStr, time::Duration};
use tracing::{debug, error};

use crate::api::{CurveOracle, TradeParams};
use crate::error::TraderError;
use crate::models::TradeDirection;

/// HTTP client for the launchpad trade builder.
///
/// The builder owns the curve math: it quotes collateral/token amounts and
/// returns the program instructions for a swap.
#[derive(Debug, Clone)]
pub struct LaunchpadClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AmountResponse {
    /// Raw amount as a decimal string
    pub amount: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetaResponse {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionResponse {
    pub program_id: String,
    pub accounts: Vec<AccountMetaResponse>,
    /// Base64 instruction data
    pub data: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InstructionsResponse {
    pub instructions: Vec<InstructionResponse>,
}

impl InstructionResponse {
    fn into_instruction(self) -> Result<Instruction> {
        let program_id = Pubkey::from_str(&self.program_id)
            .with_context(|| format!("Invalid program id {}", self.program_id))?;
        let accounts = self
            .accounts
            .into_iter()
            .map(|meta| {
                let pubkey = Pubkey::from_str(&meta.pubkey)
                    .with_context(|| format!("Invalid account key {}", meta.pubkey))?;
                Ok(AccountMeta {
                    pubkey,
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let data = STANDARD
            .decode(&self.data)
            .context("Failed to decode instruction data")?;

        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl LaunchpadClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_amount(&self, path: &str, params: &[(&str, String)]) -> Result<u64> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Requesting {} from launchpad builder: {:?}", path, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| TraderError::QueryError(format!("Launchpad {} request failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("Launchpad {} API error: Status {}, Body: {}", path, status, error_text);
            return Err(TraderError::QueryError(format!(
                "Launchpad {} API failed with status {}: {}",
                path, status, error_text
            ))
            .into());
        }

        let body: AmountResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse launchpad {} response", path))?;
        let amount = body
            .amount
            .parse::<u64>()
            .with_context(|| format!("Invalid amount in launchpad {} response: {}", path, body.amount))?;
        Ok(amount)
    }
}

#[async_trait]
impl CurveOracle for LaunchpadClient {
    async fn quote(&self, mint: &Pubkey, token_amount: u64, direction: TradeDirection) -> Result<u64> {
        self.get_amount(
            "collateral",
            &[
                ("mint", mint.to_string()),
                ("tokenAmount", token_amount.to_string()),
                ("direction", direction.to_string()),
            ],
        )
        .await
    }

    async fn amount_for(&self, mint: &Pubkey, collateral: u64, direction: TradeDirection) -> Result<u64> {
        self.get_amount(
            "tokens",
            &[
                ("mint", mint.to_string()),
                ("collateralAmount", collateral.to_string()),
                ("direction", direction.to_string()),
            ],
        )
        .await
    }

    async fn instructions_for(&self, params: &TradeParams) -> Result<Vec<Instruction>> {
        let url = format!("{}/instructions", self.base_url);
        debug!("Requesting instructions from launchpad builder: {:?}", params);

        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| TraderError::QueryError(format!("Launchpad instructions request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("Launchpad instructions API error: Status {}, Body: {}", status, error_text);
            return Err(TraderError::QueryError(format!(
                "Launchpad instructions API failed with status {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: InstructionsResponse = response
            .json()
            .await
            .context("Failed to parse launchpad instructions response")?;
        if body.instructions.is_empty() {
            return Err(TraderError::QueryError("Launchpad builder returned no instructions".to_string()).into());
        }

        body.instructions
            .into_iter()
            .map(InstructionResponse::into_instruction)
            .collect()
    }
}

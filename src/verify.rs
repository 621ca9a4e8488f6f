//! Source verification against an external explorer service

use std::time::Duration;

use async_trait::async_trait;
use ethers::{types::Address, utils::to_checksum};
use serde::Deserialize;

use crate::constants::IMPL_NAME_SUFFIX;

/// Timeout applied to explorer API requests
const EXPLORER_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The phrase explorers embed in responses for re-submitted contracts.
/// Matching it (case-insensitively) turns a re-verification into a success,
/// which keeps repeated runs of the same deployment idempotent.
const ALREADY_VERIFIED_PHRASE: &str = "already verified";

/// The outcome of a verification attempt.
///
/// `AlreadyVerified` is a success, never an error: verification is
/// re-attempted across repeated runs of the same deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The explorer accepted the verification request
    Verified,
    /// The contract's source was verified by a previous run
    AlreadyVerified,
    /// Verification failed for the contained reason
    Failed(String),
}

impl VerificationOutcome {
    /// Whether the outcome counts as a success
    pub fn is_success(&self) -> bool {
        !matches!(self, VerificationOutcome::Failed(_))
    }
}

/// Submits deployed contracts to an external explorer for source
/// verification
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Verify the contract deployed at `address` under `name`, with the
    /// ABI-encoded constructor arguments it was deployed with (hex, no 0x
    /// prefix). The argument encoding must exactly match the on-chain
    /// deployment constructor order.
    async fn verify(
        &self,
        name: &str,
        address: Address,
        constructor_args_hex: &str,
    ) -> VerificationOutcome;
}

/// The name under which the implementation behind a proxy is verified.
/// Explorers must verify the logic contract, not the proxy shell.
pub fn impl_contract_name(name: &str) -> String {
    format!("{}{}", name, IMPL_NAME_SUFFIX)
}

/// The response envelope returned by Etherscan-style explorer APIs
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    /// "1" on success, "0" on failure
    status: String,
    /// Human-readable status message
    message: String,
    /// Request GUID on success, failure reason otherwise
    result: String,
}

/// Verifier backed by an Etherscan-style explorer HTTP API
pub struct ExplorerVerifier {
    /// Base URL of the explorer API
    api_url: String,
    /// API key authorizing verification requests
    api_key: String,
    /// The HTTP client requests are issued through
    client: reqwest::Client,
}

impl ExplorerVerifier {
    /// Construct a verifier for the given explorer endpoint
    pub fn new(api_url: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(EXPLORER_REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_url,
            api_key,
            client,
        }
    }
}

#[async_trait]
impl VerificationService for ExplorerVerifier {
    async fn verify(
        &self,
        name: &str,
        address: Address,
        constructor_args_hex: &str,
    ) -> VerificationOutcome {
        let address = to_checksum(&address, None /* chain id */);
        let params = [
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("contractname", name),
            // Etherscan's API spells the field this way
            ("constructorArguements", constructor_args_hex),
            ("apikey", self.api_key.as_str()),
        ];

        let response = match self.client.post(&self.api_url).form(&params).send().await {
            Ok(resp) => resp,
            Err(e) => return VerificationOutcome::Failed(e.to_string()),
        };
        if !response.status().is_success() {
            return VerificationOutcome::Failed(format!(
                "explorer API request failed: {}",
                response.status()
            ));
        }

        match response.json::<ExplorerResponse>().await {
            Ok(envelope) => classify_response(&envelope),
            Err(e) => VerificationOutcome::Failed(e.to_string()),
        }
    }
}

/// Classify an explorer response into a verification outcome
fn classify_response(envelope: &ExplorerResponse) -> VerificationOutcome {
    if envelope.status == "1" {
        return VerificationOutcome::Verified;
    }

    let reason = if envelope.result.is_empty() {
        &envelope.message
    } else {
        &envelope.result
    };
    if reason.to_lowercase().contains(ALREADY_VERIFIED_PHRASE) {
        VerificationOutcome::AlreadyVerified
    } else {
        VerificationOutcome::Failed(reason.clone())
    }
}

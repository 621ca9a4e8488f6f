//! Validated inputs to the deployment flows.
//!
//! All validation of operator-supplied values happens here, before a plan
//! is built. The orchestrator itself passes plans through untouched, so a
//! config that constructs successfully is the last gate before funds are
//! spent on gas.

use std::env;

use ethers::types::{Address, U256};

use crate::{
    constants::{DEFAULT_DEPLOYMENT_VERSION, DEPLOYMENT_VERSION_ENV_VAR, PERCENT_BASIS_POINTS},
    errors::ScriptError,
};

/// The token distribution parameters for a full token-suite deployment
#[derive(Debug, Clone)]
pub struct DistributionConfig {
    /// The amount minted in the one-time initial mint
    pub initial_mint: U256,
    /// The wallet receiving the initial mint
    pub mint_receiver: Address,
    /// The wallets receiving the initial distribution
    pub wallets: Vec<Address>,
    /// The per-wallet distribution percents, in basis points
    pub percents: Vec<U256>,
    /// The EOA allowed to trigger emissions
    pub emission_manager: Address,
    /// The multisig receiving ownership of the proxy admin
    pub multisig: Address,
}

impl DistributionConfig {
    /// Validate and construct a distribution config.
    ///
    /// Percents must be paired one-to-one with wallets and sum to exactly
    /// the full basis-point denomination.
    pub fn new(
        initial_mint: U256,
        mint_receiver: Address,
        wallets: Vec<Address>,
        percents: Vec<U256>,
        emission_manager: Address,
        multisig: Address,
    ) -> Result<Self, ScriptError> {
        if initial_mint.is_zero() {
            return Err(ScriptError::Configuration(
                "initial mint amount must be nonzero".to_string(),
            ));
        }
        if wallets.is_empty() {
            return Err(ScriptError::Configuration(
                "at least one distribution wallet is required".to_string(),
            ));
        }
        if wallets.len() != percents.len() {
            return Err(ScriptError::Configuration(format!(
                "{} wallets but {} percents",
                wallets.len(),
                percents.len()
            )));
        }
        require_nonzero_address(mint_receiver, "mint receiver")?;
        require_nonzero_addresses(&wallets, "distribution wallet")?;
        require_nonzero_address(emission_manager, "emission manager")?;
        require_nonzero_address(multisig, "multisig")?;

        let sum: U256 = percents
            .iter()
            .fold(U256::zero(), |acc, percent| acc.saturating_add(*percent));
        if sum != U256::from(PERCENT_BASIS_POINTS) {
            return Err(ScriptError::Configuration(format!(
                "distribution percents sum to {}, expected {}",
                sum, PERCENT_BASIS_POINTS
            )));
        }

        Ok(Self {
            initial_mint,
            mint_receiver,
            wallets,
            percents,
            emission_manager,
            multisig,
        })
    }
}

/// The inputs to a season-rewards deployment
#[derive(Debug, Clone)]
pub struct RewardsConfig {
    /// The address of the already-deployed token
    pub token: Address,
    /// The treasury wallet funding the rewards
    pub treasury: Address,
}

impl RewardsConfig {
    /// Validate and construct a rewards config
    pub fn new(token: Address, treasury: Address) -> Result<Self, ScriptError> {
        require_nonzero_address(token, "token")?;
        require_nonzero_address(treasury, "treasury")?;
        Ok(Self { token, treasury })
    }
}

/// The inputs to a token-lock deployment
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// The address of the already-deployed token
    pub token: Address,
}

impl LockConfig {
    /// Validate and construct a lock config
    pub fn new(token: Address) -> Result<Self, ScriptError> {
        require_nonzero_address(token, "token")?;
        Ok(Self { token })
    }
}

/// The inputs to an in-place proxy upgrade
#[derive(Debug, Clone)]
pub struct UpgradeConfig {
    /// The address of the proxy to upgrade
    pub proxy: Address,
}

impl UpgradeConfig {
    /// Validate and construct an upgrade config
    pub fn new(proxy: Address) -> Result<Self, ScriptError> {
        require_nonzero_address(proxy, "proxy")?;
        Ok(Self { proxy })
    }
}

/// The version tag written into generated records, overridable via the
/// environment
pub fn deployment_version() -> String {
    env::var(DEPLOYMENT_VERSION_ENV_VAR)
        .unwrap_or_else(|_| DEFAULT_DEPLOYMENT_VERSION.to_string())
}

/// Reject the zero address for a named parameter
fn require_nonzero_address(address: Address, what: &str) -> Result<(), ScriptError> {
    if address.is_zero() {
        return Err(ScriptError::Configuration(format!(
            "{} address must not be the zero address",
            what
        )));
    }
    Ok(())
}

/// Reject the zero address anywhere in a named list
fn require_nonzero_addresses(addresses: &[Address], what: &str) -> Result<(), ScriptError> {
    for address in addresses {
        require_nonzero_address(*address, what)?;
    }
    Ok(())
}

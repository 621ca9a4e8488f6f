//! Plan builders for the deploy-script subcommands.
//!
//! Each subcommand is one parameterized deployment plan. The builders are
//! pure: they turn a validated config into steps and never touch the chain,
//! so the full shape of every flow is checkable without a node.

use ethers::types::Address;

use crate::{
    config::{DistributionConfig, LockConfig, RewardsConfig, UpgradeConfig},
    constants::{
        EMISSION_CONTRACT_NAME, INITIAL_MINT_METHOD, LOCK_CONTRACT_NAME, MINTER_CONTRACT_NAME,
        PERMISSIONS_CONTRACT_NAME, PROXY_ADMIN_CONTRACT_NAME, SEASON_REWARDS_CONTRACT_NAME,
        SET_EMISSION_MANAGER_METHOD, SET_MINTER_METHOD, SET_WALLETS_AND_PERCENTS_METHOD,
        TOKEN_CONTRACT_NAME, TRANSFER_OWNERSHIP_METHOD,
    },
    errors::ScriptError,
    plan::{admin_ref, ArgValue, DeploymentPlan, Step, VerifyTarget},
};

/// Reference the address produced by the step deploying `contract`
fn produced(contract: &str) -> ArgValue {
    ArgValue::StepRef(contract.to_string())
}

/// The full token-suite deployment: token, upgradeable emission behind a
/// transparent proxy, minter, cross-wiring, and the ownership handoff to
/// the multisig
pub fn token_suite_plan(config: &DistributionConfig) -> Result<DeploymentPlan, ScriptError> {
    DeploymentPlan::new(vec![
        Step::deploy(TOKEN_CONTRACT_NAME, TOKEN_CONTRACT_NAME, vec![])
            .with_record()
            .with_verification(VerifyTarget::Contract),
        Step::call(
            "InitialMint",
            produced(TOKEN_CONTRACT_NAME),
            TOKEN_CONTRACT_NAME,
            INITIAL_MINT_METHOD,
            vec![
                ArgValue::Address(config.mint_receiver),
                ArgValue::Uint(config.initial_mint),
                ArgValue::AddressList(config.wallets.clone()),
                ArgValue::UintList(config.percents.clone()),
            ],
        ),
        Step::proxy_deploy(
            EMISSION_CONTRACT_NAME,
            EMISSION_CONTRACT_NAME,
            vec![produced(TOKEN_CONTRACT_NAME)],
        )
        .with_record()
        .with_verification(VerifyTarget::Proxy),
        Step::call(
            "SetWalletsAndPercents",
            produced(EMISSION_CONTRACT_NAME),
            EMISSION_CONTRACT_NAME,
            SET_WALLETS_AND_PERCENTS_METHOD,
            vec![
                ArgValue::AddressList(config.wallets.clone()),
                ArgValue::UintList(config.percents.clone()),
            ],
        ),
        Step::call(
            "SetEmissionManager",
            produced(EMISSION_CONTRACT_NAME),
            EMISSION_CONTRACT_NAME,
            SET_EMISSION_MANAGER_METHOD,
            vec![ArgValue::Address(config.emission_manager)],
        ),
        Step::deploy(
            MINTER_CONTRACT_NAME,
            MINTER_CONTRACT_NAME,
            vec![
                produced(TOKEN_CONTRACT_NAME),
                produced(EMISSION_CONTRACT_NAME),
            ],
        )
        .with_record()
        .with_verification(VerifyTarget::Contract),
        Step::call(
            "TokenSetMinter",
            produced(TOKEN_CONTRACT_NAME),
            TOKEN_CONTRACT_NAME,
            SET_MINTER_METHOD,
            vec![produced(MINTER_CONTRACT_NAME)],
        ),
        Step::call(
            "EmissionSetMinter",
            produced(EMISSION_CONTRACT_NAME),
            EMISSION_CONTRACT_NAME,
            SET_MINTER_METHOD,
            vec![produced(MINTER_CONTRACT_NAME)],
        ),
        // The proxy admin was created by the proxy's own constructor; hand
        // it to the multisig so future upgrades require its signature
        Step::call(
            "TransferProxyAdminOwnership",
            ArgValue::StepRef(admin_ref(EMISSION_CONTRACT_NAME)),
            PROXY_ADMIN_CONTRACT_NAME,
            TRANSFER_OWNERSHIP_METHOD,
            vec![ArgValue::Address(config.multisig)],
        ),
    ])
}

/// The season-rewards deployment: permissions manager plus the rewards
/// contract wired to the existing token and treasury.
///
/// The access-pass and staking-pool constructor slots are filled with the
/// zero address; those integrations are wired through setters later.
pub fn rewards_plan(config: &RewardsConfig) -> Result<DeploymentPlan, ScriptError> {
    DeploymentPlan::new(vec![
        Step::deploy(
            PERMISSIONS_CONTRACT_NAME,
            PERMISSIONS_CONTRACT_NAME,
            vec![],
        )
        .with_record()
        .with_verification(VerifyTarget::Contract),
        Step::deploy(
            SEASON_REWARDS_CONTRACT_NAME,
            SEASON_REWARDS_CONTRACT_NAME,
            vec![
                produced(PERMISSIONS_CONTRACT_NAME),
                ArgValue::Address(config.token),
                ArgValue::Address(config.treasury),
                ArgValue::Address(Address::zero()),
                ArgValue::Address(Address::zero()),
            ],
        )
        .with_record()
        .with_verification(VerifyTarget::Contract),
    ])
}

/// The token-lock deployment: the lock is upgradeable, so it goes behind a
/// transparent proxy with the token wired through the initializer
pub fn lock_plan(config: &LockConfig) -> Result<DeploymentPlan, ScriptError> {
    DeploymentPlan::new(vec![Step::proxy_deploy(
        LOCK_CONTRACT_NAME,
        LOCK_CONTRACT_NAME,
        vec![ArgValue::Address(config.token)],
    )
    .with_record()
    .with_verification(VerifyTarget::Proxy)])
}

/// The in-place lock upgrade: reconcile the manifest with the on-chain
/// proxy, then swap in a freshly deployed implementation
pub fn upgrade_lock_plan(config: &UpgradeConfig) -> Result<DeploymentPlan, ScriptError> {
    DeploymentPlan::new(vec![Step::proxy_upgrade(
        "UpgradeTokenLock",
        ArgValue::Address(config.proxy),
        LOCK_CONTRACT_NAME,
    )
    .with_record()
    .with_verification(VerifyTarget::Proxy)])
}

//! Definitions of CLI arguments and commands for deploy scripts

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use ethers::types::{Address, U256};

use crate::{
    artifacts::{AbiResolver, ArtifactStore},
    chain::{NetworkFeeOracle, RpcSubmitter, ScriptClient},
    commands::{lock_plan, rewards_plan, token_suite_plan, upgrade_lock_plan},
    config::{
        deployment_version, DistributionConfig, LockConfig, RewardsConfig, UpgradeConfig,
    },
    constants::{DEFAULT_ARTIFACTS_DIR, DEFAULT_GENERATED_DIR, DEFAULT_MANIFEST_PATH},
    errors::ScriptError,
    orchestrator::Orchestrator,
    verify::ExplorerVerifier,
};

/// The top-level CLI arguments shared by every subcommand
#[derive(Parser)]
pub struct Cli {
    /// Private key of the deployer
    // TODO: Better key management
    #[arg(short, long, env = "PRIV_KEY")]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL")]
    pub rpc_url: String,

    /// Directory containing compiled contract artifacts
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: String,

    /// Directory generated address/ABI records are written to
    #[arg(long, default_value = DEFAULT_GENERATED_DIR)]
    pub generated_dir: String,

    /// Path of the proxy upgrade manifest
    #[arg(long, default_value = DEFAULT_MANIFEST_PATH)]
    pub manifest_path: String,

    /// Block explorer verification API URL
    #[arg(long, env = "EXPLORER_API_URL")]
    pub explorer_api_url: String,

    /// Block explorer API key
    #[arg(long, env = "EXPLORER_API_KEY")]
    pub explorer_api_key: String,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// The deployment flows exposed as subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy and wire the full token suite
    DeployTokenSuite(DeployTokenSuiteArgs),
    /// Deploy the season rewards contracts
    DeployRewards(DeployRewardsArgs),
    /// Deploy the upgradeable token lock
    DeployLock(DeployLockArgs),
    /// Upgrade the token lock implementation
    UpgradeLock(UpgradeLockArgs),
}

impl Command {
    /// Build the chain collaborators and execute the selected flow's plan
    pub async fn run(
        self,
        client: Arc<ScriptClient>,
        artifacts_dir: &str,
        generated_dir: &str,
        manifest_path: &str,
        explorer_api_url: String,
        explorer_api_key: String,
    ) -> Result<(), ScriptError> {
        let fees = NetworkFeeOracle::new(client.clone());
        let submitter = RpcSubmitter::new(client);
        let verifier = ExplorerVerifier::new(explorer_api_url, explorer_api_key);
        let resolver = AbiResolver::new(artifacts_dir);
        let store = ArtifactStore::new(resolver.clone(), generated_dir, deployment_version());
        let mut orchestrator = Orchestrator::new(
            &fees,
            &submitter,
            &verifier,
            &resolver,
            &store,
            manifest_path,
        );

        let plan = match &self {
            Command::DeployTokenSuite(args) => token_suite_plan(&args.to_config()?),
            Command::DeployRewards(args) => rewards_plan(&args.to_config()?),
            Command::DeployLock(args) => lock_plan(&args.to_config()?),
            Command::UpgradeLock(args) => upgrade_lock_plan(&args.to_config()?),
        }?;

        orchestrator.execute(&plan).await
    }
}

/// Deploy the token, the upgradeable emission contract behind a
/// [`TransparentUpgradeableProxy`](https://docs.openzeppelin.com/contracts/5.x/api/proxy#transparent_proxy),
/// and the minter, then wire them together and hand the proxy admin to the
/// multisig.
#[derive(Args)]
pub struct DeployTokenSuiteArgs {
    /// Amount minted in the one-time initial mint, in base units
    #[arg(long)]
    pub initial_mint: String,

    /// Address receiving the initial mint in hex
    #[arg(long)]
    pub mint_receiver: String,

    /// Distribution wallet addresses in hex, comma-separated
    #[arg(long, value_delimiter = ',')]
    pub wallets: Vec<String>,

    /// Distribution percents in basis points, comma-separated, paired with
    /// the wallets and summing to 10000
    #[arg(long, value_delimiter = ',')]
    pub percents: Vec<u64>,

    /// Address of the EOA allowed to trigger emissions
    #[arg(long)]
    pub emission_manager: String,

    /// Address of the multisig receiving the proxy admin
    #[arg(long)]
    pub multisig: String,
}

impl DeployTokenSuiteArgs {
    fn to_config(&self) -> Result<DistributionConfig, ScriptError> {
        DistributionConfig::new(
            parse_amount(&self.initial_mint)?,
            parse_address(&self.mint_receiver)?,
            parse_addresses(&self.wallets)?,
            self.percents.iter().copied().map(U256::from).collect(),
            parse_address(&self.emission_manager)?,
            parse_address(&self.multisig)?,
        )
    }
}

/// Deploy the permissions manager and the season rewards contract
#[derive(Args)]
pub struct DeployRewardsArgs {
    /// Address of the already-deployed token in hex
    #[arg(long, env = "TOKEN_ADDRESS")]
    pub token: String,

    /// Address of the treasury wallet funding the rewards in hex
    #[arg(long, env = "TREASURY_ADDRESS")]
    pub treasury: String,
}

impl DeployRewardsArgs {
    fn to_config(&self) -> Result<RewardsConfig, ScriptError> {
        RewardsConfig::new(parse_address(&self.token)?, parse_address(&self.treasury)?)
    }
}

/// Deploy the upgradeable token lock behind a transparent proxy
#[derive(Args)]
pub struct DeployLockArgs {
    /// Address of the already-deployed token in hex
    #[arg(long, env = "TOKEN_ADDRESS")]
    pub token: String,
}

impl DeployLockArgs {
    fn to_config(&self) -> Result<LockConfig, ScriptError> {
        LockConfig::new(parse_address(&self.token)?)
    }
}

/// Upgrade the token lock implementation in place
#[derive(Args)]
pub struct UpgradeLockArgs {
    /// Address of the lock proxy contract in hex
    #[arg(long)]
    pub proxy: String,
}

impl UpgradeLockArgs {
    fn to_config(&self) -> Result<UpgradeConfig, ScriptError> {
        UpgradeConfig::new(parse_address(&self.proxy)?)
    }
}

/// Parse a hex address argument
fn parse_address(hex: &str) -> Result<Address, ScriptError> {
    hex.parse()
        .map_err(|_| ScriptError::Configuration(format!("invalid address: {}", hex)))
}

/// Parse a list of hex address arguments
fn parse_addresses(hexes: &[String]) -> Result<Vec<Address>, ScriptError> {
    hexes.iter().map(|hex| parse_address(hex)).collect()
}

/// Parse a decimal token amount argument
fn parse_amount(decimal: &str) -> Result<U256, ScriptError> {
    U256::from_dec_str(decimal)
        .map_err(|_| ScriptError::Configuration(format!("invalid amount: {}", decimal)))
}

//! Constants used in the deploy scripts

use std::time::Duration;

/// The storage slot containing the implementation contract address in an
/// upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const IMPLEMENTATION_STORAGE_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

/// The storage slot containing the proxy admin contract address in an
/// upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The number of confirmations to wait for a deployment transaction
pub const NUM_DEPLOY_CONFIRMATIONS: usize = 1;

/// Total bounded wait for proxy deployment / upgrade confirmations
pub const PROXY_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Receipt polling interval for proxy deployment / upgrade confirmations
pub const PROXY_POLLING_INTERVAL: Duration = Duration::from_secs(3);

/// The name of the OpenZeppelin transparent upgradeable proxy artifact.
///
/// Compiled from https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/transparent/TransparentUpgradeableProxy.sol
pub const PROXY_CONTRACT_NAME: &str = "TransparentUpgradeableProxy";

/// The name of the OpenZeppelin proxy admin artifact, deployed alongside
/// every transparent proxy
pub const PROXY_ADMIN_CONTRACT_NAME: &str = "ProxyAdmin";

/// The name of the token contract artifact
pub const TOKEN_CONTRACT_NAME: &str = "Token";

/// The name of the upgradeable emission contract artifact
pub const EMISSION_CONTRACT_NAME: &str = "Emission";

/// The name of the minter contract artifact
pub const MINTER_CONTRACT_NAME: &str = "Minter";

/// The name of the permissions manager contract artifact
pub const PERMISSIONS_CONTRACT_NAME: &str = "PermissionsManager";

/// The name of the season rewards contract artifact
pub const SEASON_REWARDS_CONTRACT_NAME: &str = "SeasonRewards";

/// The name of the upgradeable token lock contract artifact
pub const LOCK_CONTRACT_NAME: &str = "TokenLock";

/// The initializer method called exactly once when a proxy is deployed
pub const INITIALIZER_METHOD: &str = "initialize";

/// The token method performing the one-time initial mint
pub const INITIAL_MINT_METHOD: &str = "initialMint";

/// The emission method configuring distribution wallets & percents
pub const SET_WALLETS_AND_PERCENTS_METHOD: &str = "setWalletsAndPercents";

/// The emission method designating the emission manager EOA
pub const SET_EMISSION_MANAGER_METHOD: &str = "setEmissionManager";

/// The method designating the minter contract, present on both the
/// token and the emission contracts
pub const SET_MINTER_METHOD: &str = "setMinter";

/// The proxy admin method handing ownership to the multisig
pub const TRANSFER_OWNERSHIP_METHOD: &str = "transferOwnership";

/// The suffix appended to a contract name when verifying the implementation
/// behind its proxy
pub const IMPL_NAME_SUFFIX: &str = "_Impl";

/// The sum all distribution percents must reach, in basis points
pub const PERCENT_BASIS_POINTS: u64 = 10_000;

/// The environment variable overriding the version tag written to
/// generated artifact records
pub const DEPLOYMENT_VERSION_ENV_VAR: &str = "DEPLOYMENT_VERSION";

/// The version tag used when no override is present
pub const DEFAULT_DEPLOYMENT_VERSION: &str = "0";

/// The default directory containing compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The default directory generated address/ABI records are written to
pub const DEFAULT_GENERATED_DIR: &str = "generated";

/// The default path of the proxy upgrade manifest
pub const DEFAULT_MANIFEST_PATH: &str = ".upgrades.json";

/// The extension of compiled contract artifacts
pub const ARTIFACT_EXTENSION: &str = "json";

/// The extension of generated constant modules
pub const GENERATED_EXTENSION: &str = "js";

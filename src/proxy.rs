//! Lifecycle management for upgradeable proxy contracts: deployment,
//! manifest reconciliation, and upgrades.
//!
//! The proxies are OpenZeppelin v5 transparent upgradeable proxies: the
//! proxy deploys its own admin contract, and upgrade calls go through that
//! admin. A local manifest tracks each proxy's implementation and lifecycle
//! state; reconciling it against the chain is a prerequisite for upgrading
//! a proxy deployed elsewhere.

use std::{collections::BTreeMap, fs, path::PathBuf, str::FromStr};

use ethers::{
    abi::Token,
    types::{Address, Bytes, H256},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    artifacts::AbiResolver,
    chain::{ConfirmPolicy, FeeOracle, TransactionSubmitter, TxPayload},
    constants::{
        IMPLEMENTATION_STORAGE_SLOT, INITIALIZER_METHOD, NUM_BYTES_ADDRESS,
        NUM_BYTES_STORAGE_SLOT, PROXY_ADMIN_STORAGE_SLOT, PROXY_CONTRACT_NAME,
    },
    errors::ScriptError,
    solidity::{encode_constructor, encode_method_call, upgrade_and_call_calldata},
};

/// Where a proxy sits in its upgrade lifecycle.
///
/// Transitions are one-directional, except that a lost manifest may be
/// re-entered at `ProxyDeployed` through reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyState {
    /// The local manifest has no record of the proxy
    Unregistered,
    /// Proxy and initial implementation are live on-chain
    ProxyDeployed,
    /// The implementation's source has been verified with the explorer
    ImplementationVerified,
    /// The proxy has been repointed at a new implementation
    Upgraded,
}

/// Whether an upgrade deploys a fresh implementation contract.
///
/// `Always` forces a new implementation even if bytecode is unchanged,
/// trading gas cost for upgrade-determinism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeployPolicy {
    /// Deploy a new implementation on every upgrade
    Always,
}

/// A manifest record for one proxy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyEntry {
    /// The implementation the proxy currently delegates to
    pub implementation: Address,
    /// Lifecycle state
    pub state: ProxyState,
}

/// The on-disk upgrade manifest, proxies keyed by address
#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    /// Registered proxies
    proxies: BTreeMap<String, ProxyEntry>,
}

/// Orchestrates the proxy lifecycle over the chain seams and the local
/// manifest file
pub struct ProxyLifecycleManager<'a> {
    /// Signs and confirms the deployment/upgrade transactions
    submitter: &'a dyn TransactionSubmitter,
    /// Supplies fresh fees before each transaction
    fees: &'a dyn FeeOracle,
    /// Resolves implementation and proxy artifacts
    resolver: &'a AbiResolver,
    /// Path of the upgrade manifest
    manifest_path: PathBuf,
}

impl<'a> ProxyLifecycleManager<'a> {
    /// Construct a manager over the given seams and manifest path
    pub fn new(
        submitter: &'a dyn TransactionSubmitter,
        fees: &'a dyn FeeOracle,
        resolver: &'a AbiResolver,
        manifest_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            submitter,
            fees,
            resolver,
            manifest_path: manifest_path.into(),
        }
    }

    /// Deploy an implementation contract plus its transparent proxy,
    /// running the designated initializer exactly once.
    ///
    /// Returns the proxy address and the admin contract the proxy created.
    pub async fn deploy_proxy(
        &self,
        contract: &str,
        init_args: &[Token],
    ) -> Result<(Address, Address), ScriptError> {
        let implementation = self.deploy_implementation(contract).await?;
        info!(
            "{} implementation deployed at {:#x}",
            contract, implementation
        );

        // Proxy constructor: (logic, initialOwner, initCalldata). The
        // initializer runs inside the proxy's constructor, hence exactly once.
        let impl_artifact = self.resolver.load(contract)?;
        let init_calldata =
            encode_method_call(&impl_artifact.abi, INITIALIZER_METHOD, init_args)?;
        let proxy_artifact = self.resolver.load(PROXY_CONTRACT_NAME)?;
        let owner = self.submitter.sender()?;
        let deploy_data = encode_constructor(
            &proxy_artifact.abi,
            &proxy_artifact.bytecode,
            &[
                Token::Address(implementation),
                Token::Address(owner),
                Token::Bytes(init_calldata.to_vec()),
            ],
        )?;

        let fees = self.fees.fetch_fee_data().await?;
        let submission = self
            .submitter
            .submit(
                TxPayload {
                    to: None,
                    data: deploy_data,
                },
                &fees,
                ConfirmPolicy::Bounded,
            )
            .await?;
        let proxy = submission.address.ok_or_else(|| {
            ScriptError::Provider("proxy deployment receipt missing contract address".to_string())
        })?;

        let admin = self.resolve_admin_address(proxy).await?;
        info!("{} proxy deployed at {:#x}, admin {:#x}", contract, proxy, admin);

        self.update_manifest(proxy, implementation, ProxyState::ProxyDeployed)?;
        Ok((proxy, admin))
    }

    /// Reconcile the local manifest with an on-chain proxy whose deployment
    /// history is not locally known. Safe to call repeatedly: re-importing
    /// an already-registered proxy yields the same reconciled state.
    pub async fn force_import(&self, proxy: Address) -> Result<Address, ScriptError> {
        let implementation = self.resolve_implementation_address(proxy).await?;

        // A proxy the manifest already tracks keeps its lifecycle state
        let state = match self.state_of(proxy)? {
            ProxyState::Unregistered => ProxyState::ProxyDeployed,
            known => known,
        };
        self.update_manifest(proxy, implementation, state)?;

        info!(
            "proxy {:#x} imported with implementation {:#x}",
            proxy, implementation
        );
        Ok(implementation)
    }

    /// Deploy a new implementation and repoint the proxy at it.
    ///
    /// The proxy must be registered in the manifest (deploy it here or
    /// `force_import` it first), otherwise the upgrade fails with a
    /// manifest-mismatch error. Re-running after a partial upgrade is safe:
    /// a fresh implementation is deployed again under
    /// [`RedeployPolicy::Always`].
    pub async fn upgrade_proxy(
        &self,
        proxy: Address,
        contract: &str,
        _redeploy: RedeployPolicy,
    ) -> Result<Address, ScriptError> {
        let manifest = self.read_manifest()?;
        if !manifest.proxies.contains_key(&manifest_key(proxy)) {
            return Err(ScriptError::ManifestMismatch(format!(
                "{:#x}; run force-import before upgrading",
                proxy
            )));
        }

        let old_implementation = self.resolve_implementation_address(proxy).await?;
        info!("old implementation: {:#x}", old_implementation);

        let implementation = self.deploy_implementation(contract).await?;

        let admin = self.resolve_admin_address(proxy).await?;
        let fees = self.fees.fetch_fee_data().await?;
        self.submitter
            .submit(
                TxPayload {
                    to: Some(admin),
                    data: upgrade_and_call_calldata(proxy, implementation, Bytes::new()),
                },
                &fees,
                ConfirmPolicy::Bounded,
            )
            .await?;
        info!("new implementation: {:#x}", implementation);

        self.update_manifest(proxy, implementation, ProxyState::Upgraded)?;
        Ok(implementation)
    }

    /// Read the implementation pointer from the proxy's reserved storage
    /// slot
    pub async fn resolve_implementation_address(
        &self,
        proxy: Address,
    ) -> Result<Address, ScriptError> {
        let slot = self
            .submitter
            .read_storage_slot(proxy, implementation_slot())
            .await?;
        let implementation = address_from_slot(slot);
        if implementation == Address::zero() {
            return Err(ScriptError::Provider(format!(
                "no implementation set in proxy storage for {:#x}",
                proxy
            )));
        }
        Ok(implementation)
    }

    /// Read the admin contract address from the proxy's reserved storage
    /// slot
    pub async fn resolve_admin_address(&self, proxy: Address) -> Result<Address, ScriptError> {
        let slot = self
            .submitter
            .read_storage_slot(proxy, admin_slot())
            .await?;
        let admin = address_from_slot(slot);
        if admin == Address::zero() {
            return Err(ScriptError::Provider(format!(
                "no admin set in proxy storage for {:#x}",
                proxy
            )));
        }
        Ok(admin)
    }

    /// Record a successful implementation verification in the manifest
    pub fn mark_implementation_verified(&self, proxy: Address) -> Result<(), ScriptError> {
        let mut manifest = self.read_manifest()?;
        let key = manifest_key(proxy);
        match manifest.proxies.get_mut(&key) {
            // Transitions are one-directional: an upgraded proxy stays
            // `Upgraded` even when its new implementation verifies
            Some(entry) if entry.state == ProxyState::Upgraded => Ok(()),
            Some(entry) => {
                entry.state = ProxyState::ImplementationVerified;
                self.write_manifest(&manifest)
            }
            None => Err(ScriptError::ManifestMismatch(format!("{:#x}", proxy))),
        }
    }

    /// The lifecycle state of a proxy per the local manifest
    pub fn state_of(&self, proxy: Address) -> Result<ProxyState, ScriptError> {
        let manifest = self.read_manifest()?;
        Ok(manifest
            .proxies
            .get(&manifest_key(proxy))
            .map(|entry| entry.state)
            .unwrap_or(ProxyState::Unregistered))
    }

    /// Deploy the bare implementation contract for `contract`, with fresh
    /// fees and a bounded confirmation wait
    async fn deploy_implementation(&self, contract: &str) -> Result<Address, ScriptError> {
        let artifact = self.resolver.load(contract)?;
        // Upgradeable implementations take no constructor args; state is
        // set through the initializer behind the proxy
        let data = encode_constructor(&artifact.abi, &artifact.bytecode, &[])?;

        let fees = self.fees.fetch_fee_data().await?;
        let submission = self
            .submitter
            .submit(TxPayload { to: None, data }, &fees, ConfirmPolicy::Bounded)
            .await?;
        submission.address.ok_or_else(|| {
            ScriptError::Provider(
                "implementation deployment receipt missing contract address".to_string(),
            )
        })
    }

    /// Upsert the manifest entry for a proxy
    fn update_manifest(
        &self,
        proxy: Address,
        implementation: Address,
        state: ProxyState,
    ) -> Result<(), ScriptError> {
        let mut manifest = self.read_manifest()?;
        manifest.proxies.insert(
            manifest_key(proxy),
            ProxyEntry {
                implementation,
                state,
            },
        );
        self.write_manifest(&manifest)
    }

    /// Load the manifest, treating a missing file as empty
    fn read_manifest(&self) -> Result<Manifest, ScriptError> {
        if !self.manifest_path.exists() {
            return Ok(Manifest::default());
        }
        let contents = fs::read_to_string(&self.manifest_path)
            .map_err(|e| ScriptError::ReadFile(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| ScriptError::ReadFile(e.to_string()))
    }

    /// Persist the manifest
    fn write_manifest(&self, manifest: &Manifest) -> Result<(), ScriptError> {
        let contents = serde_json::to_string_pretty(manifest)
            .map_err(|e| ScriptError::WriteFile(e.to_string()))?;
        fs::write(&self.manifest_path, contents).map_err(|e| ScriptError::WriteFile(e.to_string()))
    }
}

/// The manifest key for a proxy address
fn manifest_key(proxy: Address) -> String {
    format!("{:#x}", proxy)
}

/// The EIP-1967 implementation storage slot
fn implementation_slot() -> H256 {
    // Can `unwrap` here since the constant is a valid H256
    H256::from_str(IMPLEMENTATION_STORAGE_SLOT).unwrap()
}

/// The EIP-1967 admin storage slot
fn admin_slot() -> H256 {
    // Can `unwrap` here since the constant is a valid H256
    H256::from_str(PROXY_ADMIN_STORAGE_SLOT).unwrap()
}

/// Extract the address stored in the low 20 bytes of a storage word
fn address_from_slot(slot: H256) -> Address {
    Address::from_slice(&slot.as_bytes()[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..])
}

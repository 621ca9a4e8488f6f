//! Scripted in-memory chain and verifier used by the seam-level tests

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use ethers::{
    types::{Address, H256, U256},
    utils::id,
};

use crate::{
    chain::{ConfirmPolicy, FeeData, FeeOracle, Submission, TransactionSubmitter, TxPayload},
    errors::ScriptError,
    verify::{VerificationOutcome, VerificationService},
};

/// Marker bytes the fake proxy artifact's bytecode starts with, letting the
/// scripted chain recognize proxy creations
const PROXY_BYTECODE_MARKER: [u8; 4] = [0xfe, 0xed, 0xfa, 0xce];

/// The address the scripted chain signs with
pub(crate) fn fake_sender() -> Address {
    Address::from_low_u64_be(0xbeef)
}

/// Internal mutable chain state
#[derive(Default)]
struct ChainState {
    /// Counter feeding deterministic deployment addresses
    next: u64,
    /// Every submitted payload, in order
    submissions: Vec<TxPayload>,
    /// Raw storage, keyed by contract and slot
    slots: HashMap<(Address, H256), H256>,
    /// The most recently deployed address
    last_deploy: Option<Address>,
}

/// A scripted chain implementing the fee-oracle and submitter seams.
///
/// Deploys return fresh deterministic addresses. A proxy creation (detected
/// by the marker bytecode) seeds the EIP-1967 implementation slot with the
/// previous deployment and mints an admin address; an `upgradeAndCall`
/// submission repoints the implementation slot, mirroring what the real
/// contracts do.
pub(crate) struct FakeChain {
    state: Mutex<ChainState>,
    fee_calls: AtomicUsize,
    read_calls: AtomicUsize,
    fail_on_submission: Option<usize>,
    fail_on_read: Option<usize>,
}

impl FakeChain {
    /// A chain that accepts every submission
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState::default()),
            fee_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            fail_on_submission: None,
            fail_on_read: None,
        }
    }

    /// A chain whose `index`th submission (0-based) reverts
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_on_submission: Some(index),
            ..Self::new()
        }
    }

    /// A chain whose `index`th storage read (0-based) fails at the
    /// provider level
    pub fn failing_read_at(index: usize) -> Self {
        Self {
            fail_on_read: Some(index),
            ..Self::new()
        }
    }

    /// All payloads submitted so far
    pub fn submissions(&self) -> Vec<TxPayload> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// How many times fee data was fetched
    pub fn fee_fetches(&self) -> usize {
        self.fee_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeeOracle for FakeChain {
    async fn fetch_fee_data(&self) -> Result<FeeData, ScriptError> {
        self.fee_calls.fetch_add(1, Ordering::SeqCst);
        Ok(FeeData {
            max_fee_per_gas: U256::from(100_000_000_000u64),
            max_priority_fee_per_gas: U256::from(2_000_000_000u64),
        })
    }
}

#[async_trait]
impl TransactionSubmitter for FakeChain {
    async fn submit(
        &self,
        payload: TxPayload,
        _fees: &FeeData,
        _confirm: ConfirmPolicy,
    ) -> Result<Submission, ScriptError> {
        let mut state = self.state.lock().unwrap();
        let index = state.submissions.len();
        state.submissions.push(payload.clone());

        if self.fail_on_submission == Some(index) {
            return Err(ScriptError::Revert("scripted revert".to_string()));
        }

        let address = match payload.to {
            None => {
                state.next += 1;
                let deployed = Address::from_low_u64_be(0x1000 + state.next);

                if payload.data.len() >= 4 && payload.data[..4] == PROXY_BYTECODE_MARKER {
                    let implementation = state
                        .last_deploy
                        .expect("proxy deployed before any implementation");
                    let admin = Address::from_low_u64_be(0xad00 + state.next);
                    state
                        .slots
                        .insert((deployed, implementation_slot()), slot_value(implementation));
                    state
                        .slots
                        .insert((deployed, admin_slot()), slot_value(admin));
                }

                state.last_deploy = Some(deployed);
                Some(deployed)
            }
            Some(_target) => {
                if payload.data.len() >= 68
                    && payload.data[..4] == id("upgradeAndCall(address,address,bytes)")
                {
                    let proxy = Address::from_slice(&payload.data[16..36]);
                    let implementation = Address::from_slice(&payload.data[48..68]);
                    state
                        .slots
                        .insert((proxy, implementation_slot()), slot_value(implementation));
                }
                None
            }
        };

        Ok(Submission {
            address,
            tx_hash: H256::from_low_u64_be(index as u64 + 1),
            block_number: Some((index as u64 + 1).into()),
            gas_used: Some(U256::from(21_000u64)),
        })
    }

    async fn read_storage_slot(
        &self,
        address: Address,
        slot: H256,
    ) -> Result<H256, ScriptError> {
        let index = self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_read == Some(index) {
            return Err(ScriptError::Provider("connection reset".to_string()));
        }

        let state = self.state.lock().unwrap();
        Ok(state
            .slots
            .get(&(address, slot))
            .copied()
            .unwrap_or_else(H256::zero))
    }

    fn sender(&self) -> Result<Address, ScriptError> {
        Ok(fake_sender())
    }
}

/// A verifier returning a fixed outcome and recording every call
pub(crate) struct ScriptedVerifier {
    outcome: VerificationOutcome,
    calls: Mutex<Vec<(String, Address, String)>>,
}

impl ScriptedVerifier {
    /// A verifier that answers every attempt with `outcome`
    pub fn returning(outcome: VerificationOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `(name, address, ctor_args_hex)` verification attempt so far
    pub fn calls(&self) -> Vec<(String, Address, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationService for ScriptedVerifier {
    async fn verify(
        &self,
        name: &str,
        address: Address,
        constructor_args_hex: &str,
    ) -> VerificationOutcome {
        self.calls.lock().unwrap().push((
            name.to_string(),
            address,
            constructor_args_hex.to_string(),
        ));
        self.outcome.clone()
    }
}

/// Write the full suite of fake compiled artifacts under `dir`
pub(crate) fn write_suite_artifacts(dir: &Path) {
    let artifacts = [
        (
            "Token",
            r#"{
              "abi": [
                {"type": "function", "name": "initialMint", "inputs": [{"name": "receiver", "type": "address"}, {"name": "amount", "type": "uint256"}, {"name": "wallets", "type": "address[]"}, {"name": "percents", "type": "uint256[]"}], "outputs": [], "stateMutability": "nonpayable"},
                {"type": "function", "name": "setMinter", "inputs": [{"name": "minter", "type": "address"}], "outputs": [], "stateMutability": "nonpayable"}
              ],
              "bytecode": "0x60806040526001"
            }"#,
        ),
        (
            "Emission",
            r#"{
              "abi": [
                {"type": "function", "name": "initialize", "inputs": [{"name": "token", "type": "address"}], "outputs": [], "stateMutability": "nonpayable"},
                {"type": "function", "name": "setWalletsAndPercents", "inputs": [{"name": "wallets", "type": "address[]"}, {"name": "percents", "type": "uint256[]"}], "outputs": [], "stateMutability": "nonpayable"},
                {"type": "function", "name": "setEmissionManager", "inputs": [{"name": "manager", "type": "address"}], "outputs": [], "stateMutability": "nonpayable"},
                {"type": "function", "name": "setMinter", "inputs": [{"name": "minter", "type": "address"}], "outputs": [], "stateMutability": "nonpayable"}
              ],
              "bytecode": "0x60806040526002"
            }"#,
        ),
        (
            "Minter",
            r#"{
              "abi": [
                {"type": "constructor", "inputs": [{"name": "token", "type": "address"}, {"name": "emission", "type": "address"}], "stateMutability": "nonpayable"}
              ],
              "bytecode": "0x60806040526003"
            }"#,
        ),
        (
            "TransparentUpgradeableProxy",
            r#"{
              "abi": [
                {"type": "constructor", "inputs": [{"name": "logic", "type": "address"}, {"name": "initialOwner", "type": "address"}, {"name": "data", "type": "bytes"}], "stateMutability": "payable"}
              ],
              "bytecode": "0xfeedface"
            }"#,
        ),
        (
            "ProxyAdmin",
            r#"{
              "abi": [
                {"type": "function", "name": "transferOwnership", "inputs": [{"name": "newOwner", "type": "address"}], "outputs": [], "stateMutability": "nonpayable"}
              ],
              "bytecode": "0x60806040526004"
            }"#,
        ),
        (
            "PermissionsManager",
            r#"{
              "abi": [],
              "bytecode": "0x60806040526005"
            }"#,
        ),
        (
            "SeasonRewards",
            r#"{
              "abi": [
                {"type": "constructor", "inputs": [{"name": "permissions", "type": "address"}, {"name": "token", "type": "address"}, {"name": "treasury", "type": "address"}, {"name": "accessPass", "type": "address"}, {"name": "stakingPool", "type": "address"}], "stateMutability": "nonpayable"}
              ],
              "bytecode": "0x60806040526006"
            }"#,
        ),
        (
            "TokenLock",
            r#"{
              "abi": [
                {"type": "function", "name": "initialize", "inputs": [{"name": "token", "type": "address"}], "outputs": [], "stateMutability": "nonpayable"}
              ],
              "bytecode": "0x60806040526007"
            }"#,
        ),
    ];

    for (name, contents) in artifacts {
        fs::write(dir.join(format!("{}.json", name)), contents).unwrap();
    }
}

/// The EIP-1967 implementation slot as an `H256`
fn implementation_slot() -> H256 {
    crate::constants::IMPLEMENTATION_STORAGE_SLOT
        .parse()
        .unwrap()
}

/// The EIP-1967 admin slot as an `H256`
fn admin_slot() -> H256 {
    crate::constants::PROXY_ADMIN_STORAGE_SLOT.parse().unwrap()
}

/// Pack an address into the low 20 bytes of a storage word
fn slot_value(address: Address) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    H256(word)
}

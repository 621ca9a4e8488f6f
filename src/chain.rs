//! RPC-facing plumbing: client setup, fee estimation, and transaction
//! submission with mined-receipt confirmation

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, Bytes, Eip1559TransactionRequest, H256, U256, U64},
};

use crate::{
    constants::{NUM_DEPLOY_CONFIRMATIONS, PROXY_CONFIRMATION_TIMEOUT, PROXY_POLLING_INTERVAL},
    errors::ScriptError,
};

/// The current network fee suggestion, fetched immediately before each
/// transaction. Never cached across steps: fee markets move between
/// confirmations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeData {
    /// Suggested maximum total fee per unit of gas, in wei
    pub max_fee_per_gas: U256,
    /// Suggested maximum priority fee per unit of gas, in wei
    pub max_priority_fee_per_gas: U256,
}

/// A state-mutating transaction to be signed and broadcast.
///
/// A `None` destination denotes a contract creation.
#[derive(Debug, Clone)]
pub struct TxPayload {
    /// Destination address, absent for constructor deploys
    pub to: Option<Address>,
    /// Full calldata (constructor bytecode + args, or selector + args)
    pub data: Bytes,
}

/// The outcome of a mined transaction
#[derive(Debug, Clone)]
pub struct Submission {
    /// Address of the created contract, if the transaction was a deploy
    pub address: Option<Address>,
    /// Hash of the mined transaction
    pub tx_hash: H256,
    /// Block the transaction was mined in
    pub block_number: Option<U64>,
    /// Gas consumed by the transaction
    pub gas_used: Option<U256>,
}

/// How long to wait for a transaction to be mined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Wait on the provider's default confirmation behavior, unbounded
    Default,
    /// Poll every [`PROXY_POLLING_INTERVAL`] with a total wait bounded by
    /// [`PROXY_CONFIRMATION_TIMEOUT`]. Used for proxy deploys & upgrades.
    Bounded,
}

/// Queries the current network fee suggestion
#[async_trait]
pub trait FeeOracle: Send + Sync {
    /// Fetch fresh fee parameters. Must be called once per transaction.
    async fn fetch_fee_data(&self) -> Result<FeeData, ScriptError>;
}

/// Signs, broadcasts, and confirms state-mutating transactions
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submit a transaction and suspend until it is mined.
    ///
    /// Returns only after an on-chain receipt is available, never on mere
    /// broadcast. A reverted receipt is a [`ScriptError::Revert`].
    async fn submit(
        &self,
        payload: TxPayload,
        fees: &FeeData,
        confirm: ConfirmPolicy,
    ) -> Result<Submission, ScriptError>;

    /// Read a raw storage slot from a deployed contract
    async fn read_storage_slot(&self, address: Address, slot: H256)
        -> Result<H256, ScriptError>;

    /// The address transactions are signed with
    fn sender(&self) -> Result<Address, ScriptError>;
}

/// The concrete middleware stack used by the scripts
pub type ScriptClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Sets up the client with which all transactions are signed and broadcast,
/// from the deployer private key and network RPC URL
pub async fn setup_client(priv_key: &str, rpc_url: &str) -> Result<Arc<ScriptClient>, ScriptError> {
    let provider = Provider::<Http>::try_from(rpc_url)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let wallet = LocalWallet::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let chain_id = provider
        .get_chainid()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?
        .as_u64();

    Ok(Arc::new(SignerMiddleware::new(
        provider,
        wallet.with_chain_id(chain_id),
    )))
}

/// Fee oracle backed by the network's EIP-1559 fee history
pub struct NetworkFeeOracle<M> {
    /// The client used to query the network
    client: Arc<M>,
}

impl<M: Middleware> NetworkFeeOracle<M> {
    /// Construct an oracle over the given client
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M: Middleware + 'static> FeeOracle for NetworkFeeOracle<M> {
    async fn fetch_fee_data(&self) -> Result<FeeData, ScriptError> {
        let (max_fee_per_gas, max_priority_fee_per_gas) = self
            .client
            .estimate_eip1559_fees(None)
            .await
            .map_err(|e| ScriptError::Provider(e.to_string()))?;

        Ok(FeeData {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        })
    }
}

/// Transaction submitter backed by the signing RPC client
pub struct RpcSubmitter<M> {
    /// The client used to sign and broadcast
    client: Arc<M>,
}

impl<M: Middleware> RpcSubmitter<M> {
    /// Construct a submitter over the given client
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M: Middleware + 'static> TransactionSubmitter for RpcSubmitter<M> {
    async fn submit(
        &self,
        payload: TxPayload,
        fees: &FeeData,
        confirm: ConfirmPolicy,
    ) -> Result<Submission, ScriptError> {
        let mut tx = Eip1559TransactionRequest::new()
            .data(payload.data)
            .max_fee_per_gas(fees.max_fee_per_gas)
            .max_priority_fee_per_gas(fees.max_priority_fee_per_gas);
        if let Some(to) = payload.to {
            tx = tx.to(to);
        }

        let pending = self
            .client
            .send_transaction(tx, None /* block */)
            .await
            .map_err(|e| classify_send_error(&e.to_string()))?;

        let receipt = match confirm {
            ConfirmPolicy::Default => pending
                .confirmations(NUM_DEPLOY_CONFIRMATIONS)
                .await
                .map_err(|e| ScriptError::Provider(e.to_string()))?,
            ConfirmPolicy::Bounded => {
                let wait = pending
                    .confirmations(NUM_DEPLOY_CONFIRMATIONS)
                    .interval(PROXY_POLLING_INTERVAL);
                tokio::time::timeout(PROXY_CONFIRMATION_TIMEOUT, wait)
                    .await
                    .map_err(|_| {
                        ScriptError::ConfirmationTimeout(format!(
                            "no receipt after {}s",
                            PROXY_CONFIRMATION_TIMEOUT.as_secs()
                        ))
                    })?
                    .map_err(|e| ScriptError::Provider(e.to_string()))?
            }
        };

        let receipt = receipt
            .ok_or_else(|| ScriptError::Provider("transaction dropped from mempool".to_string()))?;

        if receipt.status == Some(U64::zero()) {
            return Err(ScriptError::Revert(format!(
                "transaction {:#x} reverted on-chain",
                receipt.transaction_hash
            )));
        }

        Ok(Submission {
            address: receipt.contract_address,
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }

    async fn read_storage_slot(
        &self,
        address: Address,
        slot: H256,
    ) -> Result<H256, ScriptError> {
        self.client
            .get_storage_at(address, slot, None /* block */)
            .await
            .map_err(|e| ScriptError::Provider(e.to_string()))
    }

    fn sender(&self) -> Result<Address, ScriptError> {
        self.client.default_sender().ok_or_else(|| {
            ScriptError::ClientInitialization("client does not have a sender attached".to_string())
        })
    }
}

/// Classify a broadcast failure: contract-level rejections surface as
/// reverts, everything else is a provider failure
fn classify_send_error(msg: &str) -> ScriptError {
    if msg.to_lowercase().contains("revert") {
        ScriptError::Revert(msg.to_string())
    } else {
        ScriptError::Provider(msg.to_string())
    }
}

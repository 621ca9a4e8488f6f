//! Strict in-order execution of a deployment plan.
//!
//! The orchestrator owns the plan-execution state: the map of addresses
//! produced so far, which later steps reference by step name. Each
//! transaction gets fresh fee data, and step N+1 never begins before step
//! N's on-chain confirmation is observed. Any fatal error halts the plan
//! immediately; prior steps' on-chain effects persist and re-runs rely on
//! the idempotence of the individual steps.

use std::collections::BTreeMap;

use ethers::{abi::Token, types::Address};
use tracing::{error, info, warn};

use crate::{
    artifacts::{AbiResolver, ArtifactStore},
    chain::{ConfirmPolicy, FeeOracle, TransactionSubmitter, TxPayload},
    errors::ScriptError,
    plan::{admin_ref, ArgValue, DeploymentPlan, FailurePolicy, Step, StepAction, VerifyTarget},
    proxy::{ProxyLifecycleManager, RedeployPolicy},
    solidity::{encode_constructor, encode_constructor_args_hex, encode_method_call},
    verify::{impl_contract_name, VerificationOutcome, VerificationService},
};

/// Executes deployment plans strictly in order over the chain seams
pub struct Orchestrator<'a> {
    /// Supplies fresh fees before each transaction
    fees: &'a dyn FeeOracle,
    /// Signs, broadcasts, and confirms each transaction
    submitter: &'a dyn TransactionSubmitter,
    /// Attempts source verification after successful deploys
    verifier: &'a dyn VerificationService,
    /// Resolves artifact ABIs and bytecode
    resolver: &'a AbiResolver,
    /// Persists generated address/ABI records
    store: &'a ArtifactStore,
    /// Manages proxy deploys and upgrades
    proxies: ProxyLifecycleManager<'a>,
    /// Addresses produced by completed steps, keyed by step name
    produced: BTreeMap<String, Address>,
}

impl<'a> Orchestrator<'a> {
    /// Construct an orchestrator over the given collaborators
    pub fn new(
        fees: &'a dyn FeeOracle,
        submitter: &'a dyn TransactionSubmitter,
        verifier: &'a dyn VerificationService,
        resolver: &'a AbiResolver,
        store: &'a ArtifactStore,
        manifest_path: impl Into<std::path::PathBuf>,
    ) -> Self {
        let proxies = ProxyLifecycleManager::new(submitter, fees, resolver, manifest_path);
        Self {
            fees,
            submitter,
            verifier,
            resolver,
            store,
            proxies,
            produced: BTreeMap::new(),
        }
    }

    /// Execute every step of the plan in order, halting on the first fatal
    /// error
    pub async fn execute(&mut self, plan: &DeploymentPlan) -> Result<(), ScriptError> {
        for step in plan.steps() {
            info!("executing step `{}`", step.name);
            if let Err(e) = self.execute_step(step).await {
                error!("step `{}` failed: {}", step.name, e);
                return Err(e);
            }
        }

        info!("all steps complete");
        Ok(())
    }

    /// The addresses produced by completed steps
    pub fn produced_addresses(&self) -> &BTreeMap<String, Address> {
        &self.produced
    }

    async fn execute_step(&mut self, step: &Step) -> Result<(), ScriptError> {
        match &step.action {
            StepAction::Deploy { contract, args } => {
                let tokens = self.resolve_args(args)?;
                let artifact = self.resolver.load(contract)?;
                let data = encode_constructor(&artifact.abi, &artifact.bytecode, &tokens)?;

                let fees = self.fees.fetch_fee_data().await?;
                let submission = self
                    .submitter
                    .submit(TxPayload { to: None, data }, &fees, ConfirmPolicy::Default)
                    .await?;
                let address = submission.address.ok_or_else(|| {
                    ScriptError::Provider("deployment receipt missing contract address".to_string())
                })?;
                info!("{} deployed at {:#x}", contract, address);

                self.produced.insert(step.name.clone(), address);
                self.finish_step(step, contract, address, &encode_constructor_args_hex(&tokens))
                    .await
            }
            StepAction::Call {
                target,
                contract,
                method,
                args,
            } => {
                let address = self.resolve_address(target)?;
                let tokens = self.resolve_args(args)?;
                let artifact = self.resolver.load(contract)?;
                let data = encode_method_call(&artifact.abi, method, &tokens)?;

                let fees = self.fees.fetch_fee_data().await?;
                self.submitter
                    .submit(
                        TxPayload {
                            to: Some(address),
                            data,
                        },
                        &fees,
                        ConfirmPolicy::Default,
                    )
                    .await?;
                info!("{}.{} confirmed", contract, method);

                self.finish_step(step, contract, address, "").await
            }
            StepAction::ProxyDeploy {
                contract,
                init_args,
            } => {
                let tokens = self.resolve_args(init_args)?;
                let (proxy, admin) = self.proxies.deploy_proxy(contract, &tokens).await?;

                self.produced.insert(step.name.clone(), proxy);
                self.produced.insert(admin_ref(&step.name), admin);
                self.finish_step(step, contract, proxy, "").await
            }
            StepAction::ProxyUpgrade { proxy, contract } => {
                let proxy_address = self.resolve_address(proxy)?;
                self.proxies.force_import(proxy_address).await?;
                self.proxies
                    .upgrade_proxy(proxy_address, contract, RedeployPolicy::Always)
                    .await?;

                self.finish_step(step, contract, proxy_address, "").await
            }
        }
    }

    /// Post-success bookkeeping for a step: persist the generated record
    /// and attempt source verification under the step's failure policy
    async fn finish_step(
        &self,
        step: &Step,
        contract: &str,
        address: Address,
        constructor_args_hex: &str,
    ) -> Result<(), ScriptError> {
        if step.record {
            self.store.write_record(contract, address)?;
        }

        let outcome = match step.verify {
            None => return Ok(()),
            Some(VerifyTarget::Contract) => {
                self.verifier
                    .verify(contract, address, constructor_args_hex)
                    .await
            }
            Some(VerifyTarget::Proxy) => {
                // Explorers must verify the logic contract, not the proxy
                // shell. A failed implementation lookup is a verification
                // failure, so the step's own policy decides its fate.
                match self.proxies.resolve_implementation_address(address).await {
                    Ok(implementation) => {
                        info!("implementation address for {}: {:#x}", contract, implementation);
                        let outcome = self
                            .verifier
                            .verify(&impl_contract_name(contract), implementation, "")
                            .await;
                        if outcome.is_success() {
                            self.proxies.mark_implementation_verified(address)?;
                        }
                        outcome
                    }
                    Err(e) => VerificationOutcome::Failed(e.to_string()),
                }
            }
        };

        match outcome {
            VerificationOutcome::Verified => {
                info!("{} verified at {:#x}", contract, address);
                Ok(())
            }
            VerificationOutcome::AlreadyVerified => {
                info!("{} already verified", contract);
                Ok(())
            }
            VerificationOutcome::Failed(reason) => match step.verify_policy {
                FailurePolicy::WarnAndContinue => {
                    warn!("verification failed for {}: {}", contract, reason);
                    Ok(())
                }
                FailurePolicy::Fatal => Err(ScriptError::Verification(reason)),
            },
        }
    }

    /// Resolve a list of plan arguments against the produced addresses
    fn resolve_args(&self, args: &[ArgValue]) -> Result<Vec<Token>, ScriptError> {
        args.iter().map(|arg| arg.resolve(&self.produced)).collect()
    }

    /// Resolve a plan argument that must be an address
    fn resolve_address(&self, arg: &ArgValue) -> Result<Address, ScriptError> {
        match arg.resolve(&self.produced)? {
            Token::Address(address) => Ok(address),
            other => Err(ScriptError::Configuration(format!(
                "expected an address argument, got {:?}",
                other
            ))),
        }
    }
}

//! Deployment plan model: an ordered sequence of steps whose produced
//! addresses feed the arguments of later steps

use std::collections::BTreeMap;

use ethers::{
    abi::Token,
    types::{Address, U256},
};

use crate::errors::ScriptError;

/// A constructor or method argument, either a literal value or a reference
/// to the address produced by an earlier step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// A literal address
    Address(Address),
    /// A literal unsigned integer
    Uint(U256),
    /// A list of literal addresses
    AddressList(Vec<Address>),
    /// A list of literal unsigned integers
    UintList(Vec<U256>),
    /// The address produced by the named earlier step
    StepRef(String),
}

impl ArgValue {
    /// Resolve the argument to an ABI token, looking up step references in
    /// the addresses produced so far
    pub fn resolve(&self, produced: &BTreeMap<String, Address>) -> Result<Token, ScriptError> {
        match self {
            ArgValue::Address(addr) => Ok(Token::Address(*addr)),
            ArgValue::Uint(val) => Ok(Token::Uint(*val)),
            ArgValue::AddressList(addrs) => Ok(Token::Array(
                addrs.iter().copied().map(Token::Address).collect(),
            )),
            ArgValue::UintList(vals) => {
                Ok(Token::Array(vals.iter().copied().map(Token::Uint).collect()))
            }
            ArgValue::StepRef(name) => {
                let addr = produced.get(name).ok_or_else(|| {
                    ScriptError::Configuration(format!(
                        "step reference `{}` has no produced address",
                        name
                    ))
                })?;
                Ok(Token::Address(*addr))
            }
        }
    }

    /// The step name this argument references, if any
    fn step_ref(&self) -> Option<&str> {
        match self {
            ArgValue::StepRef(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// What a step does on-chain
#[derive(Debug, Clone)]
pub enum StepAction {
    /// Deploy a contract through its constructor
    Deploy {
        /// Artifact name of the contract to deploy
        contract: String,
        /// Constructor arguments, in declaration order
        args: Vec<ArgValue>,
    },
    /// Invoke a state-mutating method on a deployed contract
    Call {
        /// The contract to call
        target: ArgValue,
        /// Artifact name whose ABI encodes the call
        contract: String,
        /// Method name
        method: String,
        /// Method arguments, in declaration order
        args: Vec<ArgValue>,
    },
    /// Deploy an implementation plus transparent proxy, running the
    /// initializer exactly once
    ProxyDeploy {
        /// Artifact name of the implementation contract
        contract: String,
        /// Initializer arguments, in declaration order
        init_args: Vec<ArgValue>,
    },
    /// Reconcile the upgrade manifest and repoint an existing proxy at a
    /// freshly deployed implementation
    ProxyUpgrade {
        /// The proxy to upgrade
        proxy: ArgValue,
        /// Artifact name of the implementation contract
        contract: String,
    },
}

/// Which address a verification attempt targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyTarget {
    /// Verify the deployed contract itself
    Contract,
    /// Resolve the implementation behind the proxy and verify that
    Proxy,
}

/// What a verification failure does to the rest of the plan.
///
/// Source verification is cosmetic to on-chain functionality, so the
/// default is to log and continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and execute the next step
    #[default]
    WarnAndContinue,
    /// Halt the plan
    Fatal,
}

/// An atomic unit of deployment work. Immutable once defined; created at
/// plan-authoring time.
#[derive(Debug, Clone)]
pub struct Step {
    /// Step name; doubles as the key for the produced address
    pub name: String,
    /// The on-chain action performed
    pub action: StepAction,
    /// Whether a generated record is written after success
    pub record: bool,
    /// Verification target after success, if any
    pub verify: Option<VerifyTarget>,
    /// What a verification failure does to the plan
    pub verify_policy: FailurePolicy,
}

impl Step {
    /// A constructor-deploy step
    pub fn deploy(name: &str, contract: &str, args: Vec<ArgValue>) -> Self {
        Self::new(
            name,
            StepAction::Deploy {
                contract: contract.to_string(),
                args,
            },
        )
    }

    /// A method-call step
    pub fn call(
        name: &str,
        target: ArgValue,
        contract: &str,
        method: &str,
        args: Vec<ArgValue>,
    ) -> Self {
        Self::new(
            name,
            StepAction::Call {
                target,
                contract: contract.to_string(),
                method: method.to_string(),
                args,
            },
        )
    }

    /// A proxy-deploy step
    pub fn proxy_deploy(name: &str, contract: &str, init_args: Vec<ArgValue>) -> Self {
        Self::new(
            name,
            StepAction::ProxyDeploy {
                contract: contract.to_string(),
                init_args,
            },
        )
    }

    /// A proxy-upgrade step
    pub fn proxy_upgrade(name: &str, proxy: ArgValue, contract: &str) -> Self {
        Self::new(
            name,
            StepAction::ProxyUpgrade {
                proxy,
                contract: contract.to_string(),
            },
        )
    }

    fn new(name: &str, action: StepAction) -> Self {
        Self {
            name: name.to_string(),
            action,
            record: false,
            verify: None,
            verify_policy: FailurePolicy::default(),
        }
    }

    /// Write a generated record after this step succeeds
    pub fn with_record(mut self) -> Self {
        self.record = true;
        self
    }

    /// Attempt source verification after this step succeeds
    pub fn with_verification(mut self, target: VerifyTarget) -> Self {
        self.verify = Some(target);
        self
    }

    /// Halt the plan if verification of this step fails
    pub fn with_fatal_verification(mut self) -> Self {
        self.verify_policy = FailurePolicy::Fatal;
        self
    }

    /// Whether the step produces an address consumed by later steps
    pub fn produces_address(&self) -> bool {
        matches!(
            self.action,
            StepAction::Deploy { .. } | StepAction::ProxyDeploy { .. }
        )
    }

    /// The step references consumed by this step's arguments
    fn referenced_steps(&self) -> Vec<&str> {
        match &self.action {
            StepAction::Deploy { args, .. } => args.iter().filter_map(ArgValue::step_ref).collect(),
            StepAction::Call { target, args, .. } => target
                .step_ref()
                .into_iter()
                .chain(args.iter().filter_map(ArgValue::step_ref))
                .collect(),
            StepAction::ProxyDeploy { init_args, .. } => {
                init_args.iter().filter_map(ArgValue::step_ref).collect()
            }
            StepAction::ProxyUpgrade { proxy, .. } => proxy.step_ref().into_iter().collect(),
        }
    }
}

/// The key under which a proxy-deploy step also produces the address of the
/// admin contract the proxy created
pub fn admin_ref(step_name: &str) -> String {
    format!("{}_admin", step_name)
}

/// An ordered deployment plan. Order is significant: dependency is position,
/// and a step may only reference addresses produced by strictly earlier
/// steps.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    /// The steps, in execution order
    steps: Vec<Step>,
}

impl DeploymentPlan {
    /// Build a plan, validating that every step reference points at an
    /// address produced by a strictly earlier step and that producer names
    /// are unique. Violations fail here, before any on-chain action.
    pub fn new(steps: Vec<Step>) -> Result<Self, ScriptError> {
        let mut produced: Vec<String> = Vec::new();
        for step in &steps {
            for reference in step.referenced_steps() {
                if !produced.iter().any(|name| name == reference) {
                    return Err(ScriptError::Configuration(format!(
                        "step `{}` references `{}`, which no earlier step produces",
                        step.name, reference
                    )));
                }
            }
            if step.produces_address() {
                if produced.iter().any(|name| name == &step.name) {
                    return Err(ScriptError::Configuration(format!(
                        "duplicate producing step name `{}`",
                        step.name
                    )));
                }
                produced.push(step.name.clone());
                if matches!(step.action, StepAction::ProxyDeploy { .. }) {
                    produced.push(admin_ref(&step.name));
                }
            }
        }

        Ok(Self { steps })
    }

    /// The steps in execution order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

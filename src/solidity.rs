//! Calldata construction for contract deploys and method calls.
//!
//! All contract ABIs here are runtime artifact inputs, so calldata is built
//! through the dynamic ABI machinery; only the proxy-admin upgrade entry
//! point has a fixed signature.

use ethers::{
    abi::{encode, Abi, Token},
    types::{Address, Bytes},
    utils::id,
};

use crate::errors::ScriptError;

/// The proxy admin's upgrade entry point, per OpenZeppelin v5.
/// Upgrade calls can only be made to the proxy through its admin.
const UPGRADE_AND_CALL_SIGNATURE: &str = "upgradeAndCall(address,address,bytes)";

/// Encode the creation calldata for a constructor deploy: the contract's
/// creation bytecode followed by the ABI-encoded constructor arguments
pub fn encode_constructor(
    abi: &Abi,
    bytecode: &Bytes,
    args: &[Token],
) -> Result<Bytes, ScriptError> {
    if bytecode.is_empty() {
        return Err(ScriptError::CalldataConstruction(
            "artifact has no creation bytecode".to_string(),
        ));
    }

    match abi.constructor() {
        Some(constructor) => constructor
            .encode_input(bytecode.to_vec(), args)
            .map(Bytes::from)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string())),
        None if args.is_empty() => Ok(bytecode.clone()),
        None => Err(ScriptError::CalldataConstruction(
            "constructor arguments supplied for a contract without a constructor".to_string(),
        )),
    }
}

/// Encode a method call through the contract's ABI
pub fn encode_method_call(abi: &Abi, method: &str, args: &[Token]) -> Result<Bytes, ScriptError> {
    let function = abi
        .function(method)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
    function
        .encode_input(args)
        .map(Bytes::from)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
}

/// Hex-encode the bare constructor arguments, as submitted alongside a
/// verification request. The encoding must exactly match the on-chain
/// deployment constructor order.
pub fn encode_constructor_args_hex(args: &[Token]) -> String {
    if args.is_empty() {
        String::new()
    } else {
        hex::encode(encode(args))
    }
}

/// Calldata for `ProxyAdmin.upgradeAndCall(proxy, implementation, data)`
pub fn upgrade_and_call_calldata(
    proxy: Address,
    implementation: Address,
    data: Bytes,
) -> Bytes {
    let selector = id(UPGRADE_AND_CALL_SIGNATURE);
    let encoded = encode(&[
        Token::Address(proxy),
        Token::Address(implementation),
        Token::Bytes(data.to_vec()),
    ]);
    Bytes::from([selector.as_slice(), encoded.as_slice()].concat())
}

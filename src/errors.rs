//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// A required deployment parameter is missing or invalid,
    /// detected before any transaction is sent
    Configuration(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// The network endpoint is unreachable or returned an error
    Provider(String),
    /// On-chain execution rejected a call
    Revert(String),
    /// A transaction was not mined within the bounded confirmation wait
    ConfirmationTimeout(String),
    /// Explorer verification failed for a reason other than "already verified"
    Verification(String),
    /// No compiled artifact exists for the requested contract name
    AbiNotFound(String),
    /// Error parsing a compilation artifact
    ArtifactParsing(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// The upgrade manifest has no record of an on-chain proxy
    ManifestMismatch(String),
    /// Error reading a file
    ReadFile(String),
    /// Error writing a file
    WriteFile(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Configuration(s) => write!(f, "configuration error: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::Provider(s) => write!(f, "provider error: {}", s),
            ScriptError::Revert(s) => write!(f, "transaction reverted: {}", s),
            ScriptError::ConfirmationTimeout(s) => {
                write!(f, "timed out awaiting confirmation: {}", s)
            }
            ScriptError::Verification(s) => write!(f, "verification failed: {}", s),
            ScriptError::AbiNotFound(s) => write!(f, "no artifact found for contract: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ManifestMismatch(s) => {
                write!(f, "proxy missing from upgrade manifest: {}", s)
            }
            ScriptError::ReadFile(s) => write!(f, "error reading file: {}", s),
            ScriptError::WriteFile(s) => write!(f, "error writing file: {}", s),
        }
    }
}

impl Error for ScriptError {}

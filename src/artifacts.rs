//! Resolution of compiled contract artifacts and persistence of the
//! generated address/ABI records consumed by downstream tooling

use std::{
    fs,
    path::{Path, PathBuf},
};

use ethers::{
    abi::Abi,
    types::{Address, Bytes},
    utils::to_checksum,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    constants::{ARTIFACT_EXTENSION, GENERATED_EXTENSION},
    errors::ScriptError,
};

/// A compiled contract artifact: the ABI plus creation bytecode
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    /// Parsed ABI, used for calldata construction
    pub abi: Abi,
    /// The ABI as raw JSON, preserved verbatim for generated records
    pub abi_json: serde_json::Value,
    /// Creation bytecode; empty for ABI-only artifacts
    pub bytecode: Bytes,
}

/// The on-disk shape of a compiled artifact file
#[derive(Deserialize)]
struct RawArtifact {
    /// The ABI entries
    abi: serde_json::Value,
    /// Hex-encoded creation bytecode
    bytecode: Option<String>,
}

/// Resolves contract ABIs and bytecode by contract name from the
/// compiled-artifacts directory
#[derive(Debug, Clone)]
pub struct AbiResolver {
    /// The directory holding `<Name>.json` artifact files
    artifacts_dir: PathBuf,
}

impl AbiResolver {
    /// Construct a resolver over the given artifacts directory
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
        }
    }

    /// Load the artifact for the given contract name.
    ///
    /// Fails with [`ScriptError::AbiNotFound`] if the contract was never
    /// compiled under that name.
    pub fn load(&self, name: &str) -> Result<ContractArtifact, ScriptError> {
        let path = self
            .artifacts_dir
            .join(name)
            .with_extension(ARTIFACT_EXTENSION);
        if !path.exists() {
            return Err(ScriptError::AbiNotFound(name.to_string()));
        }

        let contents =
            fs::read_to_string(&path).map_err(|e| ScriptError::ReadFile(e.to_string()))?;
        let raw: RawArtifact = serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        let abi: Abi = serde_json::from_value(raw.abi.clone())
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
        let bytecode = match raw.bytecode {
            Some(hex_str) => {
                let stripped = hex_str.trim_start_matches("0x");
                Bytes::from(
                    hex::decode(stripped)
                        .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?,
                )
            }
            None => Bytes::new(),
        };

        Ok(ContractArtifact {
            abi,
            abi_json: raw.abi,
            bytecode,
        })
    }
}

/// Writes the versioned name/address/ABI record each successful deployment
/// produces. One file per contract name, overwritten on re-runs, making the
/// record idempotent-by-last-write.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Resolver for the contract ABIs embedded in each record
    resolver: AbiResolver,
    /// Output directory for generated records
    generated_dir: PathBuf,
    /// Version tag stamped into each record
    version: String,
}

impl ArtifactStore {
    /// Construct a store writing under the given generated directory
    pub fn new(resolver: AbiResolver, generated_dir: impl Into<PathBuf>, version: String) -> Self {
        Self {
            resolver,
            generated_dir: generated_dir.into(),
            version,
        }
    }

    /// Resolve the ABI for `name` and write its record for `address`,
    /// overwriting any prior record of the same name.
    ///
    /// The record is a JS constant module exporting the version tag, the
    /// checksum address, and the full ABI, which is the sole integration
    /// point for code that later calls the deployed contract.
    pub fn write_record(&self, name: &str, address: Address) -> Result<PathBuf, ScriptError> {
        let artifact = self.resolver.load(name)?;

        let camel = camel_case_export(name);
        let abi_literal = serde_json::to_string_pretty(&artifact.abi_json)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
        let checksum = to_checksum(&address, None /* chain id */);

        let contents = format!(
            "const {camel}Version = \"{version}\";\n\n\
             const {camel}Address = \"{checksum}\";\n\n\
             const {camel}Abi = {abi_literal};\n\n\
             module.exports = {{ {camel}Address, {camel}Abi, {camel}Version }};",
            camel = camel,
            version = self.version,
            checksum = checksum,
            abi_literal = abi_literal,
        );

        fs::create_dir_all(&self.generated_dir)
            .map_err(|e| ScriptError::WriteFile(e.to_string()))?;
        let path = self
            .generated_dir
            .join(kebab_case_stem(name))
            .with_extension(GENERATED_EXTENSION);
        fs::write(&path, contents).map_err(|e| ScriptError::WriteFile(e.to_string()))?;

        info!("record written to {}", path.display());
        Ok(path)
    }

    /// The directory records are written under
    pub fn generated_dir(&self) -> &Path {
        &self.generated_dir
    }
}

/// Derive the record file stem from a contract name: a hyphen is inserted
/// between each lowercase letter and the uppercase letter following it,
/// then the whole name is lowercased. `TokenLock` becomes `token-lock`,
/// an all-caps run like `SCLock` collapses to `sclock`.
pub fn kebab_case_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if prev_lower && c.is_ascii_uppercase() {
            out.push('-');
        }
        prev_lower = c.is_ascii_lowercase();
        out.extend(c.to_lowercase());
    }
    out
}

/// The camel-cased export prefix used inside a record: the contract name
/// with its first character lowercased
fn camel_case_export(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ethers::types::Address;
    use tempfile::tempdir;

    use super::{camel_case_export, kebab_case_stem, AbiResolver, ArtifactStore};
    use crate::errors::ScriptError;

    /// A minimal artifact with a one-entry ABI
    const TOKEN_ARTIFACT: &str = r#"{
        "contractName": "Token",
        "abi": [{"type": "function", "name": "setMinter", "inputs": [{"name": "minter", "type": "address"}], "outputs": [], "stateMutability": "nonpayable"}],
        "bytecode": "0x6080604052"
    }"#;

    #[test]
    fn test_kebab_case_stem() {
        assert_eq!(kebab_case_stem("TokenLock"), "token-lock");
        assert_eq!(kebab_case_stem("Minter"), "minter");
        // All-caps runs have no lowercase-to-uppercase boundary
        assert_eq!(kebab_case_stem("SCLock"), "sclock");
        assert_eq!(kebab_case_stem("PermissionsManager"), "permissions-manager");
    }

    #[test]
    fn test_camel_case_export() {
        assert_eq!(camel_case_export("TokenLock"), "tokenLock");
        assert_eq!(camel_case_export("minter"), "minter");
    }

    #[test]
    fn test_missing_artifact_is_abi_not_found() {
        let dir = tempdir().unwrap();
        let resolver = AbiResolver::new(dir.path());
        let err = resolver.load("NeverCompiled").unwrap_err();
        assert!(matches!(err, ScriptError::AbiNotFound(_)));
    }

    #[test]
    fn test_record_contents() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Token.json"), TOKEN_ARTIFACT).unwrap();

        let store = ArtifactStore::new(
            AbiResolver::new(dir.path()),
            dir.path().join("generated"),
            "3".to_string(),
        );
        let address = Address::from_low_u64_be(0xabcd);
        let path = store.write_record("Token", address).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("const tokenVersion = \"3\";"));
        assert!(contents.contains("const tokenAddress = \"0x"));
        assert!(contents.contains("setMinter"));
        assert!(contents.ends_with("module.exports = { tokenAddress, tokenAbi, tokenVersion };"));
    }

    #[test]
    fn test_write_record_overwrites() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Token.json"), TOKEN_ARTIFACT).unwrap();

        let store = ArtifactStore::new(
            AbiResolver::new(dir.path()),
            dir.path().join("generated"),
            "0".to_string(),
        );
        let first = Address::from_low_u64_be(1);
        let second = Address::from_low_u64_be(2);
        store.write_record("Token", first).unwrap();
        let path = store.write_record("Token", second).unwrap();

        // Exactly one file, reflecting only the most recent address
        let entries: Vec<_> = fs::read_dir(store.generated_dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("0x0000000000000000000000000000000000000002"));
        assert!(!contents.contains("0x0000000000000000000000000000000000000001"));
    }
}

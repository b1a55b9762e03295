use std::{path::Path, sync::Arc};

use ethers::{abi::Abi, contract::ContractFactory, providers::Middleware, types::Bytes};
use eyre::{bail, Context};
use serde::Deserialize;

/// Compiled contract as written by hardhat (`artifacts/**/X.json`) or
/// hardhat-deploy (`deployments/<network>/X.json`). Only the fields needed to
/// deploy are read.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    #[serde(rename = "contractName", default)]
    pub contract_name: Option<String>,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl Artifact {
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        let artifact: Artifact =
            serde_json::from_str(json).context("Failed to parse contract artifact")?;
        if artifact.bytecode.is_empty() {
            bail!("Artifact has no bytecode (is the contract abstract?)");
        }
        Ok(artifact)
    }

    pub fn load(path: &Path) -> eyre::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("In artifact {}", path.display()))
    }

    pub fn factory<M: Middleware>(&self, client: Arc<M>) -> ContractFactory<M> {
        ContractFactory::new(self.abi.clone(), self.bytecode.clone(), client)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ARTIFACT: &str = r#"{
        "_format": "hh-sol-artifact-1",
        "contractName": "SmartKetubah",
        "abi": [
            {
                "inputs": [
                    {"internalType": "string", "name": "uri", "type": "string"},
                    {"internalType": "string", "name": "name", "type": "string"},
                    {"internalType": "string", "name": "symbol", "type": "string"}
                ],
                "stateMutability": "nonpayable",
                "type": "constructor"
            },
            {
                "inputs": [],
                "name": "recordConsent",
                "outputs": [],
                "stateMutability": "nonpayable",
                "type": "function"
            }
        ],
        "bytecode": "0x6080604052"
    }"#;

    #[test]
    fn test_parse_artifact() {
        let artifact = Artifact::from_json(ARTIFACT).unwrap();
        assert_eq!(artifact.contract_name.as_deref(), Some("SmartKetubah"));
        assert_eq!(artifact.bytecode.to_vec(), vec![0x60, 0x80, 0x60, 0x40, 0x52]);
        assert_eq!(artifact.abi.constructor().unwrap().inputs.len(), 3);
        assert!(artifact.abi.function("recordConsent").is_ok());
    }

    #[test]
    fn test_reject_empty_bytecode() {
        let json = r#"{"abi": [], "bytecode": "0x"}"#;
        assert!(Artifact::from_json(json).is_err());
    }
}

//! The per-environment chains document (`<chains-dir>/<env>.json`).
//!
//! The document is kept as an untyped JSON tree so that fields this tool does not know about
//! survive a load/save cycle unchanged and in their original order. Only the `axelar` connection
//! parameters get a typed view.

use std::fs;
use std::path::{Path, PathBuf};

use cosmrs::tendermint::chain::Id;
use error_stack::{bail, report, Result, ResultExt};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::broadcaster::GasLimit;
use crate::dec_coin::DecCoin;

pub type Section = Map<String, Value>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read chains config from {0}")]
    Read(PathBuf),
    #[error("failed to write chains config to {0}")]
    Write(PathBuf),
    #[error("chains config is malformed")]
    Malformed,
    #[error("field '{0}' of the chains config must be an object")]
    NotAnObject(String),
    #[error("the axelar section of the chains config is invalid")]
    InvalidAxelarSection,
    #[error("contract '{0}' is not configured")]
    MissingContract(String),
    #[error("contract '{contract}' has no address configured{}", .chain.as_ref().map(|c| format!(" for chain '{c}'")).unwrap_or_default())]
    MissingAddress {
        contract: String,
        chain: Option<String>,
    },
}

/// Typed view of the `axelar` section.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AxelarConfig {
    pub chain_id: Id,
    #[serde(default)]
    pub grpc: Option<String>,
    pub gas_price: DecCoin,
    #[serde(default)]
    pub gas_limit: GasLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainsConfig {
    root: Section,
}

impl ChainsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).change_context(Error::Read(path.to_path_buf()))?;

        match serde_json::from_str::<Value>(&content)
            .change_context(Error::Read(path.to_path_buf()))?
        {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(report!(Error::Malformed))
                .attach_printable("the top level of the document must be an object"),
        }
    }

    /// Writes the document back with two-space indentation and a trailing newline.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let mut content =
            serde_json::to_string_pretty(&self.root).change_context(Error::Malformed)?;
        content.push('\n');

        fs::write(path, content).change_context(Error::Write(path.to_path_buf()))
    }

    pub fn axelar(&self) -> Result<AxelarConfig, Error> {
        let section = self
            .root
            .get("axelar")
            .ok_or(report!(Error::InvalidAxelarSection))
            .attach_printable("missing 'axelar' section")?;

        AxelarConfig::deserialize(section).change_context(Error::InvalidAxelarSection)
    }

    pub fn contract_names(&self) -> Vec<String> {
        self.contracts()
            .map(|contracts| contracts.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contract(&self, name: &str) -> Option<&Section> {
        self.contracts()?.get(name)?.as_object()
    }

    /// Returns the contract section, creating it (and `axelar.contracts`) when absent.
    pub fn contract_mut(&mut self, name: &str) -> Result<&mut Section, Error> {
        let axelar = object_entry(&mut self.root, "axelar")?;
        let contracts = object_entry(axelar, "contracts")?;

        object_entry(contracts, name)
    }

    pub fn chain_contract(&self, name: &str, chain: &str) -> Option<&Section> {
        self.contract(name)?.get(chain)?.as_object()
    }

    pub fn chain_contract_mut(&mut self, name: &str, chain: &str) -> Result<&mut Section, Error> {
        object_entry(self.contract_mut(name)?, chain)
    }

    /// Names of the per-chain entries of a contract section.
    pub fn contract_chains(&self, name: &str) -> Vec<String> {
        self.contract(name)
            .map(|section| {
                section
                    .iter()
                    .filter(|(_, value)| value.is_object())
                    .map(|(chain, _)| chain.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Address of a singleton contract, or of the per-chain instance when `chain` is given.
    pub fn contract_address(&self, name: &str, chain: Option<&str>) -> Result<String, Error> {
        let section = match chain {
            Some(chain) => self.chain_contract(name, chain),
            None => self.contract(name),
        };

        let Some(section) = section else {
            bail!(Error::MissingContract(name.to_string()));
        };

        section
            .get("address")
            .and_then(Value::as_str)
            .filter(|address| !address.is_empty())
            .map(ToString::to_string)
            .ok_or(report!(Error::MissingAddress {
                contract: name.to_string(),
                chain: chain.map(ToString::to_string),
            }))
    }

    /// The chain's id on the Axelar network, which may differ from its key in `chains`.
    pub fn chain_axelar_id(&self, chain: &str) -> String {
        self.root
            .get("chains")
            .and_then(|chains| chains.get(chain))
            .and_then(|chain| chain.get("axelarId"))
            .and_then(Value::as_str)
            .unwrap_or(chain)
            .to_string()
    }

    fn contracts(&self) -> Option<&Section> {
        self.root.get("axelar")?.get("contracts")?.as_object()
    }
}

fn object_entry<'a>(parent: &'a mut Section, key: &str) -> Result<&'a mut Section, Error> {
    parent
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(report!(Error::NotAnObject(key.to_string())))
}

//! Instantiate messages assembled from the contract sections of the chains config.

use error_stack::{bail, report, Result};
use serde_json::{json, Value};
use thiserror::Error;

use crate::chains_config::{ChainsConfig, Section};

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("no instantiate message builder for contract '{0}', pass the message explicitly")]
    UnsupportedContract(String),
    #[error("contract '{0}' is deployed per chain and requires a chain")]
    MissingChain(String),
    #[error("missing '{field}' in the config of contract '{contract}'")]
    MissingField { contract: String, field: String },
}

/// Chain codec contract names, and the prover `encoder` value each one replaces.
pub const CHAIN_CODECS: [(&str, &str); 3] = [
    ("ChainCodecEvm", "abi"),
    ("ChainCodecSui", "bcs"),
    ("ChainCodecStellar", "stellar_xdr"),
];

pub fn is_chain_codec(contract: &str) -> bool {
    CHAIN_CODECS.iter().any(|(name, _)| *name == contract)
}

/// Contracts with one instance per connected chain, configured under `<Contract>.<chain>`.
pub fn is_per_chain(contract: &str) -> bool {
    matches!(contract, "VotingVerifier" | "Gateway" | "MultisigProver") || is_chain_codec(contract)
}

pub fn build(config: &ChainsConfig, contract: &str, chain: Option<&str>) -> Result<Value, Error> {
    let fields = Fields {
        config,
        contract,
        chain,
    };

    if is_per_chain(contract) && chain.is_none() {
        bail!(Error::MissingChain(contract.to_string()));
    }

    match contract {
        "Router" => Ok(json!({
            "admin_address": fields.own("adminAddress")?,
            "governance_address": fields.own("governanceAddress")?,
            "axelarnet_gateway": fields.address_of("AxelarnetGateway")?,
            "coordinator_address": fields.address_of("Coordinator")?,
        })),
        "Coordinator" => Ok(json!({
            "governance_address": fields.own("governanceAddress")?,
            "service_registry": fields.address_of("ServiceRegistry")?,
        })),
        "InterchainTokenService" => Ok(json!({
            "governance_address": fields.own("governanceAddress")?,
            "admin_address": fields.own("adminAddress")?,
            "axelarnet_gateway_address": fields.address_of("AxelarnetGateway")?,
            "operator_address": fields.own("operatorAddress")?,
        })),
        "VotingVerifier" => Ok(json!({
            "governance_address": fields.own("governanceAddress")?,
            "service_registry_address": fields.address_of("ServiceRegistry")?,
            "service_name": fields.own("serviceName")?,
            "source_gateway_address": fields.own("sourceGatewayAddress")?,
            "voting_threshold": fields.own("votingThreshold")?,
            "block_expiry": fields.own("blockExpiry")?,
            "confirmation_height": fields.own("confirmationHeight")?,
            "source_chain": fields.axelar_id(),
            "rewards_address": fields.address_of("Rewards")?,
            "msg_id_format": fields.own("msgIdFormat")?,
            "address_format": fields.own("addressFormat")?,
        })),
        "Gateway" => Ok(json!({
            "verifier_address": fields.chain_address_of("VotingVerifier")?,
            "router_address": fields.address_of("Router")?,
        })),
        "MultisigProver" => Ok(json!({
            "admin_address": fields.own("adminAddress")?,
            "governance_address": fields.own("governanceAddress")?,
            "gateway_address": fields.chain_address_of("Gateway")?,
            "multisig_address": fields.address_of("Multisig")?,
            "coordinator_address": fields.address_of("Coordinator")?,
            "service_registry_address": fields.address_of("ServiceRegistry")?,
            "voting_verifier_address": fields.chain_address_of("VotingVerifier")?,
            "chain_codec_address": fields.own("chainCodecAddress")?,
            "signing_threshold": fields.own("signingThreshold")?,
            "service_name": fields.own("serviceName")?,
            "chain_name": fields.axelar_id(),
            "verifier_set_diff_threshold": fields.own("verifierSetDiffThreshold")?,
            "key_type": fields.own("keyType")?,
            "domain_separator": strip_hex_prefix(fields.own("domainSeparator")?),
            "notify_signing_session": fields.optional("notifySigningSession").unwrap_or(Value::Bool(false)),
            "expect_full_message_payloads": fields.optional("expectFullMessagePayloads").unwrap_or(Value::Bool(false)),
            "sig_verifier_address": fields.optional("sigVerifierAddress").unwrap_or(Value::Null),
        })),
        codec if is_chain_codec(codec) => {
            let prover = fields.prover()?;
            let multisig_prover = match fields.optional("multisigProver") {
                Some(address) => address,
                None => field(prover, "MultisigProver", "address")?,
            };

            Ok(json!({
                "multisig_prover": multisig_prover,
                "domain_separator": strip_hex_prefix(field(prover, "MultisigProver", "domainSeparator")?),
            }))
        }
        _ => Err(report!(Error::UnsupportedContract(contract.to_string()))),
    }
}

struct Fields<'a> {
    config: &'a ChainsConfig,
    contract: &'a str,
    chain: Option<&'a str>,
}

impl Fields<'_> {
    /// The contract's own entry: the per-chain record falling back to the section itself.
    fn own(&self, name: &str) -> Result<Value, Error> {
        self.optional(name).ok_or(report!(Error::MissingField {
            contract: self.contract.to_string(),
            field: name.to_string(),
        }))
    }

    fn optional(&self, name: &str) -> Option<Value> {
        let chain_entry = self
            .chain
            .and_then(|chain| self.config.chain_contract(self.contract, chain))
            .and_then(|entry| entry.get(name));

        chain_entry
            .or_else(|| self.config.contract(self.contract)?.get(name))
            .filter(|value| !value.is_null())
            .cloned()
    }

    fn address_of(&self, contract: &str) -> Result<Value, Error> {
        let address = self
            .config
            .contract(contract)
            .and_then(|section| section.get("address"));

        self.required(contract, address)
    }

    fn chain_address_of(&self, contract: &str) -> Result<Value, Error> {
        let address = self
            .chain
            .and_then(|chain| self.config.chain_contract(contract, chain))
            .and_then(|entry| entry.get("address"));

        self.required(contract, address)
    }

    fn required(&self, contract: &str, value: Option<&Value>) -> Result<Value, Error> {
        value
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or(report!(Error::MissingField {
                contract: contract.to_string(),
                field: "address".to_string(),
            }))
    }

    fn prover(&self) -> Result<&Section, Error> {
        self.chain
            .and_then(|chain| self.config.chain_contract("MultisigProver", chain))
            .ok_or(report!(Error::MissingField {
                contract: "MultisigProver".to_string(),
                field: self.chain.unwrap_or_default().to_string(),
            }))
    }

    fn axelar_id(&self) -> Value {
        Value::String(
            self.chain
                .map(|chain| self.config.chain_axelar_id(chain))
                .unwrap_or_default(),
        )
    }
}

fn field(section: &Section, contract: &str, name: &str) -> Result<Value, Error> {
    section
        .get(name)
        .filter(|value| !value.is_null())
        .cloned()
        .ok_or(report!(Error::MissingField {
            contract: contract.to_string(),
            field: name.to_string(),
        }))
}

fn strip_hex_prefix(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.strip_prefix("0x").unwrap_or(&s).to_string()),
        other => other,
    }
}

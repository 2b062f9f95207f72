use clap::Subcommand;
use error_stack::{Result, ResultExt};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::chains_config::ChainsConfig;
use crate::commands::{axelar_config, Context};
use crate::cosmos::{self, CosmosClient};
use crate::msgs::its::{self, TokenId};
use crate::msgs::{multisig_prover, voting_verifier};
use crate::Error;

const ITS_HUB: &str = "InterchainTokenService";

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Code id, admin, label and cw2 version of a contract
    ContractInfo {
        contract: String,
        #[arg(long)]
        chain: Option<String>,
    },
    /// cw2 versions of every configured contract
    ContractVersions,
    /// A voting verifier poll
    Poll {
        poll_id: String,
        #[arg(long)]
        chain: String,
    },
    /// The verifier set of a multisig prover
    VerifierSet {
        #[arg(long)]
        chain: String,
        /// Query the pending verifier set instead of the active one
        #[arg(long)]
        next: bool,
    },
    /// Chain config registered on the ITS hub
    ItsChain { chain: String },
    /// Token config registered on the ITS hub
    TokenConfig { token_id: TokenId },
    /// Token instance of a chain registered on the ITS hub
    TokenInstance { chain: String, token_id: TokenId },
    /// Arbitrary smart query
    Smart {
        contract: String,
        /// Query msg as JSON
        #[arg(value_parser = parse_json)]
        query: Value,
        #[arg(long)]
        chain: Option<String>,
    },
}

fn parse_json(value: &str) -> std::result::Result<Value, serde_json::Error> {
    serde_json::from_str(value)
}

pub async fn run(ctx: Context, command: Command) -> Result<Option<String>, Error> {
    let config = ctx.load_chains_config()?;
    let mut client = ctx.client(&axelar_config(&config)?).await?;

    let answer = query(&mut client, &config, command).await?;

    serde_json::to_string_pretty(&answer)
        .map(Some)
        .change_context(Error::Query)
}

pub async fn query<T>(client: &mut T, config: &ChainsConfig, command: Command) -> Result<Value, Error>
where
    T: CosmosClient,
{
    match command {
        Command::ContractInfo { contract, chain } => {
            let address = address(config, &contract, chain.as_deref())?;
            contract_info(client, &address).await
        }
        Command::ContractVersions => contract_versions(client, config).await,
        Command::Poll { poll_id, chain } => {
            let address = address(config, "VotingVerifier", Some(&chain))?;
            smart(client, &address, &voting_verifier::QueryMsg::Poll { poll_id }).await
        }
        Command::VerifierSet { chain, next } => {
            let address = address(config, "MultisigProver", Some(&chain))?;
            let msg = if next {
                multisig_prover::QueryMsg::NextVerifierSet
            } else {
                multisig_prover::QueryMsg::CurrentVerifierSet
            };
            smart(client, &address, &msg).await
        }
        Command::ItsChain { chain } => {
            let msg = its::QueryMsg::ItsChain {
                chain: config.chain_axelar_id(&chain),
            };
            smart(client, &address(config, ITS_HUB, None)?, &msg).await
        }
        Command::TokenConfig { token_id } => {
            let msg = its::QueryMsg::TokenConfig { token_id };
            smart(client, &address(config, ITS_HUB, None)?, &msg).await
        }
        Command::TokenInstance { chain, token_id } => {
            let msg = its::QueryMsg::TokenInstance {
                chain: config.chain_axelar_id(&chain),
                token_id,
            };
            smart(client, &address(config, ITS_HUB, None)?, &msg).await
        }
        Command::Smart {
            contract,
            query,
            chain,
        } => {
            let address = address(config, &contract, chain.as_deref())?;
            smart(client, &address, &query).await
        }
    }
}

async fn smart<T, Q>(client: &mut T, address: &str, msg: &Q) -> Result<Value, Error>
where
    T: CosmosClient,
    Q: Serialize,
{
    cosmos::query_contract(client, address, msg)
        .await
        .change_context(Error::Query)
}

async fn contract_info<T>(client: &mut T, address: &str) -> Result<Value, Error>
where
    T: CosmosClient,
{
    let info = cosmos::contract_info(client, address)
        .await
        .change_context(Error::Query)?;
    let version = cosmos::contract_version(client, address)
        .await
        .change_context(Error::Query)?;

    Ok(json!({
        "address": address,
        "code_id": info.code_id,
        "creator": info.creator,
        "admin": info.admin,
        "label": info.label,
        "version": version,
    }))
}

/// cw2 versions keyed by contract, and by chain for per-chain contracts. Instances without an
/// address are left out.
async fn contract_versions<T>(client: &mut T, config: &ChainsConfig) -> Result<Value, Error>
where
    T: CosmosClient,
{
    let mut versions = Map::new();

    for contract in config.contract_names() {
        if let Ok(address) = config.contract_address(&contract, None) {
            versions.insert(contract, version(client, &address).await?);
            continue;
        }

        let mut chains = Map::new();
        for chain in config.contract_chains(&contract) {
            if let Ok(address) = config.contract_address(&contract, Some(&chain)) {
                chains.insert(chain, version(client, &address).await?);
            }
        }

        if !chains.is_empty() {
            versions.insert(contract, Value::Object(chains));
        }
    }

    Ok(Value::Object(versions))
}

async fn version<T>(client: &mut T, address: &str) -> Result<Value, Error>
where
    T: CosmosClient,
{
    let version = cosmos::contract_version(client, address)
        .await
        .change_context(Error::Query)?;

    Ok(version.map_or(Value::Null, |version| Value::String(version.version)))
}

fn address(config: &ChainsConfig, contract: &str, chain: Option<&str>) -> Result<String, Error> {
    config
        .contract_address(contract, chain)
        .change_context(Error::InvalidChainsConfig)
}

use cosmrs::proto::cosmos::base::query::v1beta1::PageRequest;
use cosmrs::proto::cosmwasm::wasm::v1::QueryCodesRequest;
use error_stack::{Result, ResultExt};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::chains_config::{ChainsConfig, Section};
use crate::commands::{axelar_config, Context};
use crate::cosmos::{self, CosmosClient};
use crate::Error;

const CODES_PAGE_SIZE: u64 = 100;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Only sync these contracts; defaults to every contract in the chains config
    #[arg(long, value_delimiter = ',')]
    pub contracts: Vec<String>,
}

pub async fn run(ctx: Context, args: Args) -> Result<Option<String>, Error> {
    let mut config = ctx.load_chains_config()?;
    let mut client = ctx.client(&axelar_config(&config)?).await?;

    let lines = sync(&mut client, &mut config, &args.contracts).await?;
    ctx.save_chains_config(&config)?;

    Ok(Some(lines.join("\n")))
}

/// Updates the `codeId` fields of the given contracts (all when empty) from the chain and returns
/// one summary line per updated entry.
pub async fn sync<T>(
    client: &mut T,
    config: &mut ChainsConfig,
    contracts: &[String],
) -> Result<Vec<String>, Error>
where
    T: CosmosClient,
{
    let contracts = if contracts.is_empty() {
        config.contract_names()
    } else {
        contracts.to_vec()
    };

    let mut lines = vec![];
    for contract in contracts {
        lines.extend(sync_contract(client, config, &contract).await?);
    }

    Ok(lines)
}

async fn sync_contract<T>(
    client: &mut T,
    config: &mut ChainsConfig,
    contract: &str,
) -> Result<Vec<String>, Error>
where
    T: CosmosClient,
{
    let Some(section) = config.contract(contract).cloned() else {
        warn!(contract, "contract is not configured");
        return Ok(vec![format!("{contract}: not configured, skipped")]);
    };
    let old = code_id_field(&section);

    if let Some(hash) = string_field(&section, "storeCodeProposalCodeHash") {
        let Some(new) = code_id_by_checksum(client, &hash)
            .await
            .change_context(Error::Query)?
        else {
            warn!(contract, hash, "no stored code matches the proposal code hash");
            return Ok(vec![format!("{contract}: no stored code with hash {hash}, skipped")]);
        };

        set_code_id(contract_mut(config, contract)?, new);
        return Ok(vec![change(contract, old, new)]);
    }

    if let Some(address) = string_field(&section, "address") {
        let new = on_chain_code_id(client, &address).await?;

        set_code_id(contract_mut(config, contract)?, new);
        return Ok(vec![change(contract, old, new)]);
    }

    let chains: Vec<(String, String)> = config
        .contract_chains(contract)
        .into_iter()
        .filter_map(|chain| {
            let address = string_field(config.chain_contract(contract, &chain)?, "address")?;
            Some((chain, address))
        })
        .collect();

    if chains.is_empty() {
        return Ok(vec![format!("{contract}: no code hash or address, skipped")]);
    }

    let mut code_ids = Vec::with_capacity(chains.len());
    for (chain, address) in chains {
        code_ids.push((chain, on_chain_code_id(client, &address).await?));
    }

    let mut lines = vec![];

    // the section keeps its code id; without one, the first instance provides it
    let section_code_id = match old {
        Some(code_id) => code_id,
        None => {
            let first = code_ids[0].1;
            set_code_id(contract_mut(config, contract)?, first);
            lines.push(change(contract, None, first));
            first
        }
    };

    for (chain, new) in code_ids {
        let entry = config
            .chain_contract_mut(contract, &chain)
            .change_context(Error::InvalidChainsConfig)?;
        let chain_old = code_id_field(entry);
        let label = format!("{contract}.{chain}");

        if new == section_code_id {
            if entry.remove("codeId").is_some() {
                lines.push(format!("{label}: {new} (same as the contract section)"));
            }
            continue;
        }

        set_code_id(entry, new);
        lines.push(change(&label, chain_old, new));
    }

    if lines.is_empty() {
        lines.push(change(contract, old, section_code_id));
    }

    Ok(lines)
}

/// Newest stored code whose checksum equals the hex encoded `checksum`.
pub async fn code_id_by_checksum<T>(
    client: &mut T,
    checksum: &str,
) -> Result<Option<u64>, cosmos::Error>
where
    T: CosmosClient,
{
    let checksum = checksum
        .strip_prefix("0x")
        .unwrap_or(checksum)
        .to_lowercase();
    let mut key = vec![];

    loop {
        let res = client
            .codes(QueryCodesRequest {
                pagination: Some(PageRequest {
                    key: key.clone(),
                    limit: CODES_PAGE_SIZE,
                    reverse: true,
                    ..Default::default()
                }),
            })
            .await?;

        if let Some(code) = res
            .code_infos
            .iter()
            .find(|code| hex::encode(&code.data_hash) == checksum)
        {
            return Ok(Some(code.code_id));
        }

        match res.pagination.map(|page| page.next_key) {
            Some(next_key) if !next_key.is_empty() => key = next_key,
            _ => return Ok(None),
        }
    }
}

async fn on_chain_code_id<T>(client: &mut T, address: &str) -> Result<u64, Error>
where
    T: CosmosClient,
{
    cosmos::contract_info(client, address)
        .await
        .map(|info| info.code_id)
        .change_context(Error::Query)
}

fn set_code_id(section: &mut Section, code_id: u64) {
    section.insert("codeId".to_string(), json!(code_id));
}

fn contract_mut<'a>(
    config: &'a mut ChainsConfig,
    contract: &str,
) -> Result<&'a mut Section, Error> {
    config
        .contract_mut(contract)
        .change_context(Error::InvalidChainsConfig)
}

fn change(label: &str, old: Option<u64>, new: u64) -> String {
    info!(contract = label, ?old, new, "synced code id");

    match old {
        Some(old) if old == new => format!("{label}: {new} (unchanged)"),
        Some(old) => format!("{label}: {old} -> {new}"),
        None => format!("{label}: none -> {new}"),
    }
}

fn code_id_field(section: &Section) -> Option<u64> {
    section.get("codeId").and_then(Value::as_u64)
}

fn string_field(section: &Section, name: &str) -> Option<String> {
    section
        .get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use cosmrs::{AccountId, Any};
use error_stack::{report, Result, ResultExt};
use flate2::write::GzEncoder;
use flate2::Compression;
use heck::ToSnakeCase;
use k256::sha2::{Digest, Sha256};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::broadcaster::Broadcaster;
use crate::chains_config::{ChainsConfig, Section};
use crate::commands::code_ids::code_id_by_checksum;
use crate::commands::{axelar_config, Context};
use crate::cosmos::CosmosClient;
use crate::events::{self, CODE_ID, CONTRACT_ADDRESS, INSTANTIATE, STORE_CODE};
use crate::msgs;
use crate::msgs::instantiate as instantiate_msgs;
use crate::Error;

const PROVER: &str = "MultisigProver";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store the contract's wasm code on chain
    Upload(UploadArgs),
    /// Instantiate a stored contract code
    Instantiate(InstantiateArgs),
    /// Store the contract's wasm code and instantiate it
    UploadInstantiate {
        #[command(flatten)]
        instantiate: InstantiateArgs,
        /// Directory containing the compiled contracts; defaults to the configured artifact dir
        #[arg(long)]
        artifact_dir: Option<PathBuf>,
    },
    /// Migrate an instantiated contract to a new code id
    Migrate(MigrateArgs),
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Contract name as used in the chains config, e.g. VotingVerifier
    pub contract: String,
    /// Directory containing the compiled contracts; defaults to the configured artifact dir
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct InstantiateArgs {
    pub contract: String,
    /// Chain of a per-chain contract instance
    #[arg(long)]
    pub chain: Option<String>,
    /// Code id to instantiate; defaults to the code id in the chains config
    #[arg(long, conflicts_with = "fetch_code_id")]
    pub code_id: Option<u64>,
    /// Look up the newest stored code matching the contract's storeCodeProposalCodeHash
    #[arg(long)]
    pub fetch_code_id: bool,
    /// Instantiate at a predictable address derived from this salt
    #[arg(long)]
    pub salt: Option<String>,
    /// Contract admin; defaults to the sender
    #[arg(long)]
    pub admin: Option<String>,
    #[arg(long)]
    pub label: Option<String>,
    /// Instantiate msg as JSON, replacing the one built from the chains config
    #[arg(long, value_parser = parse_json)]
    pub msg: Option<Value>,
}

#[derive(clap::Args, Debug)]
pub struct MigrateArgs {
    pub contract: String,
    #[arg(long)]
    pub chain: Option<String>,
    /// Target code id; defaults to the contract's lastUploadedCodeId
    #[arg(long)]
    pub code_id: Option<u64>,
    /// Migrate msg as JSON
    #[arg(long, value_parser = parse_json, default_value = "{}")]
    pub msg: Value,
}

fn parse_json(value: &str) -> std::result::Result<Value, serde_json::Error> {
    serde_json::from_str(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub code_id: u64,
    pub checksum: String,
}

pub async fn run(ctx: Context, command: Command) -> Result<Option<String>, Error> {
    let mut config = ctx.load_chains_config()?;
    let axelar = axelar_config(&config)?;
    let client = ctx.client(&axelar).await?;
    let mut broadcaster = ctx.broadcaster(client, ctx.wallet(0)?, &axelar);

    let output = match command {
        Command::Upload(args) => {
            let dir = args
                .artifact_dir
                .unwrap_or_else(|| ctx.settings.artifact_dir.clone());
            let wasm = read_artifact(&dir, &args.contract)?;

            let uploaded = upload(&mut broadcaster, &mut config, &args.contract, wasm).await?;
            format!(
                "uploaded {} with code id {} (checksum {})",
                args.contract, uploaded.code_id, uploaded.checksum
            )
        }
        Command::Instantiate(args) => {
            let address = instantiate(&mut broadcaster, &mut config, &args, None).await?;
            format!("instantiated {} at {address}", args.contract)
        }
        Command::UploadInstantiate {
            instantiate: args,
            artifact_dir,
        } => {
            let dir = artifact_dir.unwrap_or_else(|| ctx.settings.artifact_dir.clone());
            let wasm = read_artifact(&dir, &args.contract)?;

            let (uploaded, address) =
                upload_instantiate(&ctx, &mut broadcaster, &mut config, &args, wasm).await?;
            format!(
                "uploaded {} with code id {} and instantiated it at {address}",
                args.contract, uploaded.code_id
            )
        }
        Command::Migrate(args) => {
            let code_id = migrate(&mut broadcaster, &mut config, &args).await?;
            format!("migrated {} to code id {code_id}", args.contract)
        }
    };

    ctx.save_chains_config(&config)?;

    Ok(Some(output))
}

/// Reads `<dir>/<contract_name>.wasm`.
pub fn read_artifact(dir: &Path, contract: &str) -> Result<Vec<u8>, Error> {
    let path = dir.join(format!("{}.wasm", contract.to_snake_case()));

    fs::read(&path)
        .change_context(Error::Artifact)
        .attach_printable_lazy(|| format!("path: {}", path.display()))
}

/// Hex encoded SHA-256 of the uncompressed wasm, the checksum the chain reports for stored code.
pub fn checksum(wasm: &[u8]) -> String {
    hex::encode(Sha256::digest(wasm))
}

fn gzip(wasm: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(wasm).change_context(Error::Artifact)?;

    encoder.finish().change_context(Error::Artifact)
}

pub async fn upload<T>(
    broadcaster: &mut Broadcaster<T>,
    config: &mut ChainsConfig,
    contract: &str,
    wasm: Vec<u8>,
) -> Result<Uploaded, Error>
where
    T: CosmosClient,
{
    let checksum = checksum(&wasm);

    let expected = config
        .contract(contract)
        .and_then(|section| section.get("storeCodeProposalCodeHash"))
        .and_then(Value::as_str)
        .map(|hash| hash.strip_prefix("0x").unwrap_or(hash).to_lowercase());
    if let Some(expected) = expected.filter(|expected| *expected != checksum) {
        warn!(
            contract,
            expected,
            actual = checksum,
            "checksum does not match storeCodeProposalCodeHash"
        );
    }

    let msg = msgs::store_code(broadcaster.address(), gzip(&wasm)?)
        .change_context(Error::InvalidInput)?;
    let response = broadcaster
        .broadcast_and_confirm(vec![msg])
        .await
        .change_context(Error::Broadcaster)?;

    let code_id = events::first_attribute(&response, STORE_CODE, CODE_ID)
        .and_then(|code_id| code_id.parse::<u64>().ok())
        .ok_or(report!(Error::MissingEventData))
        .attach_printable_lazy(|| format!("tx hash: {}", response.txhash))?;

    info!(contract, code_id, checksum, tx_hash = response.txhash, "uploaded contract code");

    let section = config
        .contract_mut(contract)
        .change_context(Error::InvalidChainsConfig)?;
    section.insert("lastUploadedCodeId".to_string(), json!(code_id));
    section.insert("codeId".to_string(), json!(code_id));

    Ok(Uploaded { code_id, checksum })
}

/// Uploads, then instantiates the stored code. The config is saved between both steps so a failed
/// instantiation keeps the uploaded code id.
pub async fn upload_instantiate<T>(
    ctx: &Context,
    broadcaster: &mut Broadcaster<T>,
    config: &mut ChainsConfig,
    args: &InstantiateArgs,
    wasm: Vec<u8>,
) -> Result<(Uploaded, String), Error>
where
    T: CosmosClient,
{
    let uploaded = upload(broadcaster, config, &args.contract, wasm).await?;
    ctx.save_chains_config(config)?;

    let address = instantiate(broadcaster, config, args, Some(uploaded.code_id)).await?;

    Ok((uploaded, address))
}

/// Instantiates the contract and records its address. Returns the new address.
pub async fn instantiate<T>(
    broadcaster: &mut Broadcaster<T>,
    config: &mut ChainsConfig,
    args: &InstantiateArgs,
    code_id: Option<u64>,
) -> Result<String, Error>
where
    T: CosmosClient,
{
    let contract = args.contract.as_str();
    let chain = args.chain.as_deref();

    if instantiate_msgs::is_per_chain(contract) && chain.is_none() {
        return Err(report!(Error::InvalidInput))
            .attach_printable(format!("{contract} is deployed per chain, pass --chain"));
    }

    let code_id = match code_id.or(args.code_id) {
        Some(code_id) => code_id,
        None if args.fetch_code_id => fetch_code_id(broadcaster, config, contract).await?,
        None => configured_code_id(config, contract, chain)?,
    };

    let msg = match &args.msg {
        Some(msg) => msg.clone(),
        None => instantiate_msgs::build(config, contract, chain)
            .change_context(Error::InvalidChainsConfig)?,
    };

    let admin = match &args.admin {
        Some(admin) => msgs::parse_address(admin).change_context(Error::InvalidInput)?,
        None => broadcaster.address().clone(),
    };
    let label = args.label.clone().unwrap_or_else(|| match chain {
        Some(chain) => format!("{contract}-{chain}"),
        None => contract.to_string(),
    });

    let msg = instantiate_msg(
        broadcaster.address(),
        &admin,
        code_id,
        &label,
        &msg,
        args.salt.as_deref(),
    )?;
    let response = broadcaster
        .broadcast_and_confirm(vec![msg])
        .await
        .change_context(Error::Broadcaster)?;

    let address = events::first_attribute(&response, INSTANTIATE, CONTRACT_ADDRESS)
        .ok_or(report!(Error::MissingEventData))
        .attach_printable_lazy(|| format!("tx hash: {}", response.txhash))?;

    info!(contract, chain, code_id, address, tx_hash = response.txhash, "instantiated contract");

    let entry = target_mut(config, contract, chain)?;
    entry.insert("address".to_string(), json!(address));
    entry.insert("codeId".to_string(), json!(code_id));
    match &args.salt {
        Some(salt) => entry.insert("instantiatedWithSalt".to_string(), json!(salt)),
        None => entry.remove("instantiatedWithSalt"),
    };

    if let (true, Some(chain)) = (instantiate_msgs::is_chain_codec(contract), chain) {
        config
            .chain_contract_mut(PROVER, chain)
            .change_context(Error::InvalidChainsConfig)?
            .insert("chainCodecAddress".to_string(), json!(address));
    }

    Ok(address)
}

/// `MsgInstantiateContract2` when a salt is given, `MsgInstantiateContract` otherwise.
pub fn instantiate_msg(
    sender: &AccountId,
    admin: &AccountId,
    code_id: u64,
    label: &str,
    msg: &Value,
    salt: Option<&str>,
) -> Result<Any, Error> {
    match salt {
        Some(salt) => msgs::instantiate2(sender, Some(admin), code_id, label, msg, salt),
        None => msgs::instantiate(sender, Some(admin), code_id, label, msg),
    }
    .change_context(Error::InvalidInput)
}

/// Migrates the contract and records the new code id, which is returned.
pub async fn migrate<T>(
    broadcaster: &mut Broadcaster<T>,
    config: &mut ChainsConfig,
    args: &MigrateArgs,
) -> Result<u64, Error>
where
    T: CosmosClient,
{
    let contract = args.contract.as_str();
    let chain = args.chain.as_deref();

    let code_id = match args.code_id {
        Some(code_id) => code_id,
        None => config
            .contract(contract)
            .and_then(|section| section.get("lastUploadedCodeId"))
            .and_then(Value::as_u64)
            .ok_or(report!(Error::InvalidInput))
            .attach_printable("no --code-id given and no lastUploadedCodeId configured")?,
    };

    let address = config
        .contract_address(contract, chain)
        .change_context(Error::InvalidChainsConfig)?;
    let address = msgs::parse_address(&address).change_context(Error::InvalidChainsConfig)?;

    let msg = msgs::migrate(broadcaster.address(), &address, code_id, &args.msg)
        .change_context(Error::InvalidInput)?;
    let response = broadcaster
        .broadcast_and_confirm(vec![msg])
        .await
        .change_context(Error::Broadcaster)?;

    info!(contract, chain, code_id, tx_hash = response.txhash, "migrated contract");

    target_mut(config, contract, chain)?.insert("codeId".to_string(), json!(code_id));

    Ok(code_id)
}

async fn fetch_code_id<T>(
    broadcaster: &mut Broadcaster<T>,
    config: &ChainsConfig,
    contract: &str,
) -> Result<u64, Error>
where
    T: CosmosClient,
{
    let hash = config
        .contract(contract)
        .and_then(|section| section.get("storeCodeProposalCodeHash"))
        .and_then(Value::as_str)
        .ok_or(report!(Error::InvalidChainsConfig))
        .attach_printable_lazy(|| format!("{contract} has no storeCodeProposalCodeHash"))?;

    code_id_by_checksum(broadcaster.client(), hash)
        .await
        .change_context(Error::Query)?
        .ok_or(report!(Error::Query))
        .attach_printable_lazy(|| format!("no stored code with checksum {hash}"))
}

fn configured_code_id(
    config: &ChainsConfig,
    contract: &str,
    chain: Option<&str>,
) -> Result<u64, Error> {
    let chain_code_id = chain
        .and_then(|chain| config.chain_contract(contract, chain))
        .and_then(|entry| entry.get("codeId"));

    chain_code_id
        .or_else(|| config.contract(contract)?.get("codeId"))
        .and_then(Value::as_u64)
        .ok_or(report!(Error::InvalidInput))
        .attach_printable_lazy(|| format!("no --code-id given and no codeId configured for {contract}"))
}

fn target_mut<'a>(
    config: &'a mut ChainsConfig,
    contract: &str,
    chain: Option<&str>,
) -> Result<&'a mut Section, Error> {
    match chain {
        Some(chain) => config.chain_contract_mut(contract, chain),
        None => config.contract_mut(contract),
    }
    .change_context(Error::InvalidChainsConfig)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Read;

    use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;
    use cosmrs::proto::cosmos::tx::v1beta1::GetTxResponse;
    use cosmrs::proto::cosmwasm::wasm::v1::{
        CodeInfoResponse, MsgInstantiateContract2, QueryCodesResponse,
    };
    use flate2::read::GzDecoder;
    use prost::Message;
    use serde_json::json;

    use super::*;
    use crate::broadcaster::test_utils::{broadcaster, expect_accepting_node};
    use crate::chains_config::test_utils::{chains_config, devnet, temp_path};
    use crate::cosmos::MockCosmosClient;
    use crate::events::test_utils::tx_response_with_events;
    use crate::settings::Settings;
    use crate::wallet::test_utils::wallet;

    const CODEC_ADDRESS: &str = "axelar1codec";

    fn node_executing(response: TxResponse) -> MockCosmosClient {
        let mut client = MockCosmosClient::new();
        expect_accepting_node(&mut client, 1, 0);
        client.expect_tx().return_once(move |_| {
            Ok(GetTxResponse {
                tx_response: Some(response),
                ..Default::default()
            })
        });

        client
    }

    #[test]
    fn artifact_name_is_snake_case() {
        let path = temp_path("interchain_token_service.wasm");
        fs::write(&path, b"\0asm").unwrap();

        let wasm = read_artifact(path.parent().unwrap(), "InterchainTokenService").unwrap();

        assert_eq!(wasm, b"\0asm");
    }

    #[test]
    fn missing_artifact_fails() {
        let dir = temp_path("unused");
        let err = read_artifact(dir.parent().unwrap(), "Router").unwrap_err();

        assert!(matches!(err.current_context(), Error::Artifact));
    }

    #[test]
    fn gzip_is_reversible() {
        let compressed = gzip(b"\0asm contract").unwrap();
        let mut decompressed = vec![];
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut decompressed)
            .unwrap();

        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert_eq!(decompressed, b"\0asm contract");
    }

    #[tokio::test(start_paused = true)]
    async fn upload_records_the_stored_code_id() {
        let client = node_executing(tx_response_with_events(&[(STORE_CODE, CODE_ID, "42")]));
        let mut config = devnet();
        config
            .contract_mut("Router")
            .unwrap()
            .insert("storeCodeProposalCodeHash".to_string(), json!("0xdeadbeef"));

        let uploaded = upload(
            &mut broadcaster(client, wallet(0)),
            &mut config,
            "Router",
            b"\0asm".to_vec(),
        )
        .await
        .unwrap();

        assert_eq!(uploaded.code_id, 42);
        assert_eq!(uploaded.checksum, checksum(b"\0asm"));
        let router = config.contract("Router").unwrap();
        assert_eq!(router["lastUploadedCodeId"], 42);
        assert_eq!(router["codeId"], 42);
        assert_eq!(router["storeCodeProposalCodeHash"], "0xdeadbeef");
    }

    #[tokio::test(start_paused = true)]
    async fn upload_without_code_id_event_fails() {
        let client = node_executing(tx_response_with_events(&[("message", "action", "store")]));

        let err = upload(
            &mut broadcaster(client, wallet(0)),
            &mut devnet(),
            "Router",
            b"\0asm".to_vec(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err.current_context(), Error::MissingEventData));
    }

    #[tokio::test(start_paused = true)]
    async fn uploaded_code_id_is_saved_when_instantiation_fails() {
        let mut client = MockCosmosClient::new();
        expect_accepting_node(&mut client, 1, 0);
        let mut lookups = 0u32;
        client.expect_tx().returning(move |_| {
            lookups += 1;
            let response = match lookups {
                1 => tx_response_with_events(&[(STORE_CODE, CODE_ID, "42")]),
                _ => tx_response_with_events(&[("message", "action", "instantiate")]),
            };

            Ok(GetTxResponse {
                tx_response: Some(response),
                ..Default::default()
            })
        });

        let path = temp_path("devnet-amplifier.json");
        let ctx = Context {
            env: "devnet-amplifier".to_string(),
            chains_dir: path.parent().unwrap().to_path_buf(),
            settings: Settings::default(),
            mnemonic: None,
        };
        let mut config = devnet();
        let args = InstantiateArgs {
            contract: "Router".to_string(),
            msg: Some(json!({})),
            ..Default::default()
        };

        let err = upload_instantiate(
            &ctx,
            &mut broadcaster(client, wallet(0)),
            &mut config,
            &args,
            b"\0asm".to_vec(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err.current_context(), Error::MissingEventData));
        let saved = ChainsConfig::load(&path).unwrap();
        let router = saved.contract("Router").unwrap();
        assert_eq!(router["lastUploadedCodeId"], 42);
        assert_eq!(router["codeId"], 42);
    }

    #[tokio::test(start_paused = true)]
    async fn instantiating_a_chain_codec_links_the_prover() {
        let client = node_executing(tx_response_with_events(&[(
            INSTANTIATE,
            CONTRACT_ADDRESS,
            CODEC_ADDRESS,
        )]));
        let mut config = chains_config(json!({
            "axelar": {
                "contracts": {
                    "MultisigProver": {
                        "avalanche": { "address": "axelar1prover", "domainSeparator": "0xabcd" }
                    },
                    "ChainCodecEvm": {
                        "codeId": 20,
                        "avalanche": { "multisigProver": "axelar1prover" }
                    }
                }
            }
        }));
        let args = InstantiateArgs {
            contract: "ChainCodecEvm".to_string(),
            chain: Some("avalanche".to_string()),
            salt: Some("v1".to_string()),
            ..Default::default()
        };

        let address = instantiate(&mut broadcaster(client, wallet(0)), &mut config, &args, None)
            .await
            .unwrap();

        assert_eq!(address, CODEC_ADDRESS);
        let codec = config.chain_contract("ChainCodecEvm", "avalanche").unwrap();
        assert_eq!(codec["address"], CODEC_ADDRESS);
        assert_eq!(codec["codeId"], 20);
        assert_eq!(codec["instantiatedWithSalt"], "v1");
        assert_eq!(
            config.chain_contract("MultisigProver", "avalanche").unwrap()["chainCodecAddress"],
            CODEC_ADDRESS
        );
    }

    #[tokio::test(start_paused = true)]
    async fn instantiate_prefers_the_given_code_id_and_msg() {
        let client = node_executing(tx_response_with_events(&[(
            INSTANTIATE,
            CONTRACT_ADDRESS,
            "axelar1rewards",
        )]));
        let mut config = devnet();
        let args = InstantiateArgs {
            contract: "Rewards".to_string(),
            code_id: Some(4),
            msg: Some(json!({ "governance_address": "axelar1gov" })),
            ..Default::default()
        };

        instantiate(&mut broadcaster(client, wallet(0)), &mut config, &args, None)
            .await
            .unwrap();

        let rewards = config.contract("Rewards").unwrap();
        assert_eq!(rewards["address"], "axelar1rewards");
        assert_eq!(rewards["codeId"], 4);
        assert!(rewards.get("instantiatedWithSalt").is_none());
    }

    #[tokio::test]
    async fn per_chain_contract_requires_a_chain() {
        let mut client = MockCosmosClient::new();
        client.expect_broadcast_tx().never();
        let args = InstantiateArgs {
            contract: "VotingVerifier".to_string(),
            ..Default::default()
        };

        let err = instantiate(&mut broadcaster(client, wallet(0)), &mut devnet(), &args, None)
            .await
            .unwrap_err();

        assert!(matches!(err.current_context(), Error::InvalidInput));
    }

    #[tokio::test(start_paused = true)]
    async fn fetched_code_id_comes_from_the_matching_checksum() {
        let mut client = node_executing(tx_response_with_events(&[(
            INSTANTIATE,
            CONTRACT_ADDRESS,
            "axelar1router2",
        )]));
        client.expect_codes().return_once(|_| {
            Ok(QueryCodesResponse {
                code_infos: vec![CodeInfoResponse {
                    code_id: 17,
                    data_hash: vec![0xbe, 0xef],
                    ..Default::default()
                }],
                pagination: None,
            })
        });
        let mut config = devnet();
        config
            .contract_mut("Router")
            .unwrap()
            .insert("storeCodeProposalCodeHash".to_string(), json!("beef"));
        let args = InstantiateArgs {
            contract: "Router".to_string(),
            fetch_code_id: true,
            msg: Some(json!({})),
            ..Default::default()
        };

        instantiate(&mut broadcaster(client, wallet(0)), &mut config, &args, None)
            .await
            .unwrap();

        assert_eq!(config.contract("Router").unwrap()["codeId"], 17);
    }

    #[test]
    fn salted_instantiation_uses_instantiate2() {
        let sender = wallet(0).address().clone();

        let salted =
            instantiate_msg(&sender, &sender, 5, "label", &json!({}), Some("salt")).unwrap();
        let plain = instantiate_msg(&sender, &sender, 5, "label", &json!({}), None).unwrap();

        assert_eq!(salted.type_url, "/cosmwasm.wasm.v1.MsgInstantiateContract2");
        assert_eq!(
            MsgInstantiateContract2::decode(salted.value.as_slice())
                .unwrap()
                .salt,
            msgs::salt_bytes("salt")
        );
        assert_eq!(plain.type_url, "/cosmwasm.wasm.v1.MsgInstantiateContract");
    }

    #[tokio::test(start_paused = true)]
    async fn migrate_updates_the_chain_code_id() {
        let client = node_executing(tx_response_with_events(&[("migrate", "code_id", "9")]));
        let mut config = devnet();
        let args = MigrateArgs {
            contract: "VotingVerifier".to_string(),
            chain: Some("avalanche".to_string()),
            code_id: Some(9),
            msg: json!({}),
        };

        let code_id = migrate(&mut broadcaster(client, wallet(0)), &mut config, &args)
            .await
            .unwrap();

        assert_eq!(code_id, 9);
        assert_eq!(
            config.chain_contract("VotingVerifier", "avalanche").unwrap()["codeId"],
            9
        );
        assert_eq!(config.contract("VotingVerifier").unwrap()["codeId"], 5);
    }

    #[tokio::test]
    async fn migrate_without_code_id_fails() {
        let args = MigrateArgs {
            contract: "Router".to_string(),
            chain: None,
            code_id: None,
            msg: json!({}),
        };

        let err = migrate(
            &mut broadcaster(MockCosmosClient::new(), wallet(0)),
            &mut devnet(),
            &args,
        )
        .await
        .unwrap_err();

        assert!(matches!(err.current_context(), Error::InvalidInput));
    }
}

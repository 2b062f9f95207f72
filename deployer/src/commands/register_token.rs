use error_stack::{report, Result, ResultExt};
use itertools::Itertools;
use serde_json::Value;
use tracing::info;

use crate::broadcaster::Broadcaster;
use crate::chains_config::ChainsConfig;
use crate::commands::{axelar_config, Context};
use crate::cosmos::{self, CosmosClient};
use crate::msgs;
use crate::msgs::its::{ExecuteMsg, QueryMsg, TokenId, TokenSupply};
use crate::Error;

const ITS_HUB: &str = "InterchainTokenService";

#[derive(clap::Args, Debug, Clone)]
pub struct Args {
    #[arg(long)]
    pub token_id: TokenId,
    /// Chain the token was originally deployed on; must be one of --chains
    #[arg(long)]
    pub origin_chain: String,
    #[arg(long, value_delimiter = ',', required = true)]
    pub chains: Vec<String>,
    #[arg(long, default_value_t = 18)]
    pub decimals: u8,
    /// `untracked` or `tracked:<amount>`
    #[arg(long, default_value = "untracked")]
    pub supply: TokenSupply,
    /// Leave out chains that already have an instance of the token
    #[arg(long)]
    pub skip_registered: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Registration {
    pub registered: Vec<String>,
    pub skipped: Vec<String>,
    pub tx_hash: Option<String>,
}

pub async fn run(ctx: Context, args: Args) -> Result<Option<String>, Error> {
    let config = ctx.load_chains_config()?;
    let axelar = axelar_config(&config)?;
    let client = ctx.client(&axelar).await?;
    let mut broadcaster = ctx.broadcaster(client, ctx.wallet(0)?, &axelar);

    let registration = register(&mut broadcaster, &config, &args).await?;

    let mut lines = vec![];
    match &registration.tx_hash {
        Some(tx_hash) => lines.push(format!(
            "registered token {} on {} in tx {tx_hash}",
            args.token_id.as_str(),
            registration.registered.join(", ")
        )),
        None => lines.push("nothing to register".to_string()),
    }
    if !registration.skipped.is_empty() {
        lines.push(format!(
            "skipped already registered chains: {}",
            registration.skipped.join(", ")
        ));
    }

    Ok(Some(lines.join("\n")))
}

/// Registers the token instance on every chain in a single tx.
pub async fn register<T>(
    broadcaster: &mut Broadcaster<T>,
    config: &ChainsConfig,
    args: &Args,
) -> Result<Registration, Error>
where
    T: CosmosClient,
{
    if !args.chains.contains(&args.origin_chain) {
        return Err(report!(Error::InvalidInput)).attach_printable(format!(
            "origin chain '{}' must be one of the registered chains",
            args.origin_chain
        ));
    }

    let its_hub = config
        .contract_address(ITS_HUB, None)
        .change_context(Error::InvalidChainsConfig)?;
    let its_hub_id = msgs::parse_address(&its_hub).change_context(Error::InvalidChainsConfig)?;
    let origin_chain = config.chain_axelar_id(&args.origin_chain);

    let mut registered = vec![];
    let mut skipped = vec![];
    let mut register_msgs = vec![];

    for chain in args.chains.iter().unique() {
        let axelar_id = config.chain_axelar_id(chain);

        if args.skip_registered
            && is_registered(broadcaster.client(), &its_hub, &axelar_id, &args.token_id).await?
        {
            info!(
                chain = axelar_id,
                token_id = args.token_id.as_str(),
                "token instance already registered"
            );
            skipped.push(axelar_id);
            continue;
        }

        let msg = ExecuteMsg::RegisterP2pTokenInstance {
            chain: axelar_id.clone(),
            token_id: args.token_id.clone(),
            origin_chain: origin_chain.clone(),
            decimals: args.decimals,
            supply: args.supply.clone(),
        };
        register_msgs.push(
            msgs::execute(broadcaster.address(), &its_hub_id, &msg)
                .change_context(Error::InvalidInput)?,
        );
        registered.push(axelar_id);
    }

    if register_msgs.is_empty() {
        return Ok(Registration {
            registered,
            skipped,
            tx_hash: None,
        });
    }

    let response = broadcaster
        .broadcast_and_confirm(register_msgs)
        .await
        .change_context(Error::Broadcaster)?;

    info!(
        token_id = args.token_id.as_str(),
        chains = registered.join(","),
        tx_hash = response.txhash,
        "registered token instances"
    );

    Ok(Registration {
        registered,
        skipped,
        tx_hash: Some(response.txhash),
    })
}

async fn is_registered<T>(
    client: &mut T,
    its_hub: &str,
    chain: &str,
    token_id: &TokenId,
) -> Result<bool, Error>
where
    T: CosmosClient,
{
    let msg = QueryMsg::TokenInstance {
        chain: chain.to_string(),
        token_id: token_id.clone(),
    };

    let instance: Value = cosmos::query_contract(client, its_hub, &msg)
        .await
        .change_context(Error::Query)?;

    Ok(!instance.is_null())
}

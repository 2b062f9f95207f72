use std::path::PathBuf;

use clap::Subcommand;
use error_stack::{Result, ResultExt};
use tracing::info;

use crate::broadcaster::{self, Broadcaster};
use crate::chains_config::{AxelarConfig, ChainsConfig};
use crate::cosmos::{CosmosClient, CosmosGrpcClient};
use crate::settings::Settings;
use crate::wallet::Wallet;
use crate::Error;

pub mod chain_codec;
pub mod code_ids;
pub mod deploy;
pub mod load_test;
pub mod query;
pub mod register_token;

#[derive(Debug, Subcommand)]
pub enum SubCommand {
    /// Move MultisigProver encoder settings into chain codec entries of the chains config
    PrepareChainCodecMigration(chain_codec::Args),
    /// Upload, instantiate or migrate a contract
    #[command(subcommand)]
    Deploy(deploy::Command),
    /// Update the code ids in the chains config from the chain
    SyncCodeIds(code_ids::Args),
    /// Query on-chain contract state
    #[command(subcommand)]
    Query(query::Command),
    /// Register a token instance on the interchain token service hub for a set of chains
    RegisterToken(register_token::Args),
    /// Load test a voting verifier contract
    #[command(subcommand)]
    LoadTest(load_test::Command),
}

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub env: String,
    pub chains_dir: PathBuf,
    pub settings: Settings,
    pub mnemonic: Option<String>,
}

impl Context {
    pub fn chains_config_path(&self) -> PathBuf {
        self.chains_dir.join(format!("{}.json", self.env))
    }

    pub fn load_chains_config(&self) -> Result<ChainsConfig, Error> {
        ChainsConfig::load(self.chains_config_path()).change_context(Error::LoadChainsConfig)
    }

    pub fn save_chains_config(&self, config: &ChainsConfig) -> Result<(), Error> {
        let path = self.chains_config_path();
        config
            .save(&path)
            .change_context(Error::SaveChainsConfig)?;

        info!(path = %path.display(), "saved chains config");
        Ok(())
    }

    /// Account `index` of the operator mnemonic. Index 0 is the main account.
    pub fn wallet(&self, index: u32) -> Result<Wallet, Error> {
        let mnemonic = self
            .mnemonic
            .as_deref()
            .ok_or(Error::MissingMnemonic)?;

        Wallet::from_mnemonic(mnemonic, index).change_context(Error::Wallet)
    }

    pub async fn client(&self, axelar: &AxelarConfig) -> Result<CosmosGrpcClient, Error> {
        let url = axelar
            .grpc
            .as_deref()
            .ok_or(Error::InvalidChainsConfig)
            .attach_printable("missing 'axelar.grpc' endpoint")?;

        CosmosGrpcClient::new(url, self.settings.grpc_timeout)
            .await
            .change_context(Error::Connection)
            .attach_printable_lazy(|| format!("grpc endpoint: {url}"))
    }

    pub fn broadcaster<T>(&self, client: T, wallet: Wallet, axelar: &AxelarConfig) -> Broadcaster<T>
    where
        T: CosmosClient,
    {
        broadcaster_for(client, wallet, axelar, &self.settings.broadcast)
    }
}

pub fn broadcaster_for<T>(
    client: T,
    wallet: Wallet,
    axelar: &AxelarConfig,
    config: &broadcaster::Config,
) -> Broadcaster<T>
where
    T: CosmosClient,
{
    Broadcaster::builder()
        .client(client)
        .wallet(wallet)
        .chain_id(axelar.chain_id.clone())
        .gas_price(
            config
                .gas_price
                .clone()
                .unwrap_or_else(|| axelar.gas_price.clone()),
        )
        .gas_limit(axelar.gas_limit)
        .config(config.clone())
        .build()
}

fn axelar_config(config: &ChainsConfig) -> Result<AxelarConfig, Error> {
    config.axelar().change_context(Error::InvalidChainsConfig)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::Context;
    use crate::broadcaster;
    use crate::broadcaster::test_utils::expect_accepting_node;
    use crate::chains_config::test_utils::devnet;
    use crate::cosmos::MockCosmosClient;
    use crate::dec_coin::DecCoin;
    use crate::settings::Settings;
    use crate::wallet::test_utils::{wallet, MNEMONIC};
    use crate::Error;

    fn context(mnemonic: Option<&str>) -> Context {
        Context {
            env: "devnet-amplifier".to_string(),
            chains_dir: PathBuf::from("axelar-chains-config/info"),
            settings: Settings::default(),
            mnemonic: mnemonic.map(ToString::to_string),
        }
    }

    #[test]
    fn chains_config_path_is_derived_from_env() {
        assert_eq!(
            context(None).chains_config_path(),
            PathBuf::from("axelar-chains-config/info/devnet-amplifier.json")
        );
    }

    #[test]
    fn wallet_requires_a_mnemonic() {
        let err = context(None).wallet(0).unwrap_err();

        assert!(matches!(err.current_context(), Error::MissingMnemonic));
    }

    #[test]
    fn wallet_is_derived_from_the_mnemonic() {
        let wallet_0 = context(Some(MNEMONIC)).wallet(0).unwrap();

        assert_eq!(wallet_0.address(), wallet(0).address());
    }

    #[tokio::test]
    async fn broadcaster_uses_the_gas_price_override() {
        let mut ctx = context(Some(MNEMONIC));
        ctx.settings.broadcast = broadcaster::Config {
            gas_price: Some(DecCoin::new(1.0, "uaxl").unwrap()),
            ..broadcaster::Config::default()
        };
        let mut client = MockCosmosClient::new();
        expect_accepting_node(&mut client, 1, 0);

        let fee = ctx
            .broadcaster(client, wallet(0), &devnet().axelar().unwrap())
            .estimate_fee(vec![])
            .await
            .unwrap();

        assert_eq!(fee.amount[0].denom.to_string(), "uaxl");
        assert_eq!(fee.amount[0].amount, 140_000);
    }
}

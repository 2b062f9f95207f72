use std::cmp;
use std::time::Duration;

use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;
use cosmrs::proto::cosmos::tx::v1beta1::{BroadcastMode, BroadcastTxRequest};
use cosmrs::proto::traits::MessageExt;
use cosmrs::tendermint::chain::Id;
use cosmrs::tx::Fee;
use cosmrs::{AccountId, Any, Coin, Gas};
use error_stack::{report, Result, ResultExt};
use itertools::Itertools;
use num_traits::cast;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use crate::cosmos;
use crate::dec_coin::DecCoin;
use crate::wallet::Wallet;
use confirm_tx::TxStatus;
use tx::Tx;

pub mod confirm_tx;
pub mod tx;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed building tx")]
    TxBuilding,
    #[error("failed to estimate gas")]
    GasEstimation,
    #[error("failed to estimate fee")]
    FeeEstimation,
    #[error("broadcast failed")]
    Broadcast,
    #[error("failed to query account for address '{address}'")]
    QueryAccount { address: AccountId },
    #[error("transaction not accepted by the node")]
    TxNotAccepted,
    #[error("failed to confirm tx {tx_hash}")]
    TxConfirmation { tx_hash: String },
    #[error("tx {tx_hash} failed with code {code}")]
    TxFailed { tx_hash: String, code: u32 },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(with = "humantime_serde")]
    pub tx_fetch_interval: Duration,
    pub tx_fetch_max_retries: u32,
    pub gas_adjustment: f64,
    /// Overrides the gas price of the chains config.
    pub gas_price: Option<DecCoin>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tx_fetch_interval: Duration::from_millis(500),
            tx_fetch_max_retries: 20,
            gas_adjustment: 1.4,
            gas_price: None,
        }
    }
}

/// Gas limit of a tx: simulated (and scaled by the gas adjustment) or fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GasLimit {
    #[default]
    Auto,
    Fixed(Gas),
}

impl<'de> Deserialize<'de> for GasLimit {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(Gas),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(gas) => Ok(GasLimit::Fixed(gas)),
            Raw::Text(text) if text.eq_ignore_ascii_case("auto") => Ok(GasLimit::Auto),
            Raw::Text(text) => text
                .parse()
                .map(GasLimit::Fixed)
                .map_err(|_| serde::de::Error::custom(format!("invalid gas limit '{text}'"))),
        }
    }
}

impl Serialize for GasLimit {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            GasLimit::Auto => serializer.serialize_str("auto"),
            GasLimit::Fixed(gas) => serializer.serialize_u64(*gas),
        }
    }
}

/// Signs and submits txs for a single account, tracking its sequence locally so that consecutive
/// txs do not have to wait for the node to catch up.
#[derive(TypedBuilder)]
pub struct Broadcaster<T>
where
    T: cosmos::CosmosClient,
{
    client: T,
    wallet: Wallet,
    chain_id: Id,
    gas_price: DecCoin,
    #[builder(default)]
    gas_limit: GasLimit,
    config: Config,
    #[builder(default, setter(skip))]
    acc_sequence: Option<u64>,
}

impl<T> Broadcaster<T>
where
    T: cosmos::CosmosClient,
{
    pub fn address(&self) -> &AccountId {
        self.wallet.address()
    }

    pub fn client(&mut self) -> &mut T {
        &mut self.client
    }

    /// Submits the msgs in sync mode. The returned response only says the tx passed `CheckTx`.
    pub async fn broadcast(&mut self, msgs: Vec<Any>) -> Result<TxResponse, Error> {
        let result = self.sign_and_broadcast(msgs).await;

        if result.is_err() {
            // the local sequence may have run ahead of the chain, so resync on the next tx
            self.acc_sequence = None;
        }

        result
    }

    /// Submits the msgs and waits until the tx is included in a block and executed successfully.
    pub async fn broadcast_and_confirm(&mut self, msgs: Vec<Any>) -> Result<TxResponse, Error> {
        let tx_hash = self.broadcast(msgs).await?.txhash;

        let response = confirm_tx::confirm_tx(
            &mut self.client,
            &tx_hash,
            self.config.tx_fetch_interval,
            self.config.tx_fetch_max_retries,
        )
        .await
        .change_context(Error::TxConfirmation {
            tx_hash: tx_hash.clone(),
        })?;

        if TxStatus::from(response.code) == TxStatus::Failure {
            return Err(report!(Error::TxFailed {
                tx_hash,
                code: response.code,
            }))
            .attach_printable(response.raw_log);
        }

        info!(
            tx_hash,
            height = response.height,
            gas_used = response.gas_used,
            "transaction was confirmed"
        );

        Ok(response)
    }

    pub async fn estimate_fee(&mut self, msgs: Vec<Any>) -> Result<Fee, Error> {
        let (_, acc_sequence) = self.acc_number_and_sequence().await?;

        self.estimate_fee_at(msgs, acc_sequence).await
    }

    async fn sign_and_broadcast(&mut self, msgs: Vec<Any>) -> Result<TxResponse, Error> {
        let (acc_number, acc_sequence) = self.acc_number_and_sequence().await?;
        let fee = self.estimate_fee_at(msgs.clone(), acc_sequence).await?;

        let tx = Tx::builder()
            .msgs(msgs)
            .fee(fee.clone())
            .pub_key(self.wallet.pub_key())
            .acc_sequence(acc_sequence)
            .build()
            .sign_with(&self.chain_id, acc_number, |sign_doc| {
                self.wallet.sign(sign_doc)
            })
            .change_context(Error::TxBuilding)?;

        let request = BroadcastTxRequest {
            tx_bytes: tx.to_bytes().change_context(Error::TxBuilding)?,
            mode: BroadcastMode::Sync as i32,
        };

        let response = self
            .client
            .broadcast_tx(request)
            .await
            .change_context(Error::Broadcast)?
            .tx_response
            .ok_or(report!(Error::Broadcast))?;

        info!(
            tx_hash = response.txhash,
            sender = %self.wallet.address(),
            acc_number,
            acc_sequence,
            fee.amount = fee.amount.iter().map(Coin::to_string).join(", "),
            fee.gas_limit,
            "transaction was broadcast"
        );

        if response.code != 0 {
            return Err(report!(Error::TxNotAccepted))
                .attach_printable(format!("code {}: {}", response.code, response.raw_log));
        }

        self.acc_sequence.replace(
            acc_sequence
                .checked_add(1)
                .expect("account sequence must be less than u64::MAX"),
        );

        Ok(response)
    }

    async fn acc_number_and_sequence(&mut self) -> Result<(u64, u64), Error> {
        let address = self.wallet.address().clone();
        let account = cosmos::account(&mut self.client, &address)
            .await
            .change_context(Error::QueryAccount { address })?;

        let acc_sequence = self.acc_sequence.insert(cmp::max(
            account.sequence,
            self.acc_sequence.unwrap_or_default(),
        ));

        Ok((account.account_number, *acc_sequence))
    }

    async fn estimate_fee_at(&mut self, msgs: Vec<Any>, acc_sequence: u64) -> Result<Fee, Error> {
        let gas = match self.gas_limit {
            GasLimit::Fixed(gas) => gas,
            GasLimit::Auto => {
                let simulated = cosmos::estimate_gas(
                    &mut self.client,
                    msgs,
                    self.wallet.pub_key(),
                    acc_sequence,
                )
                .await
                .change_context(Error::GasEstimation)?;

                let simulated: f64 = cast(simulated).ok_or(report!(Error::GasEstimation))?;
                cast((simulated * self.config.gas_adjustment).ceil())
                    .ok_or(report!(Error::GasEstimation))?
            }
        };

        if gas == 0 {
            warn!("estimated gas is zero");
        }

        let amount = self
            .gas_price
            .fee_for_gas(gas)
            .change_context(Error::FeeEstimation)?;

        Ok(Fee::from_amount_and_gas(amount, gas))
    }
}

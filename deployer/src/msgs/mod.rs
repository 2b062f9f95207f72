//! Cosmos msgs for the wasm module, and the JSON messages of the amplifier contracts this tool
//! talks to.

use cosmrs::bank::MsgSend;
use cosmrs::cosmwasm::{
    MsgExecuteContract, MsgInstantiateContract, MsgMigrateContract, MsgStoreCode,
};
use cosmrs::proto::cosmwasm::wasm::v1::MsgInstantiateContract2;
use cosmrs::tx::Msg;
use cosmrs::{AccountId, Any, Coin};
use error_stack::{Result, ResultExt};
use k256::sha2::{Digest, Sha256};
use prost::Message;
use serde::Serialize;
use thiserror::Error;

use crate::report::ResultCompatExt;

pub mod instantiate;
pub mod its;
pub mod multisig_prover;
pub mod voting_verifier;

const MSG_INSTANTIATE_CONTRACT2_TYPE_URL: &str = "/cosmwasm.wasm.v1.MsgInstantiateContract2";

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to serialize the contract message")]
    Serialization,
    #[error("failed to encode the cosmos msg")]
    Encoding,
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
}

fn json<T>(msg: &T) -> Result<Vec<u8>, Error>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(msg).change_context(Error::Serialization)
}

pub fn parse_address(address: &str) -> Result<AccountId, Error> {
    address
        .parse::<AccountId>()
        .change_context(Error::InvalidAddress(address.to_string()))
}

pub fn store_code(sender: &AccountId, wasm_byte_code: Vec<u8>) -> Result<Any, Error> {
    MsgStoreCode {
        sender: sender.clone(),
        wasm_byte_code,
        instantiate_permission: None,
    }
    .to_any()
    .change_context(Error::Encoding)
}

pub fn instantiate<T>(
    sender: &AccountId,
    admin: Option<&AccountId>,
    code_id: u64,
    label: &str,
    msg: &T,
) -> Result<Any, Error>
where
    T: Serialize + ?Sized,
{
    MsgInstantiateContract {
        sender: sender.clone(),
        admin: admin.cloned(),
        code_id,
        label: Some(label.to_string()),
        msg: json(msg)?,
        funds: vec![],
    }
    .to_any()
    .change_context(Error::Encoding)
}

/// Instantiates at an address derived from the code checksum, the sender and `salt`, so that
/// redeploying with the same inputs is predictable.
pub fn instantiate2<T>(
    sender: &AccountId,
    admin: Option<&AccountId>,
    code_id: u64,
    label: &str,
    msg: &T,
    salt: &str,
) -> Result<Any, Error>
where
    T: Serialize + ?Sized,
{
    let msg = MsgInstantiateContract2 {
        sender: sender.to_string(),
        admin: admin.map(ToString::to_string).unwrap_or_default(),
        code_id,
        label: label.to_string(),
        msg: json(msg)?,
        funds: vec![],
        salt: salt_bytes(salt),
        fix_msg: false,
    };

    Ok(Any {
        type_url: MSG_INSTANTIATE_CONTRACT2_TYPE_URL.to_string(),
        value: msg.encode_to_vec(),
    })
}

pub fn salt_bytes(salt: &str) -> Vec<u8> {
    Sha256::digest(salt.as_bytes()).to_vec()
}

pub fn execute<T>(sender: &AccountId, contract: &AccountId, msg: &T) -> Result<Any, Error>
where
    T: Serialize + ?Sized,
{
    MsgExecuteContract {
        sender: sender.clone(),
        contract: contract.clone(),
        msg: json(msg)?,
        funds: vec![],
    }
    .to_any()
    .change_context(Error::Encoding)
}

pub fn migrate<T>(
    sender: &AccountId,
    contract: &AccountId,
    code_id: u64,
    msg: &T,
) -> Result<Any, Error>
where
    T: Serialize + ?Sized,
{
    MsgMigrateContract {
        sender: sender.clone(),
        contract: contract.clone(),
        code_id,
        msg: json(msg)?,
    }
    .to_any()
    .change_context(Error::Encoding)
}

pub fn send(from: &AccountId, to: &AccountId, amount: Coin) -> Result<Any, Error> {
    MsgSend {
        from_address: from.clone(),
        to_address: to.clone(),
        amount: vec![amount],
    }
    .to_any()
    .change_context(Error::Encoding)
}

#[cfg(test)]
mod tests {
    use cosmrs::cosmwasm::{MsgExecuteContract, MsgInstantiateContract};
    use cosmrs::tx::Msg;
    use cosmrs::AccountId;
    use prost::Message;
    use serde_json::json;

    use super::*;

    fn address(byte: u8) -> AccountId {
        AccountId::new("axelar", &[byte; 20]).unwrap()
    }

    #[test]
    fn execute_carries_the_json_message() {
        let any = execute(&address(1), &address(2), &json!({ "end_poll": { "poll_id": "7" } }))
            .unwrap();

        let msg = MsgExecuteContract::from_any(&any).unwrap();

        assert_eq!(msg.contract, address(2));
        assert_eq!(msg.msg, br#"{"end_poll":{"poll_id":"7"}}"#.to_vec());
    }

    #[test]
    fn instantiate_sets_admin_and_label() {
        let any = instantiate(&address(1), Some(&address(3)), 12, "router", &json!({})).unwrap();

        let msg = MsgInstantiateContract::from_any(&any).unwrap();

        assert_eq!(msg.admin, Some(address(3)));
        assert_eq!(msg.code_id, 12);
        assert_eq!(msg.label.as_deref(), Some("router"));
    }

    #[test]
    fn instantiate2_hashes_the_salt() {
        let any = instantiate2(&address(1), None, 12, "gateway", &json!({}), "v1.0.0").unwrap();

        assert_eq!(any.type_url, "/cosmwasm.wasm.v1.MsgInstantiateContract2");

        let msg = MsgInstantiateContract2::decode(any.value.as_slice()).unwrap();
        assert_eq!(msg.salt.len(), 32);
        assert_eq!(msg.salt, salt_bytes("v1.0.0"));
        assert_ne!(msg.salt, salt_bytes("v1.0.1"));
        assert_eq!(msg.admin, "");
        assert_eq!(msg.code_id, 12);
    }

    #[test]
    fn send_transfers_a_single_coin() {
        let amount = Coin::new(1_000_000, "uaxl").unwrap();

        let msg = MsgSend::from_any(&send(&address(1), &address(2), amount.clone()).unwrap()).unwrap();

        assert_eq!(msg.from_address, address(1));
        assert_eq!(msg.to_address, address(2));
        assert_eq!(msg.amount, vec![amount]);
    }

    #[test]
    fn invalid_address_is_rejected() {
        let err = parse_address("not-an-address").unwrap_err();

        assert!(matches!(err.current_context(), Error::InvalidAddress(_)));
    }
}

use cosmrs::crypto::PublicKey;
use cosmrs::proto::cosmos::tx::v1beta1::TxRaw;
use cosmrs::tendermint::chain::Id;
use cosmrs::tx::{BodyBuilder, Fee, SignDoc, SignerInfo};
use cosmrs::Any;
use error_stack::{Context, Result, ResultExt};
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::report::ResultCompatExt;

const DUMMY_CHAIN_ID: &str = "dummy_chain_id";
const DUMMY_ACC_NUMBER: u64 = 0;

#[derive(Error, Debug)]
pub enum Error {
    #[error("tx signing failed")]
    Sign,
    #[error("tx marshaling failed")]
    Marshaling,
}

#[derive(TypedBuilder)]
pub struct Tx {
    msgs: Vec<Any>,
    pub_key: PublicKey,
    acc_sequence: u64,
    #[builder(default = zero_fee())]
    fee: Fee,
}

fn zero_fee() -> Fee {
    Fee {
        amount: vec![],
        gas_limit: 0,
        payer: None,
        granter: None,
    }
}

impl Tx {
    pub fn sign_with<F, Err>(self, chain_id: &Id, acc_number: u64, sign: F) -> Result<TxRaw, Error>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>, Err>,
        Err: Context,
    {
        let body = BodyBuilder::new().msgs(self.msgs).finish();
        let auth_info =
            SignerInfo::single_direct(Some(self.pub_key), self.acc_sequence).auth_info(self.fee);
        let sign_doc = SignDoc::new(&body, &auth_info, chain_id, acc_number)
            .change_context(Error::Marshaling)?;

        let bytes = sign_doc
            .clone()
            .into_bytes()
            .change_context(Error::Marshaling)?;
        let signature = sign(bytes.as_slice()).change_context(Error::Sign)?;

        Ok(TxRaw {
            body_bytes: sign_doc.body_bytes,
            auth_info_bytes: sign_doc.auth_info_bytes,
            signatures: vec![signature],
        })
    }

    /// Signs with a zeroed signature, good enough for gas simulation.
    pub fn with_dummy_sig(self) -> Result<TxRaw, Error> {
        let chain_id = DUMMY_CHAIN_ID
            .parse::<Id>()
            .expect("the dummy chain id must be valid");

        self.sign_with(&chain_id, DUMMY_ACC_NUMBER, |_| {
            Result::<_, Error>::Ok(vec![0; 64])
        })
    }
}

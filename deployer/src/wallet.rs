use std::fmt::{Debug, Formatter};

use bip32::{DerivationPath, Language, Mnemonic, XPrv};
use cosmrs::crypto::PublicKey;
use cosmrs::AccountId;
use error_stack::{Result, ResultExt};
use k256::ecdsa::SigningKey;
use k256::sha2::{Digest, Sha256};
use thiserror::Error;

use crate::report::ResultCompatExt;
use crate::PREFIX;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid mnemonic")]
    InvalidMnemonic,
    #[error("failed to derive key at index {0}")]
    Derivation(u32),
    #[error("failed to encode the account address")]
    AddressEncoding,
    #[error("failed to sign")]
    Sign,
}

/// A secp256k1 account derived from a BIP-39 mnemonic along the Cosmos HD path
/// `m/44'/118'/0'/0/<index>`.
pub struct Wallet {
    key: SigningKey,
    pub_key: PublicKey,
    address: AccountId,
}

impl Wallet {
    pub fn from_mnemonic(phrase: &str, index: u32) -> Result<Self, Error> {
        let mnemonic =
            Mnemonic::new(phrase.trim(), Language::English).change_context(Error::InvalidMnemonic)?;
        let seed = mnemonic.to_seed("");
        let path = format!("m/44'/118'/0'/0/{index}")
            .parse::<DerivationPath>()
            .change_context(Error::Derivation(index))?;

        let key = XPrv::derive_from_path(seed.as_bytes(), &path)
            .change_context(Error::Derivation(index))?
            .private_key()
            .clone();

        Self::new(key)
    }

    pub fn new(key: SigningKey) -> Result<Self, Error> {
        let pub_key: PublicKey = key.verifying_key().into();
        let address = pub_key
            .account_id(PREFIX)
            .change_context(Error::AddressEncoding)?;

        Ok(Self {
            key,
            pub_key,
            address,
        })
    }

    pub fn address(&self) -> &AccountId {
        &self.address
    }

    pub fn pub_key(&self) -> PublicKey {
        self.pub_key
    }

    /// Signs the serialized sign doc of a transaction.
    pub fn sign(&self, sign_doc: &[u8]) -> Result<Vec<u8>, Error> {
        let hash = Sha256::digest(sign_doc);
        let (signature, _) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .change_context(Error::Sign)?;

        Ok(signature.to_vec())
    }
}

impl Debug for Wallet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address.to_string())
            .finish_non_exhaustive()
    }
}

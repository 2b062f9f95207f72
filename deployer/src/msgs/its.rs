use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("token id must be 32 hex encoded bytes, got '{0}'")]
    InvalidTokenId(String),
    #[error("supply must be 'untracked' or 'tracked:<amount>', got '{0}'")]
    InvalidSupply(String),
}

/// Hex encoded 32 byte token id, normalized to lowercase without `0x` prefix.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TokenId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s).to_lowercase();

        match hex::decode(&hex_str) {
            Ok(bytes) if bytes.len() == 32 => Ok(Self(hex_str)),
            _ => Err(Error::InvalidTokenId(s.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenSupply {
    /// Total supply on the chain, as a decimal string.
    Tracked(String),
    Untracked,
}

impl FromStr for TokenSupply {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "untracked" => Ok(Self::Untracked),
            Some(("tracked", amount))
                if !amount.is_empty() && amount.chars().all(|c| c.is_ascii_digit()) =>
            {
                Ok(Self::Tracked(amount.to_string()))
            }
            _ => Err(Error::InvalidSupply(s.to_string())),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    RegisterP2pTokenInstance {
        chain: String,
        token_id: TokenId,
        origin_chain: String,
        decimals: u8,
        supply: TokenSupply,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    ItsChain { chain: String },
    TokenConfig { token_id: TokenId },
    TokenInstance { chain: String, token_id: TokenId },
}

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use alloy_primitives::Address;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("unknown message id format '{0}'")]
pub struct UnknownMsgIdFormat(String);

#[derive(Error, Debug)]
#[error("unknown address format '{0}'")]
pub struct UnknownAddressFormat(String);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CrossChainId {
    pub source_chain: String,
    pub message_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub cc_id: CrossChainId,
    pub source_address: String,
    pub destination_chain: String,
    pub destination_address: String,
    /// Hex encoded, without `0x` prefix.
    pub payload_hash: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    VerifyMessages(Vec<Message>),
    EndPoll { poll_id: String },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    Poll { poll_id: String },
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    InProgress,
    Expired,
    Finished,
}

impl Display for PollStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollStatus::InProgress => "in_progress",
            PollStatus::Expired => "expired",
            PollStatus::Finished => "finished",
        };

        f.write_str(name)
    }
}

/// The part of a poll query answer the load test reads.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    pub poll: WeightedPoll,
    pub status: PollStatus,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WeightedPoll {
    pub poll_id: String,
    pub expires_at: u64,
}

/// The encodings of message ids a verifier can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MsgIdFormat {
    #[default]
    HexTxHashAndEventIndex,
    Base58TxDigestAndEventIndex,
    Base58SolanaTxSignatureAndEventIndex,
}

impl MsgIdFormat {
    /// A fresh, syntactically valid id. Ids only need to be unique, not to refer to real txs.
    pub fn random_id<R: Rng>(&self, rng: &mut R) -> String {
        let event_index = rng.gen_range(0..u32::MAX);

        match self {
            MsgIdFormat::HexTxHashAndEventIndex => {
                format!("0x{}-{event_index}", hex::encode(random_bytes::<32, _>(rng)))
            }
            MsgIdFormat::Base58TxDigestAndEventIndex => {
                format!(
                    "{}-{event_index}",
                    bs58::encode(random_bytes::<32, _>(rng)).into_string()
                )
            }
            MsgIdFormat::Base58SolanaTxSignatureAndEventIndex => {
                format!(
                    "{}-{event_index}",
                    bs58::encode(random_bytes::<64, _>(rng)).into_string()
                )
            }
        }
    }
}

/// The address encodings a verifier validates source addresses against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFormat {
    #[default]
    Eip55,
    Sui,
    Stellar,
    Solana,
    Starknet,
}

impl AddressFormat {
    pub fn random_address<R: RngCore>(&self, rng: &mut R) -> String {
        match self {
            AddressFormat::Eip55 => Address::from(random_bytes::<20, _>(rng)).to_checksum(None),
            AddressFormat::Sui => format!("0x{}", hex::encode(random_bytes::<32, _>(rng))),
            AddressFormat::Stellar => stellar_strkey::Contract(random_bytes::<32, _>(rng)).to_string(),
            AddressFormat::Solana => bs58::encode(random_bytes::<32, _>(rng)).into_string(),
            AddressFormat::Starknet => {
                let mut felt = random_bytes::<32, _>(rng);
                // stay below the field prime
                felt[0] &= 0x03;
                format!("0x{}", hex::encode(felt))
            }
        }
    }
}

impl FromStr for AddressFormat {
    type Err = UnknownAddressFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eip55" => Ok(Self::Eip55),
            "sui" => Ok(Self::Sui),
            "stellar" => Ok(Self::Stellar),
            "solana" => Ok(Self::Solana),
            "starknet" => Ok(Self::Starknet),
            _ => Err(UnknownAddressFormat(s.to_string())),
        }
    }
}

impl Display for AddressFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressFormat::Eip55 => "eip55",
            AddressFormat::Sui => "sui",
            AddressFormat::Stellar => "stellar",
            AddressFormat::Solana => "solana",
            AddressFormat::Starknet => "starknet",
        };

        f.write_str(name)
    }
}

fn random_bytes<const N: usize, R: RngCore>(rng: &mut R) -> [u8; N] {
    let mut bytes = [0u8; N];
    rng.fill_bytes(&mut bytes);
    bytes
}

impl FromStr for MsgIdFormat {
    type Err = UnknownMsgIdFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hex_tx_hash_and_event_index" => Ok(Self::HexTxHashAndEventIndex),
            "base58_tx_digest_and_event_index" => Ok(Self::Base58TxDigestAndEventIndex),
            "base58_solana_tx_signature_and_event_index" => {
                Ok(Self::Base58SolanaTxSignatureAndEventIndex)
            }
            _ => Err(UnknownMsgIdFormat(s.to_string())),
        }
    }
}

impl Display for MsgIdFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            MsgIdFormat::HexTxHashAndEventIndex => "hex_tx_hash_and_event_index",
            MsgIdFormat::Base58TxDigestAndEventIndex => "base58_tx_digest_and_event_index",
            MsgIdFormat::Base58SolanaTxSignatureAndEventIndex => {
                "base58_solana_tx_signature_and_event_index"
            }
        };

        f.write_str(name)
    }
}

/// A message from `source_chain` with random ids, addresses and payload hash. The source address
/// is encoded the way the source chain's verifier expects it.
pub fn random_message<R: Rng>(
    rng: &mut R,
    source_chain: &str,
    destination_chain: &str,
    msg_id_format: MsgIdFormat,
    address_format: AddressFormat,
) -> Message {
    Message {
        cc_id: CrossChainId {
            source_chain: source_chain.to_string(),
            message_id: msg_id_format.random_id(rng),
        },
        source_address: address_format.random_address(rng),
        destination_chain: destination_chain.to_string(),
        destination_address: format!("0x{}", hex::encode(random_bytes::<20, _>(rng))),
        payload_hash: hex::encode(random_bytes::<32, _>(rng)),
    }
}

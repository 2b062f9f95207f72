//! Prepares the chains config for provers that delegate payload encoding to a chain codec
//! contract.
//!
//! A prover used to carry an `encoder` field. After the migration, its `chainCodecAddress` and
//! the `address` of the matching `ChainCodec*` entry point at the same contract. Those two fields
//! are linked: for every chain they are either both set or both unset.

use std::fmt::{self, Display, Formatter};

use error_stack::{bail, report, Result, ResultExt};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::chains_config::{ChainsConfig, Section};
use crate::commands::Context;
use crate::msgs::instantiate::CHAIN_CODECS;

const PROVER: &str = "MultisigProver";
const ENCODER: &str = "encoder";
const CHAIN_CODEC_ADDRESS: &str = "chainCodecAddress";
const NEW_PROVER_FLAGS: [&str; 2] = ["notifySigningSession", "expectFullMessagePayloads"];

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Only migrate these chains; defaults to every chain with a MultisigProver entry
    #[arg(long, value_delimiter = ',')]
    pub chains: Vec<String>,
    /// Print the changes without saving the chains config
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("chain '{0}' has no MultisigProver entry")]
    MissingProver(String),
    #[error("MultisigProver of chain '{chain}' has unknown encoder '{encoder}'")]
    UnknownEncoder { chain: String, encoder: String },
    #[error("MultisigProver of chain '{0}' has neither an encoder nor a chain codec")]
    MissingEncoder(String),
    #[error("chain '{chain}' is half migrated: {present} is set but {missing} is not")]
    HalfMigrated {
        chain: String,
        present: String,
        missing: String,
    },
    #[error("failed to update the chains config")]
    Config,
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Migrated {
        codec: &'static str,
        encoder: String,
        multisig_prover: Option<String>,
    },
    AlreadyMigrated {
        codec: &'static str,
    },
    /// Prepared by an earlier run, the codec has no instance yet.
    AwaitingInstantiation {
        codec: &'static str,
    },
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Migrated {
                codec,
                encoder,
                multisig_prover,
            } => {
                write!(f, "encoder '{encoder}' moved to {codec}")?;
                match multisig_prover {
                    Some(address) => write!(f, " (multisigProver {address})"),
                    None => write!(f, " (prover not instantiated yet)"),
                }
            }
            Outcome::AlreadyMigrated { codec } => write!(f, "already migrated to {codec}, skipped"),
            Outcome::AwaitingInstantiation { codec } => {
                write!(f, "prepared, awaiting {codec} instantiation, skipped")
            }
        }
    }
}

pub async fn run(ctx: Context, args: Args) -> Result<Option<String>, crate::Error> {
    let mut config = ctx.load_chains_config()?;

    let outcomes =
        prepare(&mut config, &args.chains).change_context(crate::Error::ChainCodecMigration)?;

    let mut summary: Vec<String> = outcomes
        .iter()
        .map(|(chain, outcome)| format!("{chain}: {outcome}"))
        .collect();

    let changed = outcomes
        .iter()
        .any(|(_, outcome)| matches!(outcome, Outcome::Migrated { .. }));

    if args.dry_run {
        summary.push("dry run, chains config not saved".to_string());
    } else if changed {
        ctx.save_chains_config(&config)?;
    }

    Ok(Some(summary.join("\n")))
}

/// Migrates the given chains, or all prover chains when none are given. Fails without partial
/// results on the first chain that cannot be migrated.
pub fn prepare(
    config: &mut ChainsConfig,
    chains: &[String],
) -> Result<Vec<(String, Outcome)>, Error> {
    let chains = if chains.is_empty() {
        config.contract_chains(PROVER)
    } else {
        chains.to_vec()
    };

    chains
        .into_iter()
        .map(|chain| {
            let outcome = prepare_chain(config, &chain)?;
            info!(chain, %outcome, "prepared chain codec migration");
            Ok((chain, outcome))
        })
        .collect()
}

fn prepare_chain(config: &mut ChainsConfig, chain: &str) -> Result<Outcome, Error> {
    let prover = config
        .chain_contract(PROVER, chain)
        .ok_or(report!(Error::MissingProver(chain.to_string())))?;

    let encoder = string_field(prover, ENCODER);
    let prover_has_codec = string_field(prover, CHAIN_CODEC_ADDRESS).is_some();
    let prover_address = string_field(prover, "address");

    let codec = match &encoder {
        Some(encoder) => codec_for_encoder(chain, encoder)?,
        None => match existing_codec(config, chain) {
            Some(codec) => codec,
            None if prover_has_codec => bail!(half_migrated(
                chain,
                &format!("{PROVER}.{chain}.{CHAIN_CODEC_ADDRESS}"),
                "a chain codec entry",
            )),
            None => bail!(Error::MissingEncoder(chain.to_string())),
        },
    };
    let codec_has_address = config
        .chain_contract(codec, chain)
        .and_then(|entry| string_field(entry, "address"))
        .is_some();

    match (prover_has_codec, codec_has_address) {
        (true, true) => return Ok(Outcome::AlreadyMigrated { codec }),
        (true, false) => bail!(half_migrated(
            chain,
            &format!("{PROVER}.{chain}.{CHAIN_CODEC_ADDRESS}"),
            &format!("{codec}.{chain}.address"),
        )),
        (false, true) => bail!(half_migrated(
            chain,
            &format!("{codec}.{chain}.address"),
            &format!("{PROVER}.{chain}.{CHAIN_CODEC_ADDRESS}"),
        )),
        (false, false) => {}
    }

    let Some(encoder) = encoder else {
        return Ok(Outcome::AwaitingInstantiation { codec });
    };

    let prover = config
        .chain_contract_mut(PROVER, chain)
        .change_context(Error::Config)?;
    prover.remove(ENCODER);
    for flag in NEW_PROVER_FLAGS {
        prover.entry(flag).or_insert(Value::Bool(false));
    }

    let codec_entry = config
        .chain_contract_mut(codec, chain)
        .change_context(Error::Config)?;
    if let Some(address) = &prover_address {
        codec_entry
            .entry("multisigProver")
            .or_insert_with(|| Value::String(address.clone()));
    }

    Ok(Outcome::Migrated {
        codec,
        encoder,
        multisig_prover: prover_address,
    })
}

fn codec_for_encoder(chain: &str, encoder: &str) -> Result<&'static str, Error> {
    CHAIN_CODECS
        .iter()
        .find(|(_, codec_encoder)| *codec_encoder == encoder)
        .map(|(codec, _)| *codec)
        .ok_or(report!(Error::UnknownEncoder {
            chain: chain.to_string(),
            encoder: encoder.to_string(),
        }))
}

/// The chain codec with an entry for `chain`, preferring one that is already instantiated.
fn existing_codec(config: &ChainsConfig, chain: &str) -> Option<&'static str> {
    let codecs = || CHAIN_CODECS.iter().map(|(codec, _)| *codec);

    codecs()
        .find(|codec| {
            config
                .chain_contract(codec, chain)
                .and_then(|entry| string_field(entry, "address"))
                .is_some()
        })
        .or_else(|| codecs().find(|codec| config.chain_contract(codec, chain).is_some()))
}

fn string_field(section: &Section, name: &str) -> Option<String> {
    section
        .get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn half_migrated(chain: &str, present: &str, missing: &str) -> Error {
    Error::HalfMigrated {
        chain: chain.to_string(),
        present: present.to_string(),
        missing: missing.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{prepare, Error, Outcome};
    use crate::chains_config::test_utils::chains_config;
    use crate::chains_config::ChainsConfig;

    fn config() -> ChainsConfig {
        chains_config(json!({
            "axelar": {
                "contracts": {
                    "MultisigProver": {
                        "codeId": 7,
                        "avalanche": {
                            "address": "axelar1avaxprover",
                            "encoder": "abi",
                            "domainSeparator": "0xaa"
                        },
                        "sui": {
                            "address": "axelar1suiprover",
                            "encoder": "bcs",
                            "domainSeparator": "0xbb",
                            "notifySigningSession": true
                        },
                        "stellar": {
                            "encoder": "stellar_xdr",
                            "domainSeparator": "0xcc"
                        }
                    }
                }
            }
        }))
    }

    #[test]
    fn migrates_every_prover_chain() {
        let mut config = config();

        let outcomes = prepare(&mut config, &[]).unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0],
            (
                "avalanche".to_string(),
                Outcome::Migrated {
                    codec: "ChainCodecEvm",
                    encoder: "abi".to_string(),
                    multisig_prover: Some("axelar1avaxprover".to_string()),
                }
            )
        );

        let prover = config.chain_contract("MultisigProver", "avalanche").unwrap();
        assert!(prover.get("encoder").is_none());
        assert_eq!(prover["domainSeparator"], "0xaa");
        assert_eq!(prover["notifySigningSession"], false);
        assert_eq!(prover["expectFullMessagePayloads"], false);
        assert_eq!(
            config.chain_contract("ChainCodecEvm", "avalanche").unwrap()["multisigProver"],
            "axelar1avaxprover"
        );

        // existing flags are kept
        assert_eq!(
            config.chain_contract("MultisigProver", "sui").unwrap()["notifySigningSession"],
            true
        );
        assert_eq!(
            config.chain_contract("ChainCodecSui", "sui").unwrap()["multisigProver"],
            "axelar1suiprover"
        );

        // a prover without address still gets a codec entry to fill in later
        assert!(config.chain_contract("ChainCodecStellar", "stellar").unwrap().is_empty());
    }

    #[test]
    fn migrates_only_selected_chains() {
        let mut config = config();

        let outcomes = prepare(&mut config, &["sui".to_string()]).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            config.chain_contract("MultisigProver", "avalanche").unwrap()["encoder"],
            "abi"
        );
    }

    #[test]
    fn already_migrated_chain_is_skipped() {
        let mut config = chains_config(json!({
            "axelar": {
                "contracts": {
                    "MultisigProver": {
                        "avalanche": { "address": "axelar1prover", "chainCodecAddress": "axelar1codec" }
                    },
                    "ChainCodecEvm": {
                        "avalanche": { "address": "axelar1codec", "multisigProver": "axelar1prover" }
                    }
                }
            }
        }));
        let before = config.clone();

        let outcomes = prepare(&mut config, &[]).unwrap();

        assert_eq!(
            outcomes[0].1,
            Outcome::AlreadyMigrated {
                codec: "ChainCodecEvm"
            }
        );
        assert_eq!(config, before);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut config = config();
        prepare(&mut config, &[]).unwrap();
        let prepared = config.clone();

        let outcomes = prepare(&mut config, &[]).unwrap();

        assert_eq!(
            outcomes,
            vec![
                (
                    "avalanche".to_string(),
                    Outcome::AwaitingInstantiation {
                        codec: "ChainCodecEvm"
                    }
                ),
                (
                    "sui".to_string(),
                    Outcome::AwaitingInstantiation {
                        codec: "ChainCodecSui"
                    }
                ),
                (
                    "stellar".to_string(),
                    Outcome::AwaitingInstantiation {
                        codec: "ChainCodecStellar"
                    }
                ),
            ]
        );
        assert_eq!(config, prepared);
    }

    #[test]
    fn new_chain_is_migrated_next_to_prepared_ones() {
        let mut config = config();
        prepare(&mut config, &[]).unwrap();
        config
            .chain_contract_mut("MultisigProver", "flow")
            .unwrap()
            .insert("encoder".to_string(), json!("abi"));

        let outcomes = prepare(&mut config, &[]).unwrap();

        assert_eq!(outcomes.len(), 4);
        assert!(matches!(
            outcomes[3],
            (ref chain, Outcome::Migrated { codec: "ChainCodecEvm", .. }) if chain == "flow"
        ));
        assert!(config.chain_contract("ChainCodecEvm", "flow").is_some());
    }

    #[test]
    fn prover_without_encoder_or_codec_entry_is_rejected() {
        let mut config = chains_config(json!({
            "axelar": { "contracts": { "MultisigProver": { "sui": { "address": "axelar1prover" } } } }
        }));

        let err = prepare(&mut config, &[]).unwrap_err();

        assert_eq!(
            err.current_context(),
            &Error::MissingEncoder("sui".to_string())
        );
    }

    #[test]
    fn half_migrated_chain_is_rejected() {
        let mut config = chains_config(json!({
            "axelar": {
                "contracts": {
                    "MultisigProver": {
                        "avalanche": { "encoder": "abi", "chainCodecAddress": "axelar1codec" }
                    }
                }
            }
        }));

        let err = prepare(&mut config, &[]).unwrap_err();

        assert!(matches!(
            err.current_context(),
            Error::HalfMigrated { chain, .. } if chain == "avalanche"
        ));
    }

    #[test]
    fn codec_without_prover_link_is_rejected() {
        let mut config = chains_config(json!({
            "axelar": {
                "contracts": {
                    "MultisigProver": { "sui": { "address": "axelar1prover" } },
                    "ChainCodecSui": { "sui": { "address": "axelar1codec" } }
                }
            }
        }));

        let err = prepare(&mut config, &[]).unwrap_err();

        assert!(matches!(err.current_context(), Error::HalfMigrated { .. }));
    }

    #[test]
    fn unknown_encoder_is_rejected() {
        let mut config = chains_config(json!({
            "axelar": { "contracts": { "MultisigProver": { "xrpl": { "encoder": "xrpl" } } } }
        }));

        let err = prepare(&mut config, &[]).unwrap_err();

        assert_eq!(
            err.current_context(),
            &Error::UnknownEncoder {
                chain: "xrpl".to_string(),
                encoder: "xrpl".to_string()
            }
        );
    }

    #[test]
    fn unknown_chain_is_rejected() {
        let err = prepare(&mut config(), &["solana".to_string()]).unwrap_err();

        assert_eq!(
            err.current_context(),
            &Error::MissingProver("solana".to_string())
        );
    }

    #[test]
    fn outcome_summary() {
        let migrated = Outcome::Migrated {
            codec: "ChainCodecEvm",
            encoder: "abi".to_string(),
            multisig_prover: None,
        };

        assert_eq!(
            migrated.to_string(),
            "encoder 'abi' moved to ChainCodecEvm (prover not instantiated yet)"
        );
        assert_eq!(
            Outcome::AlreadyMigrated { codec: "ChainCodecSui" }.to_string(),
            "already migrated to ChainCodecSui, skipped"
        );
        assert_eq!(
            Outcome::AwaitingInstantiation { codec: "ChainCodecSui" }.to_string(),
            "prepared, awaiting ChainCodecSui instantiation, skipped"
        );
    }
}

//! Load tests against a voting verifier: one signer in a timed loop, or several signers at once,
//! and the follow-up check of the polls a run started.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Subcommand;
use cosmrs::{AccountId, Coin};
use error_stack::{Result, ResultExt};
use serde_json::Value;
use tracing::info;

use crate::broadcaster::Broadcaster;
use crate::chains_config::ChainsConfig;
use crate::commands::{axelar_config, Context};
use crate::cosmos::CosmosClient;
use crate::msgs;
use crate::msgs::voting_verifier::{AddressFormat, MsgIdFormat};
use crate::report::LoggableError;
use crate::Error;
pub use output::{PollRecord, TxLog};
pub use stats::{Stats, Summary};
pub use verify::{Verification, VerificationReport};
pub use workload::{SignerOutcome, Workload};

mod output;
mod stats;
mod verify;
mod workload;

const VERIFIER: &str = "VotingVerifier";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send batches of random messages to a voting verifier from the main account
    VerifyMessages(VerifyArgs),
    /// Run the verify-messages workload from several derived accounts at once
    MultiSigner {
        /// Number of signers, using the mnemonic's accounts 1..=n
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        signers: u32,
        #[command(flatten)]
        verify: VerifyArgs,
    },
    /// Send funds from the main account to the multi-signer accounts
    FundSigners {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        signers: u32,
        /// Amount per signer, e.g. 1000000uamplifier
        #[arg(long, value_parser = parse_coin)]
        amount: Coin,
    },
    /// Query the status of every poll in the transactions file of a previous run
    Verify(PollArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Chain whose voting verifier is tested
    #[arg(long)]
    pub chain: String,
    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub duration: Duration,
    /// Messages per VerifyMessages tx
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    pub retry_delay: Duration,
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    pub report_interval: Duration,
    /// Destination chain of the generated messages
    #[arg(long, default_value = "axelar")]
    pub destination_chain: String,
    /// Directory for the transactions file and the JSON report of the run
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PollArgs {
    /// Chain whose voting verifier holds the polls
    #[arg(long)]
    pub chain: String,
    /// Transactions file written by a run with --output-dir
    #[arg(long)]
    pub input: PathBuf,
    /// Directory for the result lists and the report, by default the one of the input
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Position of the first poll to check, counting from 1. Result lists are appended to when
    /// resuming.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub resume_from: u64,
    /// Pause between two poll queries
    #[arg(long, default_value = "100ms", value_parser = humantime::parse_duration)]
    pub delay: Duration,
    /// End expired polls from the main account
    #[arg(long)]
    pub end_expired: bool,
}

fn parse_coin(value: &str) -> std::result::Result<Coin, String> {
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, denom) = value.split_at(split);

    let amount = amount
        .parse::<u128>()
        .map_err(|_| format!("invalid amount in '{value}'"))?;
    Coin::new(amount, denom).map_err(|err| format!("invalid denom in '{value}': {err}"))
}

pub async fn run(ctx: Context, command: Command) -> Result<Option<String>, Error> {
    let config = ctx.load_chains_config()?;
    let axelar = axelar_config(&config)?;
    let mut client = ctx.client(&axelar).await?;

    match command {
        Command::VerifyMessages(args) => {
            let workload = workload(&config, &args)?;
            let mut broadcaster = ctx.broadcaster(client, ctx.wallet(0)?, &axelar);

            let summary = workload.run(&mut broadcaster).await?;

            if let Some(dir) = &args.output_dir {
                let outcome = SignerOutcome {
                    signer: broadcaster.address().clone(),
                    result: Ok(summary),
                };
                output::write_report(dir, &workload, &[outcome])?;
            }

            Ok(Some(summary.to_string()))
        }
        Command::MultiSigner { signers, verify } => {
            let workload = workload(&config, &verify)?;
            let broadcasters = (1..=signers)
                .map(|index| Ok(ctx.broadcaster(client.clone(), ctx.wallet(index)?, &axelar)))
                .collect::<Result<Vec<_>, Error>>()?;

            let outcomes = workload.run_concurrently(broadcasters).await;

            if let Some(dir) = &verify.output_dir {
                output::write_report(dir, &workload, &outcomes)?;
            }

            Ok(Some(report_outcomes(&outcomes)))
        }
        Command::Verify(args) => {
            let verifier = verifier_address(&config, &args.chain)?;
            let polls = output::read_polls(&args.input)?;
            let dir = args.output_dir.clone().unwrap_or_else(|| {
                args.input
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default()
            });
            let mut files = output::VerificationFiles::open(&dir, args.resume_from > 1)?;
            let mut ender = if args.end_expired {
                Some(ctx.broadcaster(client.clone(), ctx.wallet(0)?, &axelar))
            } else {
                None
            };

            let report = Verification::builder()
                .verifier(verifier)
                .delay(args.delay)
                .build()
                .run(
                    &mut client,
                    ender.as_mut(),
                    resumed(&polls, args.resume_from),
                    &mut files,
                )
                .await?;
            output::write_json(&dir.join(output::VERIFICATION_REPORT), &report)?;

            Ok(Some(report.to_string()))
        }
        Command::FundSigners { signers, amount } => {
            let recipients = (1..=signers)
                .map(|index| ctx.wallet(index).map(|wallet| wallet.address().clone()))
                .collect::<Result<Vec<_>, Error>>()?;
            let mut broadcaster = ctx.broadcaster(client, ctx.wallet(0)?, &axelar);

            let tx_hash = fund_signers(&mut broadcaster, &recipients, &amount).await?;

            Ok(Some(format!(
                "sent {amount} to each of {} signers in tx {tx_hash}",
                recipients.len()
            )))
        }
    }
}

fn verifier_address(config: &ChainsConfig, chain: &str) -> Result<AccountId, Error> {
    let verifier = config
        .contract_address(VERIFIER, Some(chain))
        .change_context(Error::InvalidChainsConfig)?;

    msgs::parse_address(&verifier).change_context(Error::InvalidChainsConfig)
}

/// A string setting of the chain's verifier entry, falling back on the default when unset.
fn verifier_setting<T>(config: &ChainsConfig, chain: &str, key: &str) -> Result<T, Error>
where
    T: FromStr + Default,
    T::Err: error_stack::Context,
{
    match config
        .chain_contract(VERIFIER, chain)
        .and_then(|entry| entry.get(key))
        .and_then(Value::as_str)
    {
        Some(value) => value
            .parse::<T>()
            .change_context(Error::InvalidChainsConfig)
            .attach_printable_lazy(|| format!("{VERIFIER}.{chain}.{key}")),
        None => Ok(T::default()),
    }
}

/// The polls from the 1-based position `resume_from` on.
fn resumed(polls: &[PollRecord], resume_from: u64) -> &[PollRecord] {
    let skip = usize::try_from(resume_from.saturating_sub(1)).unwrap_or(usize::MAX);

    polls.get(skip..).unwrap_or_default()
}

/// Builds the workload for the chain's voting verifier, generating message ids and source
/// addresses in the formats the verifier validates. With an output dir, confirmed batches are
/// logged to a fresh transactions file in it.
pub fn workload(config: &ChainsConfig, args: &VerifyArgs) -> Result<Workload, Error> {
    let verifier = verifier_address(config, &args.chain)?;
    let msg_id_format: MsgIdFormat = verifier_setting(config, &args.chain, "msgIdFormat")?;
    let address_format: AddressFormat = verifier_setting(config, &args.chain, "addressFormat")?;
    let tx_log = args
        .output_dir
        .as_deref()
        .map(TxLog::create)
        .transpose()?;

    Ok(Workload::builder()
        .verifier(verifier)
        .source_chain(config.chain_axelar_id(&args.chain))
        .destination_chain(args.destination_chain.clone())
        .msg_id_format(msg_id_format)
        .address_format(address_format)
        .tx_log(tx_log)
        .duration(args.duration)
        .batch_size(args.batch_size)
        .max_retries(args.max_retries)
        .retry_delay(args.retry_delay)
        .report_interval(args.report_interval)
        .build())
}

/// Sends `amount` to every recipient in a single tx and returns its hash.
pub async fn fund_signers<T>(
    broadcaster: &mut Broadcaster<T>,
    recipients: &[AccountId],
    amount: &Coin,
) -> Result<String, Error>
where
    T: CosmosClient,
{
    let sender = broadcaster.address().clone();
    let sends = recipients
        .iter()
        .map(|recipient| {
            msgs::send(&sender, recipient, amount.clone()).change_context(Error::InvalidInput)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let response = broadcaster
        .broadcast_and_confirm(sends)
        .await
        .change_context(Error::Broadcaster)?;

    info!(
        signers = recipients.len(),
        %amount,
        tx_hash = response.txhash,
        "funded signers"
    );

    Ok(response.txhash)
}

fn report_outcomes(outcomes: &[SignerOutcome]) -> String {
    let mut lines: Vec<String> = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(summary) => format!("{}: {summary}", outcome.signer),
            Err(err) => format!("{}: failed: {}", outcome.signer, LoggableError::from(err)),
        })
        .collect();

    let succeeded: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| outcome.result.as_ref().ok())
        .collect();
    lines.push(format!(
        "total ({} of {} signers finished): {}",
        succeeded.len(),
        outcomes.len(),
        Summary::aggregate(succeeded)
    ));

    lines.join("\n")
}

use std::time::Duration;

use cosmrs::{AccountId, Any};
use error_stack::{Result, ResultExt};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use super::output::TxLog;
use super::stats::{Stats, Summary};
use crate::broadcaster::Broadcaster;
use crate::cosmos::CosmosClient;
use crate::events;
use crate::msgs;
use crate::msgs::voting_verifier::{random_message, AddressFormat, ExecuteMsg, MsgIdFormat};
use crate::report::LoggableError;
use crate::Error;

/// Batches of random messages sent to a voting verifier for a fixed time.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Workload {
    pub(super) verifier: AccountId,
    pub(super) source_chain: String,
    pub(super) destination_chain: String,
    #[builder(default)]
    pub(super) msg_id_format: MsgIdFormat,
    #[builder(default)]
    pub(super) address_format: AddressFormat,
    pub(super) duration: Duration,
    pub(super) batch_size: u64,
    #[builder(default = 3)]
    max_retries: u32,
    #[builder(default = Duration::from_secs(1))]
    retry_delay: Duration,
    #[builder(default = Duration::from_secs(5))]
    report_interval: Duration,
    #[builder(default)]
    pub(super) tx_log: Option<TxLog>,
}

/// How a single signer of a concurrent run ended.
#[derive(Debug)]
pub struct SignerOutcome {
    pub signer: AccountId,
    pub result: Result<Summary, Error>,
}

impl Workload {
    /// Sends batches until the duration elapses. Failed batches are counted, not returned as
    /// errors.
    pub async fn run<T>(&self, broadcaster: &mut Broadcaster<T>) -> Result<Summary, Error>
    where
        T: CosmosClient,
    {
        let mut rng = StdRng::from_entropy();
        let mut stats = Stats::default();
        let start = Instant::now();
        let mut last_report = start;

        info!(
            signer = %broadcaster.address(),
            verifier = %self.verifier,
            batch_size = self.batch_size,
            duration = ?self.duration,
            "starting verify messages load test"
        );

        while start.elapsed() < self.duration {
            let batch = (0..self.batch_size)
                .map(|_| {
                    random_message(
                        &mut rng,
                        &self.source_chain,
                        &self.destination_chain,
                        self.msg_id_format,
                        self.address_format,
                    )
                })
                .collect();
            let msg = msgs::execute(
                broadcaster.address(),
                &self.verifier,
                &ExecuteMsg::VerifyMessages(batch),
            )
            .change_context(Error::LoadTest)?;

            match self.submit(broadcaster, msg, &mut stats).await {
                Some((tx_hash, poll_ids)) => {
                    stats.record_success(
                        self.batch_size,
                        poll_ids.len().try_into().unwrap_or(u64::MAX),
                    );

                    if let Some(tx_log) = &self.tx_log {
                        tx_log.record(&tx_hash, &poll_ids)?;
                    }
                }
                None => {
                    stats.record_failure();
                    time::sleep(self.retry_delay).await;
                }
            }

            if last_report.elapsed() >= self.report_interval {
                let elapsed = start.elapsed();
                info!(
                    signer = %broadcaster.address(),
                    txs_succeeded = stats.txs_succeeded,
                    txs_failed = stats.txs_failed,
                    polls = stats.polls,
                    polls_per_second = stats.polls_per_second(elapsed),
                    "load test progress"
                );
                last_report = Instant::now();
            }
        }

        let summary = Summary {
            stats,
            elapsed: start.elapsed(),
        };
        info!(signer = %broadcaster.address(), %summary, "load test finished");

        Ok(summary)
    }

    /// Broadcasts the batch, retrying up to `max_retries` times. Returns the tx hash and the ids
    /// of the polls the batch started, or `None` once every attempt failed.
    async fn submit<T>(
        &self,
        broadcaster: &mut Broadcaster<T>,
        msg: Any,
        stats: &mut Stats,
    ) -> Option<(String, Vec<String>)>
    where
        T: CosmosClient,
    {
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                stats.record_retry();
                time::sleep(self.retry_delay).await;
            }

            match broadcaster.broadcast_and_confirm(vec![msg.clone()]).await {
                Ok(response) => {
                    let poll_ids = events::poll_ids(&response);
                    debug!(tx_hash = response.txhash, ?poll_ids, "batch verified");

                    return Some((response.txhash, poll_ids));
                }
                Err(err) => {
                    warn!(
                        attempt,
                        err = %LoggableError::from(&err),
                        "failed to submit batch"
                    );
                }
            }
        }

        None
    }

    /// Runs the workload on every broadcaster at once and waits for all of them, whether they
    /// fail or not.
    pub async fn run_concurrently<T>(&self, broadcasters: Vec<Broadcaster<T>>) -> Vec<SignerOutcome>
    where
        T: CosmosClient,
    {
        join_all(broadcasters.into_iter().map(|mut broadcaster| async move {
            let signer = broadcaster.address().clone();
            let result = self.run(&mut broadcaster).await;

            if let Err(err) = &result {
                warn!(%signer, err = %LoggableError::from(err), "signer stopped");
            }

            SignerOutcome { signer, result }
        }))
        .await
    }
}

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use cosmrs::AccountId;
use error_stack::{Report, Result, ResultExt};
use num_traits::cast;
use serde::Serialize;
use tokio::time;
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use super::output::{PollRecord, VerificationFiles};
use crate::broadcaster::Broadcaster;
use crate::cosmos::{self, CosmosClient};
use crate::msgs;
use crate::msgs::voting_verifier::{ExecuteMsg, PollResponse, PollStatus, QueryMsg};
use crate::report::LoggableError;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Finished,
    /// Expired and ended by this run.
    Ended,
    Pending(PollStatus),
    Failed(String),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub reason: String,
    pub count: u64,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct VerificationReport {
    pub total_verified: u64,
    pub finished: u64,
    pub ended: u64,
    pub pending: u64,
    pub failed: u64,
    /// Finished and ended polls, in percent of all checked polls.
    pub success_rate: f64,
    pub failure_reasons: Vec<FailureReason>,
}

impl Display for VerificationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "polls: {} checked, {} finished, {} ended, {} pending, {} failed; success rate: {:.2}%",
            self.total_verified,
            self.finished,
            self.ended,
            self.pending,
            self.failed,
            self.success_rate
        )
    }
}

#[derive(Debug, Default)]
struct Tally {
    total: u64,
    finished: u64,
    ended: u64,
    pending: u64,
    reasons: BTreeMap<String, u64>,
}

impl Tally {
    fn add(&mut self, outcome: &Outcome) {
        self.total = self.total.saturating_add(1);

        match outcome {
            Outcome::Finished => self.finished = self.finished.saturating_add(1),
            Outcome::Ended => self.ended = self.ended.saturating_add(1),
            Outcome::Pending(_) => self.pending = self.pending.saturating_add(1),
            Outcome::Failed(reason) => {
                let count = self.reasons.entry(reason.clone()).or_default();
                *count = count.saturating_add(1);
            }
        }
    }

    fn report(self) -> VerificationReport {
        let failed = self.reasons.values().fold(0u64, |sum, n| sum.saturating_add(*n));
        let succeeded = self.finished.saturating_add(self.ended);
        let success_rate = if self.total == 0 {
            0.0
        } else {
            cast::<u64, f64>(succeeded).unwrap_or_default() * 100.0
                / cast::<u64, f64>(self.total).unwrap_or(1.0)
        };

        let mut failure_reasons: Vec<_> = self
            .reasons
            .into_iter()
            .map(|(reason, count)| FailureReason { reason, count })
            .collect();
        failure_reasons.sort_by(|a, b| b.count.cmp(&a.count));

        VerificationReport {
            total_verified: self.total,
            finished: self.finished,
            ended: self.ended,
            pending: self.pending,
            failed,
            success_rate,
            failure_reasons,
        }
    }
}

/// Checks the status of polls one by one, pausing `delay` between queries.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Verification {
    verifier: AccountId,
    #[builder(default = Duration::from_millis(100))]
    delay: Duration,
}

impl Verification {
    /// Sorts every poll into the success, pending or failed list. Expired polls are ended when an
    /// `ender` is given, otherwise they stay pending.
    pub async fn run<T>(
        &self,
        client: &mut T,
        mut ender: Option<&mut Broadcaster<T>>,
        polls: &[PollRecord],
        files: &mut VerificationFiles,
    ) -> Result<VerificationReport, Error>
    where
        T: CosmosClient,
    {
        let mut tally = Tally::default();

        info!(verifier = %self.verifier, polls = polls.len(), "verifying polls");

        for (i, record) in polls.iter().enumerate() {
            if i > 0 {
                time::sleep(self.delay).await;
            }

            let outcome = self.check(client, ender.as_deref_mut(), record).await;
            match &outcome {
                Outcome::Finished | Outcome::Ended => files.success(record)?,
                Outcome::Pending(status) => files.pending(record, &status.to_string())?,
                Outcome::Failed(reason) => files.failed(record, reason)?,
            }
            tally.add(&outcome);
        }

        let report = tally.report();
        info!(%report, "poll verification finished");

        Ok(report)
    }

    async fn check<T>(
        &self,
        client: &mut T,
        ender: Option<&mut Broadcaster<T>>,
        record: &PollRecord,
    ) -> Outcome
    where
        T: CosmosClient,
    {
        let query = QueryMsg::Poll {
            poll_id: record.poll_id.clone(),
        };

        let response: PollResponse =
            match cosmos::query_contract(client, &self.verifier.to_string(), &query).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(
                        poll_id = record.poll_id,
                        err = %LoggableError::from(&err),
                        "failed to query poll"
                    );
                    return Outcome::Failed(failure_reason(&err));
                }
            };

        match (response.status, ender) {
            (PollStatus::Finished, _) => Outcome::Finished,
            (PollStatus::Expired, Some(ender)) => self.end_poll(ender, record).await,
            (status, _) => Outcome::Pending(status),
        }
    }

    async fn end_poll<T>(&self, ender: &mut Broadcaster<T>, record: &PollRecord) -> Outcome
    where
        T: CosmosClient,
    {
        let msg = ExecuteMsg::EndPoll {
            poll_id: record.poll_id.clone(),
        };

        let result = match msgs::execute(ender.address(), &self.verifier, &msg) {
            Ok(msg) => ender
                .broadcast_and_confirm(vec![msg])
                .await
                .change_context(Error::Broadcaster),
            Err(err) => Err(err.change_context(Error::InvalidInput)),
        };

        match result {
            Ok(response) => {
                info!(
                    poll_id = record.poll_id,
                    tx_hash = response.txhash,
                    "ended expired poll"
                );
                Outcome::Ended
            }
            Err(err) => {
                warn!(
                    poll_id = record.poll_id,
                    err = %LoggableError::from(&err),
                    "failed to end expired poll"
                );
                Outcome::Pending(PollStatus::Expired)
            }
        }
    }
}

/// The node's own message when it rejected the query, so that reasons group by cause.
fn failure_reason(err: &Report<cosmos::Error>) -> String {
    match err.current_context() {
        cosmos::Error::GrpcRequest(status) => status.message().to_string(),
        other => other.to_string(),
    }
}

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use num_traits::cast;
use serde::Serialize;

/// Counters of a load test run. A batch is one `VerifyMessages` tx.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub txs_succeeded: u64,
    pub txs_failed: u64,
    pub retries: u64,
    pub messages: u64,
    pub polls: u64,
}

impl Stats {
    pub fn record_success(&mut self, messages: u64, polls: u64) {
        self.txs_succeeded = self.txs_succeeded.saturating_add(1);
        self.messages = self.messages.saturating_add(messages);
        self.polls = self.polls.saturating_add(polls);
    }

    pub fn record_failure(&mut self) {
        self.txs_failed = self.txs_failed.saturating_add(1);
    }

    pub fn record_retry(&mut self) {
        self.retries = self.retries.saturating_add(1);
    }

    pub fn merge(&mut self, other: &Stats) {
        self.txs_succeeded = self.txs_succeeded.saturating_add(other.txs_succeeded);
        self.txs_failed = self.txs_failed.saturating_add(other.txs_failed);
        self.retries = self.retries.saturating_add(other.retries);
        self.messages = self.messages.saturating_add(other.messages);
        self.polls = self.polls.saturating_add(other.polls);
    }

    /// Zero when no time has elapsed.
    pub fn polls_per_second(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }

        cast::<u64, f64>(self.polls).unwrap_or_default() / secs
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Summary {
    pub stats: Stats,
    pub elapsed: Duration,
}

impl Summary {
    /// Totals over several runs that went on concurrently, so the longest run is the elapsed time.
    pub fn aggregate<'a>(summaries: impl IntoIterator<Item = &'a Summary>) -> Summary {
        summaries
            .into_iter()
            .fold(Summary::default(), |mut total, summary| {
                total.stats.merge(&summary.stats);
                total.elapsed = total.elapsed.max(summary.elapsed);
                total
            })
    }

    pub fn polls_per_second(&self) -> f64 {
        self.stats.polls_per_second(self.elapsed)
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "txs: {} ok, {} failed, {} retries; messages: {}; polls: {}; elapsed: {:.1}s; {:.2} polls/s",
            self.stats.txs_succeeded,
            self.stats.txs_failed,
            self.stats.retries,
            self.stats.messages,
            self.stats.polls,
            self.elapsed.as_secs_f64(),
            self.polls_per_second()
        )
    }
}

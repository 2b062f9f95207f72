//! Files a load test leaves behind in its output directory.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use error_stack::{Result, ResultExt};
use serde::Serialize;
use tracing::info;

use super::stats::{Stats, Summary};
use super::workload::{SignerOutcome, Workload};
use crate::report::LoggableError;
use crate::Error;

pub const TRANSACTIONS: &str = "transactions.txt";
pub const REPORT: &str = "report.json";
pub const SUCCESS: &str = "success.txt";
pub const PENDING: &str = "pending.txt";
pub const FAILED: &str = "failed.txt";
pub const VERIFICATION_REPORT: &str = "verification.json";

/// One line per confirmed batch: the tx hash followed by the ids of the polls it started.
#[derive(Debug, Clone)]
pub struct TxLog {
    path: PathBuf,
}

impl TxLog {
    /// Starts an empty log in `dir`, replacing the one of a previous run.
    pub fn create(dir: &Path) -> Result<Self, Error> {
        fs::create_dir_all(dir)
            .change_context(Error::Output)
            .attach_printable_lazy(|| format!("dir: {}", dir.display()))?;

        let path = dir.join(TRANSACTIONS);
        File::create(&path)
            .change_context(Error::Output)
            .attach_printable_lazy(|| format!("file: {}", path.display()))?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Signers share the log, so every record is a single append.
    pub fn record(&self, tx_hash: &str, poll_ids: &[String]) -> Result<(), Error> {
        let line = std::iter::once(tx_hash)
            .chain(poll_ids.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"))
            .change_context(Error::Output)
            .attach_printable_lazy(|| format!("file: {}", self.path.display()))
    }
}

/// A tx hash and one of the polls it started, as read back from a [`TxLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRecord {
    pub tx_hash: String,
    pub poll_id: String,
}

/// Reads a tx log in file order. Blank lines and txs that started no poll are skipped.
pub fn read_polls(path: &Path) -> Result<Vec<PollRecord>, Error> {
    let content = fs::read_to_string(path)
        .change_context(Error::InvalidInput)
        .attach_printable_lazy(|| format!("file: {}", path.display()))?;

    Ok(content
        .lines()
        .flat_map(|line| {
            let mut fields = line.split_whitespace();
            let tx_hash = fields.next().unwrap_or_default().to_string();

            fields
                .map(move |poll_id| PollRecord {
                    tx_hash: tx_hash.clone(),
                    poll_id: poll_id.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect())
}

#[derive(Serialize, Debug)]
struct SignerReport {
    signer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<Stats>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    elapsed: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize, Debug)]
struct TotalReport {
    stats: Stats,
    #[serde(with = "humantime_serde")]
    elapsed: Duration,
    polls_per_second: f64,
}

#[derive(Serialize, Debug)]
struct LoadTestReport<'a> {
    verifier: String,
    source_chain: &'a str,
    destination_chain: &'a str,
    msg_id_format: String,
    address_format: String,
    batch_size: u64,
    #[serde(with = "humantime_serde")]
    duration: Duration,
    signers: Vec<SignerReport>,
    total: TotalReport,
}

/// Writes the settings and results of a run as pretty printed JSON.
pub fn write_report(
    dir: &Path,
    workload: &Workload,
    outcomes: &[SignerOutcome],
) -> Result<PathBuf, Error> {
    let total = Summary::aggregate(outcomes.iter().filter_map(|o| o.result.as_ref().ok()));
    let report = LoadTestReport {
        verifier: workload.verifier.to_string(),
        source_chain: &workload.source_chain,
        destination_chain: &workload.destination_chain,
        msg_id_format: workload.msg_id_format.to_string(),
        address_format: workload.address_format.to_string(),
        batch_size: workload.batch_size,
        duration: workload.duration,
        signers: outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(summary) => SignerReport {
                    signer: outcome.signer.to_string(),
                    stats: Some(summary.stats),
                    elapsed: Some(summary.elapsed),
                    error: None,
                },
                Err(err) => SignerReport {
                    signer: outcome.signer.to_string(),
                    stats: None,
                    elapsed: None,
                    error: Some(LoggableError::from(err).to_string()),
                },
            })
            .collect(),
        total: TotalReport {
            stats: total.stats,
            elapsed: total.elapsed,
            polls_per_second: total.polls_per_second(),
        },
    };

    write_json(&dir.join(REPORT), &report)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf, Error> {
    let json = serde_json::to_string_pretty(value).change_context(Error::Output)?;

    fs::write(path, json)
        .change_context(Error::Output)
        .attach_printable_lazy(|| format!("file: {}", path.display()))?;

    info!(path = %path.display(), "wrote report");
    Ok(path.to_path_buf())
}

/// The success, pending and failed lists of a poll verification. A resumed verification appends
/// to the lists of the run it continues.
#[derive(Debug)]
pub struct VerificationFiles {
    success: File,
    pending: File,
    failed: File,
}

impl VerificationFiles {
    pub fn open(dir: &Path, append: bool) -> Result<Self, Error> {
        fs::create_dir_all(dir)
            .change_context(Error::Output)
            .attach_printable_lazy(|| format!("dir: {}", dir.display()))?;

        let open = |name: &str| {
            let path = dir.join(name);
            OpenOptions::new()
                .create(true)
                .write(true)
                .append(append)
                .truncate(!append)
                .open(&path)
                .change_context(Error::Output)
                .attach_printable_lazy(|| format!("file: {}", path.display()))
        };

        Ok(Self {
            success: open(SUCCESS)?,
            pending: open(PENDING)?,
            failed: open(FAILED)?,
        })
    }

    pub fn success(&mut self, record: &PollRecord) -> Result<(), Error> {
        line(&mut self.success, record, None)
    }

    pub fn pending(&mut self, record: &PollRecord, status: &str) -> Result<(), Error> {
        line(&mut self.pending, record, Some(status))
    }

    pub fn failed(&mut self, record: &PollRecord, reason: &str) -> Result<(), Error> {
        line(&mut self.failed, record, Some(reason))
    }
}

fn line(file: &mut File, record: &PollRecord, detail: Option<&str>) -> Result<(), Error> {
    let written = match detail {
        Some(detail) => writeln!(file, "{} {} {detail}", record.tx_hash, record.poll_id),
        None => writeln!(file, "{} {}", record.tx_hash, record.poll_id),
    };

    written.change_context(Error::Output)
}

//! Helpers that turn `error_stack` reports into log-friendly values and bridge the `eyre`
//! reports returned by `cosmrs` into `error_stack`.

use std::fmt::{Display, Formatter};
use std::panic::Location;

use error_stack::{AttachmentKind, Context, Frame, FrameKind, Report};
use eyre::Report as EyreReport;
use itertools::Itertools;

/// A flattened view of a report: one entry per context, outermost first.
#[derive(PartialEq, Eq, Debug, Default)]
pub struct LoggableError {
    pub msg: String,
    pub attachments: Vec<String>,
    pub location: String,
    pub cause: Option<Box<LoggableError>>,
}

impl Display for LoggableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)?;

        if !self.attachments.is_empty() {
            write!(f, " ({})", self.attachments.iter().join(", "))?;
        }

        match &self.cause {
            Some(cause) => write!(f, ": {}", cause),
            None => Ok(()),
        }
    }
}

impl<C> From<&Report<C>> for LoggableError {
    fn from(report: &Report<C>) -> Self {
        // frames are ordered from the outermost context to the root cause, with the attachments of
        // a context preceding it
        let mut errors = vec![];
        let mut current = LoggableError::default();

        for frame in report.frames() {
            match frame.kind() {
                FrameKind::Context(context) => {
                    current.msg = context.to_string();
                    current.attachments.reverse();
                    errors.push(std::mem::take(&mut current));
                }
                FrameKind::Attachment(AttachmentKind::Printable(printable)) => {
                    current.attachments.push(printable.to_string())
                }
                FrameKind::Attachment(_) => {
                    if let Some(location) = location(frame) {
                        current.location = location.to_string();
                    }
                }
            }
        }

        errors
            .into_iter()
            .rev()
            .fold(None, |cause, mut error| {
                error.cause = cause.map(Box::new);
                Some(error)
            })
            .unwrap_or_default()
    }
}

fn location(frame: &Frame) -> Option<&Location<'static>> {
    frame.downcast_ref::<Location<'static>>()
}

pub trait ErrorExt<Err>
where
    Self: Into<Err>,
    Err: Context,
{
    /// Converts self into the error type `Err` and wraps it in a new `Report`.
    fn into_report(self) -> Report<Err> {
        Report::new(self.into())
    }
}

impl<T, Err> ErrorExt<Err> for T
where
    T: Into<Err>,
    Err: Context,
{
}

/// `cosmrs` reports its failures as `eyre` reports, which do not implement `Context`.
pub trait ResultCompatExt {
    type Ok;

    fn change_context<C>(self, context: C) -> Result<Self::Ok, Report<C>>
    where
        C: Context;
}

impl<T> ResultCompatExt for Result<T, EyreReport> {
    type Ok = T;

    fn change_context<C>(self, context: C) -> Result<T, Report<C>>
    where
        C: Context,
    {
        error_stack::IntoReportCompat::into_report(self)
            .map_err(|report| report.change_context(context))
    }
}

#[cfg(test)]
mod tests {
    use error_stack::Report;
    use thiserror::Error;

    use super::{LoggableError, ResultCompatExt};

    #[derive(Error, Debug)]
    enum Error {
        #[error("{0}")]
        Msg(String),
    }

    #[test]
    fn loggable_error_keeps_context_order_and_attachments() {
        let report = Report::new(Error::Msg("root".to_string()))
            .attach_printable("first")
            .change_context(Error::Msg("middle".to_string()))
            .attach_printable("second")
            .attach_printable("third")
            .change_context(Error::Msg("outer".to_string()));

        let err = LoggableError::from(&report);

        assert_eq!(err.msg, "outer");
        assert!(err.attachments.is_empty());
        assert!(err.location.contains("report.rs"));

        let middle = err.cause.as_ref().unwrap();
        assert_eq!(middle.msg, "middle");
        assert_eq!(middle.attachments, vec!["second", "third"]);

        let root = middle.cause.as_ref().unwrap();
        assert_eq!(root.msg, "root");
        assert_eq!(root.attachments, vec!["first"]);
        assert!(root.cause.is_none());
    }

    #[test]
    fn loggable_error_display_contains_all_contexts() {
        let report = Report::new(Error::Msg("tx rejected".to_string()))
            .attach_printable("code 5")
            .change_context(Error::Msg("broadcast failed".to_string()));

        let msg = LoggableError::from(&report).to_string();

        assert_eq!(msg, "broadcast failed: tx rejected (code 5)");
    }

    #[test]
    fn eyre_results_convert_into_reports() {
        let result: Result<(), eyre::Report> = Err(eyre::eyre!("invalid denom"));

        let report = result
            .change_context(Error::Msg("failed to parse coin".to_string()))
            .unwrap_err();

        assert_eq!(report.current_context().to_string(), "failed to parse coin");
    }
}

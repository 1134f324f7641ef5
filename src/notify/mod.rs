//! Run-completion notification
//!
//! Fire-and-forget: the engine invokes the sink after a run completes and
//! logs failures without ever failing the run.

#![allow(dead_code)]

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::{TestResults, TestSuite};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification sink is disabled: {sink}")]
    SinkDisabled { sink: String },

    #[error("notification sink failed: {message}")]
    SinkFailed { message: String },
}

/// Delivery sink for run-completion notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, suite: &TestSuite, results: &TestResults) -> Result<(), NotifyError>;
}

/// Sink that reports through the log stream. Stands in for the external
/// email/Slack/webhook dispatchers, which live outside this crate.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, suite: &TestSuite, results: &TestResults) -> Result<(), NotifyError> {
        info!(
            suite = %suite.id,
            run = %results.id,
            status = %results.status,
            passed = results.summary.passed,
            failed = results.summary.failed,
            errors = results.summary.errors,
            "suite run finished"
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_format() {
        let err = NotifyError::SinkDisabled {
            sink: "webhook".to_string(),
        };
        assert_eq!(err.to_string(), "notification sink is disabled: webhook");

        let err = NotifyError::SinkFailed {
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "notification sink failed: connection refused"
        );
    }
}

//! Target adapter contract
//!
//! The engine reaches its subjects (agents, workflows, deployments,
//! personas) only through this interface. Concrete backends live outside
//! this crate; the stubs here back the CLI and the test suite.

mod stubs;

pub use stubs::{CaseScript, EchoAdapter, ScriptedAdapter};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::models::{TargetType, TestInput};

/// Errors an adapter may surface. The engine maps every variant to a
/// case-level outcome; none of them abort a run by themselves.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("target did not respond before the deadline")]
    Timeout,

    #[error("execution cancelled")]
    Cancelled,

    #[error("target unreachable: {message}")]
    Unreachable { message: String },

    #[error("target execution failed: {message}")]
    Execution { message: String },
}

impl AdapterError {
    pub fn execution(message: impl Into<String>) -> Self {
        AdapterError::Execution {
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        AdapterError::Unreachable {
            message: message.into(),
        }
    }
}

/// Uniform interface for executing one test input against one subject.
///
/// Contract: the call must return by `deadline` (a past deadline returns
/// [`AdapterError::Timeout`] rather than hanging) and must observe `cancel`,
/// returning [`AdapterError::Cancelled`] promptly once the token is set. The
/// deadline is the single timeout source for a case; callers do not layer a
/// second timer on top.
#[async_trait]
pub trait TargetAdapter: Send + Sync {
    async fn execute(
        &self,
        target_type: TargetType,
        target_id: &str,
        input: &TestInput,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Value, AdapterError>;
}

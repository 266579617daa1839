//! Concurrent execution of many decision cycles.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use hitl_primitives::{AgentId, SignalSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::{DecisionError, DecisionKernel, DecisionRecord};

const DEFAULT_CONCURRENCY: usize = 32;

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Agent to decide for.
    pub agent_id: AgentId,
    /// Signals of the subject.
    #[serde(default)]
    pub signals: SignalSet,
}

impl DecisionRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(agent_id: AgentId, signals: SignalSet) -> Self {
        Self { agent_id, signals }
    }
}

/// Maximum number of cycles evaluated at once.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    max_concurrency: NonZeroUsize,
}

impl BatchConfig {
    /// Creates a configuration with the supplied concurrency limit.
    #[must_use]
    pub const fn new(max_concurrency: NonZeroUsize) -> Self {
        Self { max_concurrency }
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub const fn max_concurrency(self) -> NonZeroUsize {
        self.max_concurrency
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN))
    }
}

/// Runs decision cycles on the tokio runtime with bounded concurrency.
/// Output order always matches input order.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    kernel: Arc<DecisionKernel>,
    semaphore: Arc<Semaphore>,
    closed: Arc<AtomicBool>,
    config: BatchConfig,
}

impl BatchRunner {
    /// Creates a runner over a shared kernel.
    #[must_use]
    pub fn new(kernel: Arc<DecisionKernel>, config: BatchConfig) -> Self {
        Self {
            kernel,
            semaphore: Arc::new(Semaphore::new(config.max_concurrency().get())),
            closed: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// Returns the associated configuration.
    #[must_use]
    pub const fn config(&self) -> BatchConfig {
        self.config
    }

    /// Returns `true` if the runner has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the runner; queued cycles that have not started yet fail with
    /// [`BatchError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.semaphore.close();
    }

    /// Decides every request, one result per request in input order.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Closed`] when the runner was closed before the
    /// batch started. Per-request failures are reported in the output.
    pub async fn run(
        &self,
        requests: Vec<DecisionRequest>,
    ) -> BatchResult<Vec<BatchResult<DecisionRecord>>> {
        if self.is_closed() {
            return Err(BatchError::Closed);
        }

        debug!(requests = requests.len(), "starting decision batch");
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let kernel = Arc::clone(&self.kernel);
                let semaphore = Arc::clone(&self.semaphore);
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| BatchError::Closed)?;
                    Ok::<_, BatchError>(kernel.decide(&request.agent_id, &request.signals)?)
                })
            })
            .collect();

        Ok(join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap_or_else(|err| Err(BatchError::Join(err.to_string()))))
            .collect())
    }
}

/// Errors produced by the batch runner.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Runner is closed and will not start new cycles.
    #[error("batch runner closed")]
    Closed,
    /// The cycle itself failed.
    #[error(transparent)]
    Decision(#[from] DecisionError),
    /// The task running the cycle panicked or was cancelled.
    #[error("decision task failed: {0}")]
    Join(String),
}

/// Result alias for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

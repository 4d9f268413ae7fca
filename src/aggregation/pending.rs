//! Pending results of cell computations

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::output::CellOutputs;

/// Failure reported by a metric computation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct MetricComputeError {
    message: String,
}

impl MetricComputeError {
    /// Failure with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<crate::error::Error> for MetricComputeError {
    fn from(error: crate::error::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Outcome of one cell computation
pub type CellResult<T> = Result<CellOutputs<T>, MetricComputeError>;

/// A cell result that may not be available yet
#[derive(Debug)]
pub enum PendingOutput<T> {
    /// Already computed
    Ready(CellResult<T>),
    /// Computed by a spawned task
    Task(JoinHandle<CellResult<T>>),
    /// Sent by a producer over a channel
    Channel(oneshot::Receiver<CellResult<T>>),
}

impl<T> PendingOutput<T> {
    /// Label used when recording registrations
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            PendingOutput::Ready(_) => "ready",
            PendingOutput::Task(_) => "task",
            PendingOutput::Channel(_) => "channel",
        }
    }

    /// Wait for the result
    pub(crate) async fn settle(self) -> Result<CellOutputs<T>, Unsettled> {
        match self {
            PendingOutput::Ready(result) => result.map_err(Unsettled::from),
            PendingOutput::Task(handle) => match handle.await {
                Ok(result) => result.map_err(Unsettled::from),
                Err(e) if e.is_cancelled() => {
                    Err(Unsettled::Interrupted("the computation task was cancelled".into()))
                },
                Err(e) => Err(Unsettled::Failed(format!("the computation task panicked: {}", e))),
            },
            PendingOutput::Channel(receiver) => match receiver.await {
                Ok(result) => result.map_err(Unsettled::from),
                Err(_) => Err(Unsettled::Interrupted(
                    "the producer dropped the channel without sending a result".into(),
                )),
            },
        }
    }
}

impl<T> From<CellOutputs<T>> for PendingOutput<T> {
    fn from(outputs: CellOutputs<T>) -> Self {
        PendingOutput::Ready(Ok(outputs))
    }
}

impl<T> From<CellResult<T>> for PendingOutput<T> {
    fn from(result: CellResult<T>) -> Self {
        PendingOutput::Ready(result)
    }
}

impl<T> From<JoinHandle<CellResult<T>>> for PendingOutput<T> {
    fn from(handle: JoinHandle<CellResult<T>>) -> Self {
        PendingOutput::Task(handle)
    }
}

impl<T> From<oneshot::Receiver<CellResult<T>>> for PendingOutput<T> {
    fn from(receiver: oneshot::Receiver<CellResult<T>>) -> Self {
        PendingOutput::Channel(receiver)
    }
}

/// Why a pending result produced no outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Unsettled {
    Failed(String),
    Interrupted(String),
}

impl From<MetricComputeError> for Unsettled {
    fn from(error: MetricComputeError) -> Self {
        Unsettled::Failed(error.message)
    }
}

use std::io;

use shared::constants::TERMINATING_ERROR_ID;
use thiserror::Error;

use super::SessionState;
use crate::source::{ResolutionError, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    OperationStopped,
}

/// The single failure a session surfaces after its drain loop exits.
#[derive(Debug, Error)]
#[error("operation stopped (error id {error_id}): {source}")]
pub struct TerminatingError {
    pub error_id: &'static str,
    pub category: ErrorCategory,
    #[source]
    pub source: SourceError,
}

impl TerminatingError {
    pub fn new(source: SourceError) -> Self {
        Self { error_id: TERMINATING_ERROR_ID, category: ErrorCategory::OperationStopped, source }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot resolve event source: {0}")]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Terminated(#[from] TerminatingError),

    #[error("host output failed: {0}")]
    Host(#[from] io::Error),

    #[error("session cannot run from state {0:?}")]
    InvalidState(SessionState),
}

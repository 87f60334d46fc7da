//! Error types for electrox.

use thiserror::Error;

/// A formula was evaluated at an angular frequency outside its domain.
///
/// Reported per sweep point, so one bad frequency does not void the
/// rest of the sweep.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{element}: impedance undefined at omega = {omega} ({reason})")]
pub struct DomainError {
    pub element: String,
    pub omega: f64,
    pub reason: &'static str,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{target} takes {expected} parameter(s), got {got}")]
    InvalidParameterCount {
        target: String,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("duplicate element name: {0}")]
    DuplicateName(String),

    #[error("element not found: {0}")]
    NotFound(String),

    #[error("invalid element name: {0:?}")]
    InvalidName(String),

    #[error("element is still wired into the circuit: {0}")]
    InUse(String),

    #[error("invalid sweep: {0}")]
    InvalidSweep(String),

    #[error("invalid representation at column {position}: {message}")]
    InvalidRepresentation { position: usize, message: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn repr(position: usize, message: impl Into<String>) -> Self {
        Error::InvalidRepresentation { position, message: message.into() }
    }
}

//! Protocol generic errors
use std::fmt;

use thiserror::Error;

use super::models::GetAmountOutResult;

impl fmt::Display for GetAmountOutResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "amount = {}", self.amount)
    }
}

/// Raised when a pool snapshot can not be turned into a simulator.
#[derive(Debug, Error)]
pub enum InvalidSnapshotError {
    #[error("Value error {0}")]
    ValueError(String),
    #[error("Unable to set up the pool state: {0}")]
    SimulationError(SimulationError),
}

impl From<SimulationError> for InvalidSnapshotError {
    fn from(error: SimulationError) -> Self {
        InvalidSnapshotError::SimulationError(error)
    }
}

/// Represents the outer-level, user-facing errors of the simulation package.
///
/// Variants:
/// - `InvalidInput`: A precondition of the called operation does not hold, e.g. a price limit on
///   the wrong side of the current price or a tick range that is not aligned with the pool's tick
///   spacing. The caller passed something it should not have.
/// - `FatalError`: An invariant of the pool no longer holds, e.g. liquidity would become negative
///   or a fixed point value overflows. The snapshot or event stream is inconsistent - do not
///   attempt to continue the simulation.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Fatal error: {0}")]
    FatalError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// An event of a replayed stream could not be applied.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Event #{index} failed: {source}")]
    EventFailed {
        index: usize,
        #[source]
        source: SimulationError,
    },
}

impl TransitionError {
    pub fn at(index: usize, source: SimulationError) -> Self {
        TransitionError::EventFailed { index, source }
    }
}

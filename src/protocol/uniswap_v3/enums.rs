use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::protocol::errors::SimulationError;

/// Fee tiers in hundredths of a basis point, i.e. parts per million of the input amount.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum FeeAmount {
    Lowest = 100,
    Low = 500,
    Medium = 3000,
    High = 10_000,
}

impl FeeAmount {
    /// Minimum distance between initializable ticks of a pool with this fee.
    pub fn tick_spacing(&self) -> i32 {
        match self {
            FeeAmount::Lowest => 1,
            FeeAmount::Low => 10,
            FeeAmount::Medium => 60,
            FeeAmount::High => 200,
        }
    }
}

impl TryFrom<u32> for FeeAmount {
    type Error = SimulationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            100 => Ok(FeeAmount::Lowest),
            500 => Ok(FeeAmount::Low),
            3000 => Ok(FeeAmount::Medium),
            10_000 => Ok(FeeAmount::High),
            _ => Err(SimulationError::InvalidInput(format!("Unsupported fee tier {value}"))),
        }
    }
}

impl From<FeeAmount> for u32 {
    fn from(value: FeeAmount) -> Self {
        value as u32
    }
}

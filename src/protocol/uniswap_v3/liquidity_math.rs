use crate::protocol::errors::SimulationError;

/// Adds a signed liquidity delta to an unsigned liquidity value.
///
/// Liquidity can never become negative or exceed `u128::MAX`: both cases mean the pool state is
/// inconsistent and are reported as `FatalError`.
pub fn add_liquidity_delta(x: u128, y: i128) -> Result<u128, SimulationError> {
    let res = if y < 0 { x.checked_sub(y.unsigned_abs()) } else { x.checked_add(y as u128) };
    res.ok_or_else(|| {
        SimulationError::FatalError(format!("Liquidity delta {y} can not be applied to {x}"))
    })
}

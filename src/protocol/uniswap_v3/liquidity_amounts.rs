//! Conversions between position liquidity and token amounts.
use alloy_primitives::U256;

use crate::{protocol::errors::SimulationError, safe_math::safe_sub_u256};

use super::{
    solidity_math::mul_div,
    sqrt_price_math::{get_amount0_delta, get_amount1_delta, Q96},
};

fn sorted(a: U256, b: U256) -> (U256, U256) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

fn to_liquidity(value: U256) -> Result<u128, SimulationError> {
    u128::try_from(value)
        .map_err(|_| SimulationError::FatalError(format!("Liquidity {value} exceeds 128 bits")))
}

/// Liquidity supported by `amount0` between two sqrt prices.
pub fn get_liquidity_for_amount0(
    sqrt_ratio_a: U256,
    sqrt_ratio_b: U256,
    amount0: U256,
) -> Result<u128, SimulationError> {
    let (a, b) = sorted(sqrt_ratio_a, sqrt_ratio_b);
    let intermediate = mul_div(a, b, Q96)?;
    to_liquidity(mul_div(amount0, intermediate, safe_sub_u256(b, a)?)?)
}

/// Liquidity supported by `amount1` between two sqrt prices.
pub fn get_liquidity_for_amount1(
    sqrt_ratio_a: U256,
    sqrt_ratio_b: U256,
    amount1: U256,
) -> Result<u128, SimulationError> {
    let (a, b) = sorted(sqrt_ratio_a, sqrt_ratio_b);
    to_liquidity(mul_div(amount1, Q96, safe_sub_u256(b, a)?)?)
}

/// Largest liquidity of a position `[sqrt_ratio_a, sqrt_ratio_b]` that both amounts can fund at
/// the current price.
pub fn get_liquidity_for_amounts(
    sqrt_price: U256,
    sqrt_ratio_a: U256,
    sqrt_ratio_b: U256,
    amount0: U256,
    amount1: U256,
) -> Result<u128, SimulationError> {
    let (a, b) = sorted(sqrt_ratio_a, sqrt_ratio_b);
    if sqrt_price <= a {
        get_liquidity_for_amount0(a, b, amount0)
    } else if sqrt_price < b {
        let liquidity0 = get_liquidity_for_amount0(sqrt_price, b, amount0)?;
        let liquidity1 = get_liquidity_for_amount1(a, sqrt_price, amount1)?;
        Ok(liquidity0.min(liquidity1))
    } else {
        get_liquidity_for_amount1(a, b, amount1)
    }
}

/// Token amounts held by `liquidity` in `[sqrt_ratio_a, sqrt_ratio_b]` at the current price,
/// rounded up.
pub fn get_amounts_for_liquidity(
    sqrt_price: U256,
    sqrt_ratio_a: U256,
    sqrt_ratio_b: U256,
    liquidity: u128,
) -> Result<(U256, U256), SimulationError> {
    let (a, b) = sorted(sqrt_ratio_a, sqrt_ratio_b);
    if sqrt_price <= a {
        Ok((get_amount0_delta(a, b, liquidity, true)?, U256::ZERO))
    } else if sqrt_price < b {
        Ok((
            get_amount0_delta(sqrt_price, b, liquidity, true)?,
            get_amount1_delta(a, sqrt_price, liquidity, true)?,
        ))
    } else {
        Ok((U256::ZERO, get_amount1_delta(a, b, liquidity, true)?))
    }
}

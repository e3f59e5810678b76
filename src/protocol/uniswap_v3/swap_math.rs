use alloy_primitives::{I256, U256};

use crate::{protocol::errors::SimulationError, safe_math::safe_sub_u256};

use super::{
    solidity_math::{mul_div, mul_div_rounding_up},
    sqrt_price_math,
};

const FEE_DENOMINATOR: u32 = 1_000_000;

/// Computes a single swap step within one range of constant liquidity.
///
/// Moves the price from `sqrt_ratio_current` towards `sqrt_ratio_target`, stopping early if the
/// remaining amount is used up first. The direction is implied by the relation of the two prices.
/// A non negative `amount_remaining` is an exact input, a negative one an exact output.
///
/// Returns `(sqrt_ratio_next, amount_in, amount_out, fee_amount)`; the fee is charged on top of
/// `amount_in`.
pub fn compute_swap_step(
    sqrt_ratio_current: U256,
    sqrt_ratio_target: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> Result<(U256, U256, U256, U256), SimulationError> {
    if fee_pips >= FEE_DENOMINATOR {
        return Err(SimulationError::InvalidInput(format!("Fee {fee_pips} is not below 100%")));
    }
    let zero_for_one = sqrt_ratio_current >= sqrt_ratio_target;
    let exact_in = !amount_remaining.is_negative();
    let amount_remaining_abs = amount_remaining.unsigned_abs();
    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;

    let sqrt_ratio_next = if exact_in {
        let amount_remaining_less_fee = mul_div(
            amount_remaining_abs,
            U256::from(FEE_DENOMINATOR - fee_pips),
            U256::from(FEE_DENOMINATOR),
        )?;
        amount_in = if zero_for_one {
            sqrt_price_math::get_amount0_delta(
                sqrt_ratio_target,
                sqrt_ratio_current,
                liquidity,
                true,
            )?
        } else {
            sqrt_price_math::get_amount1_delta(
                sqrt_ratio_current,
                sqrt_ratio_target,
                liquidity,
                true,
            )?
        };
        if amount_remaining_less_fee >= amount_in {
            sqrt_ratio_target
        } else {
            sqrt_price_math::get_next_sqrt_price_from_input(
                sqrt_ratio_current,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?
        }
    } else {
        amount_out = if zero_for_one {
            sqrt_price_math::get_amount1_delta(
                sqrt_ratio_target,
                sqrt_ratio_current,
                liquidity,
                false,
            )?
        } else {
            sqrt_price_math::get_amount0_delta(
                sqrt_ratio_current,
                sqrt_ratio_target,
                liquidity,
                false,
            )?
        };
        if amount_remaining_abs >= amount_out {
            sqrt_ratio_target
        } else {
            sqrt_price_math::get_next_sqrt_price_from_output(
                sqrt_ratio_current,
                liquidity,
                amount_remaining_abs,
                zero_for_one,
            )?
        }
    };

    let max = sqrt_ratio_target == sqrt_ratio_next;

    if zero_for_one {
        if !(max && exact_in) {
            amount_in = sqrt_price_math::get_amount0_delta(
                sqrt_ratio_next,
                sqrt_ratio_current,
                liquidity,
                true,
            )?;
        }
        if !(max && !exact_in) {
            amount_out = sqrt_price_math::get_amount1_delta(
                sqrt_ratio_next,
                sqrt_ratio_current,
                liquidity,
                false,
            )?;
        }
    } else {
        if !(max && exact_in) {
            amount_in = sqrt_price_math::get_amount1_delta(
                sqrt_ratio_current,
                sqrt_ratio_next,
                liquidity,
                true,
            )?;
        }
        if !(max && !exact_in) {
            amount_out = sqrt_price_math::get_amount0_delta(
                sqrt_ratio_current,
                sqrt_ratio_next,
                liquidity,
                false,
            )?;
        }
    }

    // cap the output, never pay out more than the requested amount
    if !exact_in && amount_out > amount_remaining_abs {
        amount_out = amount_remaining_abs;
    }

    let fee_amount = if exact_in && sqrt_ratio_next != sqrt_ratio_target {
        // the remainder of an exact input that did not reach the target is taken as fee
        safe_sub_u256(amount_remaining_abs, amount_in)?
    } else {
        mul_div_rounding_up(
            amount_in,
            U256::from(fee_pips),
            U256::from(FEE_DENOMINATOR - fee_pips),
        )?
    };
    Ok((sqrt_ratio_next, amount_in, amount_out, fee_amount))
}

use alloy_primitives::U256;

use crate::{
    protocol::errors::SimulationError,
    safe_math::{div_rounding_up_u256, safe_add_u256, safe_div_u256, safe_sub_u256},
    u256_num::u256_to_f64,
};

use super::solidity_math::{mul_div, mul_div_rounding_up};

pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);
pub const Q128: U256 = U256::from_limbs([0, 0, 1, 0]);
const RESOLUTION: usize = 96;
const U160_MAX: U256 = U256::from_limbs([u64::MAX, u64::MAX, 4294967295, 0]);

fn maybe_flip_ratios(a: U256, b: U256) -> (U256, U256) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

fn ensure_price(sqrt_price: U256) -> Result<(), SimulationError> {
    if sqrt_price.is_zero() || sqrt_price > U160_MAX {
        return Err(SimulationError::InvalidInput(format!("Invalid sqrt price {sqrt_price}")));
    }
    Ok(())
}

/// Amount of token0 between two sqrt prices: `L * (√b - √a) / (√a * √b)`.
pub fn get_amount0_delta(
    a: U256,
    b: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, SimulationError> {
    let (sqrt_ratio_a, sqrt_ratio_b) = maybe_flip_ratios(a, b);
    ensure_price(sqrt_ratio_a)?;

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let numerator2 = sqrt_ratio_b - sqrt_ratio_a;

    if round_up {
        div_rounding_up_u256(
            mul_div_rounding_up(numerator1, numerator2, sqrt_ratio_b)?,
            sqrt_ratio_a,
        )
    } else {
        safe_div_u256(mul_div(numerator1, numerator2, sqrt_ratio_b)?, sqrt_ratio_a)
    }
}

/// Amount of token1 between two sqrt prices: `L * (√b - √a)`.
pub fn get_amount1_delta(
    a: U256,
    b: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, SimulationError> {
    let (sqrt_ratio_a, sqrt_ratio_b) = maybe_flip_ratios(a, b);
    if round_up {
        mul_div_rounding_up(U256::from(liquidity), sqrt_ratio_b - sqrt_ratio_a, Q96)
    } else {
        mul_div(U256::from(liquidity), sqrt_ratio_b - sqrt_ratio_a, Q96)
    }
}

pub fn get_next_sqrt_price_from_input(
    sqrt_price: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, SimulationError> {
    ensure_price(sqrt_price)?;
    if liquidity == 0 {
        return Err(SimulationError::InvalidInput("No liquidity".to_string()));
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount0_rounding_up(sqrt_price, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount1_rounding_down(sqrt_price, liquidity, amount_in, true)
    }
}

pub fn get_next_sqrt_price_from_output(
    sqrt_price: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, SimulationError> {
    ensure_price(sqrt_price)?;
    if liquidity == 0 {
        return Err(SimulationError::InvalidInput("No liquidity".to_string()));
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount1_rounding_down(sqrt_price, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount0_rounding_up(sqrt_price, liquidity, amount_out, false)
    }
}

fn get_next_sqrt_price_from_amount0_rounding_up(
    sqrt_price: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, SimulationError> {
    if amount.is_zero() {
        return Ok(sqrt_price);
    }
    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let product = amount.checked_mul(sqrt_price);

    if add {
        // liquidity * sqrtP / (liquidity + amount * sqrtP) while the product fits
        if let Some(denominator) = product.and_then(|p| numerator1.checked_add(p)) {
            return mul_div_rounding_up(numerator1, sqrt_price, denominator);
        }
        // otherwise liquidity / (liquidity / sqrtP + amount)
        div_rounding_up_u256(
            numerator1,
            safe_add_u256(safe_div_u256(numerator1, sqrt_price)?, amount)?,
        )
    } else {
        match product {
            Some(product) if numerator1 > product => {
                mul_div_rounding_up(numerator1, sqrt_price, numerator1 - product)
            }
            _ => Err(SimulationError::FatalError(
                "Output exceeds the token0 reserves in range".to_string(),
            )),
        }
    }
}

fn get_next_sqrt_price_from_amount1_rounding_down(
    sqrt_price: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, SimulationError> {
    let liquidity = U256::from(liquidity);
    if add {
        let quotient = if amount <= U160_MAX {
            safe_div_u256(amount << RESOLUTION, liquidity)?
        } else {
            mul_div(amount, Q96, liquidity)?
        };

        safe_add_u256(sqrt_price, quotient)
    } else {
        let quotient = if amount <= U160_MAX {
            div_rounding_up_u256(amount << RESOLUTION, liquidity)?
        } else {
            mul_div_rounding_up(amount, Q96, liquidity)?
        };

        if sqrt_price <= quotient {
            return Err(SimulationError::FatalError(
                "Output exceeds the token1 reserves in range".to_string(),
            ));
        }
        safe_sub_u256(sqrt_price, quotient)
    }
}

/// Converts a sqrt price in Q96 representation to its approximate f64 representation
///
/// The result is the price of token0 denominated in token1, corrected by the tokens' decimals.
pub fn sqrt_price_q96_to_f64(
    x: U256,
    token_0_decimals: u32,
    token_1_decimals: u32,
) -> Result<f64, SimulationError> {
    ensure_price(x)?;
    let token_correction = 10f64.powi(token_0_decimals as i32 - token_1_decimals as i32);

    let price = u256_to_f64(x) / 2.0f64.powi(96);
    Ok(price.powi(2) * token_correction)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use approx::assert_ulps_eq;
    use rstest::rstest;

    fn u256(s: &str) -> U256 {
        U256::from_str(s).unwrap()
    }

    #[test]
    fn test_maybe_flip() {
        let a = u256("646922711029656030980122427077");
        let b = u256("78833030112140176575862854579");
        let (a1, b1) = maybe_flip_ratios(a, b);

        assert_eq!(b, a1);
        assert_eq!(a, b1);
    }

    #[rstest]
    #[case(
        u256("646922711029656030980122427077"),
        u256("78833030112140176575862854579"),
        1000000000000u128,
        true,
        u256("882542983628")
    )]
    #[case(
        u256("646922711029656030980122427077"),
        u256("78833030112140176575862854579"),
        1000000000000u128,
        false,
        u256("882542983627")
    )]
    #[case(
        u256("79224201403219477170569942574"),
        u256("79394708140106462983274643745"),
        10000000u128,
        true,
        u256("21477")
    )]
    #[case(
        u256("79224201403219477170569942574"),
        u256("79394708140106462983274643745"),
        10000000u128,
        false,
        u256("21476")
    )]
    fn test_get_amount0_delta(
        #[case] a: U256,
        #[case] b: U256,
        #[case] liquidity: u128,
        #[case] round_up: bool,
        #[case] exp: U256,
    ) {
        let res = get_amount0_delta(a, b, liquidity, round_up).unwrap();
        assert_eq!(res, exp);
    }

    #[rstest]
    #[case(
        u256("79224201403219477170569942574"),
        u256("79394708140106462983274643745"),
        10000000u128,
        true,
        u256("21521")
    )]
    #[case(
        u256("79224201403219477170569942574"),
        u256("79394708140106462983274643745"),
        10000000u128,
        false,
        u256("21520")
    )]
    #[case(
        u256("646922711029656030980122427077"),
        u256("78833030112140176575862854579"),
        1000000000000u128,
        true,
        u256("7170299838965")
    )]
    #[case(
        u256("646922711029656030980122427077"),
        u256("78833030112140176575862854579"),
        1000000000000u128,
        false,
        u256("7170299838964")
    )]
    fn test_get_amount1_delta(
        #[case] a: U256,
        #[case] b: U256,
        #[case] liquidity: u128,
        #[case] round_up: bool,
        #[case] exp: U256,
    ) {
        let res = get_amount1_delta(a, b, liquidity, round_up).unwrap();
        assert_eq!(res, exp);
    }

    #[rstest]
    #[case(
        u256("79224201403219477170569942574"),
        1000000000000u128,
        u256("1000000"),
        true,
        u256("79224122183058203155816882540")
    )]
    #[case(
        u256("79224201403219477170569942574"),
        1000000000000u128,
        u256("1000000"),
        false,
        u256("79224280631381991434907536117")
    )]
    fn test_get_next_sqrt_price_from_input(
        #[case] sqrt_price: U256,
        #[case] liquidity: u128,
        #[case] amount_in: U256,
        #[case] zero_for_one: bool,
        #[case] exp: U256,
    ) {
        let res =
            get_next_sqrt_price_from_input(sqrt_price, liquidity, amount_in, zero_for_one).unwrap();
        assert_eq!(res, exp);
    }

    #[rstest]
    #[case(
        u256("79224201403219477170569942574"),
        1000000000000u128,
        u256("1000000"),
        true,
        u256("79224122175056962906232349030")
    )]
    #[case(
        u256("79224201403219477170569942574"),
        1000000000000u128,
        u256("1000000"),
        false,
        u256("79224280623539183744873644932")
    )]
    fn test_get_next_sqrt_price_from_output(
        #[case] sqrt_price: U256,
        #[case] liquidity: u128,
        #[case] amount_out: U256,
        #[case] zero_for_one: bool,
        #[case] exp: U256,
    ) {
        let res = get_next_sqrt_price_from_output(sqrt_price, liquidity, amount_out, zero_for_one)
            .unwrap();
        assert_eq!(res, exp);
    }

    #[test]
    fn test_next_sqrt_price_requires_liquidity() {
        let res = get_next_sqrt_price_from_input(Q96, 0, U256::from(1u64), true);

        assert!(matches!(res, Err(SimulationError::InvalidInput(_))));
    }

    #[test]
    fn test_output_exceeding_reserves_is_fatal() {
        // 1 unit of liquidity at price 1 can not pay out 10 token1
        let res = get_next_sqrt_price_from_output(Q96, 1, U256::from(10u64), true);

        assert!(matches!(res, Err(SimulationError::FatalError(_))));
    }

    #[rstest]
    #[case::usdc_eth(u256("2209221051636112667296733914466103"), 6, 18, 0.0007775336231174711f64)]
    #[case::wbtc_eth(u256("29654479368916176338227069900580738"), 8, 18, 14.00946143160293f64)]
    #[case::wdoge_eth(u256("672045190479078414067608947"), 18, 18, 7.195115788867147e-5)]
    #[case::shib_usdc(u256("231479673319799999440"), 18, 6, 8.536238764169166e-6)]
    fn test_q96_to_f64(
        #[case] sqrt_price: U256,
        #[case] t0d: u32,
        #[case] t1d: u32,
        #[case] exp: f64,
    ) {
        let res = sqrt_price_q96_to_f64(sqrt_price, t0d, t1d).unwrap();

        assert_ulps_eq!(res, exp, epsilon = f64::EPSILON);
    }
}

//! Brute force search for the most profitable position range.
//!
//! Every candidate is a range centred on the pool's tick at the start of the
//! replayed period. A position funded with a fixed token1 deposit is minted
//! into a fresh copy of the pool before the period's events are replayed.
//! The candidate is then scored by comparing the value of the withdrawn
//! position plus its fees with simply holding the deposited tokens.
use std::sync::Arc;

use alloy_primitives::U256;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info};

use crate::{
    protocol::{
        errors::{SimulationError, TransitionError},
        uniswap_v3::{
            events::{MintEvent, UniswapV3Event},
            liquidity_amounts::{get_amounts_for_liquidity, get_liquidity_for_amount1},
            replay::replay,
            solidity_math::mul_div,
            sqrt_price_math::Q96,
            state::UniswapV3State,
            tick_math::{get_sqrt_ratio_at_tick, MAX_TICK, MIN_TICK},
        },
    },
    safe_math::safe_add_u256,
    u256_num::u256_to_f64,
};

/// Number of candidate widths evaluated when a config does not say otherwise.
pub const DEFAULT_MAX_STEPS: u32 = 50;

fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS
}

#[derive(Debug, Error)]
pub enum RangeSearchError {
    #[error("Invalid range search config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Range evaluation task failed: {0}")]
    Join(#[from] JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSearchConfig {
    /// Token1 deposit in base units funding each candidate position
    #[serde(with = "crate::serde_helpers::decimal")]
    pub amount1: U256,
    /// Candidate half widths are `spacing * k` for `k` in `1..=max_steps`
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

/// Result of simulating one candidate range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeOutcome {
    /// Distance of both range boundaries from the centre tick
    pub width: i32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub liquidity: u128,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub initial_amount0: U256,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub initial_amount1: U256,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub final_amount0: U256,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub final_amount1: U256,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub fees0: U256,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub fees1: U256,
    /// Value of position and fees relative to holding the deposit, in percent
    pub value_change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeSearchResult {
    pub centre_tick: i32,
    pub outcomes: Vec<RangeOutcome>,
}

impl RangeSearchResult {
    /// The outcome with the highest value change, the narrowest one on ties.
    pub fn best(&self) -> Option<&RangeOutcome> {
        self.outcomes
            .iter()
            .reduce(|best, o| if o.value_change_pct > best.value_change_pct { o } else { best })
    }
}

/// Value of the given amounts in token1 at `sqrt_price`.
fn value_in_token1(
    amount0: U256,
    amount1: U256,
    sqrt_price: U256,
) -> Result<U256, SimulationError> {
    let amount0_in_token1 = mul_div(mul_div(amount0, sqrt_price, Q96)?, sqrt_price, Q96)?;
    safe_add_u256(amount0_in_token1, amount1)
}

/// Simulates a position on `[tick_lower, tick_upper]` funded with `amount1` token1 over `events`.
///
/// The position's liquidity is the largest one the token1 deposit supports at the initial price,
/// token0 is supplied as needed. The position is minted before the first event.
pub fn evaluate_range(
    initial: &UniswapV3State,
    events: &[UniswapV3Event],
    tick_lower: i32,
    tick_upper: i32,
    amount1: U256,
) -> Result<RangeOutcome, RangeSearchError> {
    let sqrt_ratio_a = get_sqrt_ratio_at_tick(tick_lower)?;
    let sqrt_ratio_b = get_sqrt_ratio_at_tick(tick_upper)?;
    let start_price = initial.sqrt_price();
    if start_price <= sqrt_ratio_a || start_price >= sqrt_ratio_b {
        return Err(RangeSearchError::InvalidConfig(format!(
            "Price {start_price} outside of range [{tick_lower}, {tick_upper}]"
        )));
    }

    let liquidity = get_liquidity_for_amount1(sqrt_ratio_a, start_price, amount1)?;
    let (initial_amount0, initial_amount1) =
        get_amounts_for_liquidity(start_price, sqrt_ratio_a, sqrt_ratio_b, liquidity)?;

    let mut state = initial.clone();
    state.apply_event(&MintEvent::new(tick_lower, tick_upper, liquidity).into())?;
    replay(&mut state, events)?;

    let (fees0, fees1) = state.fees_in_range(tick_lower, tick_upper, liquidity)?;
    let end_price = state.sqrt_price();
    let (final_amount0, final_amount1) =
        get_amounts_for_liquidity(end_price, sqrt_ratio_a, sqrt_ratio_b, liquidity)?;

    let position_value = value_in_token1(
        safe_add_u256(final_amount0, fees0)?,
        safe_add_u256(final_amount1, fees1)?,
        end_price,
    )?;
    let hold_value = value_in_token1(initial_amount0, initial_amount1, end_price)?;
    if hold_value.is_zero() {
        return Err(RangeSearchError::InvalidConfig(format!(
            "Deposit of {amount1} is too small for range [{tick_lower}, {tick_upper}]"
        )));
    }
    let hold = u256_to_f64(hold_value);
    let value_change_pct = (u256_to_f64(position_value) - hold) / hold * 100.0;

    let outcome = RangeOutcome {
        width: (tick_upper - tick_lower) / 2,
        tick_lower,
        tick_upper,
        liquidity,
        initial_amount0,
        initial_amount1,
        final_amount0,
        final_amount1,
        fees0,
        fees1,
        value_change_pct,
    };
    debug!(
        tick_lower,
        tick_upper,
        liquidity,
        fees0 = %outcome.fees0,
        fees1 = %outcome.fees1,
        value_change_pct,
        "Evaluated range"
    );
    Ok(outcome)
}

/// Evaluates all symmetric ranges around the initial tick, one blocking task per candidate.
///
/// The centre is the initial tick rounded towards zero to a multiple of the tick spacing.
/// Candidates crossing the global tick bounds are skipped.
pub async fn search_ranges(
    initial: Arc<UniswapV3State>,
    events: Arc<Vec<UniswapV3Event>>,
    config: &RangeSearchConfig,
) -> Result<RangeSearchResult, RangeSearchError> {
    if config.amount1.is_zero() {
        return Err(RangeSearchError::InvalidConfig("Deposit must not be zero".to_string()));
    }
    if config.max_steps == 0 {
        return Err(RangeSearchError::InvalidConfig("At least one step required".to_string()));
    }
    let spacing = initial.tick_spacing();
    let centre_tick = initial.tick() - initial.tick() % spacing;

    let handles = (1..=config.max_steps as i32)
        .map_while(|k| spacing.checked_mul(k))
        .filter(|width| centre_tick - width >= MIN_TICK && centre_tick + width <= MAX_TICK)
        .map(|width| {
            let initial = Arc::clone(&initial);
            let events = Arc::clone(&events);
            let amount1 = config.amount1;
            tokio::task::spawn_blocking(move || {
                evaluate_range(&initial, &events, centre_tick - width, centre_tick + width, amount1)
            })
        });

    let outcomes = try_join_all(handles)
        .await?
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let result = RangeSearchResult { centre_tick, outcomes };
    if let Some(best) = result.best() {
        info!(
            centre_tick,
            candidates = result.outcomes.len(),
            best_width = best.width,
            best_value_change_pct = best.value_change_pct,
            "Range search finished"
        );
    }
    Ok(result)
}

/// Mean of the best widths over several search windows, windows without outcome are skipped.
pub fn average_best_width(results: &[RangeSearchResult]) -> Option<f64> {
    let widths: Vec<f64> = results
        .iter()
        .filter_map(|r| r.best().map(|o| o.width as f64))
        .collect();
    if widths.is_empty() {
        return None;
    }
    Some(widths.iter().sum::<f64>() / widths.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloy_primitives::I256;
    use approx::assert_relative_eq;

    use crate::protocol::uniswap_v3::{enums::FeeAmount, events::SwapEvent, tick_list::TickInfo};

    const L: u128 = 1_000_000_000_000;

    fn pool() -> UniswapV3State {
        UniswapV3State::new(
            L,
            Q96,
            FeeAmount::Medium,
            0,
            vec![
                TickInfo::new(-600, L as i128, L),
                TickInfo::new(0, 0, L),
                TickInfo::new(600, -(L as i128), L),
            ],
        )
        .unwrap()
    }

    fn round_trip_swaps() -> Vec<UniswapV3Event> {
        [(true, 100_000_000i64), (false, 100_000_000), (true, 50_000_000), (false, 60_000_000)]
            .into_iter()
            .map(|(zero_for_one, amount)| {
                SwapEvent::new(zero_for_one, I256::try_from(amount).unwrap()).into()
            })
            .collect()
    }

    fn config(max_steps: u32) -> RangeSearchConfig {
        RangeSearchConfig { amount1: U256::from(1_000_000_000u64), max_steps }
    }

    #[test]
    fn test_evaluate_range() {
        let outcome = evaluate_range(
            &pool(),
            &round_trip_swaps(),
            -60,
            60,
            U256::from(1_000_000_000u64),
        )
        .unwrap();

        assert_eq!(outcome.width, 60);
        assert_eq!(outcome.liquidity, 333850249709);
        assert_eq!(outcome.initial_amount0, U256::from(1_000_000_000u64));
        assert_eq!(outcome.initial_amount1, U256::from(1_000_000_000u64));
        assert_eq!(outcome.fees0, U256::from(112631u64));
        assert_eq!(outcome.fees1, U256::from(120140u64));
        assert_eq!(outcome.final_amount0, U256::from(997502291u64));
        assert_eq!(outcome.final_amount1, U256::from(1002497729u64));
        assert_relative_eq!(outcome.value_change_pct, 0.011637662938643555, max_relative = 1e-9);
    }

    #[test]
    fn test_evaluate_range_rejects_price_outside() {
        let res = evaluate_range(&pool(), &[], 60, 120, U256::from(1u64));

        assert!(matches!(res, Err(RangeSearchError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_search_ranges() {
        let result = search_ranges(Arc::new(pool()), Arc::new(round_trip_swaps()), &config(5))
            .await
            .unwrap();

        assert_eq!(result.centre_tick, 0);
        let widths: Vec<i32> = result
            .outcomes
            .iter()
            .map(|o| o.width)
            .collect();
        assert_eq!(widths, vec![60, 120, 180, 240, 300]);
        assert_eq!(result.best().unwrap().width, 60);
        assert!(result
            .outcomes
            .windows(2)
            .all(|w| w[0].value_change_pct > w[1].value_change_pct));
    }

    #[tokio::test]
    async fn test_search_ranges_without_events_keeps_value() {
        let result = search_ranges(Arc::new(pool()), Arc::new(vec![]), &config(3))
            .await
            .unwrap();

        for outcome in result.outcomes.iter() {
            assert_eq!(outcome.fees0, U256::ZERO);
            assert_eq!(outcome.final_amount0, outcome.initial_amount0);
            assert_eq!(outcome.value_change_pct, 0.0);
        }
    }

    #[tokio::test]
    async fn test_search_ranges_rejects_zero_deposit() {
        let mut cfg = config(3);
        cfg.amount1 = U256::ZERO;

        let res = search_ranges(Arc::new(pool()), Arc::new(vec![]), &cfg).await;

        assert!(matches!(res, Err(RangeSearchError::InvalidConfig(_))));
    }

    #[test]
    fn test_average_best_width() {
        let outcome = |width: i32, pct: f64| RangeOutcome {
            width,
            tick_lower: -width,
            tick_upper: width,
            liquidity: 1,
            initial_amount0: U256::ZERO,
            initial_amount1: U256::ZERO,
            final_amount0: U256::ZERO,
            final_amount1: U256::ZERO,
            fees0: U256::ZERO,
            fees1: U256::ZERO,
            value_change_pct: pct,
        };
        let window = |outcomes| RangeSearchResult { centre_tick: 0, outcomes };
        let results = vec![
            window(vec![outcome(60, 1.0), outcome(120, 2.0)]),
            window(vec![outcome(60, 3.0), outcome(120, 3.0)]),
            window(vec![]),
        ];

        assert_eq!(average_best_width(&results), Some(90.0));
        assert_eq!(average_best_width(&[]), None);
    }
}

use std::any::Any;

use alloy_primitives::{I256, U256};
use num_bigint::BigUint;
use tracing::trace;

use crate::{
    models::Token,
    protocol::{
        errors::{InvalidSnapshotError, SimulationError},
        models::GetAmountOutResult,
        state::ProtocolSim,
    },
    safe_math::{safe_add_i256, safe_add_u256, safe_sub_i256, safe_sub_u256, u256_to_i256},
    u256_num::{biguint_to_u256, u256_to_biguint},
};

use super::{
    enums::FeeAmount,
    events::UniswapV3Event,
    liquidity_math,
    solidity_math::mul_div,
    sqrt_price_math::{sqrt_price_q96_to_f64, Q128},
    swap_math,
    tick_list::{TickFeeLedger, TickInfo, TickList},
    tick_math,
};

/// Simulated concentrated liquidity pool.
///
/// The state is a plain owned value: events are applied in place through `&mut self` and
/// independent simulations simply work on their own clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniswapV3State {
    liquidity: u128,
    sqrt_price: U256,
    fee: FeeAmount,
    tick: i32,
    ticks: TickList,
    fee_ledger: TickFeeLedger,
    fee_growth_global_0: U256,
    fee_growth_global_1: U256,
}

#[derive(Debug)]
struct SwapState {
    amount_remaining: I256,
    amount_calculated: I256,
    sqrt_price: U256,
    tick: i32,
    liquidity: u128,
    fee_amount: U256,
}

#[derive(Debug)]
struct StepComputation {
    sqrt_price_start: U256,
    tick_next: i32,
    initialized: bool,
    sqrt_price_next: U256,
    amount_in: U256,
    amount_out: U256,
    fee_amount: U256,
}

/// Outcome of a simulated swap.
///
/// `amount_calculated` is negative for an amount paid out by the pool (exact input) and positive
/// for an amount owed to the pool (exact output).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResults {
    pub amount_calculated: I256,
    pub sqrt_price: U256,
    pub liquidity: u128,
    pub tick: i32,
    /// Total fee charged on the input token
    pub fee_amount: U256,
}

impl UniswapV3State {
    /// Creates a new instance of `UniswapV3State`.
    ///
    /// # Arguments
    /// - `liquidity`: The active liquidity of the pool.
    /// - `sqrt_price`: The square root of the current price as Q64.96.
    /// - `fee`: The fee tier for the pool, which also fixes the tick spacing.
    /// - `tick`: The current tick of the pool.
    /// - `ticks`: The initialized ticks of the pool, ordered by index.
    ///
    /// Fails if the ticks are malformed or if `sqrt_price` does not lie within `tick`.
    pub fn new(
        liquidity: u128,
        sqrt_price: U256,
        fee: FeeAmount,
        tick: i32,
        ticks: Vec<TickInfo>,
    ) -> Result<Self, InvalidSnapshotError> {
        let spacing = fee.tick_spacing();
        let tick_list = TickList::from(spacing, ticks)?;

        if !(tick_math::MIN_TICK..=tick_math::MAX_TICK).contains(&tick) {
            return Err(InvalidSnapshotError::ValueError(format!("Tick {tick} out of bounds")));
        }
        let lower_price = tick_math::get_sqrt_ratio_at_tick(tick)?;
        let upper_price = if tick == tick_math::MAX_TICK {
            tick_math::MAX_SQRT_RATIO
        } else {
            tick_math::get_sqrt_ratio_at_tick(tick + 1)?
        };
        if sqrt_price < lower_price || sqrt_price > upper_price {
            return Err(InvalidSnapshotError::ValueError(format!(
                "Sqrt price {sqrt_price} does not lie within tick {tick}"
            )));
        }

        let mut fee_ledger = TickFeeLedger::default();
        for t in tick_list.iter() {
            fee_ledger.track(t.index);
        }

        Ok(UniswapV3State {
            liquidity,
            sqrt_price,
            fee,
            tick,
            ticks: tick_list,
            fee_ledger,
            fee_growth_global_0: U256::ZERO,
            fee_growth_global_1: U256::ZERO,
        })
    }

    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn sqrt_price(&self) -> U256 {
        self.sqrt_price
    }

    pub fn tick(&self) -> i32 {
        self.tick
    }

    pub fn fee_amount(&self) -> FeeAmount {
        self.fee
    }

    pub fn tick_spacing(&self) -> i32 {
        self.ticks.tick_spacing()
    }

    pub fn ticks(&self) -> &TickList {
        &self.ticks
    }

    pub fn fee_ledger(&self) -> &TickFeeLedger {
        &self.fee_ledger
    }

    /// Pool wide fee growth per unit of liquidity as Q128, (token0, token1).
    pub fn fee_growth_global(&self) -> (U256, U256) {
        (self.fee_growth_global_0, self.fee_growth_global_1)
    }

    /// Fees attributed to the ticks in `[tick_lower, tick_upper)` for a position of `liquidity`.
    pub fn fees_in_range(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
    ) -> Result<(U256, U256), SimulationError> {
        self.fee_ledger
            .fees_in_range(tick_lower, tick_upper, liquidity)
    }

    /// Applies a single replayed event.
    ///
    /// Returns the swap results for swap events.
    pub fn apply_event(
        &mut self,
        event: &UniswapV3Event,
    ) -> Result<Option<SwapResults>, SimulationError> {
        match event {
            UniswapV3Event::Mint(data) => {
                self.apply_liquidity_change(
                    data.tick_lower,
                    data.tick_upper,
                    data.liquidity_delta(false)?,
                )?;
                Ok(None)
            }
            UniswapV3Event::Burn(data) => {
                self.apply_liquidity_change(
                    data.tick_lower,
                    data.tick_upper,
                    data.liquidity_delta(true)?,
                )?;
                Ok(None)
            }
            UniswapV3Event::Swap(swap) => self
                .swap(swap.zero_for_one, swap.amount_specified, swap.sqrt_price_limit)
                .map(Some),
        }
    }

    /// Adds `liquidity_delta` to the position `[tick_lower, tick_upper)`; burns pass a negative
    /// delta.
    ///
    /// Both boundaries are updated in the tick list. The active liquidity changes only if the
    /// current tick lies inside the range. A rejected change leaves the pool untouched.
    pub fn apply_liquidity_change(
        &mut self,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<(), SimulationError> {
        let spacing = self.ticks.tick_spacing();
        if tick_lower >= tick_upper ||
            tick_lower % spacing != 0 ||
            tick_upper % spacing != 0 ||
            tick_lower < tick_math::MIN_TICK ||
            tick_upper > tick_math::MAX_TICK
        {
            return Err(SimulationError::InvalidInput(format!(
                "Invalid tick range [{tick_lower}, {tick_upper}) for spacing {spacing}"
            )));
        }
        let liquidity = if tick_lower <= self.tick && self.tick < tick_upper {
            liquidity_math::add_liquidity_delta(self.liquidity, liquidity_delta)?
        } else {
            self.liquidity
        };
        let (lower_created, upper_created) =
            self.ticks
                .update_position(tick_lower, tick_upper, liquidity_delta)?;
        if lower_created {
            self.fee_ledger.track(tick_lower);
        }
        if upper_created {
            self.fee_ledger.track(tick_upper);
        }
        self.liquidity = liquidity;
        Ok(())
    }

    /// Executes a swap against the pool and moves the pool to the resulting state.
    ///
    /// A non negative `amount_specified` is an exact input, a negative one an exact output. Without
    /// a `sqrt_price_limit` the swap may move the price up to the global price bounds. A limit on
    /// the wrong side of the current price is rejected.
    ///
    /// Fees of every step are added to the pool wide fee growth of the input token and to the
    /// ledger record of the tick spacing aligned bucket containing the current tick. The bucket
    /// index is `tick - tick % spacing` with a truncating remainder, so negative ticks round
    /// towards zero.
    pub fn swap(
        &mut self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit: Option<U256>,
    ) -> Result<SwapResults, SimulationError> {
        if amount_specified.is_zero() {
            return Ok(SwapResults {
                amount_calculated: I256::ZERO,
                sqrt_price: self.sqrt_price,
                liquidity: self.liquidity,
                tick: self.tick,
                fee_amount: U256::ZERO,
            });
        }
        let price_limit = self.price_limit(zero_for_one, sqrt_price_limit)?;
        let exact_input = !amount_specified.is_negative();
        let spacing = self.ticks.tick_spacing();

        let mut state = SwapState {
            amount_remaining: amount_specified,
            amount_calculated: I256::ZERO,
            sqrt_price: self.sqrt_price,
            tick: self.tick,
            liquidity: self.liquidity,
            fee_amount: U256::ZERO,
        };

        while !state.amount_remaining.is_zero() && state.sqrt_price != price_limit {
            let (tick_next, initialized) = self
                .ticks
                .next_initialized_tick_within_one_word(state.tick, zero_for_one);
            let sqrt_price_next = tick_math::get_sqrt_ratio_at_tick(tick_next)?;

            let sqrt_price_start = state.sqrt_price;
            let (sqrt_price, amount_in, amount_out, fee_amount) = swap_math::compute_swap_step(
                state.sqrt_price,
                UniswapV3State::get_sqrt_ratio_target(sqrt_price_next, price_limit, zero_for_one),
                state.liquidity,
                state.amount_remaining,
                self.fee as u32,
            )?;
            state.sqrt_price = sqrt_price;

            let step = StepComputation {
                sqrt_price_start,
                tick_next,
                initialized,
                sqrt_price_next,
                amount_in,
                amount_out,
                fee_amount,
            };
            trace!(?step, tick = state.tick, liquidity = state.liquidity, "V3 swap step");

            if state.liquidity > 0 {
                let growth = mul_div(step.fee_amount, Q128, U256::from(state.liquidity))?;
                if zero_for_one {
                    self.fee_growth_global_0 = safe_add_u256(self.fee_growth_global_0, growth)?;
                } else {
                    self.fee_growth_global_1 = safe_add_u256(self.fee_growth_global_1, growth)?;
                }
                let bucket = state.tick - state.tick % spacing;
                self.fee_ledger
                    .accrue(bucket, zero_for_one, growth)?;
            }
            state.fee_amount = safe_add_u256(state.fee_amount, step.fee_amount)?;

            let amount_in_with_fee = u256_to_i256(safe_add_u256(step.amount_in, step.fee_amount)?)?;
            let amount_out = u256_to_i256(step.amount_out)?;
            if exact_input {
                state.amount_remaining = safe_sub_i256(state.amount_remaining, amount_in_with_fee)?;
                state.amount_calculated = safe_sub_i256(state.amount_calculated, amount_out)?;
            } else {
                state.amount_remaining = safe_add_i256(state.amount_remaining, amount_out)?;
                state.amount_calculated =
                    safe_add_i256(state.amount_calculated, amount_in_with_fee)?;
            }

            if state.sqrt_price == step.sqrt_price_next {
                if step.initialized {
                    let liquidity_raw = self
                        .ticks
                        .get_tick(step.tick_next)?
                        .net_liquidity;
                    let liquidity_net = if zero_for_one {
                        liquidity_raw.checked_neg().ok_or_else(|| {
                            SimulationError::FatalError(format!(
                                "Net liquidity of tick {} overflows",
                                step.tick_next
                            ))
                        })?
                    } else {
                        liquidity_raw
                    };
                    state.liquidity =
                        liquidity_math::add_liquidity_delta(state.liquidity, liquidity_net)?;
                }
                state.tick = if zero_for_one { step.tick_next - 1 } else { step.tick_next };
            } else if state.sqrt_price != step.sqrt_price_start {
                state.tick = tick_math::get_tick_at_sqrt_ratio(state.sqrt_price)?;
            }
        }

        self.sqrt_price = state.sqrt_price;
        self.liquidity = state.liquidity;
        self.tick = state.tick;

        Ok(SwapResults {
            amount_calculated: state.amount_calculated,
            sqrt_price: state.sqrt_price,
            liquidity: state.liquidity,
            tick: state.tick,
            fee_amount: state.fee_amount,
        })
    }

    fn price_limit(
        &self,
        zero_for_one: bool,
        sqrt_price_limit: Option<U256>,
    ) -> Result<U256, SimulationError> {
        let price_limit = match sqrt_price_limit {
            Some(limit) => limit,
            None if zero_for_one => safe_add_u256(tick_math::MIN_SQRT_RATIO, U256::from(1u64))?,
            None => safe_sub_u256(tick_math::MAX_SQRT_RATIO, U256::from(1u64))?,
        };

        let valid = if zero_for_one {
            price_limit > tick_math::MIN_SQRT_RATIO && price_limit < self.sqrt_price
        } else {
            price_limit < tick_math::MAX_SQRT_RATIO && price_limit > self.sqrt_price
        };
        if !valid {
            return Err(SimulationError::InvalidInput(format!(
                "Price limit {price_limit} out of range for current price {} (zero_for_one: {})",
                self.sqrt_price, zero_for_one
            )));
        }
        Ok(price_limit)
    }

    fn get_sqrt_ratio_target(
        sqrt_price_next: U256,
        sqrt_price_limit: U256,
        zero_for_one: bool,
    ) -> U256 {
        let cond1 = if zero_for_one {
            sqrt_price_next < sqrt_price_limit
        } else {
            sqrt_price_next > sqrt_price_limit
        };

        if cond1 {
            sqrt_price_limit
        } else {
            sqrt_price_next
        }
    }
}

impl ProtocolSim for UniswapV3State {
    fn fee(&self) -> f64 {
        (self.fee as u32) as f64 / 1_000_000.0
    }

    fn spot_price(&self, a: &Token, b: &Token) -> Result<f64, SimulationError> {
        if a < b {
            sqrt_price_q96_to_f64(self.sqrt_price, a.decimals, b.decimals)
        } else {
            Ok(1.0f64 / sqrt_price_q96_to_f64(self.sqrt_price, b.decimals, a.decimals)?)
        }
    }

    fn get_amount_out(
        &self,
        amount_in: BigUint,
        token_a: &Token,
        token_b: &Token,
    ) -> Result<GetAmountOutResult, SimulationError> {
        let zero_for_one = token_a < token_b;
        let amount_specified = u256_to_i256(biguint_to_u256(&amount_in)?)?;

        let mut new_state = self.clone();
        let result = new_state.swap(zero_for_one, amount_specified, None)?;

        trace!(?amount_in, ?token_a, ?token_b, ?zero_for_one, ?result, "V3 SWAP");

        Ok(GetAmountOutResult::new(
            u256_to_biguint(result.amount_calculated.unsigned_abs()),
            Box::new(new_state),
        ))
    }

    fn clone_box(&self) -> Box<dyn ProtocolSim> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn eq(&self, other: &dyn ProtocolSim) -> bool {
        other
            .as_any()
            .downcast_ref::<UniswapV3State>()
            .is_some_and(|other_state| self == other_state)
    }
}

use alloy_primitives::{I256, U256};
use serde::{Deserialize, Serialize};

use crate::protocol::errors::SimulationError;

/// Underlying data structure for mint and burns
///
/// Mint- and BurnEvent below are wrapped so that
/// the From trait can be implemented for these on the UniswapV3
/// event enum
///
/// This means instead of having to type: `UniswapV3Event::Burn(LiquidityChangeData::new(...))`
/// every time we can simply use: `BurnEvent::new(...).into()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityChangeData {
    pub tick_upper: i32,
    pub tick_lower: i32,
    pub amount: u128,
}

impl LiquidityChangeData {
    /// Signed liquidity delta of this change, negative for burns.
    pub fn liquidity_delta(&self, burn: bool) -> Result<i128, SimulationError> {
        let amount = i128::try_from(self.amount).map_err(|_| {
            SimulationError::InvalidInput(format!("Liquidity amount {} too large", self.amount))
        })?;
        Ok(if burn { -amount } else { amount })
    }
}

#[derive(Debug, Clone)]
pub struct MintEvent(LiquidityChangeData);

impl MintEvent {
    pub fn new(lower: i32, upper: i32, amount: u128) -> Self {
        MintEvent(LiquidityChangeData { tick_lower: lower, tick_upper: upper, amount })
    }
}

#[derive(Debug, Clone)]
pub struct BurnEvent(LiquidityChangeData);

impl BurnEvent {
    pub fn new(lower: i32, upper: i32, amount: u128) -> Self {
        BurnEvent(LiquidityChangeData { tick_lower: lower, tick_upper: upper, amount })
    }
}

/// Pool state recorded on chain right after a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    #[serde(with = "crate::serde_helpers::decimal")]
    pub sqrt_price: U256,
    pub tick: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEvent {
    pub zero_for_one: bool,
    /// Exact input if non negative, exact output otherwise
    pub amount_specified: I256,
    pub sqrt_price_limit: Option<U256>,
    pub observed: Option<ObservedState>,
}

impl SwapEvent {
    pub fn new(zero_for_one: bool, amount_specified: I256) -> Self {
        SwapEvent { zero_for_one, amount_specified, sqrt_price_limit: None, observed: None }
    }

    /// Builds a swap from the token deltas the pool reported, positive amounts flowing into the
    /// pool.
    ///
    /// The token0 delta is replayed as the specified amount: a positive delta sells token0 for an
    /// exact input, a negative one buys token0 for an exact output.
    pub fn from_amounts(amount0: I256, amount1: I256) -> Result<Self, SimulationError> {
        if amount0.is_positive() && amount1.is_positive() ||
            amount0.is_negative() && amount1.is_negative()
        {
            return Err(SimulationError::InvalidInput(format!(
                "Swap amounts {amount0} and {amount1} must flow in opposite directions"
            )));
        }
        Ok(SwapEvent::new(amount0.is_positive(), amount0))
    }

    pub fn with_price_limit(mut self, sqrt_price_limit: U256) -> Self {
        self.sqrt_price_limit = Some(sqrt_price_limit);
        self
    }

    pub fn with_observed(mut self, sqrt_price: U256, tick: i32) -> Self {
        self.observed = Some(ObservedState { sqrt_price, tick });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniswapV3Event {
    Mint(LiquidityChangeData),
    Burn(LiquidityChangeData),
    Swap(SwapEvent),
}

impl UniswapV3Event {
    pub fn kind(&self) -> &'static str {
        match self {
            UniswapV3Event::Mint(_) => "mint",
            UniswapV3Event::Burn(_) => "burn",
            UniswapV3Event::Swap(_) => "swap",
        }
    }
}

impl From<MintEvent> for UniswapV3Event {
    fn from(value: MintEvent) -> Self {
        UniswapV3Event::Mint(value.0)
    }
}

impl From<BurnEvent> for UniswapV3Event {
    fn from(value: BurnEvent) -> Self {
        UniswapV3Event::Burn(value.0)
    }
}

impl From<SwapEvent> for UniswapV3Event {
    fn from(value: SwapEvent) -> Self {
        UniswapV3Event::Swap(value)
    }
}

//! Protocol Simulation
//!
//! This module contains the `ProtocolSim` trait, which defines the methods
//! that a protocol state must implement in order to be quoted without
//! mutating it.
//!
//! The `ProtocolSim` trait has several key methods:
//!  - `fee`: Returns the protocol's fee as a ratio.
//!  - `spot_price`: Returns the current spot price between two tokens.
//!  - `get_amount_out`: Returns the amount of output tokens given an amount of input tokens.
//!  - `clone_box`: Clones the simulated protocol state as a trait object.
//!  - `as_any`: Allows downcasting of the trait object.
//!  - `as_any_mut`: Allows mutable downcasting of the trait object.
//!  - `eq`: Compares two simulated protocol states for equality.
//!
//!
//! # Examples
//! ```
//! use alloy_primitives::U256;
//! use lp_range_simulation::protocol::uniswap_v3::{
//!     enums::FeeAmount,
//!     state::UniswapV3State,
//!     tick_list::TickInfo,
//! };
//! use lp_range_simulation::protocol::state::ProtocolSim;
//! use lp_range_simulation::models::Token;
//! use lp_range_simulation::u256_num::u256_to_biguint;
//!
//! // A pool with a single position of 1e9 liquidity around price 1
//! let state: Box<dyn ProtocolSim> = Box::new(UniswapV3State::new(
//!     1_000_000_000,
//!     U256::from(1u64) << 96,
//!     FeeAmount::Medium,
//!     0,
//!     vec![TickInfo::new(-60, 1_000_000_000, 1_000_000_000), TickInfo::new(60, -1_000_000_000, 1_000_000_000)],
//! ).unwrap());
//!
//! let token0 = Token::new("0x0000000000000000000000000000000000000001", 18, "T0");
//! let token1 = Token::new("0x0000000000000000000000000000000000000002", 18, "T1");
//!
//! let out = state.get_amount_out(u256_to_biguint(U256::from(1_000_000u64)), &token0, &token1).unwrap().amount;
//! assert_eq!(state.spot_price(&token0, &token1).unwrap(), 1.0f64);
//! assert_eq!(out, 996006u64.into());
//! ```
use std::any::Any;

use num_bigint::BigUint;

use crate::{
    models::Token,
    protocol::{errors::SimulationError, models::GetAmountOutResult},
};

/// ProtocolSim trait
/// This trait defines the methods that a protocol state must implement in order to be quoted
/// in a trade simulation.
pub trait ProtocolSim: std::fmt::Debug + Send + Sync + 'static {
    /// Returns the fee of the protocol as ratio
    ///
    /// E.g. if the fee is 1%, the value returned would be 0.01.
    fn fee(&self) -> f64;

    /// Returns the protocol's current spot price of two tokens
    ///
    /// Currency pairs are meant to be compared against one another in
    /// order to understand how much of the quote currency is required
    /// to buy one unit of the base currency.
    ///
    /// E.g. if ETH/USD is trading at 1000, we need 1000 USD (quote)
    /// to buy 1 ETH (base currency).
    ///
    /// # Arguments
    ///
    /// * `base` - Base Token: refers to the token that is the quantity of a pair. For the pair
    ///   BTC/USDT, BTC would be the base asset.
    /// * `quote` - Quote Token: refers to the token that is the price of a pair. For the symbol
    ///   BTC/USDT, USDT would be the quote asset.
    fn spot_price(&self, base: &Token, quote: &Token) -> Result<f64, SimulationError>;

    /// Returns the amount out given an amount in and input/output tokens.
    ///
    /// # Arguments
    ///
    /// * `amount_in` - The amount in of the input token.
    /// * `token_in` - The input token.
    /// * `token_out` - The output token.
    ///
    /// # Returns
    ///
    /// A `Result` containing a `GetAmountOutResult` struct on success or a
    ///  `SimulationError` on failure. The state itself is left unchanged.
    fn get_amount_out(
        &self,
        amount_in: BigUint,
        token_in: &Token,
        token_out: &Token,
    ) -> Result<GetAmountOutResult, SimulationError>;

    /// Clones the protocol state as a trait object.
    /// This allows the state to be cloned when it is being used as a `Box<dyn ProtocolSim>`.
    fn clone_box(&self) -> Box<dyn ProtocolSim>;

    /// Allows downcasting of the trait object to its underlying type.
    fn as_any(&self) -> &dyn Any;

    /// Allows downcasting of the trait object to its mutable underlying type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Compares two protocol states for equality.
    /// This method must be implemented to define how two protocol states are considered equal
    /// (used for tests).
    fn eq(&self, other: &dyn ProtocolSim) -> bool;
}

impl Clone for Box<dyn ProtocolSim> {
    fn clone(&self) -> Box<dyn ProtocolSim> {
        self.clone_box()
    }
}

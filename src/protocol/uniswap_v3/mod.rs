//! Concentrated liquidity pool simulation
pub mod enums;
pub mod events;
pub mod liquidity_amounts;
mod liquidity_math;
pub mod replay;
pub(crate) mod solidity_math;
pub mod sqrt_price_math;
pub mod state;
mod swap_math;
pub mod tick_list;
pub mod tick_math;

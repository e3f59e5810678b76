//! Quote results
//!
//! This module contains the `GetAmountOutResult` struct, which represents
//! the outcome of quoting a trade against a protocol state: the amount the
//! trade would yield and the state the protocol would be left in.
use num_bigint::BigUint;

use super::state::ProtocolSim;

/// GetAmountOutResult struct represents the result of getting the amount out of a trading pair
///
/// # Fields
///
/// * `amount`: BigUint, the amount of output tokens
/// * `new_state`: the protocol state after the trade
#[derive(Debug)]
pub struct GetAmountOutResult {
    pub amount: BigUint,
    pub new_state: Box<dyn ProtocolSim>,
}

impl GetAmountOutResult {
    /// Constructs a new GetAmountOutResult struct with the given amount and state
    pub fn new(amount: BigUint, new_state: Box<dyn ProtocolSim>) -> Self {
        GetAmountOutResult { amount, new_state }
    }
}

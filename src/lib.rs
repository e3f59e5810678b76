//! LP range simulation: replaying pool history against concentrated liquidity positions
//!
//! This library rebuilds a concentrated liquidity pool from a snapshot and
//! replays the pool's recorded mint, burn and swap events against it. Swaps
//! step through the initialized ticks exactly like the on-chain pool, charge
//! fees on the input token and attribute the resulting fee growth to ticks.
//!
//! On top of the replay engine the crate answers the question which position
//! range would have performed best over a period: candidate ranges are minted
//! into independent copies of the pool, the period is replayed for each of them
//! in parallel and the earned fees and final position value are compared with
//! holding the deposited tokens.

// Reexports
pub use num_traits;

pub mod models;
pub mod optimize;
pub mod protocol;
pub mod safe_math;
pub mod scenario;
pub mod serde_helpers;
pub mod u256_num;

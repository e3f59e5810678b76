//! Supported Swap Protocols

pub mod errors;
pub mod models;
pub mod state;
pub mod uniswap_v3;

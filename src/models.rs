//! Basic data structures
//!
//! This module contains the token model shared across the crate. Tokens
//! carry the information required to convert between human readable
//! amounts and the integer base units the pool math works with.
use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use alloy_primitives::{
    utils::{format_units, parse_units},
    U256,
};
use serde::{Deserialize, Serialize};

use crate::protocol::errors::SimulationError;

#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The address of the token, lower case hex with 0x prefix
    pub address: String,
    /// The number of decimal places that the token uses
    pub decimals: u32,
    /// The symbol of the token
    pub symbol: String,
}

impl Token {
    /// Constructor for Token
    ///
    /// The address is normalised to lower case so that token ordering, which decides which
    /// token is token0 of a pool, does not depend on the checksum casing of the input.
    pub fn new(address: &str, decimals: u32, symbol: &str) -> Self {
        Token { address: address.to_lowercase(), decimals, symbol: symbol.to_string() }
    }

    fn unit(&self) -> Result<u8, SimulationError> {
        u8::try_from(self.decimals).map_err(|_| {
            SimulationError::InvalidInput(format!(
                "Token {} has unsupported decimals {}",
                self.symbol, self.decimals
            ))
        })
    }

    /// Converts a human readable amount, e.g. `"1.5"`, into base units.
    ///
    /// Digits beyond the token's precision are truncated.
    pub fn to_base_units(&self, amount: &str) -> Result<U256, SimulationError> {
        let invalid = |reason: String| {
            SimulationError::InvalidInput(format!("Invalid token amount {amount:?}: {reason}"))
        };
        if amount.trim_start_matches('-') == "." || amount.trim_start_matches('-').is_empty() {
            return Err(invalid("no digits".to_string()));
        }
        let parsed = parse_units(amount, self.unit()?).map_err(|err| invalid(err.to_string()))?;
        if parsed.is_negative() || amount.starts_with('-') {
            return Err(invalid("negative".to_string()));
        }
        Ok(parsed.get_absolute())
    }

    /// Renders base units as a human readable decimal string.
    pub fn from_base_units(&self, amount: U256) -> Result<String, SimulationError> {
        let formatted = format_units(amount, self.unit()?)
            .map_err(|err| SimulationError::FatalError(err.to_string()))?;
        Ok(match formatted.split_once('.') {
            Some((whole, frac)) if !frac.trim_end_matches('0').is_empty() => {
                format!("{whole}.{}", frac.trim_end_matches('0'))
            }
            Some((whole, _)) => whole.to_string(),
            None => formatted,
        })
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.address)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn usdc() -> Token {
        Token::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6, "USDC")
    }

    fn weth() -> Token {
        Token::new("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18, "WETH")
    }

    #[test]
    fn test_ordering_ignores_checksum_case() {
        let lower = Token::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", 6, "USDC");
        assert_eq!(lower, usdc());
        assert!(usdc() < weth());
    }

    #[rstest]
    #[case("1", "1000000")]
    #[case("1.5", "1500000")]
    #[case("0.000001", "1")]
    #[case("0.0000019", "1")]
    #[case(".25", "250000")]
    #[case("0", "0")]
    fn test_to_base_units(#[case] human: &str, #[case] exp: &str) {
        let res = usdc().to_base_units(human).unwrap();

        assert_eq!(res.to_string(), exp);
    }

    #[rstest]
    #[case("")]
    #[case("1.2.3")]
    #[case("-1")]
    #[case("-")]
    #[case(".")]
    #[case("abc")]
    fn test_to_base_units_invalid(#[case] human: &str) {
        let res = usdc().to_base_units(human);

        assert!(matches!(res, Err(SimulationError::InvalidInput(_))));
    }

    #[rstest]
    #[case(U256::from(1_500_000u64), "1.5")]
    #[case(U256::from(1u64), "0.000001")]
    #[case(U256::from(42_000_000u64), "42")]
    #[case(U256::ZERO, "0")]
    fn test_from_base_units(#[case] amount: U256, #[case] exp: &str) {
        assert_eq!(usdc().from_base_units(amount).unwrap(), exp);
    }

    #[test]
    fn test_base_units_without_decimals() {
        let token = Token::new("0x0000000000000000000000000000000000000003", 0, "WHOLE");

        assert_eq!(token.to_base_units("42").unwrap(), U256::from(42u64));
        assert_eq!(token.from_base_units(U256::from(100u64)).unwrap(), "100");
    }
}

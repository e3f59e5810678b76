//! Replay scenarios
//!
//! A scenario bundles everything a simulation run consumes: the pool snapshot
//! taken at the start of the replayed period, the initialized ticks at that
//! moment and the chronologically ordered pool events of the period. Scenarios
//! are plain JSON documents, big integers are written as decimal strings.
//!
//! ```json
//! {
//!   "pool": { "sqrt_price": "79228162514264337593543950336", "liquidity": "1000000000", "tick": 0, "fee": 3000 },
//!   "ticks": [
//!     { "index": -60, "liquidity_net": "1000000000", "liquidity_gross": "1000000000" },
//!     { "index": 60, "liquidity_net": "-1000000000", "liquidity_gross": "1000000000" }
//!   ],
//!   "events": [
//!     { "type": "swap", "amount0": "1000000", "amount1": "-996006" },
//!     { "type": "burn", "tick_lower": -60, "tick_upper": 60, "amount": "1000" }
//!   ]
//! }
//! ```
use std::{fs, path::Path};

use alloy_primitives::{I256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    models::Token,
    optimize::range_search::RangeSearchConfig,
    protocol::{
        errors::{InvalidSnapshotError, SimulationError, TransitionError},
        uniswap_v3::{
            enums::FeeAmount,
            events::{BurnEvent, MintEvent, SwapEvent, UniswapV3Event},
            state::UniswapV3State,
            tick_list::TickInfo,
        },
    },
};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Snapshot(#[from] InvalidSnapshotError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Pool state at the start of the replayed period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(with = "crate::serde_helpers::decimal")]
    pub sqrt_price: U256,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub liquidity: u128,
    pub tick: i32,
    pub fee: FeeAmount,
    /// Must agree with the fee tier if given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_spacing: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub index: i32,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub liquidity_net: i128,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub liquidity_gross: u128,
}

impl From<&TickSnapshot> for TickInfo {
    fn from(value: &TickSnapshot) -> Self {
        TickInfo::new(value.index, value.liquidity_net, value.liquidity_gross)
    }
}

/// A pool event as recorded on chain.
///
/// Swaps carry the token deltas of the pool, positive amounts flowing into the pool, and
/// optionally the price and tick the pool reported after the swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventRecord {
    Mint {
        tick_lower: i32,
        tick_upper: i32,
        #[serde(with = "crate::serde_helpers::decimal")]
        amount: u128,
    },
    Burn {
        tick_lower: i32,
        tick_upper: i32,
        #[serde(with = "crate::serde_helpers::decimal")]
        amount: u128,
    },
    Swap {
        #[serde(with = "crate::serde_helpers::decimal")]
        amount0: I256,
        #[serde(with = "crate::serde_helpers::decimal")]
        amount1: I256,
        #[serde(
            default,
            with = "crate::serde_helpers::decimal_option",
            skip_serializing_if = "Option::is_none"
        )]
        sqrt_price: Option<U256>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tick: Option<i32>,
        #[serde(
            default,
            with = "crate::serde_helpers::decimal_option",
            skip_serializing_if = "Option::is_none"
        )]
        sqrt_price_limit: Option<U256>,
    },
}

impl TryFrom<&EventRecord> for UniswapV3Event {
    type Error = SimulationError;

    fn try_from(value: &EventRecord) -> Result<Self, Self::Error> {
        Ok(match value {
            EventRecord::Mint { tick_lower, tick_upper, amount } => {
                MintEvent::new(*tick_lower, *tick_upper, *amount).into()
            }
            EventRecord::Burn { tick_lower, tick_upper, amount } => {
                BurnEvent::new(*tick_lower, *tick_upper, *amount).into()
            }
            EventRecord::Swap { amount0, amount1, sqrt_price, tick, sqrt_price_limit } => {
                let mut swap = SwapEvent::from_amounts(*amount0, *amount1)?;
                if let Some(limit) = sqrt_price_limit {
                    swap = swap.with_price_limit(*limit);
                }
                if let (Some(sqrt_price), Some(tick)) = (sqrt_price, tick) {
                    swap = swap.with_observed(*sqrt_price, *tick);
                }
                swap.into()
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub pool: PoolSnapshot,
    #[serde(default)]
    pub ticks: Vec<TickSnapshot>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token0: Option<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token1: Option<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_search: Option<RangeSearchConfig>,
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Builds a fresh pool state from the snapshot and its ticks.
    pub fn build_state(&self) -> Result<UniswapV3State, InvalidSnapshotError> {
        if let Some(spacing) = self.pool.tick_spacing {
            if spacing != self.pool.fee.tick_spacing() {
                return Err(InvalidSnapshotError::ValueError(format!(
                    "Tick spacing {spacing} does not match fee tier {}",
                    self.pool.fee
                )));
            }
        }
        UniswapV3State::new(
            self.pool.liquidity,
            self.pool.sqrt_price,
            self.pool.fee,
            self.pool.tick,
            self.ticks
                .iter()
                .map(TickInfo::from)
                .collect(),
        )
    }

    /// Decodes the recorded events, reporting the position of the first malformed one.
    pub fn decode_events(&self) -> Result<Vec<UniswapV3Event>, TransitionError> {
        self.events
            .iter()
            .enumerate()
            .map(|(index, record)| {
                UniswapV3Event::try_from(record).map_err(|err| TransitionError::at(index, err))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use rstest::rstest;
    use tempfile::NamedTempFile;

    use crate::protocol::uniswap_v3::sqrt_price_math::Q96;

    const SCENARIO: &str = r#"{
        "pool": {
            "sqrt_price": "79228162514264337593543950336",
            "liquidity": 1000000000,
            "tick": 0,
            "fee": 3000
        },
        "ticks": [
            { "index": -60, "liquidity_net": "1000000000", "liquidity_gross": "1000000000" },
            { "index": 60, "liquidity_net": "-1000000000", "liquidity_gross": "1000000000" }
        ],
        "events": [
            { "type": "mint", "tick_lower": -120, "tick_upper": 120, "amount": "5000" },
            { "type": "swap", "amount0": "1000000", "amount1": "-996006", "sqrt_price": "1", "tick": -20 },
            { "type": "burn", "tick_lower": -120, "tick_upper": 120, "amount": "5000" }
        ]
    }"#;

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes())
            .unwrap();

        let scenario = Scenario::from_file(file.path()).unwrap();

        assert_eq!(scenario.pool.sqrt_price, Q96);
        assert_eq!(scenario.pool.fee, FeeAmount::Medium);
        assert_eq!(scenario.ticks.len(), 2);
        assert_eq!(scenario.events.len(), 3);
        assert!(scenario.range_search.is_none());
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();

        let res = Scenario::from_file(dir.path().join("missing.json"));

        assert!(matches!(res, Err(ScenarioError::Io(_))));
    }

    #[test]
    fn test_decode_events() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();

        let events = scenario.decode_events().unwrap();

        assert_eq!(events[0], MintEvent::new(-120, 120, 5000).into());
        match &events[1] {
            UniswapV3Event::Swap(swap) => {
                assert!(swap.zero_for_one);
                assert_eq!(swap.amount_specified, I256::try_from(1_000_000i64).unwrap());
                assert_eq!(swap.observed.unwrap().tick, -20);
            }
            other => panic!("expected a swap, got {other:?}"),
        }
        assert_eq!(events[2].kind(), "burn");
    }

    #[test]
    fn test_decode_events_reports_index() {
        let mut scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        scenario.events.push(EventRecord::Swap {
            amount0: I256::ONE,
            amount1: I256::ONE,
            sqrt_price: None,
            tick: None,
            sqrt_price_limit: None,
        });

        let err = scenario.decode_events().unwrap_err();

        assert!(matches!(err, TransitionError::EventFailed { index: 3, .. }));
    }

    #[test]
    fn test_build_state() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();

        let state = scenario.build_state().unwrap();

        assert_eq!(state.liquidity(), 1_000_000_000);
        assert_eq!(state.tick_spacing(), 60);
        assert_eq!(state.ticks().len(), 2);
    }

    #[rstest]
    #[case::spacing_mismatch(r#"{"sqrt_price": "79228162514264337593543950336", "liquidity": "1", "tick": 0, "fee": 3000, "tick_spacing": 10}"#)]
    #[case::price_outside_tick(r#"{"sqrt_price": "79228162514264337593543950336", "liquidity": "1", "tick": 5, "fee": 3000}"#)]
    fn test_build_state_rejects_snapshot(#[case] pool: &str) {
        let mut scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        scenario.pool = serde_json::from_str(pool).unwrap();

        assert!(scenario.build_state().is_err());
    }

    #[test]
    fn test_unknown_fee_tier_is_rejected() {
        let raw = SCENARIO.replace("\"fee\": 3000", "\"fee\": 2500");

        assert!(serde_json::from_str::<Scenario>(&raw).is_err());
    }
}

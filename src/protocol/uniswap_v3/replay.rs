use alloy_primitives::U256;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{protocol::errors::TransitionError, safe_math::safe_add_u256};

use super::{events::UniswapV3Event, state::UniswapV3State};

/// Counters collected while replaying an event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub mints: usize,
    pub burns: usize,
    pub swaps: usize,
    /// Swaps whose simulated price or tick differs from the recorded one
    pub divergent_swaps: usize,
    /// Fees charged on token0 inputs
    #[serde(with = "crate::serde_helpers::decimal")]
    pub fees_0: U256,
    /// Fees charged on token1 inputs
    #[serde(with = "crate::serde_helpers::decimal")]
    pub fees_1: U256,
}

/// Applies `events` to `state` strictly in the given order.
///
/// Stops at the first event that can not be applied and reports its position. The state is left
/// partially updated in that case and should be discarded.
pub fn replay(
    state: &mut UniswapV3State,
    events: &[UniswapV3Event],
) -> Result<ReplaySummary, TransitionError> {
    let mut summary = ReplaySummary::default();

    for (index, event) in events.iter().enumerate() {
        debug!(index, kind = event.kind(), "Applying event");
        let result = state
            .apply_event(event)
            .map_err(|err| TransitionError::at(index, err))?;

        match event {
            UniswapV3Event::Mint(_) => summary.mints += 1,
            UniswapV3Event::Burn(_) => summary.burns += 1,
            UniswapV3Event::Swap(swap) => {
                summary.swaps += 1;
                if let Some(res) = result {
                    let fees =
                        if swap.zero_for_one { &mut summary.fees_0 } else { &mut summary.fees_1 };
                    *fees = safe_add_u256(*fees, res.fee_amount)
                        .map_err(|err| TransitionError::at(index, err))?;

                    if let Some(observed) = swap.observed {
                        if observed.sqrt_price != res.sqrt_price || observed.tick != res.tick {
                            warn!(
                                index,
                                simulated_price = %res.sqrt_price,
                                observed_price = %observed.sqrt_price,
                                simulated_tick = res.tick,
                                observed_tick = observed.tick,
                                "Simulated swap diverges from recorded state"
                            );
                            summary.divergent_swaps += 1;
                        }
                    }
                }
            }
        }
    }

    info!(
        events = events.len(),
        swaps = summary.swaps,
        divergent = summary.divergent_swaps,
        tick = state.tick(),
        liquidity = state.liquidity(),
        "Replay finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloy_primitives::I256;

    use crate::protocol::{
        errors::SimulationError,
        uniswap_v3::{
            enums::FeeAmount,
            events::{BurnEvent, MintEvent, SwapEvent},
            sqrt_price_math::Q96,
            tick_list::TickInfo,
        },
    };

    const L: u128 = 1_000_000_000;

    fn pool() -> UniswapV3State {
        UniswapV3State::new(
            L,
            Q96,
            FeeAmount::Medium,
            0,
            vec![TickInfo::new(-60, L as i128, L), TickInfo::new(60, -(L as i128), L)],
        )
        .unwrap()
    }

    fn i256(v: i64) -> I256 {
        I256::try_from(v).unwrap()
    }

    #[test]
    fn test_replay_counts_events() {
        let mut state = pool();
        let events: Vec<UniswapV3Event> = vec![
            MintEvent::new(-120, 120, 500).into(),
            SwapEvent::new(true, i256(1_000_000)).into(),
            SwapEvent::new(false, i256(1_000_000)).into(),
            BurnEvent::new(-120, 120, 500).into(),
        ];

        let summary = replay(&mut state, &events).unwrap();

        assert_eq!(summary.mints, 1);
        assert_eq!(summary.burns, 1);
        assert_eq!(summary.swaps, 2);
        assert_eq!(summary.divergent_swaps, 0);
        assert!(summary.fees_0 > U256::ZERO);
        assert!(summary.fees_1 > U256::ZERO);
        assert_eq!(state.liquidity(), L);
    }

    #[test]
    fn test_replay_reports_failing_event() {
        let mut state = pool();
        let events: Vec<UniswapV3Event> = vec![
            SwapEvent::new(true, i256(1_000)).into(),
            BurnEvent::new(-60, 60, L + 1).into(),
            SwapEvent::new(true, i256(1_000)).into(),
        ];

        let err = replay(&mut state, &events).unwrap_err();

        match err {
            TransitionError::EventFailed { index, source: SimulationError::FatalError(_) } => {
                assert_eq!(index, 1)
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_replay_counts_divergent_swaps() {
        let mut state = pool();
        let expected_price = U256::from_str_radix("79149250711305166342700278159", 10).unwrap();
        let events: Vec<UniswapV3Event> = vec![
            SwapEvent::new(true, i256(1_000_000))
                .with_observed(expected_price, -20)
                .into(),
            SwapEvent::new(true, i256(1_000_000))
                .with_observed(Q96, 0)
                .into(),
        ];

        let summary = replay(&mut state, &events).unwrap();

        assert_eq!(summary.swaps, 2);
        assert_eq!(summary.divergent_swaps, 1);
    }
}

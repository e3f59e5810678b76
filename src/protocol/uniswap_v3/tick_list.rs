use std::collections::BTreeMap;

use alloy_primitives::U256;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    protocol::errors::{InvalidSnapshotError, SimulationError},
    safe_math::safe_add_u256,
};

use super::{
    liquidity_math::add_liquidity_delta,
    solidity_math::mul_div,
    sqrt_price_math::Q128,
    tick_math::{MAX_TICK, MIN_TICK},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TickInfo {
    pub index: i32,
    /// Change of active liquidity when the price crosses this tick moving up
    pub net_liquidity: i128,
    /// Liquidity referencing this tick as lower or upper boundary
    pub gross_liquidity: u128,
}

impl TickInfo {
    pub fn new(index: i32, net_liquidity: i128, gross_liquidity: u128) -> Self {
        TickInfo { index, net_liquidity, gross_liquidity }
    }
}

#[derive(Debug)]
pub struct TickListError {
    pub kind: TickListErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum TickListErrorKind {
    NotFound,
}

impl From<TickListError> for SimulationError {
    fn from(err: TickListError) -> Self {
        SimulationError::FatalError(format!("Tick lookup failed: {:?}", err.kind))
    }
}

/// Initialized ticks of a pool, ordered by index.
///
/// Only ticks with non zero gross liquidity are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickList {
    tick_spacing: i32,
    ticks: BTreeMap<i32, TickInfo>,
}

impl TickList {
    /// Builds the list from snapshot ticks.
    ///
    /// Ticks must be aligned with the spacing, inside the global tick bounds, strictly ordered by
    /// index and carry a gross liquidity that covers their net liquidity.
    pub fn from(spacing: i32, ticks: Vec<TickInfo>) -> Result<Self, InvalidSnapshotError> {
        if spacing <= 0 {
            return Err(InvalidSnapshotError::ValueError(format!("Invalid tick spacing {spacing}")));
        }
        for t in ticks.iter() {
            if t.index % spacing != 0 {
                return Err(InvalidSnapshotError::ValueError(format!(
                    "Tick index {} not aligned with tick spacing {}",
                    t.index, spacing,
                )));
            }
            if !(MIN_TICK..=MAX_TICK).contains(&t.index) {
                return Err(InvalidSnapshotError::ValueError(format!(
                    "Tick index {} out of bounds",
                    t.index
                )));
            }
            if t.gross_liquidity == 0 || t.net_liquidity.unsigned_abs() > t.gross_liquidity {
                return Err(InvalidSnapshotError::ValueError(format!(
                    "Tick {} has inconsistent liquidity, net {} gross {}",
                    t.index, t.net_liquidity, t.gross_liquidity
                )));
            }
        }
        if let Some((a, _)) = ticks
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.index >= b.index)
        {
            return Err(InvalidSnapshotError::ValueError(format!(
                "Ticks are not ordered at position {}",
                a.index
            )));
        }

        let ticks = ticks
            .into_iter()
            .map(|t| (t.index, t))
            .collect();
        Ok(TickList { tick_spacing: spacing, ticks })
    }

    pub fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickInfo> {
        self.ticks.values()
    }

    pub fn get_tick(&self, index: i32) -> Result<&TickInfo, TickListError> {
        self.ticks
            .get(&index)
            .ok_or(TickListError { kind: TickListErrorKind::NotFound })
    }

    /// Applies a liquidity change to one boundary of a position.
    ///
    /// The gross liquidity changes by `gross_delta`. The net liquidity changes by `net_delta` for a
    /// lower boundary and by `-net_delta` for an upper boundary: liquidity added at the lower edge
    /// becomes active when the price crosses upwards, liquidity added at the upper edge stops being
    /// active. Ticks whose gross liquidity drops to zero are removed.
    ///
    /// Returns `true` if the tick was not initialized before. The list is unchanged on error.
    pub fn update_tick(
        &mut self,
        index: i32,
        net_delta: i128,
        gross_delta: i128,
        upper: bool,
    ) -> Result<bool, SimulationError> {
        let updated = self.updated_tick(index, net_delta, gross_delta, upper)?;
        Ok(self.commit(index, updated))
    }

    /// Adds `liquidity_delta` to both boundaries of the position `[lower, upper)`.
    ///
    /// Both updates are checked before either is written, so a failing boundary leaves the list
    /// untouched. Returns whether each boundary was newly initialized.
    pub fn update_position(
        &mut self,
        lower: i32,
        upper: i32,
        liquidity_delta: i128,
    ) -> Result<(bool, bool), SimulationError> {
        let updated_lower = self.updated_tick(lower, liquidity_delta, liquidity_delta, false)?;
        let updated_upper = self.updated_tick(upper, liquidity_delta, liquidity_delta, true)?;
        Ok((self.commit(lower, updated_lower), self.commit(upper, updated_upper)))
    }

    /// The record at `index` after the update, `None` if the tick ends up uninitialized.
    fn updated_tick(
        &self,
        index: i32,
        net_delta: i128,
        gross_delta: i128,
        upper: bool,
    ) -> Result<Option<TickInfo>, SimulationError> {
        if index % self.tick_spacing != 0 || !(MIN_TICK..=MAX_TICK).contains(&index) {
            return Err(SimulationError::InvalidInput(format!(
                "Tick {index} is not a valid boundary for spacing {}",
                self.tick_spacing
            )));
        }
        let signed_net = if upper { net_delta.checked_neg() } else { Some(net_delta) };
        let signed_net = signed_net.ok_or_else(|| {
            SimulationError::FatalError(format!("Net liquidity delta {net_delta} overflows"))
        })?;

        match self.ticks.get(&index) {
            Some(tick) => {
                let gross_liquidity = add_liquidity_delta(tick.gross_liquidity, gross_delta)?;
                let net_liquidity = tick
                    .net_liquidity
                    .checked_add(signed_net)
                    .ok_or_else(|| {
                        SimulationError::FatalError(format!(
                            "Net liquidity of tick {index} overflows"
                        ))
                    })?;
                Ok((gross_liquidity > 0)
                    .then(|| TickInfo::new(index, net_liquidity, gross_liquidity)))
            }
            None => {
                if gross_delta < 0 {
                    return Err(SimulationError::FatalError(format!(
                        "Can not remove {} liquidity from uninitialized tick {index}",
                        gross_delta.unsigned_abs()
                    )));
                }
                Ok((gross_delta > 0).then(|| TickInfo::new(index, signed_net, gross_delta as u128)))
            }
        }
    }

    /// Writes an updated record, returns `true` if the tick was not initialized before.
    fn commit(&mut self, index: i32, updated: Option<TickInfo>) -> bool {
        match updated {
            Some(tick) => self.ticks.insert(index, tick).is_none(),
            None => {
                self.ticks.remove(&index);
                false
            }
        }
    }

    /// Returns the closest initialized tick at or below `index` (`lte`) or strictly above it.
    pub fn next_initialized_tick(&self, index: i32, lte: bool) -> Option<&TickInfo> {
        if lte {
            self.ticks
                .range(..=index)
                .next_back()
                .map(|(_, t)| t)
        } else {
            self.ticks
                .range(index.saturating_add(1)..)
                .next()
                .map(|(_, t)| t)
        }
    }

    /// Finds the next initialized tick without leaving the 256 tick bitmap word of `tick`.
    ///
    /// If no initialized tick exists within the word, the word boundary is returned as an
    /// uninitialized tick. Results are clamped to the global tick bounds.
    pub fn next_initialized_tick_within_one_word(&self, tick: i32, lte: bool) -> (i32, bool) {
        let spacing = self.tick_spacing;
        let compressed = tick.div_euclid(spacing);

        let (next, initialized) = if lte {
            let word_pos = compressed >> 8;
            let min_in_word = (word_pos << 8) * spacing;
            match self.next_initialized_tick(tick, true) {
                Some(t) if t.index >= min_in_word => (t.index, true),
                _ => (min_in_word, false),
            }
        } else {
            let word_pos = (compressed + 1) >> 8;
            let max_in_word = (((word_pos + 1) << 8) - 1) * spacing;
            match self.next_initialized_tick(tick, false) {
                Some(t) if t.index <= max_in_word => (t.index, true),
                _ => (max_in_word, false),
            }
        };

        let clamped = next.clamp(MIN_TICK, MAX_TICK);
        (clamped, initialized && clamped == next)
    }
}

/// Fee growth attributed to a tick, per unit of liquidity as Q128.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickFees {
    #[serde(with = "crate::serde_helpers::decimal")]
    pub fee_growth_0_inside: U256,
    #[serde(with = "crate::serde_helpers::decimal")]
    pub fee_growth_1_inside: U256,
}

/// Per tick fee growth records.
///
/// Records are created for every tick the pool has seen initialized and are never dropped, so the
/// fee history of a tick stays available after its liquidity was removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickFeeLedger {
    fees: BTreeMap<i32, TickFees>,
}

impl TickFeeLedger {
    pub fn track(&mut self, index: i32) {
        self.fees.entry(index).or_default();
    }

    pub fn get(&self, index: i32) -> Option<&TickFees> {
        self.fees.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i32, &TickFees)> {
        self.fees.iter()
    }

    /// Adds fee growth of the input token to the record at `index`, if there is one.
    ///
    /// Returns whether a record received the growth.
    pub fn accrue(
        &mut self,
        index: i32,
        zero_for_one: bool,
        growth: U256,
    ) -> Result<bool, SimulationError> {
        match self.fees.get_mut(&index) {
            Some(fees) => {
                if zero_for_one {
                    fees.fee_growth_0_inside = safe_add_u256(fees.fee_growth_0_inside, growth)?;
                } else {
                    fees.fee_growth_1_inside = safe_add_u256(fees.fee_growth_1_inside, growth)?;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fees earned by `liquidity` over the ticks in `[lower, upper)`, as (token0, token1).
    pub fn fees_in_range(
        &self,
        lower: i32,
        upper: i32,
        liquidity: u128,
    ) -> Result<(U256, U256), SimulationError> {
        if lower >= upper {
            return Ok((U256::ZERO, U256::ZERO));
        }
        let liquidity = U256::from(liquidity);
        self.fees
            .range(lower..upper)
            .try_fold((U256::ZERO, U256::ZERO), |(fee0, fee1), (_, fees)| {
                Ok((
                    safe_add_u256(fee0, mul_div(fees.fee_growth_0_inside, liquidity, Q128)?)?,
                    safe_add_u256(fee1, mul_div(fees.fee_growth_1_inside, liquidity, Q128)?)?,
                ))
            })
    }
}

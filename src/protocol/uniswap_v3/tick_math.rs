use alloy_primitives::{I256, U256};

use crate::{protocol::errors::SimulationError, safe_math::safe_div_u256};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;

// MIN_SQRT_RATIO: 4295128739
pub const MIN_SQRT_RATIO: U256 = U256::from_limbs([4295128739u64, 0, 0, 0]);

// MAX_SQRT_RATIO: 1461446703485210103287273052203988822378723970342
pub const MAX_SQRT_RATIO: U256 =
    U256::from_limbs([6743328256752651558u64, 17280870778742802505u64, 4294805859u64, 0]);

// 1 / sqrt(1.0001)^(2^i) as Q128.128 for i in 1..20
const RATIO_FACTORS: [U256; 19] = [
    U256::from_limbs([6459403834229662010u64, 18444899583751176498u64, 0, 0]),
    U256::from_limbs([17226890335427755468u64, 18443055278223354162u64, 0, 0]),
    U256::from_limbs([2032852871939366096u64, 18439367220385604838u64, 0, 0]),
    U256::from_limbs([14545316742740207172u64, 18431993317065449817u64, 0, 0]),
    U256::from_limbs([5129152022828963008u64, 18417254355718160513u64, 0, 0]),
    U256::from_limbs([4894419605888772193u64, 18387811781193591352u64, 0, 0]),
    U256::from_limbs([1280255884321894483u64, 18329067761203520168u64, 0, 0]),
    U256::from_limbs([15924666964335305636u64, 18212142134806087854u64, 0, 0]),
    U256::from_limbs([8010504389359918676u64, 17980523815641551639u64, 0, 0]),
    U256::from_limbs([10668036004952895731u64, 17526086738831147013u64, 0, 0]),
    U256::from_limbs([4878133418470705625u64, 16651378430235024244u64, 0, 0]),
    U256::from_limbs([9537173718739605541u64, 15030750278693429944u64, 0, 0]),
    U256::from_limbs([9972618978014552549u64, 12247334978882834399u64, 0, 0]),
    U256::from_limbs([10428997489610666743u64, 8131365268884726200u64, 0, 0]),
    U256::from_limbs([9305304367709015974u64, 3584323654723342297u64, 0, 0]),
    U256::from_limbs([14301143598189091785u64, 696457651847595233u64, 0, 0]),
    U256::from_limbs([7393154844743099908u64, 26294789957452057u64, 0, 0]),
    U256::from_limbs([2209338891292245656u64, 37481735321082u64, 0, 0]),
    U256::from_limbs([10518117631919034274u64, 76158723u64, 0, 0]),
];

/// Returns the Q64.96 sqrt price at which `tick` starts.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, SimulationError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(SimulationError::InvalidInput(format!("Tick {tick} out of bounds")));
    }
    let abs_tick = tick.unsigned_abs();
    let mut ratio = if abs_tick & 1 != 0 {
        U256::from_limbs([12262481743371124737u64, 18445821805675392311u64, 0, 0])
    } else {
        U256::from_limbs([0, 0, 1u64, 0])
    };
    for (bit, factor) in RATIO_FACTORS.iter().enumerate() {
        if abs_tick & (1 << (bit + 1)) != 0 {
            // both operands are below 2^128, the product fits
            ratio = (ratio * *factor) >> 128;
        }
    }

    if tick > 0 {
        ratio = safe_div_u256(U256::MAX, ratio)?;
    }

    // Q128.128 -> Q64.96, rounding up so that get_tick_at_sqrt_ratio stays consistent
    let rounding = if (ratio & U256::from(u32::MAX)).is_zero() { 0u64 } else { 1u64 };
    Ok((ratio >> 32) + U256::from(rounding))
}

fn most_significant_bit(x: U256) -> usize {
    x.bit_len().saturating_sub(1)
}

/// Returns the greatest tick whose sqrt price is lower than or equal to `sqrt_price`.
pub fn get_tick_at_sqrt_ratio(sqrt_price: U256) -> Result<i32, SimulationError> {
    if sqrt_price < MIN_SQRT_RATIO || sqrt_price >= MAX_SQRT_RATIO {
        return Err(SimulationError::InvalidInput(format!("Sqrt price {sqrt_price} out of bounds")));
    }
    let ratio_x128 = sqrt_price << 32;
    let msb = most_significant_bit(ratio_x128);

    let mut log_2: I256 = I256::try_from(msb as i64 - 128)
        .map_err(|_| SimulationError::FatalError("Log2 out of range".to_string()))? <<
        64;
    let mut r: U256 =
        if msb >= 128 { ratio_x128 >> (msb - 127) } else { ratio_x128 << (127 - msb) };

    for i in 0..14usize {
        r = (r * r) >> 127;
        let f: U256 = r >> 128;
        if !f.is_zero() {
            log_2 |= I256::ONE << (63 - i);
        }
        r >>= f.as_limbs()[0] as usize;
    }

    let log_sqrt10001: I256 =
        log_2 * I256::from_raw(U256::from_limbs([11745905768312294533u64, 13863u64, 0, 0]));

    let tick_low = (log_sqrt10001 -
        I256::from_raw(U256::from_limbs([6552757943157144234u64, 184476617836266586u64, 0, 0])))
    .asr(128)
    .as_i32();
    let tick_high = (log_sqrt10001 +
        I256::from_raw(U256::from_limbs([4998474450511881007u64, 15793544031827761793u64, 0, 0])))
    .asr(128)
    .as_i32();

    if tick_low == tick_high {
        Ok(tick_low)
    } else if get_sqrt_ratio_at_tick(tick_high)? <= sqrt_price {
        Ok(tick_high)
    } else {
        Ok(tick_low)
    }
}

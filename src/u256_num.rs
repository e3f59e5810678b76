//! Numeric methods for the U256 type
use alloy_primitives::U256;
use num_bigint::BigUint;

use crate::protocol::errors::SimulationError;

/// Converts a U256 integer into it's closest floating point representation
///
/// Rounds to "nearest even" if the number has to be truncated (number uses more than 53 bits).
/// The bit following the kept 53 bit significand is the round bit, any set bit after it is a
/// sticky bit. Round up if the round bit is set and either a sticky bit or the lowest kept bit is
/// set.
pub fn u256_to_f64(x: U256) -> f64 {
    let bits = x.bit_len();
    if bits <= 53 {
        return x.as_limbs()[0] as f64;
    }
    let shift = bits - 53;
    let kept = x >> shift;
    let mut significand = kept.as_limbs()[0];
    let round_bit = x.bit(shift - 1);
    let sticky = !(x & ((U256::from(1u64) << (shift - 1)) - U256::from(1u64))).is_zero();
    if round_bit && (sticky || significand & 1 == 1) {
        significand += 1;
    }
    // rounding may carry into a 54th bit, which is still exactly representable
    (significand as f64) * 2f64.powi(shift as i32)
}

/// Converts a U256 integer into a BigUint
pub fn u256_to_biguint(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
}

/// Converts a BigUint into a U256, failing if it does not fit into 256 bits
pub fn biguint_to_u256(value: &BigUint) -> Result<U256, SimulationError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(SimulationError::InvalidInput(format!("{value} does not fit into 256 bits")));
    }
    Ok(U256::from_be_slice(&bytes))
}

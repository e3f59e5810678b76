use alloy_primitives::{U256, U512};

use crate::{
    protocol::errors::SimulationError,
    safe_math::{div_mod_u512, safe_mul_u512},
};

/// `a * b / denom` computed with a 512 bit intermediate, rounded up.
pub fn mul_div_rounding_up(a: U256, b: U256, denom: U256) -> Result<U256, SimulationError> {
    let product = safe_mul_u512(U512::from(a), U512::from(b))?;
    let (mut result, rest) = div_mod_u512(product, U512::from(denom))?;
    if !rest.is_zero() {
        result += U512::from(1u64);
    }
    truncate_to_u256(result)
}

/// `a * b / denom` computed with a 512 bit intermediate, rounded down.
pub fn mul_div(a: U256, b: U256, denom: U256) -> Result<U256, SimulationError> {
    let product = safe_mul_u512(U512::from(a), U512::from(b))?;
    let (result, _) = div_mod_u512(product, U512::from(denom))?;
    truncate_to_u256(result)
}

fn truncate_to_u256(value: U512) -> Result<U256, SimulationError> {
    let limbs = value.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return Err(SimulationError::FatalError("Overflow: Value exceeds 256 bits".to_string()));
    }
    Ok(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

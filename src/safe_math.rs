//! Safe Math
//!
//! Checked arithmetic on the fixed width integer types used by the pool
//! model. Every operation that could overflow, underflow or divide by zero
//! returns a `SimulationError::FatalError` instead of wrapping or panicking:
//! an overflow inside the pool math means the snapshot or the event stream
//! is inconsistent.
use alloy_primitives::{Sign, I256, U256, U512};

use crate::protocol::errors::SimulationError;

fn checked<T>(res: Option<T>, op: &str) -> Result<T, SimulationError> {
    res.ok_or_else(|| SimulationError::FatalError(format!("{op} overflow")))
}

pub fn safe_div_u256(a: U256, b: U256) -> Result<U256, SimulationError> {
    if b.is_zero() {
        return Err(SimulationError::FatalError("Division by zero".to_string()));
    }
    Ok(a / b)
}

pub fn safe_add_u256(a: U256, b: U256) -> Result<U256, SimulationError> {
    checked(a.checked_add(b), "U256 add")
}

pub fn safe_sub_u256(a: U256, b: U256) -> Result<U256, SimulationError> {
    checked(a.checked_sub(b), "U256 sub")
}

pub fn div_mod_u256(a: U256, b: U256) -> Result<(U256, U256), SimulationError> {
    if b.is_zero() {
        return Err(SimulationError::FatalError("Division by zero".to_string()));
    }
    Ok((a / b, a % b))
}

/// Divides and rounds the quotient up if there is a remainder.
pub fn div_rounding_up_u256(a: U256, b: U256) -> Result<U256, SimulationError> {
    let (result, rest) = div_mod_u256(a, b)?;
    if rest.is_zero() {
        Ok(result)
    } else {
        safe_add_u256(result, U256::from(1u64))
    }
}

pub fn safe_mul_u512(a: U512, b: U512) -> Result<U512, SimulationError> {
    checked(a.checked_mul(b), "U512 mul")
}

pub fn div_mod_u512(a: U512, b: U512) -> Result<(U512, U512), SimulationError> {
    if b.is_zero() {
        return Err(SimulationError::FatalError("Division by zero".to_string()));
    }
    Ok((a / b, a % b))
}

pub fn safe_add_i256(a: I256, b: I256) -> Result<I256, SimulationError> {
    checked(a.checked_add(b), "I256 add")
}

pub fn safe_sub_i256(a: I256, b: I256) -> Result<I256, SimulationError> {
    checked(a.checked_sub(b), "I256 sub")
}

/// Reinterprets an unsigned magnitude as a positive signed value.
pub fn u256_to_i256(value: U256) -> Result<I256, SimulationError> {
    checked(I256::checked_from_sign_and_abs(Sign::Positive, value), "U256 to I256")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use rstest::rstest;

    fn u256(s: &str) -> U256 {
        U256::from_str(s).unwrap()
    }

    fn i256(s: &str) -> I256 {
        I256::from_str(s).unwrap()
    }

    #[rstest]
    #[case::overflow(U256::MAX, u256("1"), None)]
    #[case::ok(u256("3"), u256("2"), Some(u256("5")))]
    fn test_safe_add_u256(#[case] a: U256, #[case] b: U256, #[case] exp: Option<U256>) {
        assert_eq!(safe_add_u256(a, b).ok(), exp);
    }

    #[rstest]
    #[case::underflow(u256("1"), u256("2"), None)]
    #[case::ok(u256("3"), u256("2"), Some(u256("1")))]
    fn test_safe_sub_u256(#[case] a: U256, #[case] b: U256, #[case] exp: Option<U256>) {
        assert_eq!(safe_sub_u256(a, b).ok(), exp);
    }

    #[rstest]
    #[case::by_zero(u256("1"), u256("0"), None)]
    #[case::ok(u256("7"), u256("2"), Some(u256("3")))]
    fn test_safe_div_u256(#[case] a: U256, #[case] b: U256, #[case] exp: Option<U256>) {
        assert_eq!(safe_div_u256(a, b).ok(), exp);
    }

    #[rstest]
    #[case::exact(u256("10"), u256("5"), u256("2"))]
    #[case::rest(u256("11"), u256("5"), u256("3"))]
    #[case::zero(u256("0"), u256("5"), u256("0"))]
    fn test_div_rounding_up_u256(#[case] a: U256, #[case] b: U256, #[case] exp: U256) {
        assert_eq!(div_rounding_up_u256(a, b).unwrap(), exp);
    }

    #[test]
    fn test_div_mod_u512_by_zero() {
        let res = div_mod_u512(U512::from(1u64), U512::ZERO);

        assert!(matches!(res, Err(SimulationError::FatalError(_))));
    }

    #[test]
    fn test_safe_mul_u512_overflow() {
        assert!(safe_mul_u512(U512::MAX, U512::from(2u64)).is_err());
    }

    #[rstest]
    #[case::overflow(I256::MAX, i256("1"), None)]
    #[case::ok(i256("-3"), i256("2"), Some(i256("-1")))]
    fn test_safe_add_i256(#[case] a: I256, #[case] b: I256, #[case] exp: Option<I256>) {
        assert_eq!(safe_add_i256(a, b).ok(), exp);
    }

    #[rstest]
    #[case::overflow(I256::MIN, i256("1"), None)]
    #[case::ok(i256("10"), i256("12"), Some(i256("-2")))]
    fn test_safe_sub_i256(#[case] a: I256, #[case] b: I256, #[case] exp: Option<I256>) {
        assert_eq!(safe_sub_i256(a, b).ok(), exp);
    }

    #[test]
    fn test_u256_to_i256() {
        assert_eq!(u256_to_i256(u256("42")).unwrap(), i256("42"));
        assert!(u256_to_i256(U256::MAX).is_err());
    }
}

//! Checked fixed-point helpers.

use stakelock_core::error::AccrualError;

/// Compute `floor(a * b / denom)` without materialising `a * b`.
///
/// Splits `a = q * denom + r`, so `a * b / denom = q * b + r * b / denom`
/// exactly. `r < denom`, so the remainder product only needs
/// `log2(denom) + log2(b)` bits; the quotient product is checked.
///
/// # Errors
///
/// [`AccrualError::ArithmeticOverflow`] if the result does not fit in `u128`
/// or `denom` is zero.
pub fn mul_div(a: u128, b: u128, denom: u128) -> Result<u128, AccrualError> {
    if denom == 0 {
        return Err(AccrualError::ArithmeticOverflow);
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / denom);
    }

    let q = a / denom;
    let r = a % denom;
    let whole = q.checked_mul(b).ok_or(AccrualError::ArithmeticOverflow)?;
    let part = r
        .checked_mul(b)
        .ok_or(AccrualError::ArithmeticOverflow)?
        / denom;
    whole.checked_add(part).ok_or(AccrualError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn small_values_exact() {
        assert_eq!(mul_div(10, 3, 4).unwrap(), 7);
        assert_eq!(mul_div(0, u128::MAX, 7).unwrap(), 0);
    }

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(mul_div(1, 1, 2).unwrap(), 0);
        assert_eq!(mul_div(5, 1, 3).unwrap(), 1);
    }

    #[test]
    fn zero_denominator_is_error() {
        assert_eq!(mul_div(1, 1, 0), Err(AccrualError::ArithmeticOverflow));
    }

    #[test]
    fn wide_product_split_exactly() {
        // a * b overflows u128 but the quotient fits.
        let a = u128::MAX / 3;
        assert_eq!(mul_div(a, 6, 6).unwrap(), a);
        assert_eq!(mul_div(u128::MAX, 1_000, 1_000).unwrap(), u128::MAX);
    }

    #[test]
    fn result_overflow_reported() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(AccrualError::ArithmeticOverflow));
    }

    proptest! {
        #[test]
        fn matches_narrow_product(a in 0u128..=u64::MAX as u128, b in 0u128..=u64::MAX as u128, d in 1u128..=u64::MAX as u128) {
            prop_assert_eq!(mul_div(a, b, d).unwrap(), a * b / d);
        }

        #[test]
        fn split_path_agrees_with_identity(q in 0u128..=u32::MAX as u128, r in 0u128..1_000_000u128, b in 1u128..=u64::MAX as u128) {
            // a = q * denom + r, forced through the split branch by a large b when it overflows.
            let denom = 1_000_000u128;
            let a = q * denom + r;
            let expected = q * b + r * b / denom;
            prop_assert_eq!(mul_div(a, b, denom).unwrap(), expected);
        }
    }
}

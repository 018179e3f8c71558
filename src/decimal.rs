//! Fixed-point rescaling between the engine's three precisions.
//!
//! Salary accrues in the accounting unit (18 decimal places). Payouts leave
//! the engine either in the stable asset (6 decimal places) or in the native
//! asset (18 decimal places). Every conversion between those scales goes
//! through [`rescale`]; no other module multiplies or divides by a power of
//! ten on its own.
//!
//! Human-readable amounts (CSV input, reports) are parsed and formatted with
//! `rust_decimal` so the raw integer units never appear as floats.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Decimal places of the accounting unit used for accrual.
pub const ACCOUNTING_DECIMALS: u32 = 18;

/// Decimal places of the stable payment asset.
pub const STABLE_DECIMALS: u32 = 6;

/// Decimal places of the native payment asset.
pub const NATIVE_DECIMALS: u32 = 18;

/// Converts `amount` from `from_decimals` to `to_decimals` fixed-point places.
///
/// Scaling up is exact. Scaling down rounds half up, so a payout is never
/// systematically shortchanged by truncation. Scaling up past the working
/// integer width saturates at `u128::MAX`.
///
/// # Examples
///
/// ```
/// use payroll_engine::decimal::rescale;
///
/// assert_eq!(rescale(1_500_000, 6, 18), 1_500_000_000_000_000_000);
/// assert_eq!(rescale(1_499_999_999_999, 18, 6), 1);
/// assert_eq!(rescale(1_500_000_000_000, 18, 6), 2);
/// ```
pub fn rescale(amount: u128, from_decimals: u32, to_decimals: u32) -> u128 {
    if from_decimals < to_decimals {
        let factor = pow10(to_decimals - from_decimals);
        amount.saturating_mul(factor)
    } else if from_decimals > to_decimals {
        let divisor = pow10(from_decimals - to_decimals);
        let quotient = amount / divisor;
        // Compare the remainder against half the divisor instead of adding the
        // half up front, which would overflow near u128::MAX.
        if amount % divisor >= divisor - divisor / 2 {
            quotient + 1
        } else {
            quotient
        }
    } else {
        amount
    }
}

/// Computes `floor(a * b / d)` without forming the full product.
///
/// Returns `None` if `d` is zero or the result does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let quotient = a / d;
    let remainder = a % d;
    quotient
        .checked_mul(b)?
        .checked_add(remainder.checked_mul(b)? / d)
}

/// `10^exp`, saturating once it leaves `u128`.
pub fn pow10(exp: u32) -> u128 {
    10u128.checked_pow(exp).unwrap_or(u128::MAX)
}

/// Parses a human-readable amount like `"1000.5"` into integer units with
/// `decimals` places.
///
/// Returns `None` for negative values, malformed input, or input carrying
/// more fractional digits than `decimals`.
pub fn parse_units(s: &str, decimals: u32) -> Option<u128> {
    let value = Decimal::from_str(s.trim()).ok()?.normalize();
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let scale = value.scale();
    if scale > decimals {
        return None;
    }
    let mantissa = u128::try_from(value.mantissa()).ok()?;
    mantissa.checked_mul(10u128.checked_pow(decimals - scale)?)
}

/// Formats integer units with `decimals` places as a normalized decimal
/// string, e.g. `1_500_000` at 6 places is `"1.5"`.
pub fn format_units(amount: u128, decimals: u32) -> String {
    let decimal = i128::try_from(amount)
        .ok()
        .and_then(|units| Decimal::try_from_i128_with_scale(units, decimals).ok());

    match decimal {
        Some(d) => d.normalize().to_string(),
        None => format_units_wide(amount, decimals),
    }
}

/// Fallback for values beyond `Decimal`'s 96-bit mantissa.
fn format_units_wide(amount: u128, decimals: u32) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

//! Exact decimal arithmetic on arbitrary-precision rationals
//!
//! Decimals travel through the pipeline as `BigRational`. The only place a
//! value is rounded is `rescale`, applied once when a value is bound to a
//! schema field of fixed scale.

use crate::types::RoundingMode;
use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// How far a literal's exponent may reach past its own digit count
///
/// `1e3000000` would otherwise allocate a three-million-digit integer.
pub const MAX_EXPONENT_SLACK: usize = 400;

/// `10^exp` as a big integer
pub fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

/// Parse a decimal literal such as `12039.4`, `-0.000001` or `1.5e3`
///
/// Returns `None` for anything that is not a plain finite decimal.
pub fn parse_decimal(text: &str) -> Option<BigRational> {
    let text = text.trim();
    let (mantissa, exponent) = match text.find(|c: char| c == 'e' || c == 'E') {
        Some(idx) => (&text[..idx], text[idx + 1..].parse::<i32>().ok()?),
        None => (text, 0),
    };

    let (negative, digits) = match mantissa.as_bytes().first()? {
        b'-' => (true, &mantissa[1..]),
        b'+' => (false, &mantissa[1..]),
        _ => (false, mantissa),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let all_digits = format!("{int_part}{frac_part}");
    let mut numer: BigInt = all_digits.parse().ok()?;
    if negative {
        numer = -numer;
    }

    let shift = exponent.checked_sub(i32::try_from(frac_part.len()).ok()?)?;
    if shift.unsigned_abs() as usize > all_digits.len() + MAX_EXPONENT_SLACK {
        return None;
    }
    let value = if shift >= 0 {
        BigRational::from_integer(numer * pow10(shift.unsigned_abs()))
    } else {
        BigRational::new(numer, pow10(shift.unsigned_abs()))
    };
    Some(value)
}

/// Exact rational for the shortest decimal text that round-trips `value`
///
/// `30.4_f64` becomes exactly `304/10`, not the binary approximation.
/// Returns `None` for NaN and infinities.
pub fn from_f64(value: f64) -> Option<BigRational> {
    if !value.is_finite() {
        return None;
    }
    // Display for f64 prints the shortest round-trip digits, never exponent form
    parse_decimal(&value.to_string())
}

/// Check if `value` has at most `scale` fractional decimal digits
pub fn fits_scale(value: &BigRational, scale: u32) -> bool {
    (value * BigRational::from_integer(pow10(scale))).is_integer()
}

/// Constrain `value` to `scale` fractional digits
///
/// Returns `None` only for `RoundingMode::Unnecessary` when rounding
/// would be required.
pub fn rescale(value: &BigRational, scale: u32, mode: RoundingMode) -> Option<BigRational> {
    let factor = pow10(scale);
    let scaled = value * BigRational::from_integer(factor.clone());
    if scaled.is_integer() {
        return Some(value.clone());
    }

    let unscaled = round_to_integer(&scaled, mode)?;
    Some(BigRational::new(unscaled, factor))
}

fn round_to_integer(value: &BigRational, mode: RoundingMode) -> Option<BigInt> {
    // Truncate toward zero, then decide on the remainder
    let (quotient, remainder) = value.numer().div_rem(value.denom());
    if remainder.is_zero() {
        return Some(quotient);
    }

    let away = if value.is_negative() {
        &quotient - BigInt::one()
    } else {
        &quotient + BigInt::one()
    };
    let twice_rem = remainder.abs() * 2u8;
    let half_cmp = twice_rem.cmp(value.denom());

    let rounded = match mode {
        RoundingMode::Unnecessary => return None,
        RoundingMode::Down => quotient,
        RoundingMode::HalfUp => match half_cmp {
            std::cmp::Ordering::Less => quotient,
            _ => away,
        },
        RoundingMode::HalfEven => match half_cmp {
            std::cmp::Ordering::Less => quotient,
            std::cmp::Ordering::Greater => away,
            std::cmp::Ordering::Equal => {
                if quotient.is_even() {
                    quotient
                } else {
                    away
                }
            }
        },
    };
    Some(rounded)
}

/// Unscaled integer of a value already constrained to `scale`
///
/// `30.4` at scale 6 is `30400000`. Returns `None` if the value carries more
/// than `scale` fractional digits.
pub fn to_unscaled(value: &BigRational, scale: u32) -> Option<BigInt> {
    let scaled = value * BigRational::from_integer(pow10(scale));
    scaled.is_integer().then(|| scaled.to_integer())
}

/// Rational from an unscaled integer and scale
pub fn from_unscaled(unscaled: BigInt, scale: u32) -> BigRational {
    BigRational::new(unscaled, pow10(scale))
}

/// Number of decimal digits in the unscaled integer
pub fn digit_count(unscaled: &BigInt) -> u32 {
    if unscaled.is_zero() {
        return 1;
    }
    unscaled.magnitude().to_str_radix(10).len() as u32
}

/// Render with exactly `scale` fractional digits, e.g. `30.400000`
///
/// Returns `None` if the value does not fit the scale.
pub fn format_scaled(value: &BigRational, scale: u32) -> Option<String> {
    let unscaled = to_unscaled(value, scale)?;
    let sign = if unscaled.sign() == Sign::Minus { "-" } else { "" };
    let digits = unscaled.magnitude().to_str_radix(10);
    let scale = scale as usize;

    if scale == 0 {
        return Some(format!("{sign}{digits}"));
    }
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    Some(format!("{sign}{int_part}.{frac_part}"))
}

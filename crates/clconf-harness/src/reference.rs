//! Host reference implementations of the builtins under test.
//!
//! These are the ground truth every device result is compared against. They
//! favour exactness over speed: widening arithmetic for saturation, `f64`
//! accumulation for norms, and explicit sentinels where OpenCL leaves a
//! result implementation-defined.

use crate::element::Element;
use crate::error::{HarnessError, Result};

/// `ilogb(±0)`.
pub const ILOGB_ZERO: i32 = i32::MIN;
/// `ilogb(±∞)`.
pub const ILOGB_INF: i32 = i32::MAX;
/// `ilogb(NaN)`.
pub const ILOGB_NAN: i32 = i32::MIN + 1;

/// Smallest exponent `ilogb` returns for a finite, non-zero `f32`.
pub const ILOGB_MIN_FINITE: i32 = -149;
/// Largest exponent `ilogb` returns for a finite `f32`.
pub const ILOGB_MAX_FINITE: i32 = 127;

pub fn square(x: f32) -> f32 {
    x * x
}

/// Minimum where a NaN operand loses to a number. Ties return the first
/// operand; the sign of `fmin(±0, ∓0)` is unspecified, so callers compare
/// zero results by value.
pub fn fmin(a: f32, b: f32) -> f32 {
    if a.is_nan() {
        return b;
    }
    if b.is_nan() {
        return a;
    }
    if b < a { b } else { a }
}

/// Unbiased binary exponent of `x`, subnormals included.
pub fn ilogb(x: f32) -> i32 {
    if x.is_nan() {
        return ILOGB_NAN;
    }
    if x.is_infinite() {
        return ILOGB_INF;
    }
    if x == 0.0 {
        return ILOGB_ZERO;
    }
    let bits = x.to_bits();
    let biased = ((bits >> 23) & 0xff) as i32;
    if biased == 0 {
        // Subnormal: value is mantissa * 2^-149.
        let mantissa = bits & 0x007f_ffff;
        31 - mantissa.leading_zeros() as i32 + ILOGB_MIN_FINITE
    } else {
        biased - 127
    }
}

/// Unsigned types with a saturating multiply-add computed in a wider type.
pub trait SaturatingMad: Element {
    const MAX: Self;

    fn mad_sat(a: Self, b: Self, c: Self) -> Self;
}

macro_rules! saturating_mad {
    ($($narrow:ty => $wide:ty),* $(,)?) => {
        $(
            impl SaturatingMad for $narrow {
                const MAX: Self = <$narrow>::MAX;

                fn mad_sat(a: Self, b: Self, c: Self) -> Self {
                    let wide = <$wide>::from(a) * <$wide>::from(b) + <$wide>::from(c);
                    if wide > <$wide>::from(<$narrow>::MAX) {
                        <$narrow>::MAX
                    } else {
                        wide as $narrow
                    }
                }
            }
        )*
    };
}

saturating_mad! {
    u8 => u16,
    u16 => u32,
    u32 => u64,
    u64 => u128,
}

/// `min(a * b + c, T::MAX)` with no intermediate overflow.
pub fn mad_sat<T: SaturatingMad>(a: T, b: T, c: T) -> T {
    T::mad_sat(a, b, c)
}

/// Normalize the logical components of one vector. Accumulates in `f64` and
/// rounds once per component. The zero vector maps to itself.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let sum: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum();
    if sum == 0.0 {
        return vec![0.0; v.len()];
    }
    let length = sum.sqrt();
    v.iter().map(|&x| (x as f64 / length) as f32).collect()
}

/// Integer types with the division conventions the harness checks.
pub trait IntegerOps: Element {
    const ZERO: Self;
    const ONE: Self;

    /// Truncating quotient and remainder. A zero divisor yields `(0, 0)`;
    /// `MIN / -1` wraps to `(MIN, 0)`.
    fn div_rem(self, divisor: Self) -> (Self, Self);

    fn wrapping_product(self, rhs: Self) -> Self;
}

macro_rules! integer_ops {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntegerOps for $ty {
                const ZERO: Self = 0;
                const ONE: Self = 1;

                fn div_rem(self, divisor: Self) -> (Self, Self) {
                    if divisor == 0 {
                        (0, 0)
                    } else {
                        (self.wrapping_div(divisor), self.wrapping_rem(divisor))
                    }
                }

                fn wrapping_product(self, rhs: Self) -> Self {
                    self.wrapping_mul(rhs)
                }
            }
        )*
    };
}

integer_ops!(i8, u8, i16, u16, i32, u32, i64, u64);

pub fn div_rem<T: IntegerOps>(a: T, b: T) -> (T, T) {
    a.div_rem(b)
}

/// `[x * y, x / y, x % y]` with wrapping multiply and the zero-divisor rule
/// of [`div_rem`].
pub fn scalar_arith<T: IntegerOps>(x: T, y: T) -> [T; 3] {
    let (q, r) = x.div_rem(y);
    [x.wrapping_product(y), q, r]
}

/// Check that `amount` is a valid shift for a `bits`-wide operand.
pub fn shift_amount(amount: usize, bits: u32) -> Result<u32> {
    match u32::try_from(amount) {
        Ok(a) if a < bits => Ok(a),
        _ => Err(HarnessError::ShiftOutOfRange {
            amount: u32::try_from(amount).unwrap_or(u32::MAX),
            bits,
        }),
    }
}

/// Logical right shift. `amount` must be below 64; see [`shift_amount`].
pub fn shift_right(x: u64, amount: u32) -> u64 {
    debug_assert!(amount < u64::BITS, "shift amount {amount} out of range");
    x >> amount
}

/// Shift applied to element `index` when a `width`-lane vector kernel shifts
/// each vector by its work-item id.
pub fn vector_shift_amount(index: usize, width: usize) -> usize {
    index / width.max(1)
}

/// Alpha-weighted blend of two RGBA pixels. Weights are `alpha / total` for
/// both sides (total clamped to 1 when it is zero); the result alpha is the
/// un-clamped total.
pub fn weighted_blend(input: [f32; 4], aux: [f32; 4]) -> [f32; 4] {
    let total = input[3] + aux[3];
    let divisor = if total == 0.0 { 1.0 } else { total };
    let in_weight = input[3] / divisor;
    let aux_weight = aux[3] / divisor;
    [
        input[0] * in_weight + aux[0] * aux_weight,
        input[1] * in_weight + aux[1] * aux_weight,
        input[2] * in_weight + aux[2] * aux_weight,
        total,
    ]
}

/// Look `x` up in a tone curve of `curve.len()` samples. The index is
/// `trunc(x * samples)`, clamped to the curve.
pub fn curve_lookup(x: f32, curve: &[f32]) -> f32 {
    let samples = curve.len() as i32;
    let index = (x * samples as f32) as i32;
    let clamped = index.clamp(0, (samples - 1).max(0)) as usize;
    curve.get(clamped).copied().unwrap_or_default()
}

/// Map the first lane through the curve, pass the second through.
pub fn contrast(pixel: [f32; 2], curve: &[f32]) -> [f32; 2] {
    [curve_lookup(pixel[0], curve), pixel[1]]
}

/// Evenly spaced curve `i / (points - 1)`, computed as the kernel host does.
pub fn linear_curve(points: usize) -> Vec<f32> {
    let step = 1.0f32 / (points.saturating_sub(1).max(1)) as f32;
    (0..points).map(|i| i as f32 * step).collect()
}

use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, OperationSpec, Session};
use crate::element::{ElementType, VectorWidth};
use crate::error::{HarnessError, Result};
use crate::generator::{InputGenerator, TestVector};
use crate::kernels;
use crate::reference::{self, IntegerOps};

/// Dividends cycle through 0..255 while divisors step through 1..=255, so
/// every 8-bit pair is covered once.
const DATA_SIZE: usize = 254 * 256;

/// Integer types exercised by the division test.
trait DivOperand: IntegerOps {
    /// Dividend paired with an all-ones divisor. `INT_MIN / -1` and
    /// `LONG_MIN / -1` overflow in OpenCL C, so those types use `MIN + 1`;
    /// `char` promotes to `int` first and keeps `MIN`.
    const EDGE_DIVIDEND: Self;

    /// Low bits of `v`, reinterpreted.
    fn wrap(v: u64) -> Self;
}

macro_rules! div_operand {
    ($($ty:ty => $edge:expr),* $(,)?) => {
        $(
            impl DivOperand for $ty {
                const EDGE_DIVIDEND: Self = $edge;

                fn wrap(v: u64) -> Self {
                    v as $ty
                }
            }
        )*
    };
}

div_operand!(
    i8 => i8::MIN,
    u8 => u8::MIN,
    i32 => i32::MIN + 1,
    u32 => u32::MIN,
    i64 => i64::MIN + 1,
    u64 => u64::MIN,
);

/// Signed and unsigned division and remainder at 8, 32 and 64 bits.
pub struct DivRem;

impl ConformanceCase for DivRem {
    fn name(&self) -> &'static str {
        "divrem"
    }

    fn description(&self) -> &'static str {
        "division and remainder on char, uchar, int, uint, long and ulong"
    }

    fn configurations(&self) -> Vec<Configuration> {
        [
            ElementType::I8,
            ElementType::U8,
            ElementType::I32,
            ElementType::U32,
            ElementType::I64,
            ElementType::U64,
        ]
        .into_iter()
        .map(|element| Configuration::typed(kernels::DIVREM, "divrem", element, VectorWidth::Scalar))
        .collect()
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let spec = config.primary()?;
        let report = match spec.element {
            ElementType::I8 => run_typed::<i8>(spec, session)?,
            ElementType::U8 => run_typed::<u8>(spec, session)?,
            ElementType::I32 => run_typed::<i32>(spec, session)?,
            ElementType::U32 => run_typed::<u32>(spec, session)?,
            ElementType::I64 => run_typed::<i64>(spec, session)?,
            ElementType::U64 => run_typed::<u64>(spec, session)?,
            other => {
                return Err(HarnessError::ArgumentMismatch {
                    kernel: spec.entry.to_string(),
                    detail: format!("divrem is not tested on {other}"),
                });
            }
        };
        Ok(vec![report])
    }
}

/// Dividends and divisors: the 8-bit sweep with 1 / all-ones, a zero
/// divisor, the edge dividend over all-ones and a negative dividend
/// written over the first records.
fn operands<T: DivOperand>(generator: &mut InputGenerator, width: VectorWidth) -> (TestVector<T>, TestVector<T>) {
    let all_ones = T::wrap(u64::MAX);
    let a_over = [(0, T::ONE), (2, T::EDGE_DIVIDEND), (3, T::wrap(-7i64 as u64))];
    let b_over = [(0, all_ones), (1, T::ZERO), (2, all_ones), (3, T::wrap(2))];

    let a = generator.from_fn(DATA_SIZE, width, |i| T::wrap((i % 255) as u64), &a_over);
    let b = generator.from_fn(DATA_SIZE, width, |i| T::wrap((i / 255 + 1) as u64), &b_over);
    (a, b)
}

fn run_typed<T: DivOperand>(spec: OperationSpec, session: &mut Session<'_>) -> Result<ComparisonReport> {
    let (a, b) = operands::<T>(session.generator(), spec.width);

    let args = [
        KernelArg::Input(a.to_buffer()),
        KernelArg::Input(b.to_buffer()),
        KernelArg::output(spec.element, DATA_SIZE),
        KernelArg::output(spec.element, DATA_SIZE),
    ];
    let mut outputs = session.launch(spec.entry, &args, DATA_SIZE)?;
    let quotient = outputs.next::<T>()?;
    let remainder = outputs.next::<T>()?;

    // Compare (quotient, remainder) pairs as two-lane records.
    let device: Vec<T> = quotient.iter().zip(&remainder).flat_map(|(&q, &r)| [q, r]).collect();
    let expected: Vec<T> = a
        .values()
        .iter()
        .zip(b.values())
        .flat_map(|(&x, &y)| {
            let (q, r) = reference::div_rem(x, y);
            [q, r]
        })
        .collect();

    Comparator::new(EqualityPolicy::Value).with_group(2, 2).compare(spec.entry, &device, &expected, |i| {
        format!("{} / {}", a.values()[i], b.values()[i])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overflowing_pairs<T: DivOperand>(min: T) -> usize {
        let (a, b) = operands::<T>(&mut InputGenerator::new(0), VectorWidth::Scalar);
        let minus_one = T::wrap(u64::MAX);
        a.values().iter().zip(b.values()).filter(|&(&x, &y)| x == min && y == minus_one).count()
    }

    #[test]
    fn int_and_long_never_divide_min_by_minus_one() {
        assert_eq!(overflowing_pairs(i32::MIN), 0);
        assert_eq!(overflowing_pairs(i64::MIN), 0);
    }

    #[test]
    fn char_keeps_min_over_minus_one() {
        let (a, b) = operands::<i8>(&mut InputGenerator::new(0), VectorWidth::Scalar);
        assert_eq!((a.values()[2], b.values()[2]), (i8::MIN, -1));
        assert_eq!(reference::div_rem(a.values()[2], b.values()[2]), (i8::MIN, 0));
    }

    #[test]
    fn edge_dividend_over_minus_one_is_defined() {
        let (a, b) = operands::<i32>(&mut InputGenerator::new(0), VectorWidth::Scalar);
        assert_eq!((a.values()[2], b.values()[2]), (i32::MIN + 1, -1));
        assert_eq!(reference::div_rem(a.values()[2], b.values()[2]), (i32::MAX, 0));
    }
}

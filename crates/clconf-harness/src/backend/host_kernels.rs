//! Software execution of the conformance kernels.
//!
//! Each kernel runs work-item by work-item over the bound arguments with the
//! OpenCL C semantics of the builtin it exercises. Buffer accesses are bounds
//! checked; an out-of-range access fails the launch instead of panicking.

use crate::backend::KernelArg;
use crate::element::{Element, ElementType, HostBuffer, ScalarArg, VectorWidth};
use crate::error::{HarnessError, Result};
use crate::reference::{ILOGB_INF, ILOGB_NAN, ILOGB_ZERO};

/// Arguments and output storage of one launch.
pub(super) struct Invocation<'a> {
    kernel: &'a str,
    args: &'a [KernelArg],
    outputs: Vec<Option<HostBuffer>>,
    type_param: Option<(ElementType, VectorWidth)>,
    global: usize,
}

impl<'a> Invocation<'a> {
    pub(super) fn new(
        kernel: &'a str,
        args: &'a [KernelArg],
        type_param: Option<(ElementType, VectorWidth)>,
        global: usize,
    ) -> Self {
        let outputs = args
            .iter()
            .map(|arg| match arg {
                KernelArg::Output { element, len } => Some(HostBuffer::zeroed(*element, *len)),
                _ => None,
            })
            .collect();
        Self { kernel, args, outputs, type_param, global }
    }

    /// Output buffers in argument order.
    pub(super) fn into_outputs(self) -> Vec<HostBuffer> {
        self.outputs.into_iter().flatten().collect()
    }

    fn mismatch(&self, detail: String) -> HarnessError {
        HarnessError::ArgumentMismatch { kernel: self.kernel.to_string(), detail }
    }

    fn type_param(&self) -> Result<(ElementType, VectorWidth)> {
        self.type_param.ok_or_else(|| self.mismatch("program was built without TYPE".into()))
    }

    fn input<T: Element>(&self, pos: usize) -> Result<&'a [T]> {
        match self.args.get(pos) {
            Some(KernelArg::Input(buffer)) => T::from_buffer(buffer).ok_or_else(|| {
                self.mismatch(format!(
                    "argument {pos} holds {} but the kernel reads {}",
                    buffer.element_type(),
                    T::TYPE
                ))
            }),
            Some(_) => Err(self.mismatch(format!("argument {pos} is not an input buffer"))),
            None => Err(self.mismatch(format!("missing argument {pos}"))),
        }
    }

    fn scalar(&self, pos: usize) -> Result<ScalarArg> {
        match self.args.get(pos) {
            Some(KernelArg::Scalar(value)) => Ok(*value),
            Some(_) => Err(self.mismatch(format!("argument {pos} is not a scalar"))),
            None => Err(self.mismatch(format!("missing argument {pos}"))),
        }
    }

    fn int(&self, pos: usize) -> Result<i32> {
        match self.scalar(pos)? {
            ScalarArg::Int(v) => Ok(v),
            other => Err(self.mismatch(format!("argument {pos} is {other:?}, expected int"))),
        }
    }

    fn uint(&self, pos: usize) -> Result<u32> {
        match self.scalar(pos)? {
            ScalarArg::Uint(v) => Ok(v),
            other => Err(self.mismatch(format!("argument {pos} is {other:?}, expected uint"))),
        }
    }

    fn ulong(&self, pos: usize) -> Result<u64> {
        match self.scalar(pos)? {
            ScalarArg::Ulong(v) => Ok(v),
            other => Err(self.mismatch(format!("argument {pos} is {other:?}, expected ulong"))),
        }
    }

    /// Take the zeroed output buffer at `pos`; hand it back with [`Self::store`].
    fn take_output<T: Element>(&mut self, pos: usize) -> Result<Vec<T>> {
        let taken = self.outputs.get_mut(pos).and_then(Option::take);
        let Some(buffer) = taken else {
            return Err(self.mismatch(format!("argument {pos} is not an output buffer")));
        };
        let element = buffer.element_type();
        T::from_owned(buffer).ok_or_else(|| {
            self.mismatch(format!("argument {pos} holds {element} but the kernel writes {}", T::TYPE))
        })
    }

    fn store<T: Element>(&mut self, pos: usize, values: Vec<T>) -> Result<()> {
        match self.outputs.get_mut(pos) {
            Some(slot) => {
                *slot = Some(T::into_buffer(values));
                Ok(())
            }
            None => Err(self.mismatch(format!("missing argument {pos}"))),
        }
    }

    fn out_of_bounds(&self, index: usize, len: usize) -> HarnessError {
        HarnessError::Launch {
            kernel: self.kernel.to_string(),
            reason: format!("work-item accessed element {index} of a {len}-element buffer"),
        }
    }

    fn read<T: Copy>(&self, data: &[T], index: usize) -> Result<T> {
        data.get(index).copied().ok_or_else(|| self.out_of_bounds(index, data.len()))
    }

    fn write<T>(&self, data: &mut [T], index: usize, value: T) -> Result<()> {
        let len = data.len();
        match data.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.out_of_bounds(index, len)),
        }
    }

    /// Visit every logical lane, one `width`-wide vector per work-item.
    fn for_each_lane(&self, width: VectorWidth, mut f: impl FnMut(usize, usize) -> Result<()>) -> Result<()> {
        let stride = width.storage_lanes();
        for item in 0..self.global {
            for lane in 0..width.lanes() {
                f(item, item * stride + lane)?;
            }
        }
        Ok(())
    }
}

pub(super) fn dispatch(inv: &mut Invocation<'_>) -> Result<()> {
    let kernel = inv.kernel;
    match kernel {
        "square" => square(inv),
        "fmin_test" => fmin(inv, VectorWidth::Scalar),
        "fmin_vec_test" => fmin(inv, VectorWidth::V4),
        "ilogb_test" => ilogb(inv, VectorWidth::Scalar),
        "ilogb_vec_test" => ilogb(inv, VectorWidth::V4),
        "mad_sat_test" => mad_sat(inv),
        "norm" => normalize(inv),
        "divrem" => divrem(inv),
        "srl_test" => srl(inv, VectorWidth::Scalar),
        "srl_vec4_test" => srl(inv, VectorWidth::V4),
        "srl_vec8_test" => srl(inv, VectorWidth::V8),
        "cl_weighted_blend" => blend(inv),
        "contrast" => contrast(inv),
        "test1" => arith(inv, Invocation::uint, |x: u32, y: u32| {
            [x.wrapping_mul(y), x.checked_div(y).unwrap_or(0), x.checked_rem(y).unwrap_or(0)]
        }),
        "test2" => arith(inv, Invocation::ulong, |x: u64, y: u64| {
            [x.wrapping_mul(y), x.checked_div(y).unwrap_or(0), x.checked_rem(y).unwrap_or(0)]
        }),
        other => Err(HarnessError::Launch {
            kernel: other.to_string(),
            reason: "no host implementation for this kernel".into(),
        }),
    }
}

fn square(inv: &mut Invocation<'_>) -> Result<()> {
    let input = inv.input::<f32>(0)?;
    let count = inv.uint(2)? as usize;
    let mut out = inv.take_output::<f32>(1)?;
    for i in 0..inv.global.min(count) {
        let x = inv.read(input, i)?;
        inv.write(&mut out, i, x * x)?;
    }
    inv.store(1, out)
}

fn device_fmin(x: f32, y: f32) -> f32 {
    match (x.is_nan(), y.is_nan()) {
        (true, _) => y,
        (_, true) => x,
        _ if y < x => y,
        _ => x,
    }
}

fn fmin(inv: &mut Invocation<'_>, width: VectorWidth) -> Result<()> {
    let a = inv.input::<f32>(0)?;
    let b = inv.input::<f32>(1)?;
    let mut out = inv.take_output::<f32>(2)?;
    inv.for_each_lane(width, |_, k| {
        let value = device_fmin(inv.read(a, k)?, inv.read(b, k)?);
        inv.write(&mut out, k, value)
    })?;
    inv.store(2, out)
}

fn device_ilogb(x: f32) -> i32 {
    if x.is_nan() {
        return ILOGB_NAN;
    }
    if x.is_infinite() {
        return ILOGB_INF;
    }
    if x == 0.0 {
        return ILOGB_ZERO;
    }
    // Scale subnormals into the normal range by 2^25.
    let (scaled, bias) = if x.abs() < f32::MIN_POSITIVE { (x * 33_554_432.0, 25) } else { (x, 0) };
    ((scaled.to_bits() >> 23) & 0xff) as i32 - 127 - bias
}

fn ilogb(inv: &mut Invocation<'_>, width: VectorWidth) -> Result<()> {
    let input = inv.input::<f32>(0)?;
    let mut out = inv.take_output::<i32>(1)?;
    inv.for_each_lane(width, |_, k| {
        let value = device_ilogb(inv.read(input, k)?);
        inv.write(&mut out, k, value)
    })?;
    inv.store(1, out)
}

fn mad_sat_typed<T: Element>(
    inv: &mut Invocation<'_>,
    width: VectorWidth,
    op: impl Fn(T, T, T) -> T,
) -> Result<()> {
    let a = inv.input::<T>(0)?;
    let b = inv.input::<T>(1)?;
    let c = inv.input::<T>(2)?;
    let mut out = inv.take_output::<T>(3)?;
    inv.for_each_lane(width, |_, k| {
        let value = op(inv.read(a, k)?, inv.read(b, k)?, inv.read(c, k)?);
        inv.write(&mut out, k, value)
    })?;
    inv.store(3, out)
}

macro_rules! checked_mad {
    ($inv:expr, $width:expr, $ty:ty) => {
        mad_sat_typed::<$ty>($inv, $width, |a, b, c| {
            a.checked_mul(b).and_then(|p| p.checked_add(c)).unwrap_or(<$ty>::MAX)
        })
    };
}

fn mad_sat(inv: &mut Invocation<'_>) -> Result<()> {
    let (element, width) = inv.type_param()?;
    match element {
        ElementType::U8 => checked_mad!(inv, width, u8),
        ElementType::U16 => checked_mad!(inv, width, u16),
        ElementType::U32 => checked_mad!(inv, width, u32),
        ElementType::U64 => checked_mad!(inv, width, u64),
        other => Err(inv.mismatch(format!("mad_sat is only emulated for unsigned types, not {other}"))),
    }
}

fn normalize(inv: &mut Invocation<'_>) -> Result<()> {
    let (element, width) = inv.type_param()?;
    if element != ElementType::F32 || width.lanes() > 4 {
        return Err(inv.mismatch(format!("normalize takes float vectors up to 4 wide, not TYPE={element}")));
    }
    let input = inv.input::<f32>(0)?;
    let mut out = inv.take_output::<f32>(1)?;
    let stride = width.storage_lanes();
    for item in 0..inv.global {
        let base = item * stride;
        let mut sum = 0.0f64;
        for lane in 0..width.lanes() {
            let x = f64::from(inv.read(input, base + lane)?);
            sum += x * x;
        }
        let length = sum.sqrt();
        for lane in 0..width.lanes() {
            let x = f64::from(inv.read(input, base + lane)?);
            let y = if sum == 0.0 { 0.0 } else { (x / length) as f32 };
            inv.write(&mut out, base + lane, y)?;
        }
    }
    inv.store(1, out)
}

fn divrem_typed<T: Element>(
    inv: &mut Invocation<'_>,
    width: VectorWidth,
    op: impl Fn(T, T) -> (T, T),
) -> Result<()> {
    let a = inv.input::<T>(0)?;
    let b = inv.input::<T>(1)?;
    let mut quotient = inv.take_output::<T>(2)?;
    let mut remainder = inv.take_output::<T>(3)?;
    inv.for_each_lane(width, |_, k| {
        let (q, r) = op(inv.read(a, k)?, inv.read(b, k)?);
        inv.write(&mut quotient, k, q)?;
        inv.write(&mut remainder, k, r)
    })?;
    inv.store(2, quotient)?;
    inv.store(3, remainder)
}

macro_rules! overflowing_divrem {
    ($inv:expr, $width:expr, $ty:ty) => {
        divrem_typed::<$ty>($inv, $width, |a, b| match (a.checked_div(b), a.checked_rem(b)) {
            (Some(q), Some(r)) => (q, r),
            _ if b == 0 => (0, 0),
            // MIN / -1
            _ => (a.wrapping_neg(), 0),
        })
    };
}

fn divrem(inv: &mut Invocation<'_>) -> Result<()> {
    let (element, width) = inv.type_param()?;
    match element {
        ElementType::I8 => overflowing_divrem!(inv, width, i8),
        ElementType::U8 => overflowing_divrem!(inv, width, u8),
        ElementType::I16 => overflowing_divrem!(inv, width, i16),
        ElementType::U16 => overflowing_divrem!(inv, width, u16),
        ElementType::I32 => overflowing_divrem!(inv, width, i32),
        ElementType::U32 => overflowing_divrem!(inv, width, u32),
        ElementType::I64 => overflowing_divrem!(inv, width, i64),
        ElementType::U64 => overflowing_divrem!(inv, width, u64),
        ElementType::F32 => Err(inv.mismatch("divrem takes integer types".into())),
    }
}

fn srl(inv: &mut Invocation<'_>, width: VectorWidth) -> Result<()> {
    let input = inv.input::<u64>(0)?;
    let mut out = inv.take_output::<u64>(1)?;
    inv.for_each_lane(width, |item, k| {
        // OpenCL masks the shift amount to the operand width.
        let value = inv.read(input, k)?.wrapping_shr(item as u32);
        inv.write(&mut out, k, value)
    })?;
    inv.store(1, out)
}

fn blend(inv: &mut Invocation<'_>) -> Result<()> {
    let input = inv.input::<f32>(0)?;
    let aux = inv.input::<f32>(1)?;
    let mut out = inv.take_output::<f32>(2)?;
    for item in 0..inv.global {
        let base = item * 4;
        let in_alpha = inv.read(input, base + 3)?;
        let aux_alpha = inv.read(aux, base + 3)?;
        let total = in_alpha + aux_alpha;
        let divisor = if total == 0.0 { 1.0 } else { total };
        let (in_weight, aux_weight) = (in_alpha / divisor, aux_alpha / divisor);
        for lane in 0..3 {
            let value = inv.read(input, base + lane)? * in_weight + inv.read(aux, base + lane)? * aux_weight;
            inv.write(&mut out, base + lane, value)?;
        }
        inv.write(&mut out, base + 3, total)?;
    }
    inv.store(2, out)
}

fn contrast(inv: &mut Invocation<'_>) -> Result<()> {
    let input = inv.input::<f32>(0)?;
    let curve = inv.input::<f32>(2)?;
    let samples = inv.int(3)?;
    let mut out = inv.take_output::<f32>(1)?;
    for i in 0..inv.global {
        let x = inv.read(input, 2 * i)?;
        let index = (x * samples as f32) as i32;
        let y = if index < 0 {
            inv.read(curve, 0)?
        } else if index < samples {
            inv.read(curve, index as usize)?
        } else {
            inv.read(curve, samples.wrapping_sub(1) as usize)?
        };
        inv.write(&mut out, 2 * i, y)?;
        inv.write(&mut out, 2 * i + 1, inv.read(input, 2 * i + 1)?)?;
    }
    inv.store(1, out)
}

fn arith<'a, T: Element>(
    inv: &mut Invocation<'a>,
    scalar: fn(&Invocation<'a>, usize) -> Result<T>,
    op: fn(T, T) -> [T; 3],
) -> Result<()> {
    let values = op(scalar(inv, 0)?, scalar(inv, 1)?);
    let mut out = inv.take_output::<T>(2)?;
    for _ in 0..inv.global {
        for (k, value) in values.into_iter().enumerate() {
            inv.write(&mut out, k, value)?;
        }
    }
    inv.store(2, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference;

    #[test]
    fn device_ilogb_matches_bitwise_reference() {
        let samples = [
            1.0f32,
            -3.5,
            f32::MAX,
            f32::MIN_POSITIVE,
            f32::from_bits(1),
            f32::from_bits(0x007f_ffff),
            f32::from_bits(0x0000_0400),
            0.0,
            -0.0,
            f32::NAN,
            f32::NEG_INFINITY,
        ];
        for x in samples {
            assert_eq!(device_ilogb(x), reference::ilogb(x), "x = {x:e}");
        }
    }

    #[test]
    fn device_fmin_nan_loses_and_zeros_tie() {
        assert_eq!(device_fmin(f32::NAN, 1.0), 1.0);
        assert_eq!(device_fmin(1.0, f32::NAN), 1.0);
        assert_eq!(device_fmin(0.0, -0.0), 0.0);
        assert_eq!(device_fmin(-2.0, 3.0), -2.0);
    }

    #[test]
    fn out_of_bounds_read_fails_the_launch() {
        let args = vec![
            KernelArg::Input(HostBuffer::F32(vec![1.0; 4])),
            KernelArg::output(ElementType::F32, 4),
        ];
        let mut inv = Invocation::new("ilogb_test", &args, None, 8);
        let err = dispatch(&mut inv).unwrap_err();
        assert!(matches!(err, HarnessError::Launch { .. }), "{err}");
    }

    #[test]
    fn wrong_input_type_is_argument_mismatch() {
        let args = vec![
            KernelArg::Input(HostBuffer::U32(vec![1; 4])),
            KernelArg::output(ElementType::I32, 4),
        ];
        let mut inv = Invocation::new("ilogb_test", &args, None, 4);
        let err = dispatch(&mut inv).unwrap_err();
        assert!(matches!(err, HarnessError::ArgumentMismatch { .. }), "{err}");
    }
}

//! OpenCL C kernel sources for the conformance tests.
//!
//! Each constant holds the full OpenCL C source of one program. Programs
//! that start with `typedef TYPE type;` are compiled once per configuration
//! with `-DTYPE=<cl type>`.

use crate::program::ProgramSource;

/// `out[i] = in[i] * in[i]`, guarded by an element count.
pub const SQUARE_SOURCE: &str = r#"
__kernel void square(
    __global const float* input,
    __global float*       output,
    const uint count)
{
    const uint i = get_global_id(0);
    if (i < count)
        output[i] = input[i] * input[i];
}
"#;

/// Scalar and `float4` `fmin` over the same input buffers.
pub const FMIN_SOURCE: &str = r#"
__kernel void fmin_test(
    __global const float* input1,
    __global const float* input2,
    __global float*       output)
{
    const int i = get_global_id(0);
    output[i] = fmin(input1[i], input2[i]);
}

__kernel void fmin_vec_test(
    __global const float4* input1,
    __global const float4* input2,
    __global float4*       output)
{
    const int i = get_global_id(0);
    output[i] = fmin(input1[i], input2[i]);
}
"#;

/// Scalar and `float4` `ilogb`. Zero, infinity and NaN map to fixed
/// sentinels so the result does not depend on `FP_ILOGB0`/`FP_ILOGBNAN`.
pub const ILOGB_SOURCE: &str = r#"
#define ILOGB_ZERO_SENTINEL INT_MIN
#define ILOGB_INF_SENTINEL  INT_MAX
#define ILOGB_NAN_SENTINEL  (INT_MIN + 1)

int ilogb_checked(float x)
{
    int r = ilogb(x);
    r = isnan(x) ? ILOGB_NAN_SENTINEL : r;
    r = isinf(x) ? ILOGB_INF_SENTINEL : r;
    r = x == 0.0f ? ILOGB_ZERO_SENTINEL : r;
    return r;
}

__kernel void ilogb_test(
    __global const float* input,
    __global int*         output)
{
    const int i = get_global_id(0);
    output[i] = ilogb_checked(input[i]);
}

__kernel void ilogb_vec_test(
    __global const float4* input,
    __global int4*         output)
{
    const int i = get_global_id(0);
    const float4 x = input[i];
    int4 r = ilogb(x);
    r = select(r, (int4)(ILOGB_NAN_SENTINEL), isnan(x));
    r = select(r, (int4)(ILOGB_INF_SENTINEL), isinf(x));
    r = select(r, (int4)(ILOGB_ZERO_SENTINEL), x == (float4)(0.0f));
    output[i] = r;
}
"#;

/// `mad_sat` over any unsigned scalar or vector `TYPE`.
pub const MAD_SAT_SOURCE: &str = r#"
typedef TYPE type;

__kernel void mad_sat_test(
    __global const type* a,
    __global const type* b,
    __global const type* c,
    __global type*       output)
{
    const int i = get_global_id(0);
    output[i] = mad_sat(a[i], b[i], c[i]);
}
"#;

/// `normalize` over `float`, `float2`, `float3` or `float4`.
pub const NORMALIZE_SOURCE: &str = r#"
typedef TYPE type;

__kernel void norm(
    __global const type* input,
    __global type*       output)
{
    const int i = get_global_id(0);
    output[i] = normalize(input[i]);
}
"#;

/// Quotient and remainder with a zero divisor mapped to zero.
pub const DIVREM_SOURCE: &str = r#"
typedef TYPE type;

__kernel void divrem(
    __global const type* a,
    __global const type* b,
    __global type*       quotient,
    __global type*       remainder)
{
    const int i = get_global_id(0);
    const type d = b[i];
    quotient[i]  = d != 0 ? a[i] / d : 0;
    remainder[i] = d != 0 ? a[i] % d : 0;
}
"#;

/// Logical right shift of each element (or vector) by its work-item id.
pub const SRL_SOURCE: &str = r#"
__kernel void srl_test(
    __global const ulong* input,
    __global ulong*       output)
{
    const int i = get_global_id(0);
    output[i] = input[i] >> (ulong)i;
}

__kernel void srl_vec4_test(
    __global const ulong4* input,
    __global ulong4*       output)
{
    const int i = get_global_id(0);
    output[i] = input[i] >> (ulong4)((ulong)i);
}

__kernel void srl_vec8_test(
    __global const ulong8* input,
    __global ulong8*       output)
{
    const int i = get_global_id(0);
    output[i] = input[i] >> (ulong8)((ulong)i);
}
"#;

/// Alpha-weighted blend of two RGBA images.
pub const BLEND_SOURCE: &str = r#"
__kernel void cl_weighted_blend(
    __global const float4* in,
    __global const float4* aux,
    __global float4*       out)
{
    const int gid = get_global_id(0);
    const float4 in_v = in[gid];
    const float4 aux_v = aux[gid];
    const float total_alpha = in_v.w + aux_v.w;
    const float divisor = total_alpha == 0.0f ? 1.0f : total_alpha;
    const float in_weight = in_v.w / divisor;
    const float aux_weight = aux_v.w / divisor;
    float4 out_v;
    out_v.x = in_v.x * in_weight + aux_v.x * aux_weight;
    out_v.y = in_v.y * in_weight + aux_v.y * aux_weight;
    out_v.z = in_v.z * in_weight + aux_v.z * aux_weight;
    out_v.w = total_alpha;
    out[gid] = out_v;
}
"#;

/// Tone-curve lookup on the first lane of each `float2`.
pub const CONTRAST_SOURCE: &str = r#"
__kernel void contrast(
    __global const float2* input,
    __global float2*       output,
    __global const float*  curve,
    const int samples)
{
    const int i = get_global_id(0);
    const float2 in = input[i];
    const int x = in.x * samples;
    float y;
    if (x < 0)
        y = curve[0];
    else if (x < samples)
        y = curve[x];
    else
        y = curve[samples - 1];
    output[i] = (float2)(y, in.y);
}
"#;

/// Multiply, divide and remainder of two by-value arguments.
pub const INT64_SOURCE: &str = r#"
__kernel void test1(
    const uint x,
    const uint y,
    __global uint* output)
{
    output[0] = x * y;
    output[1] = y != 0 ? x / y : 0;
    output[2] = y != 0 ? x % y : 0;
}

__kernel void test2(
    const ulong x,
    const ulong y,
    __global ulong* output)
{
    output[0] = x * y;
    output[1] = y != 0 ? x / y : 0;
    output[2] = y != 0 ? x % y : 0;
}
"#;

pub const SQUARE: ProgramSource = ProgramSource::new("square", SQUARE_SOURCE);
pub const FMIN: ProgramSource = ProgramSource::new("fmin", FMIN_SOURCE);
pub const ILOGB: ProgramSource = ProgramSource::new("ilogb", ILOGB_SOURCE);
pub const MAD_SAT: ProgramSource = ProgramSource::new("mad_sat", MAD_SAT_SOURCE);
pub const NORMALIZE: ProgramSource = ProgramSource::new("normalize", NORMALIZE_SOURCE);
pub const DIVREM: ProgramSource = ProgramSource::new("divrem", DIVREM_SOURCE);
pub const SRL: ProgramSource = ProgramSource::new("srl", SRL_SOURCE);
pub const BLEND: ProgramSource = ProgramSource::new("weightblend", BLEND_SOURCE);
pub const CONTRAST: ProgramSource = ProgramSource::new("contrast", CONTRAST_SOURCE);
pub const INT64: ProgramSource = ProgramSource::new("int64", INT64_SOURCE);

/// Every program, for validation and listing.
pub fn all_kernel_sources() -> Vec<ProgramSource> {
    vec![SQUARE, FMIN, ILOGB, MAD_SAT, NORMALIZE, DIVREM, SRL, BLEND, CONTRAST, INT64]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_declares_kernels() {
        for program in all_kernel_sources() {
            assert!(
                !program.entry_points().is_empty(),
                "program '{}' has no __kernel entry points",
                program.name
            );
        }
    }

    #[test]
    fn helper_functions_are_not_entry_points() {
        assert_eq!(ILOGB.entry_points(), vec!["ilogb_test", "ilogb_vec_test"]);
        assert_eq!(SRL.entry_points(), vec!["srl_test", "srl_vec4_test", "srl_vec8_test"]);
    }

    #[test]
    fn typed_programs_use_type_placeholder() {
        for program in [MAD_SAT, NORMALIZE, DIVREM] {
            assert!(program.text.contains("typedef TYPE type;"), "{}", program.name);
        }
    }
}

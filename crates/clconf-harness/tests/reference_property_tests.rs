//! Properties of the host reference evaluators.

use clconf_harness::reference::{
    self, ILOGB_INF, ILOGB_MAX_FINITE, ILOGB_MIN_FINITE, ILOGB_NAN, ILOGB_ZERO, IntegerOps, SaturatingMad,
};
use proptest::prelude::*;

fn finite_f32() -> impl Strategy<Value = f32> {
    any::<f32>().prop_filter("finite", |x| x.is_finite())
}

proptest! {
    #[test]
    fn mad_sat_never_exceeds_max_u8(a: u8, b: u8, c: u8) {
        let got = reference::mad_sat(a, b, c);
        let exact = u32::from(a) * u32::from(b) + u32::from(c);
        prop_assert!(got <= u8::MAX);
        prop_assert_eq!(u32::from(got), exact.min(u32::from(u8::MAX)));
    }

    #[test]
    fn mad_sat_never_exceeds_max_u64(a: u64, b: u64, c: u64) {
        let got = reference::mad_sat(a, b, c);
        let exact = u128::from(a) * u128::from(b) + u128::from(c);
        prop_assert_eq!(u128::from(got), exact.min(u128::from(<u64 as SaturatingMad>::MAX)));
    }

    #[test]
    fn fmin_ignores_a_nan_operand(x in finite_f32(), payload in 1u32..0x0040_0000) {
        let nan = f32::from_bits(0x7fc0_0000 | payload);
        prop_assert_eq!(reference::fmin(nan, x).to_bits(), x.to_bits());
        prop_assert_eq!(reference::fmin(x, nan).to_bits(), x.to_bits());
    }

    #[test]
    fn fmin_is_never_larger_than_either_operand(x in finite_f32(), y in finite_f32()) {
        let m = reference::fmin(x, y);
        prop_assert!(m <= x && m <= y);
    }

    #[test]
    fn ilogb_brackets_finite_values(x in finite_f32().prop_filter("non-zero", |x| *x != 0.0)) {
        let e = reference::ilogb(x);
        prop_assert!((ILOGB_MIN_FINITE..=ILOGB_MAX_FINITE).contains(&e));
        let magnitude = f64::from(x.abs());
        prop_assert!(magnitude >= 2f64.powi(e));
        prop_assert!(magnitude < 2f64.powi(e + 1));
    }

    #[test]
    fn division_by_zero_is_zero_zero(a8: i8, u8v: u8, a32: i32, u32v: u32, a64: i64, u64v: u64) {
        prop_assert_eq!(reference::div_rem(a8, 0), (0, 0));
        prop_assert_eq!(reference::div_rem(u8v, 0), (0, 0));
        prop_assert_eq!(reference::div_rem(a32, 0), (0, 0));
        prop_assert_eq!(reference::div_rem(u32v, 0), (0, 0));
        prop_assert_eq!(reference::div_rem(a64, 0), (0, 0));
        prop_assert_eq!(reference::div_rem(u64v, 0), (0, 0));
    }

    #[test]
    fn quotient_and_remainder_recompose(a in any::<i32>(), b in any::<i32>().prop_filter("non-zero", |b| *b != 0)) {
        let (q, r) = reference::div_rem(a, b);
        prop_assert_eq!(q.wrapping_mul(b).wrapping_add(r), a);
        prop_assert!(r == 0 || (r < 0) == (a < 0));
    }

    #[test]
    fn scalar_arith_matches_div_rem(x: u64, y: u64) {
        let [product, q, r] = reference::scalar_arith(x, y);
        prop_assert_eq!(product, x.wrapping_product(y));
        prop_assert_eq!((q, r), reference::div_rem(x, y));
    }

    #[test]
    fn normalize_has_unit_norm(v in prop::collection::vec(-1.0e3f32..1.0e3, 1..=4)) {
        prop_assume!(v.iter().any(|x| x.abs() > 1.0e-3));
        let n = reference::normalize(&v);
        let norm: f64 = n.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt();
        prop_assert!((norm - 1.0).abs() < 1.0e-6, "norm {norm} of {n:?}");
    }

    #[test]
    fn normalize_is_scale_invariant(
        v in prop::collection::vec(-1.0e3f32..1.0e3, 1..=4),
        scale in prop::sample::select(vec![0.25f32, 2.0, 8.0, 1024.0]),
    ) {
        prop_assume!(v.iter().any(|x| x.abs() > 1.0e-3));
        let scaled: Vec<f32> = v.iter().map(|x| x * scale).collect();
        // Power-of-two scaling is exact, so the results match bit for bit.
        prop_assert_eq!(reference::normalize(&v), reference::normalize(&scaled));
    }

    #[test]
    fn blend_is_symmetric_under_swap(
        a in prop::array::uniform4(0.0f32..1.0),
        b in prop::array::uniform4(0.0f32..1.0),
    ) {
        let ab = reference::weighted_blend(a, b);
        let ba = reference::weighted_blend(b, a);
        prop_assert_eq!(ab[3], ba[3]);
        for lane in 0..3 {
            prop_assert!((ab[lane] - ba[lane]).abs() <= 1.0e-6, "lane {lane}: {ab:?} vs {ba:?}");
        }
    }

    #[test]
    fn contrast_output_stays_on_the_curve(x in -4.0f32..4.0, g in any::<f32>()) {
        let curve = reference::linear_curve(5);
        let [y, passed] = reference::contrast([x, g], &curve);
        prop_assert!(curve.contains(&y));
        prop_assert_eq!(passed.to_bits(), g.to_bits());
    }
}

#[test]
fn ilogb_sentinels_are_distinct_and_out_of_range() {
    let sentinels = [ILOGB_ZERO, ILOGB_INF, ILOGB_NAN];
    for (i, a) in sentinels.iter().enumerate() {
        assert!(!(ILOGB_MIN_FINITE..=ILOGB_MAX_FINITE).contains(a));
        for b in &sentinels[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(reference::ilogb(0.0), ILOGB_ZERO);
    assert_eq!(reference::ilogb(-0.0), ILOGB_ZERO);
    assert_eq!(reference::ilogb(f32::NEG_INFINITY), ILOGB_INF);
    assert_eq!(reference::ilogb(f32::NAN), ILOGB_NAN);
    assert_eq!(reference::ilogb(f32::from_bits(1)), ILOGB_MIN_FINITE);
    assert_eq!(reference::ilogb(f32::MAX), ILOGB_MAX_FINITE);
}

#[test]
fn zero_total_alpha_blends_to_black() {
    let out = reference::weighted_blend([0.3, 0.4, 0.5, 0.0], [0.9, 0.8, 0.7, 0.0]);
    assert_eq!(out, [0.0, 0.0, 0.0, 0.0]);
}

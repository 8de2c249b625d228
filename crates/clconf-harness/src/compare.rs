//! Element-by-element comparison of device output against the reference,
//! and the text report a test prints.

use std::fmt;
use std::io::Write;

use tracing::debug;

use crate::backend::{DeviceSummary, PlatformSummary};
use crate::element::{Difference, Element};
use crate::error::{HarnessError, Result};

/// How two elements are judged equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityPolicy {
    /// `==`. NaN never equals anything and `-0 == +0`.
    Value,
    /// Raw bit patterns, so NaN payloads and zero signs must match.
    BitPattern,
    /// Raw bit patterns except that `-0` and `+0` are equal. For results
    /// where the sign of a zero is unspecified.
    BitPatternAnyZero,
}

impl EqualityPolicy {
    pub fn equal<T: Element>(self, device: T, reference: T) -> bool {
        match self {
            Self::Value => device == reference,
            Self::BitPattern => device.to_bits() == reference.to_bits(),
            // Distinct bits compare equal only for the two zeros.
            Self::BitPatternAnyZero => device.to_bits() == reference.to_bits() || device == reference,
        }
    }
}

/// One record whose device value differs from the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct MismatchReport {
    /// Record index (element index for scalars, vector index otherwise).
    pub index: usize,
    /// Human-readable operands that produced the record.
    pub operands: String,
    pub device: String,
    pub reference: String,
    /// Per-lane `device - reference` over the significant lanes.
    pub difference: Vec<Difference>,
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Incorrect element({}): {} result: {} correct: {} difference: {}",
            self.index,
            self.operands,
            self.device,
            self.reference,
            join(&self.difference),
        )
    }
}

/// Mismatch tally for one kernel variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    /// Summary label, `Wrong` or `Wrong<n>`.
    pub label: String,
    pub kernel: String,
    pub mismatches: Vec<MismatchReport>,
    pub total: usize,
}

impl ComparisonReport {
    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len()
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn summary_line(&self) -> String {
        format!("{}: {}/{}", self.label, self.mismatch_count(), self.total)
    }
}

/// Compares flattened buffers record by record.
///
/// A record is `group` consecutive storage lanes of which the first
/// `active_lanes` are significant, so `float3` data compares with a group
/// of 4 and 3 active lanes.
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    policy: EqualityPolicy,
    group: usize,
    active_lanes: usize,
}

impl Comparator {
    /// Scalar records under `policy`.
    pub fn new(policy: EqualityPolicy) -> Self {
        Self { policy, group: 1, active_lanes: 1 }
    }

    /// Records of `group` lanes, the first `active_lanes` compared.
    pub fn with_group(mut self, group: usize, active_lanes: usize) -> Self {
        self.group = group.max(1);
        self.active_lanes = active_lanes.clamp(1, self.group);
        self
    }

    pub fn policy(&self) -> EqualityPolicy {
        self.policy
    }

    /// Scan every record; never stops at the first mismatch.
    ///
    /// `operands(record)` renders the inputs of a mismatching record and is
    /// only called for mismatches.
    pub fn compare<T, F>(
        &self,
        kernel: &str,
        device: &[T],
        reference: &[T],
        operands: F,
    ) -> Result<ComparisonReport>
    where
        T: Element,
        F: Fn(usize) -> String,
    {
        if device.len() != reference.len() {
            return Err(HarnessError::ArgumentMismatch {
                kernel: kernel.to_string(),
                detail: format!(
                    "device returned {} elements, reference has {}",
                    device.len(),
                    reference.len()
                ),
            });
        }
        if device.len() % self.group != 0 {
            return Err(HarnessError::ArgumentMismatch {
                kernel: kernel.to_string(),
                detail: format!("{} elements do not form records of {}", device.len(), self.group),
            });
        }

        let mut mismatches = Vec::new();
        let records = device.chunks_exact(self.group).zip(reference.chunks_exact(self.group));
        let mut total = 0;
        for (index, (got, want)) in records.enumerate() {
            total += 1;
            let got = &got[..self.active_lanes];
            let want = &want[..self.active_lanes];
            if got.iter().zip(want).all(|(&g, &w)| self.policy.equal(g, w)) {
                continue;
            }
            mismatches.push(MismatchReport {
                index,
                operands: operands(index),
                device: render(got),
                reference: render(want),
                difference: got.iter().zip(want).map(|(&g, &w)| T::difference(g, w)).collect(),
            });
        }

        debug!(kernel, total, mismatches = mismatches.len(), "comparison finished");
        Ok(ComparisonReport { label: String::new(), kernel: kernel.to_string(), mismatches, total })
    }
}

/// Render one record: a bare value for scalars, `(a, b, c)` otherwise.
pub fn render<T: fmt::Display>(values: &[T]) -> String {
    match values {
        [single] => single.to_string(),
        many => format!("({})", join(many)),
    }
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Writes the user-facing report of a run.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self, platform: &PlatformSummary, device: &DeviceSummary) -> Result<()> {
        writeln!(
            self.out,
            "Platform is `{}' by: {} version: {}",
            platform.name, platform.vendor, platform.version
        )?;
        writeln!(
            self.out,
            "Device is `{}' by: {} version: {}",
            device.name, device.vendor, device.version
        )?;
        Ok(())
    }

    /// Header naming a test and the configuration about to run.
    pub fn configuration(&mut self, case: &str, label: &str) -> Result<()> {
        writeln!(self.out, "== {case} [{label}]")?;
        Ok(())
    }

    pub fn report(&mut self, report: &ComparisonReport) -> Result<()> {
        for mismatch in &report.mismatches {
            writeln!(self.out, "{mismatch}")?;
        }
        writeln!(self.out, "{}", report.summary_line())?;
        Ok(())
    }

    /// Describe a fatal error. Build failures carry the full build log.
    pub fn fatal(&mut self, err: &HarnessError) -> Result<()> {
        if let HarnessError::Build { log, .. } = err {
            writeln!(self.out, "BUILD FAIL")?;
            writeln!(self.out, "{}", log.trim_end())?;
            writeln!(self.out, "LOG DONE")?;
        }
        writeln!(self.out, "FATAL: {err}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_policy_counts_every_mismatch() {
        let cmp = Comparator::new(EqualityPolicy::Value);
        let report = cmp
            .compare("k", &[1u32, 5, 3, 9], &[1, 2, 3, 4], |i| format!("i={i}"))
            .unwrap();
        assert_eq!(report.mismatch_count(), 2);
        assert_eq!(report.total, 4);
        assert_eq!(report.mismatches[0].index, 1);
        assert_eq!(report.mismatches[0].difference, vec![Difference::Integer(3)]);
        assert_eq!(report.mismatches[1].operands, "i=3");
    }

    #[test]
    fn bit_pattern_policy_sees_zero_sign_and_nan_payload() {
        let bits = Comparator::new(EqualityPolicy::BitPattern);
        let value = Comparator::new(EqualityPolicy::Value);
        let device = [0.0f32, f32::from_bits(0x7fc0_0001)];
        let reference = [-0.0f32, f32::from_bits(0x7fc0_0001)];
        let by_bits = bits.compare("k", &device, &reference, |_| String::new()).unwrap();
        assert_eq!(by_bits.mismatch_count(), 1);
        let by_value = value.compare("k", &device, &reference, |_| String::new()).unwrap();
        // -0 == +0, NaN != NaN
        assert_eq!(by_value.mismatch_count(), 1);
        assert_eq!(by_value.mismatches[0].index, 1);
    }

    #[test]
    fn any_zero_policy_only_relaxes_the_zero_sign() {
        let cmp = Comparator::new(EqualityPolicy::BitPatternAnyZero);
        let device = [-0.0f32, 0.0, f32::from_bits(0x7fc0_0001), 1.0];
        let reference = [0.0f32, -0.0, f32::from_bits(0x7fc0_0002), f32::from_bits(0x3f80_0001)];
        let report = cmp.compare("k", &device, &reference, |_| String::new()).unwrap();
        assert_eq!(report.mismatch_count(), 2);
        assert_eq!(report.mismatches[0].index, 2);
        assert_eq!(report.mismatches[1].index, 3);

        let nan = f32::from_bits(0x7fc0_0001);
        let same = cmp.compare("k", &[nan], &[nan], |_| String::new()).unwrap();
        assert!(same.is_clean());
    }

    #[test]
    fn padding_lane_is_ignored() {
        let cmp = Comparator::new(EqualityPolicy::Value).with_group(4, 3);
        let device = [1.0f32, 2.0, 3.0, 99.0, 1.0, 2.0, 3.0, 0.0];
        let reference = [1.0f32, 2.0, 3.0, 0.0, 1.0, 2.5, 3.0, 0.0];
        let report = cmp.compare("k", &device, &reference, |_| String::new()).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.mismatch_count(), 1);
        assert_eq!(report.mismatches[0].device, "(1, 2, 3)");
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let cmp = Comparator::new(EqualityPolicy::Value);
        let err = cmp.compare("k", &[1u8, 2], &[1u8], |_| String::new()).unwrap_err();
        assert!(matches!(err, HarnessError::ArgumentMismatch { .. }));
    }

    #[test]
    fn reporter_prints_summary_and_build_log() {
        let mut reporter = Reporter::new(Vec::new());
        let report = ComparisonReport {
            label: "Wrong".into(),
            kernel: "square".into(),
            mismatches: Vec::new(),
            total: 64,
        };
        reporter.report(&report).unwrap();
        reporter
            .fatal(&HarnessError::Build { program: "p".into(), log: "error: boom\n".into() })
            .unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.starts_with("Wrong: 0/64\n"));
        assert!(text.contains("BUILD FAIL\nerror: boom\nLOG DONE\n"));
    }
}

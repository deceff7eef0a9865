//! Inline eligibility: when a constant-length comparison is cheaper as
//! straight-line vector code than as a kernel call.

use crate::config::target::{CpuFeature, FeatureSet, TargetConfig, VectorWidth};
use crate::stride::Stride;

/// Element interpretation of the compared regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl ElementKind {
    pub fn is_integral(self) -> bool {
        !matches!(self, ElementKind::Float | ElementKind::Double)
    }
}

/// Decides whether the backend can synthesize a fixed-length comparison
/// instead of calling a kernel. Only the selector consults this.
pub trait InlineEligibility {
    #[allow(clippy::too_many_arguments)]
    fn can_inline_constant_length(
        &self,
        target: &TargetConfig,
        features: FeatureSet,
        kind: ElementKind,
        stride_a: Stride,
        stride_b: Stride,
        length: u32,
        max_width: VectorWidth,
    ) -> bool;
}

/// The x86-64 rule.
///
/// Loads of both operands are widened to the larger stride, so the span
/// that matters is `length * max(stride_a, stride_b)` bytes. Up to two
/// vectors (overlapping when the span is not a multiple of the width)
/// cover it without a loop. Widening a narrower operand needs the
/// SSE4.1 `pmovzx` family.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantLengthCompare;

impl ConstantLengthCompare {
    /// Vectors per operand an unrolled comparison may use.
    pub const MAX_VECTORS: u32 = 2;
}

impl InlineEligibility for ConstantLengthCompare {
    fn can_inline_constant_length(
        &self,
        target: &TargetConfig,
        features: FeatureSet,
        kind: ElementKind,
        stride_a: Stride,
        stride_b: Stride,
        length: u32,
        max_width: VectorWidth,
    ) -> bool {
        if !kind.is_integral() {
            return false;
        }
        if length == 0 {
            return true;
        }
        if stride_a != stride_b && !target.features.union(features).contains(CpuFeature::Sse4_1) {
            log::trace!(
                "mixed strides {}/{} need sse4.1, not available on {}",
                stride_a,
                stride_b,
                target.name
            );
            return false;
        }
        let element = stride_a.max(stride_b).bytes() as u64;
        let span = length as u64 * element;
        let budget = (Self::MAX_VECTORS * max_width.bytes()) as u64;
        log::trace!("constant-length span {} bytes, budget {} bytes ({})", span, budget, max_width);
        span <= budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(
        target: &TargetConfig,
        a: Stride,
        b: Stride,
        length: u32,
        width: VectorWidth,
    ) -> bool {
        ConstantLengthCompare.can_inline_constant_length(
            target,
            FeatureSet::EMPTY,
            ElementKind::Byte,
            a,
            b,
            length,
            width,
        )
    }

    #[test]
    fn test_short_same_stride_inlines() {
        let t = TargetConfig::x86_64();
        assert!(check(&t, Stride::S1, Stride::S1, 16, VectorWidth::Xmm));
        assert!(check(&t, Stride::S1, Stride::S1, 32, VectorWidth::Xmm));
        assert!(!check(&t, Stride::S1, Stride::S1, 33, VectorWidth::Xmm));
    }

    #[test]
    fn test_budget_scales_with_width_and_stride() {
        let t = TargetConfig::x86_64_v4();
        assert!(check(&t, Stride::S1, Stride::S1, 128, VectorWidth::Zmm));
        assert!(!check(&t, Stride::S1, Stride::S1, 129, VectorWidth::Zmm));
        assert!(check(&t, Stride::S4, Stride::S4, 16, VectorWidth::Ymm));
        assert!(!check(&t, Stride::S4, Stride::S4, 17, VectorWidth::Ymm));
        // widened to the larger stride
        assert!(check(&t, Stride::S1, Stride::S2, 32, VectorWidth::Ymm));
        assert!(!check(&t, Stride::S1, Stride::S2, 33, VectorWidth::Ymm));
    }

    #[test]
    fn test_mixed_strides_need_sse41() {
        let baseline = TargetConfig::x86_64();
        assert!(!check(&baseline, Stride::S1, Stride::S2, 4, VectorWidth::Xmm));
        assert!(ConstantLengthCompare.can_inline_constant_length(
            &baseline,
            FeatureSet::of(&[CpuFeature::Sse4_1]),
            ElementKind::Byte,
            Stride::S1,
            Stride::S2,
            4,
            VectorWidth::Xmm,
        ));
        assert!(check(&TargetConfig::x86_64_v2(), Stride::S1, Stride::S2, 4, VectorWidth::Xmm));
    }

    #[test]
    fn test_zero_length_always_inlines() {
        assert!(check(&TargetConfig::x86_64(), Stride::S1, Stride::S4, 0, VectorWidth::Xmm));
    }

    #[test]
    fn test_float_kinds_never_inline() {
        for kind in [ElementKind::Float, ElementKind::Double] {
            assert!(!ConstantLengthCompare.can_inline_constant_length(
                &TargetConfig::x86_64_v3(),
                FeatureSet::EMPTY,
                kind,
                Stride::S4,
                Stride::S4,
                1,
                VectorWidth::Ymm,
            ));
        }
        assert!(ElementKind::Char.is_integral());
    }
}

//! Kernel selection for masked region-equality comparisons.
//!
//! One call per comparison node. The answer is either "inline it" or one
//! of the registry kernels; an impossible stride combination or a direct
//! index the registry does not know is a fatal internal error, never a
//! fallback to some other kernel.


use std::fmt;

use crate::config::target::{FeatureSet, TargetConfig, VectorWidth};
use crate::guarantee;
use crate::inline::{ConstantLengthCompare, ElementKind, InlineEligibility};
use crate::kernel::{self, KernelDescriptor};
use crate::stride::{self, DirectSlot, Stride};

/// Number of compared elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Length {
    Constant(u32),
    Dynamic,
}

impl Length {
    pub fn as_constant(self) -> Option<u32> {
        match self {
            Length::Constant(n) => Some(n),
            Length::Dynamic => None,
        }
    }
}

/// Everything the selector reads about one comparison node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComparisonRequest {
    pub stride_a: Stride,
    pub stride_b: Stride,
    /// Present only when a mask region participates.
    pub stride_mask: Option<Stride>,
    pub length: Length,
    /// Slot of the statically known stride pair, or -1 when strides are
    /// only known at run time. Computed upstream by
    /// [`stride::direct_index`].
    pub direct_index: i32,
    /// Features the generated code may assume at run time.
    pub feature_set: FeatureSet,
    pub max_vector_width: VectorWidth,
}

impl ComparisonRequest {
    /// Request for a node on `target`. `dynamic_strides` marks strides
    /// that are only known when the kernel runs.
    pub fn for_target(
        target: &TargetConfig,
        stride_a: Stride,
        stride_b: Stride,
        stride_mask: Option<Stride>,
        length: Length,
        dynamic_strides: bool,
    ) -> Self {
        let direct_index = if dynamic_strides {
            -1
        } else {
            stride::direct_index(Some(stride_a), Some(stride_b))
        };
        Self {
            stride_a,
            stride_b,
            stride_mask,
            length,
            direct_index,
            feature_set: FeatureSet::EMPTY,
            max_vector_width: target.max_vector_width(FeatureSet::EMPTY),
        }
    }

    /// Allow the code to also use features that are checked at run time.
    pub fn with_runtime_features(mut self, target: &TargetConfig, features: FeatureSet) -> Self {
        self.feature_set = features;
        self.max_vector_width = target.max_vector_width(features);
        self
    }
}

/// Outcome of kernel selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// No call: the backend emits a constant-length comparison inline.
    Inline,
    /// Call this kernel.
    Call(&'static KernelDescriptor),
}

impl Selection {
    /// The chosen kernel; `None` means inline.
    pub fn kernel(self) -> Option<&'static KernelDescriptor> {
        match self {
            Selection::Inline => None,
            Selection::Call(k) => Some(k),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Inline => f.write_str("inline"),
            Selection::Call(k) => write!(f, "call {}", k.name),
        }
    }
}

/// Kernel selector bound to a target and an inline-eligibility rule.
pub struct Selector<'t, E = ConstantLengthCompare> {
    target: &'t TargetConfig,
    eligibility: E,
}

impl<'t> Selector<'t> {
    pub fn new(target: &'t TargetConfig) -> Self {
        Self::with_eligibility(target, ConstantLengthCompare)
    }
}

impl<'t, E: InlineEligibility> Selector<'t, E> {
    pub fn with_eligibility(target: &'t TargetConfig, eligibility: E) -> Self {
        Self {
            target,
            eligibility,
        }
    }

    pub fn target(&self) -> &TargetConfig {
        self.target
    }

    /// Pick the kernel for `request`, or `Selection::Inline`.
    ///
    /// Panics through [`guarantee!`] on a direct index outside [-1, 8] or
    /// a stride combination no kernel implements.
    pub fn select(&self, request: &ComparisonRequest) -> Selection {
        let index = request.direct_index;
        // Slots 9-11 are reached by the branches below, never by index.
        guarantee!(
            (-1..DirectSlot::COUNT as i32).contains(&index),
            "invalid direct stub call index {}",
            index
        );
        let registry = kernel::registry();

        if let (Some(slot), Some(length)) =
            (DirectSlot::from_index(index), request.length.as_constant())
        {
            if self.eligibility.can_inline_constant_length(
                self.target,
                request.feature_set,
                ElementKind::Byte,
                slot.stride_a(),
                slot.stride_b(),
                length,
                request.max_vector_width,
            ) {
                log::debug!("region equals {} len {}: inline", slot, length);
                return Selection::Inline;
            }
        }

        let (a, b) = (request.stride_a, request.stride_b);
        let selected = match request.stride_mask {
            Some(m) if m != b => {
                if a == Stride::S1 {
                    guarantee!(
                        b == Stride::S2 && m == Stride::S1,
                        "unsupported strides A={} B={} mask={}",
                        a,
                        b,
                        m
                    );
                    registry.s1_s2_s1()
                } else {
                    guarantee!(
                        a == Stride::S2 && b == Stride::S2 && m == Stride::S1,
                        "unsupported strides A={} B={} mask={}",
                        a,
                        b,
                        m
                    );
                    registry.s2_s2_s1()
                }
            }
            mask => {
                guarantee!(
                    mask.map_or(true, |m| m == b),
                    "unsupported strides A={} B={} mask={:?}",
                    a,
                    b,
                    mask
                );
                match DirectSlot::from_index(index) {
                    Some(slot) => registry.direct(slot),
                    None => registry.dynamic_strides(),
                }
            }
        };

        log::debug!(
            "region equals A={} B={} mask={:?} index {}: {}",
            a,
            b,
            request.stride_mask,
            index,
            selected.name
        );
        Selection::Call(selected)
    }
}

/// Select with the default x86-64 inline rule.
pub fn select(target: &TargetConfig, request: &ComparisonRequest) -> Selection {
    Selector::new(target).select(request)
}

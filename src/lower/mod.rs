//! Lowering: turns region-equality comparisons into x86-64 pseudo-assembly.
//!
//! Each comparison becomes either an inline constant-length compare
//! directive or an argument setup followed by a kernel call. Units are
//! lowered independently; a failed guarantee aborts only its own unit.


use std::fmt;

use rayon::prelude::*;

use crate::config::target::{TargetConfig, VectorWidth};
use crate::diagnostic::{catch_internal_error, Diagnostic};
use crate::kernel::{KernelDescriptor, ValueKind};
use crate::select::{ComparisonRequest, Length, Selection, Selector};
use crate::stride::{self, Stride};

/// System V integer argument registers, in order.
const ARG_REGS: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

/// One lowered comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompareOp {
    /// Straight-line compare of `length` elements using `vectors` loads of
    /// `width` per operand.
    InlineCompare {
        length: u32,
        stride_a: Stride,
        stride_b: Stride,
        stride_mask: Option<Stride>,
        width: VectorWidth,
        vectors: u32,
    },
    /// Out-of-line call. `stride_tag` is set for the dynamic-strides kernel.
    CallKernel {
        kernel: &'static KernelDescriptor,
        length: Length,
        masked: bool,
        stride_tag: Option<i32>,
    },
}

impl CompareOp {
    /// Lower one request with the given selector.
    pub fn from_request<E: crate::inline::InlineEligibility>(
        selector: &Selector<'_, E>,
        request: &ComparisonRequest,
    ) -> Self {
        match selector.select(request) {
            Selection::Inline => {
                // Inline is only chosen for constant lengths.
                let length = request.length.as_constant().unwrap_or(0);
                let element = request.stride_a.max(request.stride_b).bytes() as u64;
                let width = request.max_vector_width;
                let span = length as u64 * element;
                CompareOp::InlineCompare {
                    length,
                    stride_a: request.stride_a,
                    stride_b: request.stride_b,
                    stride_mask: request.stride_mask,
                    width,
                    vectors: span.div_ceil(width.bytes() as u64) as u32,
                }
            }
            Selection::Call(kernel) => CompareOp::CallKernel {
                kernel,
                length: request.length,
                masked: request.stride_mask.is_some(),
                stride_tag: kernel
                    .signature
                    .takes_stride_tag()
                    .then(|| stride::encode_dynamic_strides(request.stride_a, request.stride_b)),
            },
        }
    }

    /// Assembly lines for this op.
    pub fn emit(&self) -> Vec<String> {
        match self {
            CompareOp::InlineCompare {
                length,
                stride_a,
                stride_b,
                stride_mask,
                width,
                vectors,
            } => {
                let mask = stride_mask.map_or_else(|| "none".to_string(), |m| m.to_string());
                vec![format!(
                    "region_equals.inline len={} a={} b={} mask={} width={} vectors={}",
                    length, stride_a, stride_b, mask, width, vectors
                )]
            }
            CompareOp::CallKernel {
                kernel,
                length,
                masked,
                stride_tag,
            } => {
                let mut lines = Vec::new();
                let mut stack_args = Vec::new();
                let operands = call_operands(kernel, *length, *masked, *stride_tag);
                for (i, operand) in operands.into_iter().enumerate() {
                    match ARG_REGS.get(i) {
                        Some(reg) if operand == "0" => {
                            lines.push(format!("xor {}, {}", reg, reg))
                        }
                        Some(reg) => lines.push(format!("mov {}, {}", reg, operand)),
                        None => stack_args.push(operand),
                    }
                }
                for operand in stack_args.iter().rev() {
                    lines.push(format!("push {}", operand));
                }
                lines.push(format!("call {}", kernel.name));
                if !stack_args.is_empty() {
                    lines.push(format!("add rsp, {}", stack_args.len() * 8));
                }
                lines
            }
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.emit().join("\n"))
    }
}

/// Operand text for each parameter of `kernel`, in signature order.
fn call_operands(
    kernel: &KernelDescriptor,
    length: Length,
    masked: bool,
    stride_tag: Option<i32>,
) -> Vec<String> {
    let mut objects = ["a.base", "b.base"].into_iter();
    let mut offsets = ["a.offset", "b.offset"].into_iter();
    let mut ints = [
        Some(match length {
            Length::Constant(n) => n.to_string(),
            Length::Dynamic => "len".to_string(),
        }),
        stride_tag.map(|t| t.to_string()),
    ]
    .into_iter()
    .flatten();

    kernel
        .signature
        .params
        .iter()
        .map(|param| match param {
            ValueKind::Object => objects.next().unwrap_or("?").to_string(),
            ValueKind::Long => offsets.next().unwrap_or("?").to_string(),
            ValueKind::Pointer if masked => "mask".to_string(),
            ValueKind::Pointer => "0".to_string(),
            ValueKind::Int => ints.next().unwrap_or_else(|| "?".to_string()),
            ValueKind::Bool => "?".to_string(),
        })
        .collect()
}

/// Lowers region-equality comparisons into target assembly lines.
pub trait RegionEqualsLowering {
    /// The target name (e.g. "x86-64-v3").
    fn target_name(&self) -> &str;

    /// Lower one comparison. Panics through `guarantee!` on combinations
    /// no kernel implements.
    fn lower(&self, request: &ComparisonRequest) -> Vec<String>;
}

/// x86-64 lowering with the default inline rule.
pub struct Amd64RegionEqualsLowering {
    target: TargetConfig,
}

impl Amd64RegionEqualsLowering {
    pub fn new(target: TargetConfig) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }
}

impl RegionEqualsLowering for Amd64RegionEqualsLowering {
    fn target_name(&self) -> &str {
        &self.target.name
    }

    fn lower(&self, request: &ComparisonRequest) -> Vec<String> {
        let selector = Selector::new(&self.target);
        CompareOp::from_request(&selector, request).emit()
    }
}

// ─── Compilation units ────────────────────────────────────────────

/// A method being compiled: the region comparisons it contains.
#[derive(Clone, Debug)]
pub struct CompilationUnit {
    pub name: String,
    pub comparisons: Vec<ComparisonRequest>,
}

impl CompilationUnit {
    pub fn new(name: impl Into<String>, comparisons: Vec<ComparisonRequest>) -> Self {
        Self {
            name: name.into(),
            comparisons,
        }
    }
}

/// Lower every comparison of `unit`. A failed guarantee abandons the
/// whole unit and is reported as a diagnostic.
pub fn lower_unit(
    lowering: &(impl RegionEqualsLowering + ?Sized),
    unit: &CompilationUnit,
) -> Result<Vec<String>, Diagnostic> {
    catch_internal_error(&unit.name, || {
        let mut lines = vec![format!("{}:", unit.name)];
        for (i, request) in unit.comparisons.iter().enumerate() {
            lines.push(format!("; region equals #{}", i));
            lines.extend(lowering.lower(request));
        }
        lines
    })
}

/// Lower units in parallel. Results come back in input order.
pub fn lower_units(
    lowering: &(impl RegionEqualsLowering + Sync + ?Sized),
    units: &[CompilationUnit],
) -> Vec<Result<Vec<String>, Diagnostic>> {
    crate::kernel::init();
    units.par_iter().map(|unit| lower_unit(lowering, unit)).collect()
}

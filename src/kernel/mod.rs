//! Kernel registry: the twelve precompiled region-equality kernels.
//!
//! Slot layout:
//!   0-8   one kernel per `DirectSlot`, mask stride equal to stride B
//!   9     dynamic strides, passed as a runtime tag
//!   10    stride A = 1, stride B = 2, mask stride = 1
//!   11    stride A = 2, stride B = 2, mask stride = 1
//!
//! Slots 0-8 are addressed by direct index, so their order is shared with
//! `stride::direct_index`. Slots 9-11 are reached through their own
//! accessors only.

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::OnceLock;

use crate::stride::DirectSlot;

// ─── Signatures ───────────────────────────────────────────────────

/// Machine-level parameter and return kinds of a kernel call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// Boolean result.
    Bool,
    /// 32-bit integer (element count, stride tag).
    Int,
    /// 64-bit integer (byte offset into an object).
    Long,
    /// Managed object reference (array base).
    Object,
    /// Raw pointer (mask region).
    Pointer,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "i32",
            ValueKind::Long => "i64",
            ValueKind::Object => "object",
            ValueKind::Pointer => "ptr",
        };
        f.write_str(name)
    }
}

/// Fixed call signature of a kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelSignature {
    pub result: ValueKind,
    pub params: &'static [ValueKind],
}

/// `(arrayA, offsetA, arrayB, offsetB, mask, length)`
const REGION_PARAMS: &[ValueKind] = &[
    ValueKind::Object,
    ValueKind::Long,
    ValueKind::Object,
    ValueKind::Long,
    ValueKind::Pointer,
    ValueKind::Int,
];

/// `(arrayA, offsetA, arrayB, offsetB, mask, length, dynamicStrides)`
const DYNAMIC_REGION_PARAMS: &[ValueKind] = &[
    ValueKind::Object,
    ValueKind::Long,
    ValueKind::Object,
    ValueKind::Long,
    ValueKind::Pointer,
    ValueKind::Int,
    ValueKind::Int,
];

impl KernelSignature {
    pub const fn region_equals() -> Self {
        Self {
            result: ValueKind::Bool,
            params: REGION_PARAMS,
        }
    }

    pub const fn region_equals_dynamic() -> Self {
        Self {
            result: ValueKind::Bool,
            params: DYNAMIC_REGION_PARAMS,
        }
    }

    /// Whether the last parameter carries the runtime stride tag.
    pub fn takes_stride_tag(&self) -> bool {
        self.params.len() == DYNAMIC_REGION_PARAMS.len()
    }
}

impl fmt::Display for KernelSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        write!(f, "({}) -> {}", params.join(", "), self.result)
    }
}

// ─── Descriptors ──────────────────────────────────────────────────

/// Side-effect class of a kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purity {
    /// No observable side effects; the result depends only on the memory
    /// contents and bounds passed in. Calls with identical arguments may
    /// be merged or reordered.
    Pure,
    /// Must be emitted exactly where and as often as written.
    SideEffecting,
}

/// A named out-of-line kernel the code generator can call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelDescriptor {
    /// Linker symbol.
    pub name: &'static str,
    pub signature: KernelSignature,
    pub purity: Purity,
}

impl KernelDescriptor {
    const fn pure(name: &'static str, signature: KernelSignature) -> Self {
        Self {
            name,
            signature,
            purity: Purity::Pure,
        }
    }

    #[inline]
    pub fn is_pure(&self) -> bool {
        self.purity == Purity::Pure
    }
}

impl fmt::Display for KernelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.signature)
    }
}

// ─── Registry ─────────────────────────────────────────────────────

/// Slot of the dynamic-strides kernel.
pub const DYNAMIC_STRIDES_SLOT: usize = DirectSlot::COUNT;
/// Slot of the (1, 2, mask 1) kernel.
pub const S1_S2_S1_SLOT: usize = DirectSlot::COUNT + 1;
/// Slot of the (2, 2, mask 1) kernel.
pub const S2_S2_S1_SLOT: usize = DirectSlot::COUNT + 2;
/// Total number of kernels.
pub const KERNEL_COUNT: usize = DirectSlot::COUNT + 3;

/// The immutable kernel table.
#[derive(Debug)]
pub struct KernelRegistry {
    kernels: [KernelDescriptor; KERNEL_COUNT],
}

fn direct_kernel_name(slot: DirectSlot) -> &'static str {
    match slot {
        DirectSlot::S1S1 => "arrayRegionEqualsS1S1",
        DirectSlot::S1S2 => "arrayRegionEqualsS1S2",
        DirectSlot::S1S4 => "arrayRegionEqualsS1S4",
        DirectSlot::S2S1 => "arrayRegionEqualsS2S1",
        DirectSlot::S2S2 => "arrayRegionEqualsS2S2",
        DirectSlot::S2S4 => "arrayRegionEqualsS2S4",
        DirectSlot::S4S1 => "arrayRegionEqualsS4S1",
        DirectSlot::S4S2 => "arrayRegionEqualsS4S2",
        DirectSlot::S4S4 => "arrayRegionEqualsS4S4",
    }
}

impl KernelRegistry {
    fn build() -> Self {
        let kernels = std::array::from_fn(|slot| match DirectSlot::ALL.get(slot) {
            Some(direct) => {
                KernelDescriptor::pure(direct_kernel_name(*direct), KernelSignature::region_equals())
            }
            None => match slot {
                DYNAMIC_STRIDES_SLOT => KernelDescriptor::pure(
                    "arrayRegionEqualsDynamicStrides",
                    KernelSignature::region_equals_dynamic(),
                ),
                S1_S2_S1_SLOT => KernelDescriptor::pure(
                    "arrayRegionEqualsS1S2S1",
                    KernelSignature::region_equals(),
                ),
                _ => KernelDescriptor::pure(
                    "arrayRegionEqualsS2S2S1",
                    KernelSignature::region_equals(),
                ),
            },
        });
        log::debug!("kernel registry built with {} kernels", KERNEL_COUNT);
        Self { kernels }
    }

    /// Kernel for a statically known stride pair.
    #[inline]
    pub fn direct(&self, slot: DirectSlot) -> &KernelDescriptor {
        &self.kernels[slot.index()]
    }

    /// Kernel taking strides as a runtime tag.
    #[inline]
    pub fn dynamic_strides(&self) -> &KernelDescriptor {
        &self.kernels[DYNAMIC_STRIDES_SLOT]
    }

    /// Stride A = 1, stride B = 2, mask stride = 1.
    #[inline]
    pub fn s1_s2_s1(&self) -> &KernelDescriptor {
        &self.kernels[S1_S2_S1_SLOT]
    }

    /// Stride A = 2, stride B = 2, mask stride = 1.
    #[inline]
    pub fn s2_s2_s1(&self) -> &KernelDescriptor {
        &self.kernels[S2_S2_S1_SLOT]
    }

    pub fn get(&self, slot: usize) -> Option<&KernelDescriptor> {
        self.kernels.get(slot)
    }

    /// Slot of a kernel by symbol name.
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.kernels.iter().position(|k| k.name == name)
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// `(slot, kernel)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &KernelDescriptor)> {
        self.kernels.iter().enumerate()
    }

    /// One line per slot: `slot  symbol(signature)  purity`.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        for (slot, kernel) in self.iter() {
            let purity = if kernel.is_pure() { "pure" } else { "effects" };
            out.push_str(&format!(
                "{:>2}  {:<31}  {}  {}\n",
                slot, kernel.name, kernel.signature, purity
            ));
        }
        out
    }
}

static REGISTRY: OnceLock<KernelRegistry> = OnceLock::new();

/// The process-wide kernel registry, built on first use.
pub fn registry() -> &'static KernelRegistry {
    REGISTRY.get_or_init(KernelRegistry::build)
}

/// Build the registry now, before compiler worker threads start.
pub fn init() {
    let _ = registry();
}

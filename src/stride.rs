//! Stride model: element widths of the compared regions.
//!
//! `DirectSlot` is the one enumeration of statically known
//! (stride A, stride B) pairs. The direct index computed here and the
//! first nine kernel-table slots are both derived from it.

use std::fmt;

use crate::diagnostic::Diagnostic;

/// Bytes per element of a memory region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stride {
    S1,
    S2,
    S4,
}

impl Stride {
    pub const ALL: [Stride; 3] = [Stride::S1, Stride::S2, Stride::S4];

    #[inline]
    pub const fn bytes(self) -> u32 {
        1 << self.log2()
    }

    #[inline]
    pub const fn log2(self) -> u32 {
        match self {
            Stride::S1 => 0,
            Stride::S2 => 1,
            Stride::S4 => 2,
        }
    }

    pub const fn from_log2(log2: u32) -> Option<Stride> {
        match log2 {
            0 => Some(Stride::S1),
            1 => Some(Stride::S2),
            2 => Some(Stride::S4),
            _ => None,
        }
    }

    pub const fn from_bytes(bytes: u32) -> Option<Stride> {
        match bytes {
            1 => Some(Stride::S1),
            2 => Some(Stride::S2),
            4 => Some(Stride::S4),
            _ => None,
        }
    }

    /// Parse a byte width ("1", "2", "4") or a stride name ("S2").
    pub fn parse(s: &str) -> Result<Stride, Diagnostic> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('S')
            .or_else(|| trimmed.strip_prefix('s'))
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .ok()
            .and_then(Stride::from_bytes)
            .ok_or_else(|| {
                Diagnostic::error(format!("invalid stride '{}'", s))
                    .with_help("strides are 1, 2 or 4 bytes".to_string())
            })
    }
}

impl fmt::Display for Stride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.bytes())
    }
}

// ─── Direct slots ─────────────────────────────────────────────────

/// A statically known (stride A, stride B) pair.
///
/// The discriminant is the direct index: `log2(a) * 3 + log2(b)`. This
/// order is a public contract; kernel symbols are resolved against it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DirectSlot {
    S1S1 = 0,
    S1S2 = 1,
    S1S4 = 2,
    S2S1 = 3,
    S2S2 = 4,
    S2S4 = 5,
    S4S1 = 6,
    S4S2 = 7,
    S4S4 = 8,
}

impl DirectSlot {
    pub const COUNT: usize = 9;

    pub const ALL: [DirectSlot; DirectSlot::COUNT] = [
        DirectSlot::S1S1,
        DirectSlot::S1S2,
        DirectSlot::S1S4,
        DirectSlot::S2S1,
        DirectSlot::S2S2,
        DirectSlot::S2S4,
        DirectSlot::S4S1,
        DirectSlot::S4S2,
        DirectSlot::S4S4,
    ];

    pub const fn new(a: Stride, b: Stride) -> DirectSlot {
        DirectSlot::ALL[(a.log2() * 3 + b.log2()) as usize]
    }

    pub const fn from_index(index: i32) -> Option<DirectSlot> {
        if index >= 0 && (index as usize) < DirectSlot::COUNT {
            Some(DirectSlot::ALL[index as usize])
        } else {
            None
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn stride_a(self) -> Stride {
        match Stride::from_log2(self as u32 / 3) {
            Some(s) => s,
            None => unreachable!(),
        }
    }

    pub const fn stride_b(self) -> Stride {
        match Stride::from_log2(self as u32 % 3) {
            Some(s) => s,
            None => unreachable!(),
        }
    }
}

impl fmt::Display for DirectSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.stride_a(), self.stride_b())
    }
}

// Positions, discriminants and stride decompositions must agree.
const _: () = {
    let mut i = 0;
    while i < DirectSlot::COUNT {
        let slot = DirectSlot::ALL[i];
        assert!(slot.index() == i);
        assert!(DirectSlot::new(slot.stride_a(), slot.stride_b()).index() == i);
        i += 1;
    }
};

/// Direct index for a pair of strides, or -1 when either is only known
/// at run time.
pub fn direct_index(a: Option<Stride>, b: Option<Stride>) -> i32 {
    match (a, b) {
        (Some(a), Some(b)) => DirectSlot::new(a, b).index() as i32,
        _ => -1,
    }
}

/// Stride A encoded in a valid direct index.
pub fn constant_stride_a(index: i32) -> Option<Stride> {
    DirectSlot::from_index(index).map(DirectSlot::stride_a)
}

/// Stride B encoded in a valid direct index.
pub fn constant_stride_b(index: i32) -> Option<Stride> {
    DirectSlot::from_index(index).map(DirectSlot::stride_b)
}

/// Runtime tag passed to the dynamic-strides kernel. Same encoding as the
/// direct index, so the kernel can switch on it with one table.
pub fn encode_dynamic_strides(a: Stride, b: Stride) -> i32 {
    DirectSlot::new(a, b).index() as i32
}

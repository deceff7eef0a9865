use std::fmt;

use crate::diagnostic::Diagnostic;

// ─── CPU Features ──────────────────────────────────────────────────

/// x86-64 instruction-set extensions the backend may assume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CpuFeature {
    Sse2,
    Sse3,
    Ssse3,
    Sse4_1,
    Sse4_2,
    Popcnt,
    Avx,
    Avx2,
    Bmi1,
    Bmi2,
    Lzcnt,
    Fma,
    Avx512F,
    Avx512Bw,
    Avx512Vl,
    Avx512Dq,
    Avx512Cd,
}

impl CpuFeature {
    pub const ALL: [CpuFeature; 17] = [
        CpuFeature::Sse2,
        CpuFeature::Sse3,
        CpuFeature::Ssse3,
        CpuFeature::Sse4_1,
        CpuFeature::Sse4_2,
        CpuFeature::Popcnt,
        CpuFeature::Avx,
        CpuFeature::Avx2,
        CpuFeature::Bmi1,
        CpuFeature::Bmi2,
        CpuFeature::Lzcnt,
        CpuFeature::Fma,
        CpuFeature::Avx512F,
        CpuFeature::Avx512Bw,
        CpuFeature::Avx512Vl,
        CpuFeature::Avx512Dq,
        CpuFeature::Avx512Cd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CpuFeature::Sse2 => "sse2",
            CpuFeature::Sse3 => "sse3",
            CpuFeature::Ssse3 => "ssse3",
            CpuFeature::Sse4_1 => "sse4.1",
            CpuFeature::Sse4_2 => "sse4.2",
            CpuFeature::Popcnt => "popcnt",
            CpuFeature::Avx => "avx",
            CpuFeature::Avx2 => "avx2",
            CpuFeature::Bmi1 => "bmi1",
            CpuFeature::Bmi2 => "bmi2",
            CpuFeature::Lzcnt => "lzcnt",
            CpuFeature::Fma => "fma",
            CpuFeature::Avx512F => "avx512f",
            CpuFeature::Avx512Bw => "avx512bw",
            CpuFeature::Avx512Vl => "avx512vl",
            CpuFeature::Avx512Dq => "avx512dq",
            CpuFeature::Avx512Cd => "avx512cd",
        }
    }

    /// Parse a feature name. Case-insensitive; `sse4_1` and `sse4.1` are
    /// the same feature.
    pub fn parse(name: &str) -> Option<CpuFeature> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', ".");
        CpuFeature::ALL
            .into_iter()
            .find(|f| f.name() == normalized)
    }

    #[inline]
    const fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for CpuFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of CPU features, one bit per `CpuFeature`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FeatureSet(u32);

impl FeatureSet {
    pub const EMPTY: FeatureSet = FeatureSet(0);

    pub fn of(features: &[CpuFeature]) -> Self {
        features.iter().fold(Self::EMPTY, |set, f| set.with(*f))
    }

    /// Parse a comma- or whitespace-separated feature list.
    pub fn parse(list: &str) -> Result<Self, Diagnostic> {
        let mut set = Self::EMPTY;
        for name in list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
        {
            let feature = CpuFeature::parse(name).ok_or_else(|| {
                Diagnostic::error(format!("unknown CPU feature '{}'", name))
                    .with_help("features are spelled like sse4.1, avx2, avx512bw".to_string())
            })?;
            set.insert(feature);
        }
        Ok(set)
    }

    #[inline]
    pub const fn contains(self, feature: CpuFeature) -> bool {
        self.0 & feature.bit() != 0
    }

    pub fn insert(&mut self, feature: CpuFeature) {
        self.0 |= feature.bit();
    }

    pub const fn with(self, feature: CpuFeature) -> Self {
        Self(self.0 | feature.bit())
    }

    pub const fn union(self, other: FeatureSet) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = CpuFeature> {
        CpuFeature::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(CpuFeature::name).collect();
        f.write_str(&names.join(","))
    }
}

// ─── Vector Widths ─────────────────────────────────────────────────

/// Vector register class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VectorWidth {
    /// 128-bit SSE registers.
    Xmm,
    /// 256-bit AVX registers.
    Ymm,
    /// 512-bit AVX-512 registers.
    Zmm,
}

impl VectorWidth {
    #[inline]
    pub const fn bytes(self) -> u32 {
        match self {
            VectorWidth::Xmm => 16,
            VectorWidth::Ymm => 32,
            VectorWidth::Zmm => 64,
        }
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// Parse a width given in bits ("256") or by register class ("ymm").
    pub fn parse(s: &str) -> Option<VectorWidth> {
        match s.trim().to_ascii_lowercase().as_str() {
            "128" | "xmm" => Some(VectorWidth::Xmm),
            "256" | "ymm" => Some(VectorWidth::Ymm),
            "512" | "zmm" => Some(VectorWidth::Zmm),
            _ => None,
        }
    }

    /// Widest class the given features make usable.
    pub fn widest_for(features: FeatureSet) -> VectorWidth {
        // 512-bit byte compares need AVX512BW on top of the foundation.
        if features.contains(CpuFeature::Avx512F) && features.contains(CpuFeature::Avx512Bw) {
            VectorWidth::Zmm
        } else if features.contains(CpuFeature::Avx2) {
            VectorWidth::Ymm
        } else {
            VectorWidth::Xmm
        }
    }
}

impl fmt::Display for VectorWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VectorWidth::Xmm => "xmm",
            VectorWidth::Ymm => "ymm",
            VectorWidth::Zmm => "zmm",
        };
        f.write_str(name)
    }
}

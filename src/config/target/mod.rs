use std::path::Path;

use crate::diagnostic::Diagnostic;

mod features;
pub use features::*;

/// Target configuration: what the generated code may assume about the CPU.
///
/// Built-in targets follow the x86-64 micro-architecture levels. Custom
/// targets are TOML files under `targets/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetConfig {
    /// Short identifier used in CLI and file paths (e.g. "x86-64-v3").
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Features every machine running the code is guaranteed to have.
    pub features: FeatureSet,
    /// Upper bound on vector width, whatever the features allow. Some
    /// deployments cap at 256 bits to avoid AVX-512 frequency drops.
    pub max_vector_width: VectorWidth,
}

const X86_64_V1: &[CpuFeature] = &[CpuFeature::Sse2];

const X86_64_V2: &[CpuFeature] = &[
    CpuFeature::Sse2,
    CpuFeature::Sse3,
    CpuFeature::Ssse3,
    CpuFeature::Sse4_1,
    CpuFeature::Sse4_2,
    CpuFeature::Popcnt,
];

const X86_64_V3: &[CpuFeature] = &[
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
];

const X86_64_V4_EXTRA: &[CpuFeature] = &[
    CpuFeature::Avx512F,
    CpuFeature::Avx512Bw,
    CpuFeature::Avx512Vl,
    CpuFeature::Avx512Dq,
    CpuFeature::Avx512Cd,
];

impl TargetConfig {
    pub const BUILTIN: [&'static str; 4] = ["x86-64", "x86-64-v2", "x86-64-v3", "x86-64-v4"];

    /// Baseline x86-64: SSE2 only.
    pub fn x86_64() -> Self {
        Self::builtin("x86-64", "x86-64 baseline", FeatureSet::of(X86_64_V1))
    }

    pub fn x86_64_v2() -> Self {
        Self::builtin("x86-64-v2", "x86-64 level 2", FeatureSet::of(X86_64_V2))
    }

    pub fn x86_64_v3() -> Self {
        Self::builtin("x86-64-v3", "x86-64 level 3", FeatureSet::of(X86_64_V3))
    }

    pub fn x86_64_v4() -> Self {
        let features = FeatureSet::of(X86_64_V3).union(FeatureSet::of(X86_64_V4_EXTRA));
        Self::builtin("x86-64-v4", "x86-64 level 4", features)
    }

    fn builtin(name: &str, display_name: &str, features: FeatureSet) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            features,
            max_vector_width: VectorWidth::Zmm,
        }
    }

    /// Widest vector class usable by code that may also rely on
    /// `runtime_features` (features checked at run time before entering
    /// the code). Capped by `max_vector_width`.
    pub fn max_vector_width(&self, runtime_features: FeatureSet) -> VectorWidth {
        VectorWidth::widest_for(self.features.union(runtime_features)).min(self.max_vector_width)
    }

    /// Load a target configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(format!(
                "cannot read target config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse_toml(&content, path)
    }

    /// Resolve a target by name: built-ins first, then `targets/{name}.toml`
    /// relative to the binary or working directory.
    pub fn resolve(name: &str) -> Result<Self, Diagnostic> {
        // Reject path traversal
        if name.contains('/') || name.contains('\\') || name.contains("..") || name.starts_with('.')
        {
            return Err(Diagnostic::error(format!("invalid target name '{}'", name)));
        }

        match name {
            "x86-64" | "x86_64" => return Ok(Self::x86_64()),
            "x86-64-v2" => return Ok(Self::x86_64_v2()),
            "x86-64-v3" => return Ok(Self::x86_64_v3()),
            "x86-64-v4" => return Ok(Self::x86_64_v4()),
            _ => {}
        }

        let relative = format!("targets/{}.toml", name);

        // 1. Relative to compiler binary
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                for base in dir.ancestors().take(3) {
                    let path = base.join(&relative);
                    if path.exists() {
                        return Self::load(&path);
                    }
                }
            }
        }

        // 2. Current working directory
        let cwd_path = std::path::PathBuf::from(&relative);
        if cwd_path.exists() {
            return Self::load(&cwd_path);
        }

        Err(
            Diagnostic::error(format!("unknown target '{}' (looked for '{}')", name, relative))
                .with_help(format!(
                    "available targets: {}",
                    Self::BUILTIN.join(", ")
                )),
        )
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self, Diagnostic> {
        let err = |msg: String| Diagnostic::error(format!("{}: {}", path.display(), msg));

        let mut name = String::new();
        let mut display_name = String::new();
        let mut base: Option<TargetConfig> = None;
        let mut extra = FeatureSet::EMPTY;
        let mut max_width: Option<VectorWidth> = None;

        let mut section = String::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            if let Some((key, value)) = trimmed.split_once('=') {
                let key = key.trim();
                let value = value.trim();
                let unquoted = value.trim_matches('"');

                match (section.as_str(), key) {
                    ("target", "name") => name = unquoted.to_string(),
                    ("target", "display_name") => display_name = unquoted.to_string(),
                    ("target", "base") => {
                        let resolved = match unquoted {
                            "x86-64" | "x86_64" => Self::x86_64(),
                            "x86-64-v2" => Self::x86_64_v2(),
                            "x86-64-v3" => Self::x86_64_v3(),
                            "x86-64-v4" => Self::x86_64_v4(),
                            other => {
                                return Err(err(format!(
                                    "target.base must be a built-in target, got '{}'",
                                    other
                                )))
                            }
                        };
                        base = Some(resolved);
                    }
                    ("cpu", "features") => {
                        for feature in parse_string_array(value) {
                            let f = CpuFeature::parse(&feature).ok_or_else(|| {
                                err(format!("unknown CPU feature '{}'", feature))
                            })?;
                            extra.insert(f);
                        }
                    }
                    ("vector", "max_width") => {
                        max_width = Some(VectorWidth::parse(unquoted).ok_or_else(|| {
                            err(format!(
                                "invalid vector.max_width: {} (expected 128, 256 or 512)",
                                value
                            ))
                        })?);
                    }
                    _ => {}
                }
            }
        }

        if name.is_empty() {
            return Err(err("missing target.name".to_string()));
        }

        let base_features = base.as_ref().map_or(FeatureSet::EMPTY, |b| b.features);
        let features = base_features.union(extra);
        // Every x86-64 machine has SSE2; a config without it is a typo.
        if !features.contains(CpuFeature::Sse2) {
            return Err(err(
                "cpu.features must include sse2 (or set target.base)".to_string(),
            ));
        }

        Ok(Self {
            display_name: if display_name.is_empty() {
                name.clone()
            } else {
                display_name
            },
            name,
            features,
            max_vector_width: max_width.unwrap_or(VectorWidth::Zmm),
        })
    }
}

/// Parse a TOML string array: `["a", "b"]`.
fn parse_string_array(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

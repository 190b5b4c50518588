//! Compression levels and their size estimates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Floor for the estimated size of any compressed file. Rendering a file
/// below this size is not worth a call; estimates never go under it.
pub const MIN_COMPRESSED_TOKENS: usize = 100;

/// Content-fidelity tiers, ordered from least to most aggressive.
///
/// Each level carries a nominal retain fraction: the share of the original
/// tokens expected to survive rendering at that level. The order is used
/// for tie-breaks and step-wise escalation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// File content preserved unchanged
    #[default]
    None,
    /// Remove imports, whitespace, commented-out code (~5%)
    Trim,
    /// Also drop redundant comments and most docstrings (~15%)
    Light,
    /// Replace simple function bodies with descriptions (~50%)
    Medium,
    /// Skeleton only: signatures plus short descriptions (~90%)
    Heavy,
    /// One-to-three sentence summary of the whole file
    Max,
}

impl CompressionLevel {
    /// All levels, least aggressive first
    pub const ALL: [CompressionLevel; 6] = [
        CompressionLevel::None,
        CompressionLevel::Trim,
        CompressionLevel::Light,
        CompressionLevel::Medium,
        CompressionLevel::Heavy,
        CompressionLevel::Max,
    ];

    /// Nominal fraction of the original tokens expected to remain
    pub fn retain_fraction(&self) -> f64 {
        match self {
            CompressionLevel::None => 1.0,
            CompressionLevel::Trim => 0.95,
            CompressionLevel::Light => 0.85,
            CompressionLevel::Medium => 0.50,
            CompressionLevel::Heavy => 0.10,
            CompressionLevel::Max => 0.0,
        }
    }

    /// Estimate the rendered token count for a file of `baseline` tokens.
    ///
    /// Compressed output is assumed to bottom out at
    /// [`MIN_COMPRESSED_TOKENS`], and an estimate never exceeds the
    /// baseline: compression cannot grow a file.
    pub fn estimate(&self, baseline: usize) -> usize {
        match self {
            CompressionLevel::None => baseline,
            CompressionLevel::Max => baseline.min(MIN_COMPRESSED_TOKENS),
            _ => {
                let calculated = (baseline as f64 * self.retain_fraction()) as usize;
                calculated.max(MIN_COMPRESSED_TOKENS).min(baseline)
            }
        }
    }

    /// One step more aggressive, or `None` when already at [`Max`](Self::Max)
    pub fn escalate(&self) -> Option<CompressionLevel> {
        match self {
            CompressionLevel::None => Some(CompressionLevel::Trim),
            CompressionLevel::Trim => Some(CompressionLevel::Light),
            CompressionLevel::Light => Some(CompressionLevel::Medium),
            CompressionLevel::Medium => Some(CompressionLevel::Heavy),
            CompressionLevel::Heavy => Some(CompressionLevel::Max),
            CompressionLevel::Max => None,
        }
    }

    /// Stable lowercase name, also the serialized form
    pub fn name(&self) -> &'static str {
        match self {
            CompressionLevel::None => "none",
            CompressionLevel::Trim => "trim",
            CompressionLevel::Light => "light",
            CompressionLevel::Medium => "medium",
            CompressionLevel::Heavy => "heavy",
            CompressionLevel::Max => "max",
        }
    }

    /// Human-readable description of what the level removes
    pub fn description(&self) -> &'static str {
        match self {
            CompressionLevel::None => "No compression (0%), file unchanged",
            CompressionLevel::Trim => "Trim compression (5%), remove imports and whitespace",
            CompressionLevel::Light => "Light compression (15%), remove redundant comments",
            CompressionLevel::Medium => {
                "Medium compression (50%), replace simple functions with descriptions"
            }
            CompressionLevel::Heavy => "Heavy compression (90%), skeleton only with signatures",
            CompressionLevel::Max => "Maximum compression (100%), one to three sentence summary",
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionLevel {
    type Err = String;

    /// Accepts level names and compression percentages: `none`/`0`,
    /// `trim`/`5`, `light`/`15`, `medium`/`50`, `heavy`/`90`,
    /// `max`/`full`/`100`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(CompressionLevel::None),
            "trim" | "5" => Ok(CompressionLevel::Trim),
            "light" | "15" => Ok(CompressionLevel::Light),
            "medium" | "50" => Ok(CompressionLevel::Medium),
            "heavy" | "90" => Ok(CompressionLevel::Heavy),
            "max" | "full" | "100" => Ok(CompressionLevel::Max),
            other => Err(format!(
                "Invalid compression level: '{}'. Valid options: none/0, trim/5, light/15, medium/50, heavy/90, max/full/100",
                other
            )),
        }
    }
}

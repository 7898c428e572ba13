//! Model selection metadata.
//!
//! `ModelInfo` is derived from a file path and its size only. The file
//! contents are never parsed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Quantization label shown when the file name matches no known token.
pub const UNKNOWN_QUANTIZATION: &str = "Unknown";

/// Known quantization tokens, ordered by specificity so that `Q4_K_M`
/// wins over `Q4`.
const QUANT_TOKENS: &[&str] = &[
    "IQ1_S", "IQ1_M", "IQ2_XXS", "IQ2_XS", "IQ2_S", "IQ2_M", "Q2_K_XL", "Q2_K_L", "Q2_K",
    "IQ3_XXS", "IQ3_XS", "IQ3_M", "Q3_K_XL", "Q3_K_L", "Q3_K_M", "Q3_K_S", "IQ4_XS", "IQ4_NL",
    "Q4_K_XL", "Q4_K_L", "Q4_K_M", "Q4_K_S", "Q4_1", "Q4_0", "MXFP4", "Q5_K_XL", "Q5_K_L",
    "Q5_K_M", "Q5_K_S", "Q5_1", "Q5_0", "Q6_K_XL", "Q6_K_L", "Q6_K", "Q8_K_XL", "Q8_0", "BF16",
    "FP16", "F16", "FP32", "F32",
];

/// Best-effort quantization label for a model file name.
///
/// Matching is case-insensitive. `FP16`/`FP32` are reported as `F16`/`F32`.
#[must_use]
pub fn quantization_label(file_name: &str) -> &'static str {
    let upper = file_name.to_uppercase();
    QUANT_TOKENS
        .iter()
        .find(|token| upper.contains(*token))
        .map_or(UNKNOWN_QUANTIZATION, |token| match *token {
            "FP16" => "F16",
            "FP32" => "F32",
            other => other,
        })
}

/// Metadata for the currently selected model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Absolute path of the model file.
    pub path: PathBuf,
    /// File name component, used for display.
    pub file_name: String,
    /// Size on disk in bytes.
    pub size_bytes: u64,
    /// Quantization label, or [`UNKNOWN_QUANTIZATION`].
    pub quantization: String,
}

impl ModelInfo {
    /// Derive model info from a path and its byte size.
    pub fn from_path(path: impl AsRef<Path>, size_bytes: u64) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let quantization = quantization_label(&file_name).to_string();
        Self {
            path: path.to_path_buf(),
            file_name,
            size_bytes,
            quantization,
        }
    }

    /// Size rendered in GiB with one decimal.
    #[must_use]
    pub fn size_display(&self) -> String {
        format_bytes(self.size_bytes)
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.file_name,
            self.quantization,
            self.size_display()
        )
    }
}

/// Render a byte count as GiB.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let gib = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    format!("{gib:.1} GiB")
}

//! Physical memory status and the model admission rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Used fraction above which pressure is critical.
pub const CRITICAL_USED_FRACTION: f64 = 0.9;

/// Used fraction above which pressure is a warning.
pub const WARNING_USED_FRACTION: f64 = 0.75;

/// A model is admitted only if available memory exceeds this multiple of its
/// size. Covers the mapped weights plus the server's working memory.
pub const ADMISSION_FACTOR: u64 = 2;

/// Coarse memory pressure level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressure {
    Normal,
    Warning,
    Critical,
}

impl MemoryPressure {
    /// Classify a used fraction in `[0, 1]`.
    #[must_use]
    pub fn from_used_fraction(used: f64) -> Self {
        if used > CRITICAL_USED_FRACTION {
            Self::Critical
        } else if used > WARNING_USED_FRACTION {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

impl fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// A snapshot of physical memory with its derived pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatus {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub pressure: MemoryPressure,
}

impl MemoryStatus {
    /// Build a status from raw byte counts.
    ///
    /// `available` is clamped to `total`.
    #[must_use]
    pub fn new(total_bytes: u64, available_bytes: u64) -> Self {
        let available_bytes = available_bytes.min(total_bytes);
        let pressure = MemoryPressure::from_used_fraction(used_fraction(total_bytes, available_bytes));
        Self {
            total_bytes,
            available_bytes,
            pressure,
        }
    }

    /// Fraction of physical memory in use.
    #[must_use]
    pub fn used_fraction(&self) -> f64 {
        used_fraction(self.total_bytes, self.available_bytes)
    }

    /// Whether a model of `size_bytes` may be loaded.
    ///
    /// True only if available memory strictly exceeds
    /// [`ADMISSION_FACTOR`] times the model size.
    #[must_use]
    pub const fn can_fit(&self, size_bytes: u64) -> bool {
        self.available_bytes > size_bytes.saturating_mul(ADMISSION_FACTOR)
    }
}

#[allow(clippy::cast_precision_loss)]
fn used_fraction(total: u64, available: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (total - available) as f64 / total as f64
}

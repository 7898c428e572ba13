//! Memory sampling and admission ports.

use crate::domain::MemoryStatus;

/// Source of physical memory samples.
///
/// Implementations return `None` when a sample cannot be taken; callers keep
/// their last-known value in that case.
pub trait MemorySource: Send + Sync {
    fn sample(&self) -> Option<MemoryStatus>;
}

/// Pre-flight check consulted before a model server is spawned.
pub trait MemoryAdmission: Send + Sync {
    /// Whether a model of `size_bytes` may be loaded right now.
    fn can_load_model(&self, size_bytes: u64) -> bool;

    /// Last known available memory, for error reporting.
    fn available_bytes(&self) -> Option<u64>;
}

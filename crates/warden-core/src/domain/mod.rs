//! Domain types for the server lifecycle.
//!
//! Pure data with no I/O dependencies.

mod memory;
mod model;
mod status;

pub use memory::{
    ADMISSION_FACTOR, CRITICAL_USED_FRACTION, MemoryPressure, MemoryStatus, WARNING_USED_FRACTION,
};
pub use model::{ModelInfo, UNKNOWN_QUANTIZATION, format_bytes, quantization_label};
pub use status::{ExitInfo, Generation, ServerHealth, ServerStatus, StatusTransition};

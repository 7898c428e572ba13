//! Inspect command handler.

use std::path::Path;

use anyhow::Result;
use warden_core::domain::ADMISSION_FACTOR;
use warden_core::ports::{MemoryAdmission, ModelFiles};
use warden_core::{LifecycleError, ModelInfo};

use crate::error::CliError;

/// Print model metadata and the admission verdict for this machine.
pub fn execute(
    model: &Path,
    files: &dyn ModelFiles,
    memory: &dyn MemoryAdmission,
) -> Result<()> {
    let size = files.file_size(model).ok_or_else(|| {
        CliError::from(LifecycleError::ModelNotFound {
            path: model.to_path_buf(),
        })
    })?;
    let info = ModelInfo::from_path(model, size);
    let admitted = memory.can_load_model(size);

    print!("{}", render(&info, admitted, memory.available_bytes()));
    Ok(())
}

fn render(info: &ModelInfo, admitted: bool, available: Option<u64>) -> String {
    let verdict = if admitted {
        "yes".to_string()
    } else {
        format!(
            "no (needs more than {}x the model size, {} available)",
            ADMISSION_FACTOR,
            available.map_or_else(|| "unknown".to_string(), warden_core::domain::format_bytes)
        )
    };
    format!(
        "File:         {}\nPath:         {}\nSize:         {}\nQuantization: {}\nCan load:     {verdict}\n",
        info.file_name,
        info.path.display(),
        info.size_display(),
        info.quantization,
    )
}

//! Model file access port.

use std::path::Path;

/// Minimal view of the filesystem needed before a launch.
///
/// The core only needs to know whether a model exists and how large it is.
/// It never reads the file.
pub trait ModelFiles: Send + Sync {
    /// Size in bytes of the regular file at `path`, or `None` if there is no
    /// such file.
    fn file_size(&self, path: &Path) -> Option<u64>;
}

//! Filesystem-backed [`ModelFiles`].

use std::path::Path;

use warden_core::ports::ModelFiles;

/// Reads model metadata from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsModelFiles;

impl ModelFiles for FsModelFiles {
    fn file_size(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(path)
            .ok()
            .filter(std::fs::Metadata::is_file)
            .map(|meta| meta.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_size_of_regular_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 1234]).unwrap();

        assert_eq!(FsModelFiles.file_size(file.path()), Some(1234));
    }

    #[test]
    fn test_missing_file_and_directory_are_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(FsModelFiles.file_size(dir.path()), None);
        assert_eq!(FsModelFiles.file_size(&dir.path().join("nope.gguf")), None);
    }
}

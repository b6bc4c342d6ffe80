use std::{
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Could not create staged file in {0}: {1}")]
    Create(PathBuf, std::io::Error),
    #[error("Could not write staged file: {0}")]
    Write(std::io::Error),
}

/// An upload written to the scratch directory. Removal belongs to the
/// inner `NamedTempFile`, which deletes the file when this value is
/// dropped, whatever happened in between.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    /// Names the file after the request id, never after the client filename.
    pub fn write(
        scratch_dir: &Path,
        request_id: Uuid,
        image_data: &[u8],
    ) -> Result<Self, StagingError> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-", request_id))
            .suffix(".upload")
            .tempfile_in(scratch_dir)
            .map_err(|e| StagingError::Create(scratch_dir.to_path_buf(), e))?;

        file.write_all(image_data).map_err(StagingError::Write)?;
        file.flush().map_err(StagingError::Write)?;

        tracing::debug!("Staged {} bytes at {}", image_data.len(), file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let request_id = Uuid::new_v4();

        let staged = StagedUpload::write(dir.path(), request_id, b"bytes").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&request_id.to_string()));

        drop(staged);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_same_request_payloads_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();

        let first = StagedUpload::write(dir.path(), Uuid::new_v4(), b"first").unwrap();
        let second = StagedUpload::write(dir.path(), Uuid::new_v4(), b"second").unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read(first.path()).unwrap(), b"first");
        assert_eq!(std::fs::read(second.path()).unwrap(), b"second");
    }

    #[test]
    fn test_missing_scratch_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let result = StagedUpload::write(&missing, Uuid::new_v4(), b"bytes");
        assert!(matches!(result, Err(StagingError::Create(_, _))));
    }
}

//! A file on its way to the storage service, and the advisory rules callers
//! may check it against before uploading.

use bytes::Bytes;
use std::{io, path::Path};
use thiserror::Error;
use tokio::fs;

/// File payload plus the name the client gave it.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping its final path component as the name.
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
            })?;
        let bytes = fs::read(path).await?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercased extension of the original file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadRuleError {
    #[error("file is {size_kb} KB, larger than the {max_kb} KB limit")]
    TooLarge { size_kb: u64, max_kb: u64 },
    #[error("file extension `{0}` is not allowed")]
    ExtensionNotAllowed(String),
    #[error("file `{0}` has no extension")]
    MissingExtension(String),
}

/// Size and extension limits. Nothing in the upload path enforces them.
#[derive(Clone, Debug)]
pub struct UploadRules {
    pub max_size_kb: u64,
    pub allowed_extensions: Vec<String>,
}

impl UploadRules {
    pub fn check(&self, file: &UploadFile) -> Result<(), UploadRuleError> {
        let size_kb = (file.size_bytes() as u64).div_ceil(1024);
        if size_kb > self.max_size_kb {
            return Err(UploadRuleError::TooLarge {
                size_kb,
                max_kb: self.max_size_kb,
            });
        }

        let ext = file
            .extension()
            .ok_or_else(|| UploadRuleError::MissingExtension(file.file_name.clone()))?;
        if !self
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
        {
            return Err(UploadRuleError::ExtensionNotAllowed(ext));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> UploadRules {
        UploadRules {
            max_size_kb: 2,
            allowed_extensions: vec!["pdf".into(), "png".into()],
        }
    }

    #[test]
    fn accepts_small_allowed_file() {
        let file = UploadFile::new("Report.PDF", vec![0u8; 2048]);
        assert_eq!(rules().check(&file), Ok(()));
    }

    #[test]
    fn rejects_oversized_file() {
        let file = UploadFile::new("scan.png", vec![0u8; 2049]);
        assert_eq!(
            rules().check(&file),
            Err(UploadRuleError::TooLarge {
                size_kb: 3,
                max_kb: 2
            })
        );
    }

    #[tokio::test]
    async fn reads_name_and_bytes_from_disk() {
        let path = std::env::temp_dir().join(format!("storage-up-{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"hello").await.unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(file.file_name, path.file_name().unwrap().to_string_lossy());
        assert_eq!(file.bytes.as_ref(), b"hello");
        assert_eq!(file.extension().as_deref(), Some("txt"));
    }

    #[test]
    fn rejects_unlisted_or_missing_extension() {
        let exe = UploadFile::new("setup.exe", vec![1u8; 10]);
        assert_eq!(
            rules().check(&exe),
            Err(UploadRuleError::ExtensionNotAllowed("exe".into()))
        );

        let bare = UploadFile::new("README", vec![1u8; 10]);
        assert_eq!(
            rules().check(&bare),
            Err(UploadRuleError::MissingExtension("README".into()))
        );
    }
}

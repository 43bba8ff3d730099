//! Scoped on-disk query file
//!
//! Callers that receive a query as bytes (an upload) need a path for the
//! extractors. [`QueryUpload`] writes the bytes to a named temporary file that
//! keeps the original extension and is removed when the value is dropped, on
//! success and failure alike.

use std::io::Write;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
pub struct QueryUpload {
    file: NamedTempFile,
}

impl QueryUpload {
    /// Write `bytes` to a temp file ending in `.{extension}`
    pub fn from_bytes(bytes: &[u8], extension: &str) -> std::io::Result<Self> {
        let mut file = Self::create_file(extension)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file })
    }

    fn create_file(extension: &str) -> std::io::Result<NamedTempFile> {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        Builder::new().prefix("mirage-query-").suffix(&suffix).tempfile()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_extension_and_contents() {
        let upload = QueryUpload::from_bytes(b"MThd", ".mid").unwrap();
        assert_eq!(
            upload.path().extension().and_then(|e| e.to_str()),
            Some("mid")
        );
        assert_eq!(std::fs::read(upload.path()).unwrap(), b"MThd");
    }

    #[test]
    fn test_removed_on_drop() {
        let upload = QueryUpload::from_bytes(b"pixels", "png").unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());
        drop(upload);
        assert!(!path.exists());
    }
}

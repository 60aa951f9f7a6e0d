use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// 本機檔案系統；相對路徑以 base_path 為根，絕對路徑原樣使用
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(Path::new(path))
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        tracing::debug!("Reading {}", full_path.display());
        Ok(tokio::fs::read(full_path).await?)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_creates_directories() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("reports"));

        storage
            .write_file("2025/attendance_20251216.zip", b"PK")
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("reports/2025/attendance_20251216.zip")).unwrap();
        assert_eq!(written, b"PK");
    }

    #[tokio::test]
    async fn test_absolute_paths_ignore_base() {
        let dir = tempdir().unwrap();
        let sheet = dir.path().join("export.csv");
        std::fs::write(&sheet, "Full Name\nAlice\n").unwrap();

        let storage = LocalStorage::new("./output");
        let data = storage.read_file(&sheet.to_string_lossy()).await.unwrap();

        assert_eq!(data, b"Full Name\nAlice\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let result = storage.read_file("missing.csv").await;
        assert!(matches!(result, Err(crate::utils::error::OpsError::IoError(_))));
    }
}

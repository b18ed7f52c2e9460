//! Asynchronous file backend for the vault
//!
//! The workspace core reaches the file system only through the `Vault`
//! trait: request/response round-trips that the event loop awaits without
//! blocking. `LocalVault` is the tokio::fs implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// One directory entry as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File or directory name
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Whether this entry is a directory
    pub is_dir: bool,
}

impl FileEntry {
    /// Create an entry
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_dir,
        }
    }
}

/// Asynchronous command interface to the file backend
#[async_trait]
pub trait Vault: Send + Sync {
    /// List a directory: directories first, then files, names ascending
    async fn list(&self, dir: &Path) -> Result<Vec<FileEntry>>;

    /// Read a file as UTF-8 text
    async fn read(&self, path: &Path) -> Result<String>;

    /// Write text to a file, replacing its content
    async fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Create an empty file; errors when the path already exists
    async fn create_file(&self, path: &Path) -> Result<()>;

    /// Create a directory; errors when the path already exists
    async fn create_dir(&self, path: &Path) -> Result<()>;

    /// Rename a file or directory
    async fn rename(&self, old: &Path, new: &Path) -> Result<()>;

    /// Delete a file, or a directory recursively
    async fn delete(&self, path: &Path) -> Result<()>;
}

/// Local file system implementation of the vault backend
#[derive(Debug, Clone, Default)]
pub struct LocalVault;

impl LocalVault {
    /// Create a local vault backend
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Vault for LocalVault {
    async fn list(&self, dir: &Path) -> Result<Vec<FileEntry>> {
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| VaultError::from_io(dir, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| VaultError::from_io(dir, e))?
        {
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            entries.push(FileEntry { name, path, is_dir });
        }

        // Directories first, then names
        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    async fn read(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| VaultError::from_io(path, e).into())
    }

    async fn write(&self, path: &Path, content: &str) -> Result<()> {
        tokio::fs::write(path, content)
            .await
            .map_err(|e| VaultError::from_io(path, e).into())
    }

    async fn create_file(&self, path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| VaultError::from_io(path, e))?
        {
            return Err(VaultError::AlreadyExists(path.to_path_buf()).into());
        }
        tokio::fs::File::create(path)
            .await
            .map_err(|e| VaultError::from_io(path, e))?;
        Ok(())
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| VaultError::from_io(path, e))?
        {
            return Err(VaultError::AlreadyExists(path.to_path_buf()).into());
        }
        tokio::fs::create_dir(path)
            .await
            .map_err(|e| VaultError::from_io(path, e).into())
    }

    async fn rename(&self, old: &Path, new: &Path) -> Result<()> {
        tokio::fs::rename(old, new)
            .await
            .map_err(|e| VaultError::from_io(old, e).into())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| VaultError::from_io(path, e))?;

        if metadata.is_dir() {
            tokio::fs::remove_dir_all(path)
                .await
                .map_err(|e| VaultError::from_io(path, e).into())
        } else {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| VaultError::from_io(path, e).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    async fn seeded_vault() -> TempDir {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("b.md"), "# b").await.unwrap();
        tokio::fs::write(dir.path().join("a.md"), "# a").await.unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_orders_directories_first() {
        let dir = seeded_vault().await;
        let vault = LocalVault::new();

        let entries = vault.list(dir.path()).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["sub", "a.md", "b.md"]);
        assert!(entries[0].is_dir);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let vault = LocalVault::new();

        let err = vault.read(&dir.path().join("ghost.md")).await.unwrap_err();
        assert!(matches!(err, Error::Vault(VaultError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_file_refuses_existing_path() {
        let dir = seeded_vault().await;
        let vault = LocalVault::new();

        let err = vault
            .create_file(&dir.path().join("a.md"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Vault(VaultError::AlreadyExists(_))));

        vault.create_file(&dir.path().join("new.md")).await.unwrap();
        assert!(dir.path().join("new.md").exists());
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let vault = LocalVault::new();
        let path = dir.path().join("note.md");

        vault.write(&path, "hello vault").await.unwrap();
        assert_eq!(vault.read(&path).await.unwrap(), "hello vault");
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let dir = seeded_vault().await;
        let vault = LocalVault::new();

        vault
            .rename(&dir.path().join("a.md"), &dir.path().join("renamed.md"))
            .await
            .unwrap();
        assert!(dir.path().join("renamed.md").exists());

        vault.delete(&dir.path().join("renamed.md")).await.unwrap();
        assert!(!dir.path().join("renamed.md").exists());

        // Recursive directory delete
        tokio::fs::write(dir.path().join("sub/inner.md"), "x")
            .await
            .unwrap();
        vault.delete(&dir.path().join("sub")).await.unwrap();
        assert!(!dir.path().join("sub").exists());
    }
}

//! Vault content search
//!
//! Recursive, case-insensitive content search over markdown and text files
//! with a first-matching-line snippet per hit. Runs on the blocking pool so
//! the walk never stalls the event loop.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, VaultError};

use super::backend::FileEntry;

/// Maximum number of hits returned per query
pub const MAX_RESULTS: usize = 100;

/// File extensions included in content search
const SEARCHABLE_EXTENSIONS: &[&str] = &["md", "txt"];

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// The matching file
    pub entry: FileEntry,
    /// The first matching line, trimmed
    pub snippet: String,
}

/// Search vault content for a query string.
///
/// Empty or whitespace-only queries return no hits. Unreadable entries are
/// skipped rather than failing the whole search.
pub async fn search(root: impl Into<PathBuf>, query: &str) -> Result<Vec<SearchHit>> {
    let root = root.into();
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    tokio::task::spawn_blocking(move || search_blocking(&root, &query))
        .await
        .map_err(|e| VaultError::Backend {
            path: PathBuf::new(),
            source: std::io::Error::other(e),
        })?
}

fn search_blocking(root: &Path, query_lower: &str) -> Result<Vec<SearchHit>> {
    let mut hits = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || !is_searchable(path) {
            continue;
        }

        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        if !content.to_lowercase().contains(query_lower) {
            continue;
        }

        let snippet = content
            .lines()
            .find(|line| line.to_lowercase().contains(query_lower))
            .map(|line| line.trim().to_string())
            .unwrap_or_default();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        hits.push(SearchHit {
            entry: FileEntry::new(name, path.to_path_buf(), false),
            snippet,
        });

        if hits.len() >= MAX_RESULTS {
            break;
        }
    }

    Ok(hits)
}

fn is_searchable(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            SEARCHABLE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

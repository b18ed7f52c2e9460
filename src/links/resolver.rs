//! Cross-reference token resolution
//!
//! Parses `[[Token]]` references out of document content and resolves them
//! against a cached directory listing:
//! - case-insensitive exact name match first
//! - then the name with the default document extension appended
//! - first match in cache order wins (cache order is the order the backend
//!   returned entries; nothing further is guaranteed)

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::vault::FileEntry;

/// Default document extension, without the dot
pub const DEFAULT_EXTENSION: &str = "md";

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]\n]+)\]\]").unwrap());

/// One parsed cross-reference token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    /// The token text between the brackets
    pub token: String,
    /// Byte offset of the opening bracket
    pub start: usize,
    /// Byte offset one past the closing bracket
    pub end: usize,
}

/// Parse every cross-reference token in a document
pub fn parse_links(content: &str) -> Vec<WikiLink> {
    WIKI_LINK
        .captures_iter(content)
        .map(|caps| {
            let whole = caps.get(0).expect("capture 0 always present");
            WikiLink {
                token: caps[1].trim().to_string(),
                start: whole.start(),
                end: whole.end(),
            }
        })
        .collect()
}

/// Resolves cross-reference tokens against a cached directory listing
#[derive(Debug, Default)]
pub struct LinkResolver {
    /// Cached listing, in backend order
    entries: Vec<FileEntry>,
    /// Parse results for the last-seen content, keyed by content hash
    parse_cache: Option<(u64, Vec<WikiLink>)>,
}

impl LinkResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached listing
    pub fn update_cache(&mut self, entries: Vec<FileEntry>) {
        debug!("link cache refreshed: {} entries", entries.len());
        self.entries = entries;
    }

    /// The cached listing
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Parse the links in a document, reusing the previous result when the
    /// content is unchanged.
    pub fn links_in(&mut self, content: &str) -> &[WikiLink] {
        let hash = xxh3_64(content.as_bytes());
        let fresh = match &self.parse_cache {
            Some((cached_hash, _)) => *cached_hash != hash,
            None => true,
        };
        if fresh {
            self.parse_cache = Some((hash, parse_links(content)));
        }
        &self
            .parse_cache
            .as_ref()
            .expect("parse cache populated above")
            .1
    }

    /// Resolve a token to a cached file entry.
    ///
    /// Exact name first, then name + default extension, both
    /// case-insensitive; first match in cache order. Directories never
    /// match.
    pub fn resolve(&self, token: &str) -> Option<&FileEntry> {
        let token_lower = token.trim().to_lowercase();
        let with_extension = format!("{}.{}", token_lower, DEFAULT_EXTENSION);

        self.entries
            .iter()
            .find(|e| !e.is_dir && e.name.to_lowercase() == token_lower)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| !e.is_dir && e.name.to_lowercase() == with_extension)
            })
    }

    /// The file name a missing token would be created under
    pub fn creation_name(token: &str) -> String {
        format!("{}.{}", token.trim(), DEFAULT_EXTENSION)
    }

    /// Autocomplete candidates for an open token prefix.
    ///
    /// Every cached non-directory entry is a candidate, offered with the
    /// default extension stripped. An empty prefix offers everything.
    pub fn completions(&self, prefix: &str) -> Vec<String> {
        let prefix_lower = prefix.trim().to_lowercase();
        let suffix = format!(".{}", DEFAULT_EXTENSION);

        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| {
                e.name
                    .strip_suffix(&suffix)
                    .unwrap_or(&e.name)
                    .to_string()
            })
            .filter(|name| {
                prefix_lower.is_empty() || name.to_lowercase().starts_with(&prefix_lower)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached_resolver(names: &[(&str, bool)]) -> LinkResolver {
        let mut resolver = LinkResolver::new();
        resolver.update_cache(
            names
                .iter()
                .map(|(name, is_dir)| FileEntry::new(*name, format!("vault/{name}"), *is_dir))
                .collect(),
        );
        resolver
    }

    #[test]
    fn test_parse_links() {
        let links = parse_links("See [[Notes]] and [[Daily Log]] for context.");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].token, "Notes");
        assert_eq!(links[1].token, "Daily Log");
        assert_eq!(&"See [[Notes]]"[links[0].start..links[0].end], "[[Notes]]");
    }

    #[test]
    fn test_parse_ignores_unclosed_and_nested_brackets() {
        assert!(parse_links("broken [[token").is_empty());
        assert!(parse_links("empty [[]] stays empty").is_empty());
    }

    #[test]
    fn test_resolve_exact_then_extension() {
        let resolver = cached_resolver(&[("Notes.md", false), ("notes", false)]);

        // Exact (case-insensitive) name wins over name + extension
        let hit = resolver.resolve("NOTES").unwrap();
        assert_eq!(hit.name, "notes");

        let hit = resolver.resolve("Notes.md").unwrap();
        assert_eq!(hit.name, "Notes.md");
    }

    #[test]
    fn test_resolve_appends_default_extension() {
        let resolver = cached_resolver(&[("Notes.md", false)]);
        let hit = resolver.resolve("notes").unwrap();
        assert_eq!(hit.name, "Notes.md");
    }

    #[test]
    fn test_resolve_first_match_in_cache_order() {
        let resolver = cached_resolver(&[("NOTES.md", false), ("notes.md", false)]);
        let hit = resolver.resolve("Notes").unwrap();
        assert_eq!(hit.name, "NOTES.md");
    }

    #[test]
    fn test_resolve_skips_directories() {
        let resolver = cached_resolver(&[("Notes.md", true), ("Other.md", false)]);
        assert!(resolver.resolve("Notes").is_none());
    }

    #[test]
    fn test_resolve_miss() {
        let resolver = cached_resolver(&[("Other.md", false)]);
        assert!(resolver.resolve("Notes").is_none());
        assert_eq!(LinkResolver::creation_name("Notes"), "Notes.md");
    }

    #[test]
    fn test_completions_strip_extension_and_skip_dirs() {
        let resolver = cached_resolver(&[
            ("Notes.md", false),
            ("Nothing.txt", false),
            ("Notebooks", true),
        ]);

        let all = resolver.completions("");
        assert_eq!(all, vec!["Notes", "Nothing.txt"]);

        let filtered = resolver.completions("note");
        assert_eq!(filtered, vec!["Notes"]);
    }

    #[test]
    fn test_links_in_caches_by_content() {
        let mut resolver = LinkResolver::new();
        let first = resolver.links_in("[[A]]").to_vec();
        assert_eq!(first.len(), 1);

        // Same content: cache hit, same result
        assert_eq!(resolver.links_in("[[A]]").to_vec(), first);

        // Different content: cache refreshed
        let second = resolver.links_in("[[A]] [[B]]").to_vec();
        assert_eq!(second.len(), 2);
    }
}

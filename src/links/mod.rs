//! Cross-reference (wiki-link) module
//!
//! - `parse_links` / `WikiLink` - `[[Token]]` extraction
//! - `LinkResolver` - cached-listing resolution and autocomplete

mod resolver;

pub use resolver::*;

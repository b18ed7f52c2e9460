//! Rendering boundary module
//!
//! - `render_document` / `render_markdown` - content to styled text
//! - `RenderCache` - per-tab render memoization

mod markdown;

pub use markdown::*;

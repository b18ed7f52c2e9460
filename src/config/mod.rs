//! Configuration and persistence module
//!
//! Handles:
//! - User configuration (`config.toml`, env overrides)
//! - Persistent state (`state.json`: vault, snapshot, geometry, zoom)
//! - Debounced state writes

mod debounce;
mod settings;
mod storage;

pub use debounce::*;
pub use settings::*;
pub use storage::*;

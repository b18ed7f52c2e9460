//! Terminal multiplexer module
//!
//! - `TerminalMultiplexer` - session arena with one-Active addressing
//! - `ProcessHost` / `PtyHost` - the pseudo-terminal process boundary
//! - `TermEvent` / `TermSize` - host event stream and geometry

mod host;
mod mux;

pub use host::*;
pub use mux::*;

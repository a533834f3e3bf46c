//! Core console components.
//!
//! - **palette**: logical color ids and their resolution per color model
//! - **session**: the reference-counted terminal session handle
//!
//! # Architecture
//!
//! ```text
//! TerminalSession (Rc handle, clone per owner)
//! └── SessionCore (dropped with the last handle)
//!     ├── Backend (raw mode, output, raw key bytes)
//!     └── ColorPalette (256 ColorSpec slots)
//! ```

pub mod palette;
pub mod session;

pub use palette::{BaseColor, ColorModel, ColorPalette, ColorSpec};
pub use session::TerminalSession;

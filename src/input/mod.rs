//! Keyboard input.
//!
//! - **keys**: raw byte decoding into [`KeyCode`]s, plus the blocking,
//!   polling and draining reads built on it
//! - **line**: line editing with backspace handling on top of echoed keys
//!
//! # Input Pipeline
//!
//! ```text
//! Backend::read_raw_key ──> KeyDecoder ──> LineEditor
//!   (bytes, 0xE0 leads)      (KeyCode)      (String)
//! ```

pub mod keys;
pub mod line;

pub use keys::{KeyCode, KeyDecoder};
pub use line::LineEditor;

//! xconsole - a cross-platform console controller
//!
//! Colored text, cursor positioning and raw keyboard input that behave the
//! same on Windows consoles and POSIX terminals.
//!
//! # Features
//!
//! - **Sessions**: reference-counted raw-mode handle, restored when the last
//!   handle drops (including during a panic)
//! - **Colors**: logical color ids mapped to console attributes or color pairs
//! - **Keys**: polling and blocking reads with arrow keys decoded
//! - **Line input**: echoed line editing with backspace across row wraps
//! - **Pacing**: a drift-correcting frame throttle
//!
//! # Quick Start
//!
//! ```no_run
//! use xconsole::{BaseColor, ColorModel, ColorSpec, CrosstermBackend, TerminalSession};
//!
//! # fn main() -> xconsole::Result<()> {
//! let session = TerminalSession::open(CrosstermBackend::new(), ColorModel::native())?;
//! session.register_color(1, ColorSpec::new(BaseColor::Yellow, BaseColor::Blue).bold_foreground());
//! session.activate(1)?;
//! session.write("What is your name? ")?;
//! let name = session.line_editor().read_line_default()?;
//! session.write(&format!("Hello, {name}!\n"))?;
//! session.keys().pause()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod timing;

pub use backend::{Backend, Coord, CrosstermBackend, VirtualTerminal};
pub use crate::core::{BaseColor, ColorModel, ColorPalette, ColorSpec, TerminalSession};
pub use error::{Error, Result};
pub use input::{KeyCode, KeyDecoder, LineEditor};
pub use timing::FrameThrottle;

//! Terminal backends.
//!
//! Everything above this module talks to the terminal through the
//! [`Backend`] capability set. There are two implementations:
//!
//! - **device**: the live terminal device (Windows console and POSIX ttys)
//! - **virtual_term**: an in-memory terminal emulation that records cells,
//!   applied attributes and lifecycle calls, used for headless runs and tests
//!
//! # Architecture
//!
//! ```text
//! TerminalSession
//! ├── ColorPalette ── resolves ──> Attributes
//! └── Backend
//!     ├── CrosstermBackend (stdout + crossterm events)
//!     └── VirtualTerminal  (cell grid + KeyFeed channel)
//! ```

pub mod device;
pub mod virtual_term;

use std::time::Duration;

use bitflags::bitflags;

use crate::error::Result;

pub use device::CrosstermBackend;
pub use virtual_term::{KeyFeed, VirtualProbe, VirtualTerminal};

/// A 0-based cell coordinate, `x` = column, `y` = row.
///
/// Also used for window sizes, where `x` is the column count and `y` the row
/// count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: u16,
    pub y: u16,
}

impl Coord {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

impl From<(u16, u16)> for Coord {
    fn from((x, y): (u16, u16)) -> Self {
        Self { x, y }
    }
}

/// Scan codes of the extended-key byte stream returned by
/// [`Backend::read_raw_key`].
///
/// An extended key is a lead byte followed by one scan code. Arrows have two
/// accepted codes each: the console keypad code and the ANSI final byte.
pub mod scan {
    pub const LEAD_NULL: u8 = 0x00;
    pub const LEAD_EXTENDED: u8 = 0xE0;

    pub const UP: u8 = 0x48;
    pub const DOWN: u8 = 0x50;
    pub const LEFT: u8 = 0x4B;
    pub const RIGHT: u8 = 0x4D;

    pub const UP_ANSI: u8 = 0x41;
    pub const DOWN_ANSI: u8 = 0x42;
    pub const RIGHT_ANSI: u8 = 0x43;
    pub const LEFT_ANSI: u8 = 0x44;

    pub const HOME: u8 = 0x47;
    pub const PAGE_UP: u8 = 0x49;
    pub const END: u8 = 0x4F;
    pub const PAGE_DOWN: u8 = 0x51;
    pub const INSERT: u8 = 0x52;
    pub const DELETE: u8 = 0x53;

    /// Whether `byte` introduces a two-byte extended key.
    pub fn is_lead(byte: u8) -> bool {
        byte == LEAD_NULL || byte == LEAD_EXTENDED
    }
}

/// How a raw key read behaves when nothing is pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadMode {
    /// Return `None` immediately.
    Poll,
    /// Block until a byte arrives.
    Wait,
}

bitflags! {
    /// Console text attributes for the base+bold color model.
    ///
    /// Bit layout matches the classic console character attribute word:
    /// three primaries plus an intensity bit, once for the foreground and
    /// once for the background.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ConsoleAttr: u16 {
        const FOREGROUND_BLUE      = 0x0001;
        const FOREGROUND_GREEN     = 0x0002;
        const FOREGROUND_RED       = 0x0004;
        const FOREGROUND_INTENSITY = 0x0008;
        const BACKGROUND_BLUE      = 0x0010;
        const BACKGROUND_GREEN     = 0x0020;
        const BACKGROUND_RED       = 0x0040;
        const BACKGROUND_INTENSITY = 0x0080;
    }
}

impl ConsoleAttr {
    /// Foreground as an index into the 16-entry ANSI table.
    pub fn foreground_index(self) -> u8 {
        Self::ansi_index(
            self.contains(Self::FOREGROUND_RED),
            self.contains(Self::FOREGROUND_GREEN),
            self.contains(Self::FOREGROUND_BLUE),
            self.contains(Self::FOREGROUND_INTENSITY),
        )
    }

    /// Background as an index into the 16-entry ANSI table.
    pub fn background_index(self) -> u8 {
        Self::ansi_index(
            self.contains(Self::BACKGROUND_RED),
            self.contains(Self::BACKGROUND_GREEN),
            self.contains(Self::BACKGROUND_BLUE),
            self.contains(Self::BACKGROUND_INTENSITY),
        )
    }

    fn ansi_index(red: bool, green: bool, blue: bool, intense: bool) -> u8 {
        u8::from(red) | u8::from(green) << 1 | u8::from(blue) << 2 | u8::from(intense) << 3
    }
}

/// A color pair for the palette color model.
///
/// `foreground` and `background` are cells of the 16-entry palette; a bright
/// background lives in the upper bank (`8..16`) and is addressed by a pair id
/// in the parallel bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorPair {
    pub pair: u16,
    pub foreground: u8,
    pub background: u8,
    pub bold: bool,
}

/// Concrete drawing attributes produced by palette resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attributes {
    Console(ConsoleAttr),
    Pair(ColorPair),
}

impl Default for Attributes {
    fn default() -> Self {
        Attributes::Console(ConsoleAttr::empty())
    }
}

/// The capability set every terminal backend provides.
pub trait Backend {
    /// Put the device into raw mode: no line buffering, no echo, special
    /// keys reported, colors enabled.
    fn enter_raw_mode(&mut self) -> Result<()>;

    /// Release raw mode and restore the device.
    fn leave_raw_mode(&mut self) -> Result<()>;

    /// Clear the whole screen and home the cursor.
    fn clear(&mut self) -> Result<()>;

    /// Write literal text at the cursor, advancing it with normal line wrap.
    fn write_text(&mut self, text: &str) -> Result<()>;

    /// Apply attributes to all subsequent output.
    fn set_attributes(&mut self, attrs: Attributes) -> Result<()>;

    /// Read one raw input byte.
    ///
    /// Extended keys arrive as a lead byte (`0x00` or `0xE0`) followed by a
    /// scan code. With [`ReadMode::Poll`], `Ok(None)` means nothing is
    /// pending.
    fn read_raw_key(&mut self, mode: ReadMode) -> Result<Option<u8>>;

    fn cursor_position(&mut self) -> Result<Coord>;

    fn window_size(&mut self) -> Result<Coord>;

    fn move_cursor(&mut self, pos: Coord) -> Result<()>;

    /// Block the calling thread for `duration`.
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_attr_indices() {
        let attr = ConsoleAttr::FOREGROUND_RED | ConsoleAttr::FOREGROUND_GREEN;
        assert_eq!(attr.foreground_index(), 3); // yellow
        assert_eq!(attr.background_index(), 0);

        let attr = ConsoleAttr::BACKGROUND_BLUE | ConsoleAttr::BACKGROUND_INTENSITY;
        assert_eq!(attr.background_index(), 12); // bright blue
    }

    #[test]
    fn test_coord_from_tuple() {
        assert_eq!(Coord::from((3, 7)), Coord::new(3, 7));
    }
}

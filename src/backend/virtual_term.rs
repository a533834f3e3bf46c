//! In-memory terminal emulation
//!
//! `VirtualTerminal` behaves like a small console window: a cell grid with a
//! cursor, line wrap at the right edge, scrolling at the bottom, and a
//! backspace byte that steps the cursor left. Every written cell records the
//! attributes that were active, so color output can be checked without a
//! real device. Input comes from a [`KeyFeed`], which may live on another
//! thread.

use std::cell::{Ref, RefCell};
use std::io;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;

use super::{Attributes, Backend, Coord, ReadMode};
use crate::error::{Error, Result};

/// A single screen cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub attrs: Attributes,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            attrs: Attributes::default(),
        }
    }
}

/// Emulated device state, shared between the backend and its probes
#[derive(Debug)]
struct VirtualState {
    cols: u16,
    rows: u16,
    cells: Vec<Vec<Cell>>,
    cursor: Coord,
    attrs: Attributes,
    raw_mode: bool,
    refuse_raw_mode: bool,
    setups: usize,
    teardowns: usize,
    clears: usize,
    /// Every character written, in order
    transcript: String,
    sleeps: Vec<Duration>,
}

impl VirtualState {
    fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![vec![Cell::default(); cols as usize]; rows as usize],
            cursor: Coord::default(),
            attrs: Attributes::default(),
            raw_mode: false,
            refuse_raw_mode: false,
            setups: 0,
            teardowns: 0,
            clears: 0,
            transcript: String::new(),
            sleeps: Vec::new(),
        }
    }

    fn put_char(&mut self, ch: char) {
        self.transcript.push(ch);
        match ch {
            '\n' => self.line_feed(),
            '\r' => self.cursor.x = 0,
            // Consoles step back on BS without erasing
            '\x08' => self.cursor.x = self.cursor.x.saturating_sub(1),
            _ => {
                let Coord { x, y } = self.cursor;
                self.cells[y as usize][x as usize] = Cell {
                    ch,
                    attrs: self.attrs,
                };
                self.cursor.x += 1;
                // Filling the last column wraps at once, as a console window does
                if self.cursor.x >= self.cols {
                    self.line_feed();
                }
            }
        }
    }

    fn line_feed(&mut self) {
        self.cursor.x = 0;
        if self.cursor.y + 1 < self.rows {
            self.cursor.y += 1;
        } else {
            self.cells.remove(0);
            self.cells.push(vec![Cell::default(); self.cols as usize]);
        }
    }

    fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(Cell::default());
        }
        self.cursor = Coord::default();
        self.clears += 1;
    }
}

/// Emulated terminal backend
pub struct VirtualTerminal {
    state: Rc<RefCell<VirtualState>>,
    input: Receiver<u8>,
}

impl VirtualTerminal {
    /// Create a terminal of `cols` x `rows` cells and the feed that drives
    /// its input.
    pub fn new(cols: u16, rows: u16) -> (Self, KeyFeed) {
        assert!(cols > 0 && rows > 0, "virtual terminal needs at least one cell");
        let (tx, rx) = mpsc::channel();
        let terminal = Self {
            state: Rc::new(RefCell::new(VirtualState::new(cols, rows))),
            input: rx,
        };
        (terminal, KeyFeed { tx })
    }

    /// Make raw-mode setup fail, emulating an unusable device.
    pub fn refuse_raw_mode(self) -> Self {
        self.state.borrow_mut().refuse_raw_mode = true;
        self
    }

    /// A read-only view that stays valid after the backend is dropped.
    pub fn probe(&self) -> VirtualProbe {
        VirtualProbe {
            state: Rc::clone(&self.state),
        }
    }
}

impl Backend for VirtualTerminal {
    fn enter_raw_mode(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.refuse_raw_mode {
            return Err(Error::RawMode(io::Error::new(
                io::ErrorKind::Unsupported,
                "raw mode refused by virtual terminal",
            )));
        }
        state.raw_mode = true;
        state.setups += 1;
        Ok(())
    }

    fn leave_raw_mode(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.raw_mode = false;
        state.teardowns += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.state.borrow_mut().clear();
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        for ch in text.chars() {
            state.put_char(ch);
        }
        Ok(())
    }

    fn set_attributes(&mut self, attrs: Attributes) -> Result<()> {
        self.state.borrow_mut().attrs = attrs;
        Ok(())
    }

    fn read_raw_key(&mut self, mode: ReadMode) -> Result<Option<u8>> {
        match mode {
            ReadMode::Poll => match self.input.try_recv() {
                Ok(byte) => Ok(Some(byte)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
            },
            ReadMode::Wait => self.input.recv().map(Some).map_err(|_| Error::InputClosed),
        }
    }

    fn cursor_position(&mut self) -> Result<Coord> {
        Ok(self.state.borrow().cursor)
    }

    fn window_size(&mut self) -> Result<Coord> {
        let state = self.state.borrow();
        Ok(Coord::new(state.cols, state.rows))
    }

    fn move_cursor(&mut self, pos: Coord) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.cursor = Coord::new(
            pos.x.min(state.cols - 1),
            pos.y.min(state.rows - 1),
        );
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) {
        self.state.borrow_mut().sleeps.push(duration);
    }
}

/// Sending half of a virtual terminal's input
#[derive(Clone, Debug)]
pub struct KeyFeed {
    tx: Sender<u8>,
}

impl KeyFeed {
    pub fn byte(&self, byte: u8) {
        // A dropped terminal has nobody left to read
        let _ = self.tx.send(byte);
    }

    pub fn bytes(&self, bytes: &[u8]) {
        for &byte in bytes {
            self.byte(byte);
        }
    }

    pub fn text(&self, text: &str) {
        self.bytes(text.as_bytes());
    }
}

/// Inspection handle onto a virtual terminal
#[derive(Clone, Debug)]
pub struct VirtualProbe {
    state: Rc<RefCell<VirtualState>>,
}

impl VirtualProbe {
    fn state(&self) -> Ref<'_, VirtualState> {
        self.state.borrow()
    }

    pub fn cursor(&self) -> Coord {
        self.state().cursor
    }

    pub fn cell(&self, x: u16, y: u16) -> Cell {
        self.state().cells[y as usize][x as usize]
    }

    /// Text of row `y` with trailing blanks removed
    pub fn row_text(&self, y: u16) -> String {
        let line: String = self.state().cells[y as usize].iter().map(|c| c.ch).collect();
        line.trim_end().to_string()
    }

    /// Attributes currently applied to new output
    pub fn attributes(&self) -> Attributes {
        self.state().attrs
    }

    pub fn raw_mode(&self) -> bool {
        self.state().raw_mode
    }

    pub fn setups(&self) -> usize {
        self.state().setups
    }

    pub fn teardowns(&self) -> usize {
        self.state().teardowns
    }

    pub fn clears(&self) -> usize {
        self.state().clears
    }

    pub fn transcript(&self) -> String {
        self.state().transcript.clone()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state().sleeps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ConsoleAttr;

    #[test]
    fn test_write_wraps_at_right_edge() {
        let (mut term, _feed) = VirtualTerminal::new(4, 3);
        let probe = term.probe();

        term.write_text("abcdef").unwrap();

        assert_eq!(probe.row_text(0), "abcd");
        assert_eq!(probe.row_text(1), "ef");
        assert_eq!(probe.cursor(), Coord::new(2, 1));
    }

    #[test]
    fn test_scrolls_at_bottom() {
        let (mut term, _feed) = VirtualTerminal::new(6, 2);
        let probe = term.probe();

        term.write_text("one\ntwo\nthree").unwrap();

        assert_eq!(probe.row_text(0), "two");
        assert_eq!(probe.row_text(1), "three");
        assert_eq!(probe.cursor(), Coord::new(5, 1));
    }

    #[test]
    fn test_full_bottom_row_scrolls_immediately() {
        let (mut term, _feed) = VirtualTerminal::new(5, 2);
        let probe = term.probe();

        term.write_text("one\nthree").unwrap();

        assert_eq!(probe.row_text(0), "three");
        assert_eq!(probe.row_text(1), "");
        assert_eq!(probe.cursor(), Coord::new(0, 1));
        assert_eq!(probe.transcript(), "one\nthree");
    }

    #[test]
    fn test_backspace_steps_left_without_erasing() {
        let (mut term, _feed) = VirtualTerminal::new(10, 2);
        let probe = term.probe();

        term.write_text("ab\x08").unwrap();

        assert_eq!(probe.cursor(), Coord::new(1, 0));
        assert_eq!(probe.row_text(0), "ab");

        // Never leaves the row
        term.move_cursor(Coord::new(0, 1)).unwrap();
        term.write_text("\x08").unwrap();
        assert_eq!(probe.cursor(), Coord::new(0, 1));
    }

    #[test]
    fn test_cells_record_attributes() {
        let (mut term, _feed) = VirtualTerminal::new(10, 2);
        let probe = term.probe();
        let red = Attributes::Console(ConsoleAttr::FOREGROUND_RED);

        term.write_text("a").unwrap();
        term.set_attributes(red).unwrap();
        term.write_text("b").unwrap();

        assert_eq!(probe.cell(0, 0).attrs, Attributes::default());
        assert_eq!(probe.cell(1, 0).attrs, red);
    }

    #[test]
    fn test_poll_and_wait_input() {
        let (mut term, feed) = VirtualTerminal::new(10, 2);

        assert_eq!(term.read_raw_key(ReadMode::Poll).unwrap(), None);

        feed.text("x");
        assert_eq!(term.read_raw_key(ReadMode::Wait).unwrap(), Some(b'x'));

        drop(feed);
        assert!(matches!(term.read_raw_key(ReadMode::Wait), Err(Error::InputClosed)));
    }

    #[test]
    fn test_move_cursor_clamps_to_window() {
        let (mut term, _feed) = VirtualTerminal::new(10, 4);
        term.move_cursor(Coord::new(40, 40)).unwrap();
        assert_eq!(term.cursor_position().unwrap(), Coord::new(9, 3));
    }
}

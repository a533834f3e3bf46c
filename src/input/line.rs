//! Line editing on raw keys
//!
//! Keys are echoed as they are typed. Backspace removes the last character
//! and erases its cell, stepping back across a row boundary when the cursor
//! sits in the first column.

use crate::backend::{Backend, Coord};
use crate::error::Result;

use super::keys::{KeyCode, KeyDecoder};

/// Reads delimiter-terminated lines from a session
pub struct LineEditor<B: Backend> {
    keys: KeyDecoder<B>,
}

impl<B: Backend> LineEditor<B> {
    pub fn new(keys: KeyDecoder<B>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &KeyDecoder<B> {
        &self.keys
    }

    /// Read a line terminated by newline.
    pub fn read_line_default(&self) -> Result<String> {
        self.read_line(b"\n")
    }

    /// Read a line terminated by `delimiter`.
    pub fn read_line_until(&self, delimiter: u8) -> Result<String> {
        self.read_line(&[delimiter])
    }

    /// Read characters until one of `delimiters` is typed.
    ///
    /// The delimiter is consumed and not part of the result. If it was not a
    /// newline, the rest of the typed line is echoed and discarded up to and
    /// including the next newline. Arrow keys are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `delimiters` is empty, since the read could never end.
    pub fn read_line(&self, delimiters: &[u8]) -> Result<String> {
        assert!(!delimiters.is_empty(), "read_line needs at least one delimiter");
        let session = self.keys.session();
        let mut line = String::new();

        let terminator = loop {
            // Taken before the echo moves the cursor
            let pos = session.cursor_position()?;
            let key = self.keys.echo_key()?;

            if key.is_backspace() {
                let target = if line.pop().is_some() {
                    self.step_back(pos)?
                } else {
                    // The echoed BS moved the cursor; undo that
                    pos
                };
                session.move_cursor(target)?;

                let blank_at = session.cursor_position()?;
                session.write(" ")?;
                session.move_cursor(blank_at)?;
                continue;
            }

            match key {
                KeyCode::Char(byte) if delimiters.contains(&byte) => break key,
                KeyCode::Char(byte) => line.push(char::from(byte)),
                _ => {}
            }
        };

        if terminator != KeyCode::NEWLINE {
            while self.keys.echo_key()? != KeyCode::NEWLINE {}
        }

        Ok(line)
    }

    /// The cell before `pos`, wrapping to the last column of the row above.
    fn step_back(&self, pos: Coord) -> Result<Coord> {
        if pos.x > 0 {
            return Ok(Coord::new(pos.x - 1, pos.y));
        }
        let width = self.keys.session().window_size()?.x;
        Ok(Coord::new(width.saturating_sub(1), pos.y.saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{KeyFeed, VirtualProbe, VirtualTerminal};
    use crate::core::palette::ColorModel;
    use crate::core::session::TerminalSession;
    use crate::error::Error;

    const BS: u8 = 0x08;

    fn setup(cols: u16) -> (LineEditor<VirtualTerminal>, KeyFeed, VirtualProbe) {
        let (term, feed) = VirtualTerminal::new(cols, 6);
        let probe = term.probe();
        let session = TerminalSession::open(term, ColorModel::Palette).unwrap();
        (session.line_editor(), feed, probe)
    }

    #[test]
    fn test_reads_until_newline() {
        let (editor, feed, probe) = setup(40);
        feed.text("abc\n");

        assert_eq!(editor.read_line(b"\n").unwrap(), "abc");
        assert_eq!(probe.row_text(0), "abc");
        assert_eq!(probe.cursor(), Coord::new(0, 1));
        assert_eq!(editor.keys().poll_key().unwrap(), KeyCode::NoKey);
    }

    #[test]
    fn test_enter_key_terminates() {
        let (editor, feed, _probe) = setup(40);
        feed.text("abc\r");

        assert_eq!(editor.read_line_default().unwrap(), "abc");
    }

    #[test]
    fn test_backspace_removes_last_char() {
        let (editor, feed, probe) = setup(40);
        feed.bytes(&[b'a', b'b', BS, b'c', b'\n']);

        assert_eq!(editor.read_line(b"\n").unwrap(), "ac");
        assert_eq!(probe.row_text(0), "ac");
    }

    #[test]
    fn test_delete_acts_as_backspace() {
        let (editor, feed, _probe) = setup(40);
        feed.bytes(&[b'x', b'y', 0x7F, b'\n']);

        assert_eq!(editor.read_line(b"\n").unwrap(), "x");
    }

    #[test]
    fn test_backspace_on_empty_line_keeps_cursor() {
        let (editor, feed, probe) = setup(40);
        editor.keys().session().write("> ").unwrap();
        let start = probe.cursor();

        feed.bytes(&[BS, BS]);
        feed.text("ok\n");

        // Typing resumes exactly where the prompt left the cursor
        assert_eq!(editor.read_line(b"\n").unwrap(), "ok");
        assert_eq!(probe.cell(start.x, start.y).ch, 'o');
        assert_eq!(probe.row_text(0), "> ok");
    }

    #[test]
    fn test_empty_backspace_has_no_visible_effect() {
        let (editor, feed, probe) = setup(40);
        editor.keys().session().write("name: ").unwrap();
        let start = probe.cursor();

        feed.bytes(&[BS, BS, BS, b'\n']);

        assert_eq!(editor.read_line(b"\n").unwrap(), "");
        assert_eq!(probe.row_text(0), "name:");
        assert_eq!(probe.cursor(), Coord::new(0, start.y + 1));
    }

    #[test]
    fn test_backspace_wraps_to_previous_row() {
        let (editor, feed, probe) = setup(4);
        feed.text("abcde");
        feed.bytes(&[BS, BS]);
        feed.text("X\n");

        assert_eq!(editor.read_line(b"\n").unwrap(), "abcX");
        assert_eq!(probe.row_text(0), "abcX");
        assert_eq!(probe.row_text(1), "");
    }

    #[test]
    fn test_other_delimiter_discards_rest_of_line() {
        let (editor, feed, probe) = setup(40);
        feed.text("ab,cd\nnext");

        assert_eq!(editor.read_line(b",;").unwrap(), "ab");
        assert_eq!(probe.row_text(0), "ab,cd");
        assert_eq!(editor.keys().poll_key().unwrap(), KeyCode::Char(b'n'));
    }

    #[test]
    fn test_read_line_until_single_delimiter() {
        let (editor, feed, _probe) = setup(40);
        feed.text("key=value\n");

        assert_eq!(editor.read_line_until(b'=').unwrap(), "key");
    }

    #[test]
    fn test_arrow_keys_are_ignored() {
        let (editor, feed, _probe) = setup(40);
        feed.bytes(&[b'u', 0xE0, 0x48, b'p', 0x00, 0x4B, b'\n']);

        assert_eq!(editor.read_line(b"\n").unwrap(), "up");
    }

    #[test]
    fn test_input_closed_before_newline() {
        let (editor, feed, _probe) = setup(40);
        feed.text("abc,def");
        drop(feed);

        assert!(matches!(editor.read_line(b","), Err(Error::InputClosed)));
    }

    #[test]
    #[should_panic(expected = "at least one delimiter")]
    fn test_empty_delimiters_panic() {
        let (editor, _feed, _probe) = setup(40);
        let _ = editor.read_line(b"");
    }
}

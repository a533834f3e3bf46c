//! Live terminal backend using crossterm
//!
//! Drives the real terminal on both Windows consoles and POSIX ttys.
//! crossterm key events are re-encoded into the console extended-key byte
//! stream so the key decoder sees one input format on every platform.

use std::collections::VecDeque;
use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::{
    cursor::{self, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::debug;

use super::{scan, Attributes, Backend, Coord, ReadMode};
use crate::error::{Error, Result};

/// Set while some backend holds the process terminal
static DEVICE_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Exclusive ownership of the process terminal, released on drop
#[derive(Debug)]
struct DeviceClaim;

impl DeviceClaim {
    fn acquire() -> Option<Self> {
        DEVICE_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DeviceClaim)
    }
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        DEVICE_CLAIMED.store(false, Ordering::Release);
    }
}

/// Terminal backend over stdout and the crossterm event queue
pub struct CrosstermBackend {
    stdout: Stdout,
    /// Bytes of an already-read key event not yet handed out
    pending: VecDeque<u8>,
    /// Whether raw mode is currently enabled
    raw: bool,
    claim: Option<DeviceClaim>,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            pending: VecDeque::new(),
            raw: false,
            claim: None,
        }
    }

    fn next_event(mode: ReadMode) -> io::Result<Option<Event>> {
        match mode {
            ReadMode::Poll => {
                if event::poll(Duration::ZERO)? {
                    event::read().map(Some)
                } else {
                    Ok(None)
                }
            }
            ReadMode::Wait => event::read().map(Some),
        }
    }
}

impl Backend for CrosstermBackend {
    fn enter_raw_mode(&mut self) -> Result<()> {
        // One session per process; a second would restore the device under the first
        let claim = match self.claim.take() {
            Some(claim) => claim,
            None => DeviceClaim::acquire().ok_or_else(|| {
                Error::RawMode(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "terminal is already owned by another session",
                ))
            })?,
        };

        terminal::enable_raw_mode().map_err(Error::RawMode)?;
        self.claim = Some(claim);
        self.raw = true;
        execute!(self.stdout, EnterAlternateScreen, Show).map_err(Error::RawMode)?;
        Ok(())
    }

    fn leave_raw_mode(&mut self) -> Result<()> {
        if !self.raw {
            return Ok(());
        }
        self.raw = false;

        // Reset attributes before leaving so the shell prompt is not colored
        let _ = execute!(self.stdout, ResetColor, SetAttribute(Attribute::Reset), Show);
        let _ = execute!(self.stdout, LeaveAlternateScreen);
        let _ = self.stdout.flush();

        let restored = terminal::disable_raw_mode().map_err(Error::Restore);
        self.claim = None;
        restored
    }

    fn clear(&mut self) -> Result<()> {
        execute!(self.stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        // Raw mode disables output post-processing, so LF needs its CR back
        if self.raw && text.contains('\n') {
            queue!(self.stdout, Print(text.replace('\n', "\r\n")))?;
        } else {
            queue!(self.stdout, Print(text))?;
        }
        self.stdout.flush()?;
        Ok(())
    }

    fn set_attributes(&mut self, attrs: Attributes) -> Result<()> {
        let (fg, bg, bold) = style_for(attrs);
        queue!(
            self.stdout,
            SetAttribute(Attribute::Reset),
            SetForegroundColor(fg),
            SetBackgroundColor(bg)
        )?;
        if bold {
            queue!(self.stdout, SetAttribute(Attribute::Bold))?;
        }
        self.stdout.flush()?;
        Ok(())
    }

    fn read_raw_key(&mut self, mode: ReadMode) -> Result<Option<u8>> {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Ok(Some(byte));
            }

            let Some(event) = Self::next_event(mode)? else {
                return Ok(None);
            };

            match event {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    let bytes = encode_key(&key);
                    if bytes.is_empty() {
                        debug!("Ignoring unmapped key: {:?}", key.code);
                    }
                    self.pending.extend(bytes);
                }
                // Resize, mouse, focus and paste events are not input keys
                _ => {}
            }
        }
    }

    fn cursor_position(&mut self) -> Result<Coord> {
        self.stdout.flush()?;
        Ok(Coord::from(cursor::position()?))
    }

    fn window_size(&mut self) -> Result<Coord> {
        Ok(Coord::from(terminal::size()?))
    }

    fn move_cursor(&mut self, pos: Coord) -> Result<()> {
        execute!(self.stdout, MoveTo(pos.x, pos.y))?;
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        // Raw mode must never outlive the backend
        if self.raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Map resolved attributes to crossterm foreground, background and bold.
pub fn style_for(attrs: Attributes) -> (Color, Color, bool) {
    match attrs {
        Attributes::Console(attr) => (
            Color::AnsiValue(attr.foreground_index()),
            Color::AnsiValue(attr.background_index()),
            false,
        ),
        Attributes::Pair(pair) => (
            Color::AnsiValue(pair.foreground),
            Color::AnsiValue(pair.background),
            pair.bold,
        ),
    }
}

/// Encode a crossterm key event as console input bytes.
///
/// Plain ASCII keys become their byte, Enter is CR, Backspace is BS, and
/// navigation keys become a lead byte plus scan code. Keys with no console
/// encoding (non-ASCII characters, media keys) yield an empty vector.
pub fn encode_key(event: &KeyEvent) -> Vec<u8> {
    match event.code {
        KeyCode::Char(ch) => encode_char(ch, event.modifiers),

        KeyCode::Enter => vec![b'\r'],
        KeyCode::Backspace => vec![0x08],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::Esc => vec![0x1B],

        KeyCode::Up => vec![scan::LEAD_EXTENDED, scan::UP],
        KeyCode::Down => vec![scan::LEAD_EXTENDED, scan::DOWN],
        KeyCode::Left => vec![scan::LEAD_EXTENDED, scan::LEFT],
        KeyCode::Right => vec![scan::LEAD_EXTENDED, scan::RIGHT],

        KeyCode::Home => vec![scan::LEAD_EXTENDED, scan::HOME],
        KeyCode::End => vec![scan::LEAD_EXTENDED, scan::END],
        KeyCode::PageUp => vec![scan::LEAD_EXTENDED, scan::PAGE_UP],
        KeyCode::PageDown => vec![scan::LEAD_EXTENDED, scan::PAGE_DOWN],
        KeyCode::Insert => vec![scan::LEAD_EXTENDED, scan::INSERT],
        KeyCode::Delete => vec![scan::LEAD_EXTENDED, scan::DELETE],

        // Function key scan codes collide with the ANSI arrow codes
        _ => Vec::new(),
    }
}

fn encode_char(ch: char, mods: KeyModifiers) -> Vec<u8> {
    if !ch.is_ascii() {
        return Vec::new();
    }
    let byte = ch as u8;

    // Ctrl + letter = control character
    if mods.contains(KeyModifiers::CONTROL) && byte.is_ascii_alphabetic() {
        return vec![byte.to_ascii_lowercase() - b'a' + 1];
    }

    // NUL is reserved as an extended-key lead
    if byte == 0 {
        return Vec::new();
    }

    vec![byte]
}

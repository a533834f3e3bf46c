//! Terminal session management
//!
//! A [`TerminalSession`] is a handle onto the terminal device. Handles are
//! cheap clones of one shared core: the first handle puts the device into
//! raw mode, the last one to drop restores it. Color registration and
//! output go through whichever handle is at hand; they all see the same
//! palette and device.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use super::palette::{ColorModel, ColorPalette, ColorSpec};
use crate::backend::{Backend, Coord, ReadMode};
use crate::error::Result;
use crate::input::{KeyDecoder, LineEditor};
use crate::timing::Clock;

/// State shared by every handle of a session
struct SessionCore<B: Backend> {
    backend: RefCell<B>,
    palette: RefCell<ColorPalette>,
}

impl<B: Backend> Drop for SessionCore<B> {
    fn drop(&mut self) {
        // Last handle gone: restore the device
        let backend = self.backend.get_mut();
        if let Err(e) = backend.clear() {
            error!("Failed to clear screen on teardown: {}", e);
        }
        if let Err(e) = backend.leave_raw_mode() {
            error!("Failed to release raw mode: {}", e);
        }
        info!("Terminal session closed");
    }
}

/// Reference-counted handle onto the terminal device
pub struct TerminalSession<B: Backend> {
    core: Rc<SessionCore<B>>,
}

impl<B: Backend> TerminalSession<B> {
    /// Take over the device: enter raw mode, clear the screen and start with
    /// an empty palette.
    ///
    /// Failure here means the device is unusable; callers should treat it
    /// as fatal.
    pub fn open(mut backend: B, model: ColorModel) -> Result<Self> {
        backend.enter_raw_mode()?;

        // Raw mode is on from here, so a failed clear still needs teardown
        let core = Rc::new(SessionCore {
            backend: RefCell::new(backend),
            palette: RefCell::new(ColorPalette::new(model)),
        });
        core.backend.borrow_mut().clear()?;

        info!("Terminal session opened ({:?} color model)", model);
        Ok(Self { core })
    }

    /// Number of live handles onto this session
    pub fn handles(&self) -> usize {
        Rc::strong_count(&self.core)
    }

    /// Register `spec` under `id`; see [`ColorPalette::register`].
    pub fn register_color(&self, id: u8, spec: ColorSpec) {
        self.core.palette.borrow_mut().register(id, spec);
    }

    /// Make `id` the color for all subsequent output.
    pub fn activate(&self, id: u8) -> Result<()> {
        let attrs = self.core.palette.borrow().resolve(id);
        self.backend().set_attributes(attrs)
    }

    pub fn write(&self, text: &str) -> Result<()> {
        self.backend().write_text(text)
    }

    pub fn write_char(&self, ch: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.write(ch.encode_utf8(&mut buf))
    }

    pub fn clear_screen(&self) -> Result<()> {
        self.backend().clear()
    }

    /// Window size as (columns, rows)
    pub fn window_size(&self) -> Result<Coord> {
        self.backend().window_size()
    }

    pub fn cursor_position(&self) -> Result<Coord> {
        self.backend().cursor_position()
    }

    pub fn move_cursor(&self, pos: Coord) -> Result<()> {
        self.backend().move_cursor(pos)
    }

    pub fn move_to(&self, x: u16, y: u16) -> Result<()> {
        self.move_cursor(Coord::new(x, y))
    }

    /// Sleep for roughly `ms` milliseconds through the backend.
    pub fn sleep_ms(&self, ms: u64) {
        self.sleep(Duration::from_millis(ms));
    }

    pub fn sleep(&self, duration: Duration) {
        self.backend().sleep(duration);
    }

    /// Key input bound to this session
    pub fn keys(&self) -> KeyDecoder<B> {
        KeyDecoder::new(self.clone())
    }

    /// Line input bound to this session
    pub fn line_editor(&self) -> LineEditor<B> {
        LineEditor::new(self.keys())
    }

    pub(crate) fn read_raw_key(&self, mode: ReadMode) -> Result<Option<u8>> {
        self.backend().read_raw_key(mode)
    }

    fn backend(&self) -> std::cell::RefMut<'_, B> {
        self.core.backend.borrow_mut()
    }
}

/// Frame pacing on a session sleeps through its backend
impl<B: Backend> Clock for TerminalSession<B> {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        self.backend().sleep(duration);
    }
}

impl<B: Backend> Clone for TerminalSession<B> {
    fn clone(&self) -> Self {
        let core = Rc::clone(&self.core);
        debug!("Session handle created ({} live)", Rc::strong_count(&core));
        Self { core }
    }
}

impl<B: Backend> Drop for TerminalSession<B> {
    fn drop(&mut self) {
        debug!("Session handle dropped ({} remaining)", Rc::strong_count(&self.core) - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Attributes, ColorPair, ConsoleAttr, VirtualTerminal};
    use crate::core::palette::BaseColor;
    use crate::error::Error;
    use crate::timing::FrameThrottle;

    #[test]
    fn test_setup_and_teardown_once() {
        let (term, _feed) = VirtualTerminal::new(20, 5);
        let probe = term.probe();

        let first = TerminalSession::open(term, ColorModel::Attribute).unwrap();
        assert_eq!(probe.setups(), 1);
        assert!(probe.raw_mode());

        let second = first.clone();
        let third = second.clone();
        assert_eq!(first.handles(), 3);
        assert_eq!(probe.setups(), 1);

        // Drop out of creation order; only the last one tears down
        drop(second);
        drop(first);
        assert_eq!(probe.teardowns(), 0);
        assert!(probe.raw_mode());

        drop(third);
        assert_eq!(probe.setups(), 1);
        assert_eq!(probe.teardowns(), 1);
        assert!(!probe.raw_mode());
    }

    #[test]
    fn test_clears_on_open_and_close() {
        let (term, _feed) = VirtualTerminal::new(20, 5);
        let probe = term.probe();

        let session = TerminalSession::open(term, ColorModel::Attribute).unwrap();
        assert_eq!(probe.clears(), 1);
        session.write("leftover").unwrap();

        drop(session);
        assert_eq!(probe.clears(), 2);
        assert_eq!(probe.row_text(0), "");
    }

    #[test]
    fn test_setup_failure_is_reported() {
        let (term, _feed) = VirtualTerminal::new(20, 5);
        let probe = term.probe();

        let result = TerminalSession::open(term.refuse_raw_mode(), ColorModel::Palette);
        assert!(matches!(result, Err(Error::RawMode(_))));
        assert_eq!(probe.setups(), 0);
        assert_eq!(probe.teardowns(), 0);
    }

    #[test]
    fn test_teardown_on_unwind() {
        let (term, _feed) = VirtualTerminal::new(20, 5);
        let probe = term.probe();
        let session = TerminalSession::open(term, ColorModel::Attribute).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = session;
            panic!("render failed");
        }));

        assert!(result.is_err());
        assert_eq!(probe.teardowns(), 1);
    }

    #[test]
    fn test_activate_then_write_uses_registered_color() {
        let (term, _feed) = VirtualTerminal::new(20, 5);
        let probe = term.probe();
        let session = TerminalSession::open(term, ColorModel::Attribute).unwrap();

        session.register_color(1, ColorSpec::new(BaseColor::Yellow, BaseColor::Blue).bold_foreground());
        session.register_color(2, ColorSpec::new(BaseColor::Black, BaseColor::White).bold_background());

        session.activate(1).unwrap();
        session.write("A").unwrap();
        session.activate(2).unwrap();
        session.write("B").unwrap();

        assert_eq!(
            probe.cell(0, 0).attrs,
            Attributes::Console(
                ConsoleAttr::FOREGROUND_RED
                    | ConsoleAttr::FOREGROUND_GREEN
                    | ConsoleAttr::FOREGROUND_INTENSITY
                    | ConsoleAttr::BACKGROUND_BLUE
            )
        );
        assert_eq!(
            probe.cell(1, 0).attrs,
            Attributes::Console(
                ConsoleAttr::BACKGROUND_RED
                    | ConsoleAttr::BACKGROUND_GREEN
                    | ConsoleAttr::BACKGROUND_BLUE
                    | ConsoleAttr::BACKGROUND_INTENSITY
            )
        );
    }

    #[test]
    fn test_handles_share_palette() {
        let (term, _feed) = VirtualTerminal::new(20, 5);
        let probe = term.probe();
        let session = TerminalSession::open(term, ColorModel::Palette).unwrap();
        let other = session.clone();

        session.register_color(3, ColorSpec::new(BaseColor::Green, BaseColor::Red).bold_background());
        other.activate(3).unwrap();

        assert_eq!(
            probe.attributes(),
            Attributes::Pair(ColorPair { pair: 260, foreground: 2, background: 9, bold: false })
        );
    }

    #[test]
    fn test_cursor_and_geometry() {
        let (term, _feed) = VirtualTerminal::new(30, 8);
        let session = TerminalSession::open(term, ColorModel::Attribute).unwrap();

        assert_eq!(session.window_size().unwrap(), Coord::new(30, 8));

        session.move_to(4, 2).unwrap();
        session.write("hi").unwrap();
        assert_eq!(session.cursor_position().unwrap(), Coord::new(6, 2));
    }

    #[test]
    fn test_sleep_goes_through_backend() {
        let (term, _feed) = VirtualTerminal::new(10, 2);
        let probe = term.probe();
        let session = TerminalSession::open(term, ColorModel::Attribute).unwrap();

        session.sleep_ms(25);
        assert_eq!(probe.sleeps(), vec![Duration::from_millis(25)]);
    }

    #[test]
    fn test_throttle_sleeps_through_session() {
        let (term, _feed) = VirtualTerminal::new(10, 2);
        let probe = term.probe();
        let session = TerminalSession::open(term, ColorModel::Attribute).unwrap();
        let mut throttle = FrameThrottle::with_clock(session.clone());

        throttle.throttle_ms(100);
        assert!(probe.sleeps().is_empty());

        let slept = throttle.throttle_ms(100);
        assert_eq!(probe.sleeps(), vec![slept]);
        assert!(slept > Duration::from_millis(50), "slept {slept:?}");
        assert!(slept <= Duration::from_millis(100));
        assert_eq!(session.handles(), 2);
    }
}

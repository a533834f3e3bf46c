//! Key decoding
//!
//! Turns the backend's raw byte stream into [`KeyCode`]s. A carriage return
//! is reported as a newline, and a lead byte (`0x00` or `0xE0`) followed by
//! a scan code becomes one of the arrow sentinels.

use tracing::debug;

use crate::backend::{scan, Backend, ReadMode};
use crate::core::session::TerminalSession;
use crate::error::Result;

/// A decoded key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A literal character byte
    Char(u8),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// Nothing pending; only returned by non-blocking reads
    NoKey,
}

impl KeyCode {
    pub const NEWLINE: KeyCode = KeyCode::Char(b'\n');

    /// The literal character, if this key has one
    pub fn as_char(self) -> Option<char> {
        match self {
            KeyCode::Char(byte) => Some(char::from(byte)),
            _ => None,
        }
    }

    /// BS or DEL
    pub fn is_backspace(self) -> bool {
        matches!(self, KeyCode::Char(0x08) | KeyCode::Char(0x7F))
    }
}

/// Decode the scan code that follows an extended lead byte.
///
/// Each arrow accepts both its keypad code and its ANSI final byte. Anything
/// else has no meaning here and yields `None`.
pub fn decode_extended(code: u8) -> Option<KeyCode> {
    match code {
        scan::UP | scan::UP_ANSI => Some(KeyCode::ArrowUp),
        scan::DOWN | scan::DOWN_ANSI => Some(KeyCode::ArrowDown),
        scan::RIGHT | scan::RIGHT_ANSI => Some(KeyCode::ArrowRight),
        scan::LEFT | scan::LEFT_ANSI => Some(KeyCode::ArrowLeft),
        _ => None,
    }
}

/// Translate a plain (non-lead) byte.
pub fn translate(byte: u8) -> KeyCode {
    match byte {
        b'\r' => KeyCode::NEWLINE,
        other => KeyCode::Char(other),
    }
}

/// Key reader bound to a terminal session
pub struct KeyDecoder<B: Backend> {
    session: TerminalSession<B>,
}

impl<B: Backend> KeyDecoder<B> {
    pub fn new(session: TerminalSession<B>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &TerminalSession<B> {
        &self.session
    }

    /// Read and decode at most one key.
    fn read_key(&self, mode: ReadMode) -> Result<KeyCode> {
        let Some(byte) = self.session.read_raw_key(mode)? else {
            return Ok(KeyCode::NoKey);
        };

        if !scan::is_lead(byte) {
            return Ok(translate(byte));
        }

        // The scan code is delivered together with its lead
        let Some(code) = self.session.read_raw_key(ReadMode::Wait)? else {
            return Ok(KeyCode::NoKey);
        };
        match decode_extended(code) {
            Some(key) => Ok(key),
            None => {
                debug!("Discarding extended key {:#04x} {:#04x}", byte, code);
                Ok(KeyCode::NoKey)
            }
        }
    }

    /// Return the next key, or [`KeyCode::NoKey`] if nothing is pending.
    pub fn poll_key(&self) -> Result<KeyCode> {
        self.read_key(ReadMode::Poll)
    }

    /// Block until a key arrives. Never returns [`KeyCode::NoKey`].
    pub fn wait_key(&self) -> Result<KeyCode> {
        loop {
            let key = self.read_key(ReadMode::Wait)?;
            if key != KeyCode::NoKey {
                return Ok(key);
            }
        }
    }

    /// Throw away everything already typed.
    pub fn drain(&self) -> Result<()> {
        while self.session.read_raw_key(ReadMode::Poll)?.is_some() {}
        Ok(())
    }

    /// Drain stale input, then block for a fresh key.
    pub fn wait_new_key(&self) -> Result<KeyCode> {
        self.drain()?;
        self.wait_key()
    }

    /// Block, discarding other keys, until `target` is pressed.
    ///
    /// There is no timeout.
    ///
    /// # Panics
    ///
    /// Panics if `target` is [`KeyCode::NoKey`], which can never be pressed.
    pub fn wait_key_until(&self, target: KeyCode) -> Result<()> {
        assert!(target != KeyCode::NoKey, "cannot wait for NoKey");
        while self.wait_key()? != target {}
        Ok(())
    }

    /// Block for a key and write its character to the screen.
    ///
    /// Keys without a character (arrows) are returned but not echoed.
    pub fn echo_key(&self) -> Result<KeyCode> {
        let key = self.wait_key()?;
        if let Some(ch) = key.as_char() {
            self.session.write_char(ch)?;
        }
        Ok(key)
    }

    /// Prompt and wait for any key, ignoring anything typed beforehand.
    pub fn pause(&self) -> Result<()> {
        self.drain()?;
        self.session.write("Press any key to continue . . .")?;
        self.wait_key()?;
        self.session.write("\n")
    }
}

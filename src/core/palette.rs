//! Logical color palette
//!
//! Callers register a [`ColorSpec`] under a small integer id and later
//! activate it by id. Resolution to concrete attributes depends on the
//! [`ColorModel`] of the terminal:
//!
//! - **Attribute**: the console attribute word. Each base color is a mix of
//!   the red, green and blue bits; bold sets the intensity bit.
//! - **Palette**: numbered color pairs. Foreground bold is a text attribute,
//!   while a bold background selects a bright palette cell and a pair id in
//!   a parallel bank, since bold changes the cell rather than adding a flag.

use serde::{Deserialize, Serialize};

use crate::backend::{Attributes, ColorPair, ConsoleAttr};

/// Number of palette slots. Valid ids are `0..MAX_COLOR_ID`.
pub const PALETTE_SIZE: usize = 256;

/// One past the highest id that may be registered.
pub const MAX_COLOR_ID: u8 = 255;

/// Offset from a base palette cell to its bright counterpart
pub const BRIGHT_OFFSET: u8 = 8;

/// Stride between the normal and bright-background pair banks
pub const PAIR_BANK_STRIDE: u16 = PALETTE_SIZE as u16;

/// The eight base terminal colors, numbered as in the ANSI table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseColor {
    #[default]
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

impl BaseColor {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn has_red(self) -> bool {
        self.index() & 0b001 != 0
    }

    pub fn has_green(self) -> bool {
        self.index() & 0b010 != 0
    }

    pub fn has_blue(self) -> bool {
        self.index() & 0b100 != 0
    }
}

/// A foreground/background combination with independent bold flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorSpec {
    pub foreground: BaseColor,
    pub background: BaseColor,
    pub foreground_bold: bool,
    pub background_bold: bool,
}

impl ColorSpec {
    pub const fn new(foreground: BaseColor, background: BaseColor) -> Self {
        Self {
            foreground,
            background,
            foreground_bold: false,
            background_bold: false,
        }
    }

    pub const fn bold_foreground(mut self) -> Self {
        self.foreground_bold = true;
        self
    }

    pub const fn bold_background(mut self) -> Self {
        self.background_bold = true;
        self
    }
}

/// How a terminal encodes colors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorModel {
    /// Base colors plus intensity bits (Windows console)
    Attribute,
    /// Numbered color pairs over a 16-cell palette (curses-style terminals)
    Palette,
}

impl ColorModel {
    /// The model native to the build platform
    pub fn native() -> Self {
        if cfg!(windows) {
            ColorModel::Attribute
        } else {
            ColorModel::Palette
        }
    }
}

/// Table of registered color specs
#[derive(Clone, Debug)]
pub struct ColorPalette {
    model: ColorModel,
    entries: [ColorSpec; PALETTE_SIZE],
}

impl ColorPalette {
    /// A palette with every slot unset.
    pub fn new(model: ColorModel) -> Self {
        Self {
            model,
            entries: [ColorSpec::default(); PALETTE_SIZE],
        }
    }

    /// Store `spec` under `id`, replacing any earlier registration.
    ///
    /// # Panics
    ///
    /// Panics if `id` is [`MAX_COLOR_ID`] or above.
    pub fn register(&mut self, id: u8, spec: ColorSpec) {
        assert!(id < MAX_COLOR_ID, "color id {id} out of range 0..{MAX_COLOR_ID}");
        self.entries[id as usize] = spec;
    }

    pub fn spec(&self, id: u8) -> ColorSpec {
        self.entries[id as usize]
    }

    /// Resolve `id` to concrete attributes for this palette's model.
    ///
    /// Unregistered ids resolve like an all-default spec, which renders as
    /// black on black.
    pub fn resolve(&self, id: u8) -> Attributes {
        let spec = self.spec(id);
        match self.model {
            ColorModel::Attribute => Attributes::Console(console_attr(spec)),
            ColorModel::Palette => Attributes::Pair(color_pair(id, spec)),
        }
    }
}

/// Attribute-model resolution: primaries per base color plus intensity bits.
pub fn console_attr(spec: ColorSpec) -> ConsoleAttr {
    let mut attr = ConsoleAttr::empty();

    attr.set(ConsoleAttr::FOREGROUND_RED, spec.foreground.has_red());
    attr.set(ConsoleAttr::FOREGROUND_GREEN, spec.foreground.has_green());
    attr.set(ConsoleAttr::FOREGROUND_BLUE, spec.foreground.has_blue());
    attr.set(ConsoleAttr::FOREGROUND_INTENSITY, spec.foreground_bold);

    attr.set(ConsoleAttr::BACKGROUND_RED, spec.background.has_red());
    attr.set(ConsoleAttr::BACKGROUND_GREEN, spec.background.has_green());
    attr.set(ConsoleAttr::BACKGROUND_BLUE, spec.background.has_blue());
    attr.set(ConsoleAttr::BACKGROUND_INTENSITY, spec.background_bold);

    attr
}

/// Palette-model resolution.
///
/// Pair 0 is reserved by curses-style terminals, so id `n` is pair `n + 1`.
/// A bold background moves the pair into the bright bank and the background
/// into the bright half of the palette.
pub fn color_pair(id: u8, spec: ColorSpec) -> ColorPair {
    let mut pair = u16::from(id) + 1;
    let mut background = spec.background.index();
    if spec.background_bold {
        pair += PAIR_BANK_STRIDE;
        background += BRIGHT_OFFSET;
    }

    ColorPair {
        pair,
        foreground: spec.foreground.index(),
        background,
        bold: spec.foreground_bold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_primaries() {
        let expected = [
            (BaseColor::Black, ConsoleAttr::empty()),
            (BaseColor::Red, ConsoleAttr::FOREGROUND_RED),
            (BaseColor::Green, ConsoleAttr::FOREGROUND_GREEN),
            (BaseColor::Yellow, ConsoleAttr::FOREGROUND_RED | ConsoleAttr::FOREGROUND_GREEN),
            (BaseColor::Blue, ConsoleAttr::FOREGROUND_BLUE),
            (BaseColor::Magenta, ConsoleAttr::FOREGROUND_RED | ConsoleAttr::FOREGROUND_BLUE),
            (BaseColor::Cyan, ConsoleAttr::FOREGROUND_GREEN | ConsoleAttr::FOREGROUND_BLUE),
            (
                BaseColor::White,
                ConsoleAttr::FOREGROUND_RED | ConsoleAttr::FOREGROUND_GREEN | ConsoleAttr::FOREGROUND_BLUE,
            ),
        ];
        for (color, attr) in expected {
            assert_eq!(console_attr(ColorSpec::new(color, BaseColor::Black)), attr, "{color:?}");
        }
    }

    #[test]
    fn test_console_background_and_intensity() {
        let spec = ColorSpec::new(BaseColor::White, BaseColor::Cyan)
            .bold_foreground()
            .bold_background();
        let attr = console_attr(spec);

        assert!(attr.contains(ConsoleAttr::FOREGROUND_INTENSITY));
        assert!(attr.contains(ConsoleAttr::BACKGROUND_INTENSITY));
        assert!(attr.contains(ConsoleAttr::BACKGROUND_GREEN | ConsoleAttr::BACKGROUND_BLUE));
        assert!(!attr.contains(ConsoleAttr::BACKGROUND_RED));
    }

    #[test]
    fn test_pair_offsets() {
        let spec = ColorSpec::new(BaseColor::Yellow, BaseColor::Blue);
        assert_eq!(
            color_pair(4, spec),
            ColorPair { pair: 5, foreground: 3, background: 4, bold: false }
        );

        // Foreground bold stays an attribute on the same pair
        assert_eq!(color_pair(4, spec.bold_foreground()).pair, 5);
        assert!(color_pair(4, spec.bold_foreground()).bold);

        // Background bold moves to the bright bank
        let bright = color_pair(4, spec.bold_background());
        assert_eq!(bright.pair, 5 + PAIR_BANK_STRIDE);
        assert_eq!(bright.background, 12);
        assert!(!bright.bold);
    }

    #[test]
    fn test_register_overwrites() {
        let mut palette = ColorPalette::new(ColorModel::Attribute);
        palette.register(7, ColorSpec::new(BaseColor::Red, BaseColor::Black));
        palette.register(7, ColorSpec::new(BaseColor::Green, BaseColor::Black));

        assert_eq!(palette.resolve(7), Attributes::Console(ConsoleAttr::FOREGROUND_GREEN));
    }

    #[test]
    fn test_unregistered_resolves_blank() {
        let palette = ColorPalette::new(ColorModel::Attribute);
        assert_eq!(palette.resolve(42), Attributes::Console(ConsoleAttr::empty()));

        let palette = ColorPalette::new(ColorModel::Palette);
        assert_eq!(
            palette.resolve(42),
            Attributes::Pair(ColorPair { pair: 43, foreground: 0, background: 0, bold: false })
        );
    }

    #[test]
    fn test_highest_valid_id() {
        let mut palette = ColorPalette::new(ColorModel::Palette);
        palette.register(254, ColorSpec::new(BaseColor::Cyan, BaseColor::Black));
        assert_eq!(palette.spec(254).foreground, BaseColor::Cyan);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_register_out_of_range() {
        let mut palette = ColorPalette::new(ColorModel::Palette);
        palette.register(255, ColorSpec::default());
    }
}

//! This Rust `embedded-hal`-based library drives a [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! compatible 16x2 character display through a PCF8574 "I2C backpack" in an embedded, `no_std` environment.
//!
//! The PCF8574 only offers 8 GPIO lines, so the backpack wires P0-P3 to the RS, RW, enable and backlight lines and
//! P4-P7 to the upper four data lines of the display. The HD44780 is therefore run in its 4-bit mode: every byte is
//! sent as two nibbles, high nibble first, and every nibble is latched with an enable strobe that takes three
//! I2C writes.
//!
//! Two backpack variants are supported, distinguished by their fixed I2C address:
//! - **0x27** - the board commonly sold with an alternative backlight circuit
//! - **0x3F** - the standard PCF8574A backpack
//!
//! Key features include:
//! - Cold-start initialization of the HD44780 into 4-bit, 2-line mode
//! - Writing text and numbers at a row and column
//! - Backlight and cursor control
//! - Support for custom characters
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Optional support for the `defmt` and `ufmt` frameworks
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! pcf8574-character-lcd = { version = "0.1", features = ["defmt"] }
//! ```
//! The `defmt` feature makes the library's errors and addresses loggable with `defmt` and emits debug logs while the
//! display is initialized. The `ufmt` feature allows the `uwriteln!` and `uwrite!` macros to be used.
//!
//! Create and initialize the display:
//! ```rust
//! use pcf8574_character_lcd::{BackpackAddress, CharacterDisplay};
//!
//! let i2c = ...; // I2C peripheral
//! let delay = ...; // DelayNs implementation
//!
//! let mut lcd = CharacterDisplay::initialize(i2c, BackpackAddress::StandardBackpack, delay)?;
//! ```
//! Use the display:
//! ```rust
//! lcd.write_text("Hello", 0, 0)?.write_number(42, 1, 0)?;
//! lcd.set_backlight(false)?;
//! // the `core::fmt::Write` implementation prints at the current cursor position
//! use core::fmt::Write;
//!
//! write!(lcd, " world")?;
//! ```
//! Each method returns a `Result` that wraps the display object in `Ok()`, allowing commands to be chained.
//!
//! Row and column are not validated by default: columns past 15 run into other DDRAM addresses and any row other
//! than 0 selects the second line. `set_cursor_position_checked` and `write_text_checked` reject positions outside
//! of the 16x2 grid instead.
//!
//! The display is driven from `&mut self` only. Sharing one display between tasks or threads needs an external
//! mutex, and the I2C bus itself can be shared with a device from `embedded-hal-bus`.
//!
#![no_std]
#![allow(dead_code, non_upper_case_globals)]
use core::fmt::Display;

use embedded_hal::{delay::DelayNs, i2c};

mod adapter;
mod driver;
#[cfg(test)]
mod test_support;

pub use adapter::{Pcf8574Adapter, Pcf8574BitField};
pub use driver::{HD44780, LCD_COLS, LCD_ROWS};

#[derive(Debug, PartialEq, Copy, Clone)]
/// Errors that can occur when using the LCD backpack
pub enum CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    /// An I2C write to the backpack failed. The operation was aborted at that write.
    BusError(I2C::Error),
    /// Row is out of range. Only returned by the checked operations.
    RowOutOfRange,
    /// Column is out of range. Only returned by the checked operations.
    ColumnOutOfRange,
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl<I2C> From<core::fmt::Error> for CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn from(err: core::fmt::Error) -> Self {
        CharacterDisplayError::FormattingError(err)
    }
}

impl<I2C> From<&CharacterDisplayError<I2C>> for &'static str
where
    I2C: i2c::I2c,
{
    fn from(err: &CharacterDisplayError<I2C>) -> Self {
        match err {
            CharacterDisplayError::BusError(_) => "I2C bus error",
            CharacterDisplayError::RowOutOfRange => "Row out of range",
            CharacterDisplayError::ColumnOutOfRange => "Column out of range",
            CharacterDisplayError::FormattingError(_) => "Formatting error",
        }
    }
}

#[cfg(feature = "defmt")]
impl<I2C> defmt::Format for CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<I2C> ufmt::uDisplay for CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<I2C> Display for CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
/// The I2C address of the backpack. Backpacks are built with one of these two addresses.
pub enum BackpackAddress {
    /// 0x27, the board with the alternative backlight circuit
    #[default]
    AltBacklightBoard,
    /// 0x3F, the standard backpack
    StandardBackpack,
}

impl From<BackpackAddress> for u8 {
    fn from(address: BackpackAddress) -> Self {
        match address {
            BackpackAddress::AltBacklightBoard => 0x27,
            BackpackAddress::StandardBackpack => 0x3F,
        }
    }
}

impl TryFrom<u8> for BackpackAddress {
    /// the rejected address
    type Error = u8;

    fn try_from(address: u8) -> Result<Self, Self::Error> {
        match address {
            0x27 => Ok(BackpackAddress::AltBacklightBoard),
            0x3F => Ok(BackpackAddress::StandardBackpack),
            other => Err(other),
        }
    }
}

impl From<&BackpackAddress> for &'static str {
    fn from(address: &BackpackAddress) -> Self {
        match address {
            BackpackAddress::AltBacklightBoard => "0x27",
            BackpackAddress::StandardBackpack => "0x3F",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BackpackAddress {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for BackpackAddress {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for BackpackAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// The HD44780 register a byte is written to, selected with the RS line.
pub enum Register {
    /// Instruction register
    Command,
    /// Data register, DDRAM or CGRAM depending on the last address command
    Data,
}

impl Register {
    const fn rs_setting(&self) -> bool {
        match self {
            Register::Command => false,
            Register::Data => true,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Register {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Register::Command => defmt::write!(fmt, "Command"),
            Register::Data => defmt::write!(fmt, "Data"),
        }
    }
}

/// A 16x2 HD44780 character display behind a PCF8574 backpack. One value drives one physical display
/// and holds all session state: the bus, the latched backlight and register-select lines, and the
/// controller settings.
pub struct CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    device: Pcf8574Adapter<I2C, DELAY>,
    actions: HD44780,
}

impl<I2C, DELAY> CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    /// Create a new character display object with the default I2C address for the backpack.
    pub fn new(i2c: I2C, delay: DELAY) -> Self {
        Self::new_with_address(i2c, BackpackAddress::default(), delay)
    }

    /// Create a new character display object with a specific I2C address for the backpack.
    pub fn new_with_address(i2c: I2C, address: BackpackAddress, delay: DELAY) -> Self {
        Self {
            device: Pcf8574Adapter::new(i2c, address, delay),
            actions: HD44780::default(),
        }
    }

    /// Create the display object and run the controller's cold-start sequence.
    pub fn initialize(
        i2c: I2C,
        address: BackpackAddress,
        delay: DELAY,
    ) -> Result<Self, CharacterDisplayError<I2C>> {
        let mut lcd = Self::new_with_address(i2c, address, delay);
        lcd.init()?;
        Ok(lcd)
    }

    /// Initialize the display. This must be called before using the display, and again after any
    /// operation failed with a bus error.
    pub fn init(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.init(&mut self.device)?;
        Ok(self)
    }

    /// returns a reference to the I2C peripheral. mostly needed for testing
    fn i2c(&mut self) -> &mut I2C {
        self.device.i2c()
    }

    /// Consumes the display and returns the I2C peripheral and the delay.
    pub fn release(self) -> (I2C, DELAY) {
        self.device.release()
    }

    /// returns the I2C address of the backpack
    pub fn address(&self) -> BackpackAddress {
        self.device.address()
    }

    /// returns whether the backlight line is currently asserted
    pub fn backlight(&self) -> bool {
        self.device.backlight()
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Sends a raw byte to the command or data register.
    pub fn send_byte(
        &mut self,
        value: u8,
        register: Register,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.send_byte(&mut self.device, value, register)?;
        Ok(self)
    }

    /// Clear the display and move the cursor to row 0, column 0
    pub fn clear(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.clear(&mut self.device)?;
        Ok(self)
    }

    /// Move the cursor to row 0, column 0 without clearing the display.
    pub fn home(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.home(&mut self.device)?;
        Ok(self)
    }

    /// Set the cursor position. Rows and columns are zero-indexed and not range checked.
    pub fn set_cursor_position(
        &mut self,
        row: u8,
        col: u8,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.set_cursor_position(&mut self.device, row, col)?;
        Ok(self)
    }

    /// Set the cursor position, failing with `RowOutOfRange` or `ColumnOutOfRange` outside of the 16x2 grid.
    pub fn set_cursor_position_checked(
        &mut self,
        row: u8,
        col: u8,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions
            .set_cursor_position_checked(&mut self.device, row, col)?;
        Ok(self)
    }

    /// Prints a string at the current cursor position.
    pub fn print(&mut self, text: &str) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.print(&mut self.device, text)?;
        Ok(self)
    }

    /// Prints a string starting at the given row and column.
    pub fn write_text(
        &mut self,
        text: &str,
        row: u8,
        col: u8,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.write_text(&mut self.device, text, row, col)?;
        Ok(self)
    }

    /// Prints a string starting at the given row and column, rejecting positions outside of the 16x2 grid.
    pub fn write_text_checked(
        &mut self,
        text: &str,
        row: u8,
        col: u8,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions
            .write_text_checked(&mut self.device, text, row, col)?;
        Ok(self)
    }

    /// Prints an integer in decimal starting at the given row and column.
    pub fn write_number(
        &mut self,
        n: i32,
        row: u8,
        col: u8,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.write_number(&mut self.device, n, row, col)?;
        Ok(self)
    }

    /// Turn the backlight on or off
    pub fn set_backlight(&mut self, on: bool) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.set_backlight(&mut self.device, on)?;
        Ok(self)
    }

    /// Show a blinking cursor or hide it. This also turns the backlight on.
    pub fn set_cursor_visible(&mut self, on: bool) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.set_cursor_visible(&mut self.device, on)?;
        Ok(self)
    }

    /// Scroll the display to the left.
    pub fn scroll_display_left(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.scroll_display_left(&mut self.device)?;
        Ok(self)
    }

    /// Scroll the display to the right.
    pub fn scroll_display_right(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions.scroll_display_right(&mut self.device)?;
        Ok(self)
    }

    /// Create a new custom character in one of the 8 CGRAM slots.
    pub fn create_char(
        &mut self,
        location: u8,
        charmap: [u8; 8],
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.actions
            .create_char(&mut self.device, location, charmap)?;
        Ok(self)
    }
}

/// Implement the `core::fmt::Write` trait for the LCD backpack, allowing it to be used with the `write!` macro.
/// Text is printed at the current cursor position.
impl<I2C, DELAY> core::fmt::Write for CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.print(s) {
            #[cfg(feature = "defmt")]
            defmt::warn!("write_str failed: {}", _e);
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the LCD backpack, allowing it to be used with the `uwriteln!` and `uwrite!` macros.
impl<I2C, DELAY> ufmt::uWrite for CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), CharacterDisplayError<I2C>> {
        self.print(s)?;
        Ok(())
    }

    type Error = CharacterDisplayError<I2C>;
}

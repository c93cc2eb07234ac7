// HD44780 Support
// The HD44780 struct holds the controller-side state of a display session and
// implements the display commands on top of a Pcf8574Adapter, which performs
// the nibble strobing over I2C. Every command is sent as two nibbles, high
// nibble first, with the RS line selecting the instruction or data register.
//

use core::fmt::Write;
use embedded_hal::{delay::DelayNs, i2c};

use crate::{adapter::Pcf8574Adapter, CharacterDisplayError, Register};

// commands
pub const LCD_CMD_NOOP: u8 = 0x00; //  Invalid instruction; only latches the control lines
pub const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
pub const LCD_CMD_RETURNHOME: u8 = 0x02; //  Set cursor position to zero
pub const LCD_CMD_ENTRYMODESET: u8 = 0x04; //  Sets the entry mode
pub const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
pub const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor
pub const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display
pub const LCD_CMD_SETCGRAMADDR: u8 = 0x40; //  Used to set the CGRAM (character generator RAM) with characters
pub const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

// flags for display entry mode
pub const LCD_FLAG_ENTRYLEFT: u8 = 0x02; //  Uset to set text to flow from left to right
pub const LCD_FLAG_ENTRYSHIFTDECREMENT: u8 = 0x00; //  Used to 'left justify' text from the cursor

// flags for display on/off control
pub const LCD_FLAG_DISPLAYON: u8 = 0x04; //  Turns the display on
pub const LCD_FLAG_CURSORON: u8 = 0x02; //  Turns the cursor on
pub const LCD_FLAG_CURSOROFF: u8 = 0x00; //  Turns the cursor off
pub const LCD_FLAG_BLINKON: u8 = 0x01; //  Turns on the blinking cursor
pub const LCD_FLAG_BLINKOFF: u8 = 0x00; //  Turns off the blinking cursor

// flags for display/cursor shift
pub const LCD_FLAG_DISPLAYMOVE: u8 = 0x08; //  Flag for moving the display
pub const LCD_FLAG_MOVERIGHT: u8 = 0x04; //  Flag for moving right
pub const LCD_FLAG_MOVELEFT: u8 = 0x00; //  Flag for moving left

// flags for function set
pub const LCD_FLAG_4BITMODE: u8 = 0x00; //  LCD 4 bit mode
pub const LCD_FLAG_2LINE: u8 = 0x08; //  LCD 2 line mode
pub const LCD_FLAG_5x8_DOTS: u8 = 0x00; //  8 pixel high font mode

// power-on sequence
const LCD_INIT_WAKEUP: u8 = 0x33; //  Sent as a full byte: two "8 bit mode" nibbles
const LCD_INIT_8BIT_NIBBLE: u8 = 0x03; //  Forces 8 bit mode once more
const LCD_INIT_4BIT_NIBBLE: u8 = 0x02; //  Switches the interface to 4 bit mode
const LCD_INIT_SETTLE_MS: u32 = 5;

// DDRAM base addresses of the two display lines
const LCD_ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub const LCD_ROWS: u8 = 2;
pub const LCD_COLS: u8 = 16;

/// Longest decimal rendering of an `i32`: `-2147483648`.
const NUMBER_TEXT_CAPACITY: usize = 11;

/// Controller state of a display session. Created by `init`, after which the
/// stored values mirror what was last sent to the HD44780.
pub struct HD44780 {
    display_function: u8,
    display_control: u8,
    display_mode: u8,
}

impl Default for HD44780 {
    fn default() -> Self {
        Self {
            display_function: 0,
            display_control: 0,
            display_mode: 0,
        }
    }
}

impl HD44780 {
    /// Runs the HD44780 power-on sequence for 4 bit operation and leaves the display
    /// cleared, on, with the cursor hidden and the backlight on. On error the controller
    /// is in an unknown state and `init` has to be run again.
    pub fn init<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        #[cfg(feature = "defmt")]
        defmt::debug!("initializing HD44780 at {}", device.address());

        device.set_backlight(true);
        device.set_rs(false);

        self.send_byte(device, LCD_INIT_WAKEUP, Register::Command)?;
        device.delay().delay_ms(LCD_INIT_SETTLE_MS);
        device.write_nibble(LCD_INIT_8BIT_NIBBLE)?;
        device.delay().delay_ms(LCD_INIT_SETTLE_MS);
        device.write_nibble(LCD_INIT_4BIT_NIBBLE)?;
        device.delay().delay_ms(LCD_INIT_SETTLE_MS);

        self.display_function = LCD_FLAG_4BITMODE | LCD_FLAG_2LINE | LCD_FLAG_5x8_DOTS;
        self.send_byte(
            device,
            LCD_CMD_FUNCTIONSET | self.display_function,
            Register::Command,
        )?;

        self.display_control = LCD_FLAG_DISPLAYON | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF;
        self.send_byte(
            device,
            LCD_CMD_DISPLAYCONTROL | self.display_control,
            Register::Command,
        )?;

        self.display_mode = LCD_FLAG_ENTRYLEFT | LCD_FLAG_ENTRYSHIFTDECREMENT;
        self.send_byte(
            device,
            LCD_CMD_ENTRYMODESET | self.display_mode,
            Register::Command,
        )?;

        self.clear(device)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("HD44780 initialized");
        Ok(())
    }

    /// Sends one byte to the given register, high nibble first.
    pub fn send_byte<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        value: u8,
        register: Register,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        device.write_byte(register.rs_setting(), value)
    }

    pub fn clear<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_byte(device, LCD_CMD_CLEARDISPLAY, Register::Command)
    }

    pub fn home<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_byte(device, LCD_CMD_RETURNHOME, Register::Command)
    }

    /// Moves the cursor. Any row other than 0 selects the second line, and the column is
    /// added to the line's base address without a range check, so large columns wrap
    /// into other DDRAM addresses.
    pub fn set_cursor_position<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        row: u8,
        col: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        let row_offset = if row > 0 {
            LCD_ROW_OFFSETS[1]
        } else {
            LCD_ROW_OFFSETS[0]
        };
        self.send_byte(
            device,
            (LCD_CMD_SETDDRAMADDR | row_offset).wrapping_add(col),
            Register::Command,
        )
    }

    /// Same as `set_cursor_position`, but rejects positions outside of the 16x2 grid
    /// before anything is sent.
    pub fn set_cursor_position_checked<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        row: u8,
        col: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        if row >= LCD_ROWS {
            return Err(CharacterDisplayError::RowOutOfRange);
        }
        if col >= LCD_COLS {
            return Err(CharacterDisplayError::ColumnOutOfRange);
        }
        self.set_cursor_position(device, row, col)
    }

    /// Writes each character of `text` to the data register at the current cursor position.
    /// Characters are truncated to 8 bits, so only the controller's single byte character
    /// codes are meaningful.
    pub fn print<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        text: &str,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        for c in text.chars() {
            self.send_byte(device, c as u8, Register::Data)?;
        }
        Ok(())
    }

    pub fn write_text<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        text: &str,
        row: u8,
        col: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.set_cursor_position(device, row, col)?;
        self.print(device, text)
    }

    pub fn write_text_checked<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        text: &str,
        row: u8,
        col: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.set_cursor_position_checked(device, row, col)?;
        self.print(device, text)
    }

    /// Writes the decimal representation of `n` starting at the given position.
    pub fn write_number<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        n: i32,
        row: u8,
        col: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        let mut text: heapless::String<NUMBER_TEXT_CAPACITY> = heapless::String::new();
        write!(text, "{}", n)?;
        self.write_text(device, &text, row, col)
    }

    /// Switches the backlight and sends a no-op command so the new level is latched
    /// on the expander right away.
    pub fn set_backlight<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        on: bool,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        #[cfg(feature = "defmt")]
        defmt::trace!("backlight {}", on);

        device.set_backlight(on);
        self.send_byte(device, LCD_CMD_NOOP, Register::Command)
    }

    /// Shows a blinking cursor, or hides it. Either way the display stays on and the
    /// backlight is switched on.
    // TODO: stop forcing the backlight here once the coupling is confirmed unintended.
    pub fn set_cursor_visible<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        on: bool,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        device.set_backlight(true);
        self.display_control = if on {
            LCD_FLAG_DISPLAYON | LCD_FLAG_CURSORON | LCD_FLAG_BLINKON
        } else {
            LCD_FLAG_DISPLAYON | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF
        };
        self.send_byte(
            device,
            LCD_CMD_DISPLAYCONTROL | self.display_control,
            Register::Command,
        )
    }

    pub fn scroll_display_left<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_byte(
            device,
            LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVELEFT,
            Register::Command,
        )
    }

    pub fn scroll_display_right<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_byte(
            device,
            LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVERIGHT,
            Register::Command,
        )
    }

    /// Stores a 5x8 glyph in one of the eight CGRAM slots. Only the low 3 bits of
    /// `location` are used. The cursor address is left in CGRAM, so callers should
    /// position the cursor before printing again.
    pub fn create_char<I2C, DELAY>(
        &mut self,
        device: &mut Pcf8574Adapter<I2C, DELAY>,
        location: u8,
        charmap: [u8; 8],
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_byte(
            device,
            LCD_CMD_SETCGRAMADDR | ((location & 0x7) << 3),
            Register::Command,
        )?;
        for &charmap_byte in charmap.iter() {
            self.send_byte(device, charmap_byte, Register::Data)?;
        }
        Ok(())
    }

    pub fn display_function(&self) -> u8 {
        self.display_function
    }

    pub fn display_control(&self) -> u8 {
        self.display_control
    }

    pub fn display_mode(&self) -> u8 {
        self.display_mode
    }
}

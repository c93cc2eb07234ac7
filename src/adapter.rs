use bitfield::bitfield;
use embedded_hal::{delay::DelayNs, i2c};

use crate::{BackpackAddress, CharacterDisplayError};

/// Settle time after each write of the enable strobe sequence.
pub(crate) const NIBBLE_SETTLE_MS: u32 = 1;

// Pin layout of the PCF8574 backpack: P0-P3 carry the control lines, P4-P7 the
// upper four data lines of the HD44780.
bitfield! {
    pub struct Pcf8574BitField(u8);
    impl Debug;
    impl BitAnd;
    pub rs, set_rs: 0, 0;
    pub rw, set_rw: 1, 1;
    pub enable, set_enable: 2, 2;
    pub backlight, set_backlight: 3, 3;
    pub data, set_data: 7, 4;
}

impl Clone for Pcf8574BitField {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

/// Adapter based on the PCF8574 I2C GPIO expander interfacing with the HD44780 LCD controller
/// via a 4-bit interface. Owns the bus, the delay and the latched register-select and
/// backlight lines. The RW line is never raised: the adapter is write-only.
pub struct Pcf8574Adapter<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    i2c: I2C,
    delay: DELAY,
    address: BackpackAddress,
    bits: Pcf8574BitField,
}

impl<I2C, DELAY> Pcf8574Adapter<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    pub fn new(i2c: I2C, address: BackpackAddress, delay: DELAY) -> Self {
        Self {
            i2c,
            delay,
            address,
            bits: Pcf8574BitField(0),
        }
    }

    pub fn address(&self) -> BackpackAddress {
        self.address
    }

    /// returns the i2c object. mostly used for testing
    pub fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    pub fn delay(&mut self) -> &mut DELAY {
        &mut self.delay
    }

    pub fn release(self) -> (I2C, DELAY) {
        (self.i2c, self.delay)
    }

    /// Returns the current value of the expander output lines.
    pub fn bits(&self) -> u8 {
        self.bits.0
    }

    /// Sets the RS line. A value of `false` selects the instruction register, while `true`
    /// selects the data register.
    pub fn set_rs(&mut self, value: bool) {
        self.bits.set_rs(value as u8);
    }

    pub fn rs(&self) -> bool {
        self.bits.rs() != 0
    }

    /// Sets the backlight line. The new level only reaches the expander with the next write.
    pub fn set_backlight(&mut self, value: bool) {
        self.bits.set_backlight(value as u8);
    }

    pub fn backlight(&self) -> bool {
        self.bits.backlight() != 0
    }

    fn write_bits_to_gpio(&mut self) -> Result<(), CharacterDisplayError<I2C>> {
        let data = [self.bits.0];
        self.i2c
            .write(self.address.into(), &data)
            .map_err(CharacterDisplayError::BusError)?;
        Ok(())
    }

    /// Writes the lower nibble of `value` to the controller using the currently latched RS and
    /// backlight lines. The nibble is presented with enable low, strobed high, then dropped low
    /// again so the controller latches it on the falling edge. Each write is followed by
    /// a settle delay. Bits above the low nibble are ignored.
    pub fn write_nibble(&mut self, value: u8) -> Result<(), CharacterDisplayError<I2C>> {
        self.bits.set_rw(0);
        self.bits.set_data(value & 0x0F);

        self.bits.set_enable(0);
        self.write_bits_to_gpio()?;
        self.delay.delay_ms(NIBBLE_SETTLE_MS);

        self.bits.set_enable(1);
        self.write_bits_to_gpio()?;
        self.delay.delay_ms(NIBBLE_SETTLE_MS);

        self.bits.set_enable(0);
        self.write_bits_to_gpio()?;
        self.delay.delay_ms(NIBBLE_SETTLE_MS);

        Ok(())
    }

    /// Writes a full byte to the controller, high nibble first. If `rs_setting` is `true`, the
    /// byte goes to the data register (DDRAM or CGRAM, depending on the prior address command),
    /// otherwise to the instruction register.
    pub fn write_byte(&mut self, rs_setting: bool, value: u8) -> Result<(), CharacterDisplayError<I2C>> {
        self.set_rs(rs_setting);
        self.write_nibble(value >> 4)?;
        self.write_nibble(value & 0x0F)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::test_support::{byte_transactions, nibble_transactions, RecordingDelay};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        i2c::{Mock as I2cMock, Transaction as I2cTransaction},
    };

    #[test]
    fn test_pcf8574_bit_layout() {
        let mut bits = Pcf8574BitField(0);
        bits.set_rs(1);
        bits.set_rw(0);
        bits.set_enable(1);
        bits.set_backlight(1);
        bits.set_data(0b1010);
        assert_eq!(bits.0, 0b1010_1101);

        bits.set_rs(0);
        bits.set_rw(1);
        bits.set_enable(0);
        bits.set_backlight(0);
        bits.set_data(0b0101);
        assert_eq!(bits.0, 0b0101_0010);
    }

    #[test]
    fn test_write_nibble_strobe_sequence() {
        let expected_transactions = [
            I2cTransaction::write(0x27, std::vec![0b1010_1001]), // rs = 1, bl = 1, enable = 0
            I2cTransaction::write(0x27, std::vec![0b1010_1101]), // rs = 1, bl = 1, enable = 1
            I2cTransaction::write(0x27, std::vec![0b1010_1001]), // rs = 1, bl = 1, enable = 0
        ];
        let mut adapter = Pcf8574Adapter::new(
            I2cMock::new(&expected_transactions),
            BackpackAddress::AltBacklightBoard,
            NoopDelay,
        );
        adapter.set_rs(true);
        adapter.set_backlight(true);
        assert!(adapter.write_nibble(0b1010).is_ok());
        adapter.i2c().done();
    }

    #[test]
    fn test_write_nibble_every_value() {
        for nibble in 0..=0x0F_u8 {
            // idle, strobe, idle
            let idle = (nibble << 4) | 0b1000;
            let expected_transactions = [
                I2cTransaction::write(0x3F, std::vec![idle]),
                I2cTransaction::write(0x3F, std::vec![idle + 4]),
                I2cTransaction::write(0x3F, std::vec![idle]),
            ];
            let mut adapter = Pcf8574Adapter::new(
                I2cMock::new(&expected_transactions),
                BackpackAddress::StandardBackpack,
                NoopDelay,
            );
            adapter.set_backlight(true);
            assert!(adapter.write_nibble(nibble).is_ok());
            assert_eq!(adapter.bits() >> 4, nibble);
            adapter.i2c().done();
        }
    }

    #[test]
    fn test_write_nibble_masks_high_bits() {
        let expected_transactions = nibble_transactions(0x27, 0x06, false, false);
        let mut adapter = Pcf8574Adapter::new(
            I2cMock::new(&expected_transactions),
            BackpackAddress::AltBacklightBoard,
            NoopDelay,
        );
        assert!(adapter.write_nibble(0xF6).is_ok());
        adapter.i2c().done();
    }

    #[test]
    fn test_write_nibble_settle_delays() {
        let expected_transactions = nibble_transactions(0x27, 0x0A, false, false);
        let mut adapter = Pcf8574Adapter::new(
            I2cMock::new(&expected_transactions),
            BackpackAddress::AltBacklightBoard,
            RecordingDelay::default(),
        );
        assert!(adapter.write_nibble(0x0A).is_ok());
        let (mut i2c, delay) = adapter.release();
        i2c.done();
        assert_eq!(delay.delays_ms(), std::vec![1, 1, 1]);
    }

    #[test]
    fn test_write_byte() {
        let expected_transactions = [
            // write byte 0xDE with RS = 1, backlight off
            I2cTransaction::write(0x27, std::vec![0b1101_0001]), // high nibble, enable = 0
            I2cTransaction::write(0x27, std::vec![0b1101_0101]), // high nibble, enable = 1
            I2cTransaction::write(0x27, std::vec![0b1101_0001]), // high nibble, enable = 0
            I2cTransaction::write(0x27, std::vec![0b1110_0001]), // low nibble, enable = 0
            I2cTransaction::write(0x27, std::vec![0b1110_0101]), // low nibble, enable = 1
            I2cTransaction::write(0x27, std::vec![0b1110_0001]), // low nibble, enable = 0
            // write byte 0xAD with RS = 0, backlight off
            I2cTransaction::write(0x27, std::vec![0b1010_0000]),
            I2cTransaction::write(0x27, std::vec![0b1010_0100]),
            I2cTransaction::write(0x27, std::vec![0b1010_0000]),
            I2cTransaction::write(0x27, std::vec![0b1101_0000]),
            I2cTransaction::write(0x27, std::vec![0b1101_0100]),
            I2cTransaction::write(0x27, std::vec![0b1101_0000]),
        ];
        let mut adapter = Pcf8574Adapter::new(
            I2cMock::new(&expected_transactions),
            BackpackAddress::AltBacklightBoard,
            NoopDelay,
        );
        assert!(adapter.write_byte(true, 0xDE).is_ok());
        assert!(adapter.write_byte(false, 0xAD).is_ok());
        adapter.i2c().done();
    }

    #[test]
    fn test_write_byte_every_value() {
        for value in 0..=0xFF_u8 {
            for rs in [false, true] {
                let expected_transactions = byte_transactions(0x27, value, rs, true);
                let mut adapter = Pcf8574Adapter::new(
                    I2cMock::new(&expected_transactions),
                    BackpackAddress::AltBacklightBoard,
                    NoopDelay,
                );
                adapter.set_backlight(true);
                assert!(adapter.write_byte(rs, value).is_ok());
                adapter.i2c().done();
                assert_eq!(adapter.rs(), rs);
                assert!(adapter.backlight());
            }
        }
    }

    #[test]
    fn test_write_nibble_stops_on_strobe_failure() {
        let expected_transactions = [
            I2cTransaction::write(0x27, std::vec![0b0011_0000]),
            I2cTransaction::write(0x27, std::vec![0b0011_0100]).with_error(ErrorKind::Other),
        ];
        let mut adapter = Pcf8574Adapter::new(
            I2cMock::new(&expected_transactions),
            BackpackAddress::AltBacklightBoard,
            NoopDelay,
        );
        assert!(matches!(
            adapter.write_nibble(0x03),
            Err(CharacterDisplayError::BusError(ErrorKind::Other))
        ));
        adapter.i2c().done();
    }

    #[test]
    fn test_write_byte_stops_on_second_nibble_failure() {
        let mut expected_transactions = std::vec::Vec::new();
        expected_transactions.extend(nibble_transactions(0x27, 0x04, true, false));
        expected_transactions
            .push(I2cTransaction::write(0x27, std::vec![0b1000_0001]).with_error(ErrorKind::Other));
        let mut adapter = Pcf8574Adapter::new(
            I2cMock::new(&expected_transactions),
            BackpackAddress::AltBacklightBoard,
            NoopDelay,
        );
        assert!(matches!(
            adapter.write_byte(true, 0x48),
            Err(CharacterDisplayError::BusError(ErrorKind::Other))
        ));
        // the mock panics on any write past the failing one
        adapter.i2c().done();
    }
}

// Shared helpers for the unit tests. Expected bus traffic is built from the
// PCF8574 pin layout directly instead of through the adapter bit field.
extern crate std;

use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::i2c::Transaction as I2cTransaction;

/// The three expander writes (idle, strobe, idle) for one nibble.
pub fn nibble_transactions(address: u8, nibble: u8, rs: bool, backlight: bool) -> Vec<I2cTransaction> {
    let backlight_bit: u8 = if backlight { 0b1000 } else { 0 };
    let idle = ((nibble & 0x0F) << 4) | backlight_bit | rs as u8;
    std::vec![
        I2cTransaction::write(address, std::vec![idle]),
        I2cTransaction::write(address, std::vec![idle | 0b0100]),
        I2cTransaction::write(address, std::vec![idle]),
    ]
}

/// The six expander writes for a full byte, high nibble first.
pub fn byte_transactions(address: u8, value: u8, rs: bool, backlight: bool) -> Vec<I2cTransaction> {
    let mut transactions = nibble_transactions(address, value >> 4, rs, backlight);
    transactions.extend(nibble_transactions(address, value & 0x0F, rs, backlight));
    transactions
}

pub fn command_transactions(address: u8, value: u8) -> Vec<I2cTransaction> {
    byte_transactions(address, value, false, true)
}

pub fn data_transactions(address: u8, value: u8) -> Vec<I2cTransaction> {
    byte_transactions(address, value, true, true)
}

/// Bus traffic of the cold-start sequence with the backlight on.
pub fn init_transactions(address: u8) -> Vec<I2cTransaction> {
    let mut transactions = command_transactions(address, 0x33);
    transactions.extend(nibble_transactions(address, 0x03, false, true));
    transactions.extend(nibble_transactions(address, 0x02, false, true));
    for command in [0x28, 0x0C, 0x06, 0x01] {
        transactions.extend(command_transactions(address, command));
    }
    transactions
}

/// Delay that records every requested pause in milliseconds.
#[derive(Default)]
pub struct RecordingDelay {
    delays_ms: Vec<u32>,
}

impl RecordingDelay {
    pub fn delays_ms(&self) -> Vec<u32> {
        self.delays_ms.clone()
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delays_ms.push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}

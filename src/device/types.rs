use crate::error::ErrorKind;

/// Which protocol mode the device is currently confirmed to be in.
///
/// Transitions happen only when the matching banner (or the hardware-reset
/// write in the case of [`Mode::Resetting`]) has been observed on the wire;
/// the host never assumes a mode on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No handshake has completed, or the device was reset.
    Unknown,
    /// Raw bit-bang mode, confirmed by the `BBIO1` banner.
    Bitbang,
    /// I2C mode, confirmed by the `I2C1` banner.
    I2c,
    /// UART mode, confirmed by the `ART1` banner.
    Uart,
    /// The hardware-reset byte has been written and the device is rebooting.
    Resetting,
}

/// Notifications published on the event channel.
///
/// Events are a secondary observation channel; the future returned by each
/// operation is the canonical completion signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    /// Bit-bang mode confirmed, the device is ready for commands.
    Ready,
    ModeReset,
    I2cReady,
    I2cConfigured,
    I2cWriteComplete,
    I2cReadStart,
    /// One byte of a streaming read, emitted the moment it is consumed.
    I2cReadData(u8),
    I2cReadComplete,
    I2cReadError,
    UartReady,
    UartSpeedSet,
    UartConfigured,
    Error { kind: ErrorKind, detail: String },
}

/// Peripheral switches shared by the I2C configuration command and the UART
/// peripheral command. Both encode into `0x40` plus one bit per switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeripheralConfig {
    /// Power to the 3.3V and 5V pins.
    pub power: bool,
    /// On-board pull-up resistors.
    pub pullups: bool,
    /// AUX pin level.
    pub aux: bool,
    /// CS pin level.
    pub cs: bool,
}

impl PeripheralConfig {
    pub(crate) fn command_byte(self) -> u8 {
        let mut byte = CMD_PERIPHERALS_BASE;
        if self.power {
            byte |= 1 << 3;
        }
        if self.pullups {
            byte |= 1 << 2;
        }
        if self.aux {
            byte |= 1 << 1;
        }
        if self.cs {
            byte |= 1;
        }
        byte
    }
}

/// Hard ceiling for one bulk write: the payload length rides in a 4-bit
/// field of the command byte.
pub const MAX_BULK_WRITE: usize = 16;

/// Largest read count expressible to the combined write-then-read command.
pub const MAX_COMBINED_READ: usize = 4096;

// ============================================================================
// Wire command bytes (host -> device)
// ============================================================================

/// Enter (or confirm) raw bit-bang mode.
pub(crate) const CMD_ENTER_BITBANG: u8 = 0x00;
/// Reboot the device out of binary mode.
pub(crate) const CMD_HARDWARE_RESET: u8 = 0x0F;
/// Enter I2C mode from bit-bang.
pub(crate) const CMD_ENTER_I2C: u8 = 0x02;
/// Enter UART mode from bit-bang.
pub(crate) const CMD_ENTER_UART: u8 = 0x03;
/// Peripheral switches, low nibble carries the flag bits.
pub(crate) const CMD_PERIPHERALS_BASE: u8 = 0x40;
/// I2C bulk write, low nibble carries `payload length - 1`.
pub(crate) const CMD_I2C_BULK_WRITE: u8 = 0x10;
/// I2C combined write-then-read frame.
pub(crate) const CMD_I2C_WRITE_THEN_READ: u8 = 0x08;
/// UART baud selection, low nibble carries the speed code.
pub(crate) const CMD_UART_SPEED_BASE: u8 = 0x60;
/// UART line configuration bits.
pub(crate) const CMD_UART_CONFIG_BASE: u8 = 0x80;
/// UART bulk write, low nibble carries `chunk length - 1`.
pub(crate) const CMD_UART_BULK_WRITE: u8 = 0x10;
pub(crate) const CMD_UART_ECHO_ON: u8 = 0x02;
pub(crate) const CMD_UART_ECHO_OFF: u8 = 0x03;

// ============================================================================
// Device reply tokens
// ============================================================================

pub(crate) const BANNER_BITBANG: &str = "BBIO1";
/// Prefix of the bit-bang banner, used to spot an accidental reset while a
/// four-character mode banner is awaited.
pub(crate) const BANNER_BITBANG_PREFIX: &str = "BBIO";
pub(crate) const BANNER_I2C: &str = "I2C1";
pub(crate) const BANNER_UART: &str = "ART1";

pub(crate) const ACK: u8 = 0x01;
pub(crate) const NACK: u8 = 0x00;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peripheral_byte_with_all_switches_off() {
        assert_eq!(PeripheralConfig::default().command_byte(), 0x40);
    }

    #[test]
    fn peripheral_byte_with_all_switches_on() {
        let all = PeripheralConfig {
            power: true,
            pullups: true,
            aux: true,
            cs: true,
        };
        assert_eq!(all.command_byte(), 0x4F);
    }

    #[test]
    fn peripheral_byte_sets_each_bit_independently() {
        let power = PeripheralConfig {
            power: true,
            ..Default::default()
        };
        assert_eq!(power.command_byte(), 0x48);
        let pullups = PeripheralConfig {
            pullups: true,
            ..Default::default()
        };
        assert_eq!(pullups.command_byte(), 0x44);
        let aux = PeripheralConfig {
            aux: true,
            ..Default::default()
        };
        assert_eq!(aux.command_byte(), 0x42);
        let cs = PeripheralConfig {
            cs: true,
            ..Default::default()
        };
        assert_eq!(cs.command_byte(), 0x41);
    }
}

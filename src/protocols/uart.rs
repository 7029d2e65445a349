//! UART operation engine.
//!
//! Mirrors the I2C engine's polling discipline for mode entry and speed
//! selection. The remaining commands (line configuration, RX echo,
//! peripherals, bulk writes) are fire-and-forget: no observed firmware
//! revision acknowledges them, and that asymmetry with I2C is preserved
//! rather than papered over.

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::device::{
    BusPirate, Event, Mode, PeripheralConfig, BANNER_UART, CMD_ENTER_UART, CMD_UART_BULK_WRITE,
    CMD_UART_CONFIG_BASE, CMD_UART_ECHO_OFF, CMD_UART_ECHO_ON, CMD_UART_SPEED_BASE,
    MAX_BULK_WRITE,
};
use crate::error::{Error, Result};

/// UART capability handle, obtained from [`BusPirate::uart`].
pub struct Uart<'bp, T> {
    bp: &'bp mut BusPirate<T>,
}

/// The baud rates the firmware's speed command can express, as a 4-bit code
/// OR'd into `0x60`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartSpeed {
    B300,
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B31250,
    B38400,
    B57600,
    B115200,
}

impl UartSpeed {
    /// Looks up a numeric baud rate in the firmware's table.
    pub fn from_baud(baud: u32) -> Result<Self> {
        match baud {
            300 => Ok(UartSpeed::B300),
            1200 => Ok(UartSpeed::B1200),
            2400 => Ok(UartSpeed::B2400),
            4800 => Ok(UartSpeed::B4800),
            9600 => Ok(UartSpeed::B9600),
            19_200 => Ok(UartSpeed::B19200),
            31_250 => Ok(UartSpeed::B31250),
            38_400 => Ok(UartSpeed::B38400),
            57_600 => Ok(UartSpeed::B57600),
            115_200 => Ok(UartSpeed::B115200),
            other => Err(Error::InvalidArgument(format!(
                "unsupported baud rate {}",
                other
            ))),
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            UartSpeed::B300 => 0b0000,
            UartSpeed::B1200 => 0b0001,
            UartSpeed::B2400 => 0b0010,
            UartSpeed::B4800 => 0b0011,
            UartSpeed::B9600 => 0b0100,
            UartSpeed::B19200 => 0b0101,
            UartSpeed::B31250 => 0b0110,
            UartSpeed::B38400 => 0b0111,
            UartSpeed::B57600 => 0b1000,
            // The 0b1001 slot is unused in the firmware's table.
            UartSpeed::B115200 => 0b1010,
        }
    }
}

/// Pin-output drive for the UART lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PinOutput {
    #[default]
    HiZ,
    V3_3,
}

/// Data bits and parity, four states in a two-bit field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataBitsParity {
    #[default]
    EightNone,
    EightEven,
    EightOdd,
    NineNone,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Polarity {
    #[default]
    IdleHigh,
    IdleLow,
}

/// UART line configuration. The default equals the firmware's defaults, so
/// configuring with it writes the bare base byte `0x80`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UartConfig {
    pub pin_output: PinOutput,
    pub data_bits: DataBitsParity,
    pub stop_bits: StopBits,
    pub polarity: Polarity,
}

impl UartConfig {
    pub(crate) fn command_byte(self) -> u8 {
        let mut byte = CMD_UART_CONFIG_BASE;
        if self.pin_output == PinOutput::V3_3 {
            byte |= 1 << 4;
        }
        byte |= (self.data_bits as u8) << 2;
        if self.stop_bits == StopBits::Two {
            byte |= 1 << 1;
        }
        if self.polarity == Polarity::IdleLow {
            byte |= 1;
        }
        byte
    }
}

impl<'bp, T: AsyncRead + AsyncWrite + Unpin> Uart<'bp, T> {
    pub(crate) fn new(bp: &'bp mut BusPirate<T>) -> Self {
        Self { bp }
    }

    /// Switches the device into UART mode.
    ///
    /// UART entry must start from a known state, so the device is always
    /// driven back into raw bit-bang first, then sent the UART entry byte.
    /// The same accidental-reset recovery applies as for I2C: a `BBIO`
    /// banner during the `ART1` wait re-issues the entry byte.
    pub async fn init(&mut self) -> Result<()> {
        if matches!(self.bp.mode, Mode::Unknown | Mode::Resetting) {
            return Err(self
                .bp
                .report(Error::InvalidState("uart init requires a started connection")));
        }
        self.bp.enter_bitbang().await?;
        self.bp.mode = Mode::Bitbang;
        info!("entering uart mode");
        self.bp.enter_mode(CMD_ENTER_UART, BANNER_UART).await?;
        self.bp.mode = Mode::Uart;
        self.bp.emit(Event::UartReady);
        Ok(())
    }

    /// Selects the link speed and waits for the acknowledgment byte.
    ///
    /// Only the rates in [`UartSpeed`]'s table are accepted; anything else
    /// fails before a single byte is written.
    pub async fn set_speed(&mut self, baud: u32) -> Result<()> {
        self.ensure_active()?;
        let speed = match UartSpeed::from_baud(baud) {
            Ok(speed) => speed,
            Err(e) => return Err(self.bp.report(e)),
        };
        debug!("uart speed {} (code {:#06b})", baud, speed.code());
        self.bp.send(&[CMD_UART_SPEED_BASE | speed.code()]).await?;
        let interval = self.bp.config.poll_interval;
        self.bp.wait_for_ack(interval).await?;
        self.bp.emit(Event::UartSpeedSet);
        Ok(())
    }

    /// Writes the line-configuration byte. Fire-and-forget: no ACK is
    /// awaited (unverified whether newer firmware sends one).
    pub async fn configure(&mut self, config: UartConfig) -> Result<()> {
        self.ensure_active()?;
        let byte = config.command_byte();
        debug!("uart config byte {:#04x}", byte);
        self.bp.send(&[byte]).await?;
        self.bp.emit(Event::UartConfigured);
        Ok(())
    }

    /// Enables or suppresses echoing of received data. Fire-and-forget.
    pub async fn set_rx_echo(&mut self, enabled: bool) -> Result<()> {
        self.ensure_active()?;
        let byte = if enabled {
            CMD_UART_ECHO_ON
        } else {
            CMD_UART_ECHO_OFF
        };
        self.bp.send(&[byte]).await
    }

    /// Sets the peripheral switches. Same bit layout as the I2C config
    /// command, but a distinct UART command. Fire-and-forget.
    pub async fn set_peripherals(&mut self, peripherals: PeripheralConfig) -> Result<()> {
        self.ensure_active()?;
        self.bp.send(&[peripherals.command_byte()]).await
    }

    /// Transmits `data` in chunks of at most 16 bytes, each prefixed with
    /// the bulk-write header carrying `chunk length - 1`. Fire-and-forget
    /// per chunk.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_active()?;
        for chunk in data.chunks(MAX_BULK_WRITE) {
            let mut frame = Vec::with_capacity(chunk.len() + 1);
            frame.push(CMD_UART_BULK_WRITE | (chunk.len() as u8 - 1));
            frame.extend_from_slice(chunk);
            self.bp.send(&frame).await?;
        }
        Ok(())
    }

    fn ensure_active(&mut self) -> Result<()> {
        if self.bp.mode != Mode::Uart {
            return Err(self
                .bp
                .report(Error::InvalidState("uart mode is not active")));
        }
        Ok(())
    }
}

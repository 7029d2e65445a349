//! I2C operation engine.
//!
//! Layered on the mode state machine: apart from [`init`](I2c::init), every
//! operation requires I2C mode to be confirmed active and fails with
//! `InvalidState` otherwise.

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::device::{
    BusPirate, Event, Mode, PeripheralConfig, ACK, BANNER_I2C, CMD_ENTER_I2C, CMD_I2C_BULK_WRITE,
    CMD_I2C_WRITE_THEN_READ, MAX_COMBINED_READ, NACK,
};
use crate::error::{Error, Result};

/// I2C capability handle, obtained from [`BusPirate::i2c`].
pub struct I2c<'bp, T> {
    bp: &'bp mut BusPirate<T>,
}

impl<'bp, T: AsyncRead + AsyncWrite + Unpin> I2c<'bp, T> {
    pub(crate) fn new(bp: &'bp mut BusPirate<T>) -> Self {
        Self { bp }
    }

    /// Switches the device into I2C mode.
    ///
    /// Requires the bit-bang handshake to have completed. If UART mode is
    /// active the device is first driven back into raw bit-bang, since the
    /// two modes are mutually exclusive. A `BBIO` banner observed while
    /// waiting for `I2C1` means the device reset itself; the entry byte is
    /// re-sent and the wait continues.
    pub async fn init(&mut self) -> Result<()> {
        match self.bp.mode {
            Mode::Unknown | Mode::Resetting => {
                return Err(self
                    .bp
                    .report(Error::InvalidState("i2c init requires a started connection")));
            }
            Mode::Uart => {
                self.bp.enter_bitbang().await?;
                self.bp.mode = Mode::Bitbang;
            }
            Mode::Bitbang | Mode::I2c => {}
        }
        info!("entering i2c mode");
        self.bp.enter_mode(CMD_ENTER_I2C, BANNER_I2C).await?;
        self.bp.mode = Mode::I2c;
        self.bp.emit(Event::I2cReady);
        Ok(())
    }

    /// Sets the peripheral switches (power, pull-ups, AUX, CS) and waits for
    /// the single acknowledgment byte.
    pub async fn configure(&mut self, peripherals: PeripheralConfig) -> Result<()> {
        self.ensure_active()?;
        let byte = peripherals.command_byte();
        debug!("i2c config byte {:#04x}", byte);
        self.bp.send(&[byte]).await?;
        let interval = self.bp.config.poll_interval;
        self.bp.wait_for_ack(interval).await?;
        self.bp.emit(Event::I2cConfigured);
        Ok(())
    }

    /// Bulk-writes `register` followed by `data`, one acknowledged byte at a
    /// time.
    ///
    /// The firmware reports a per-byte ACK for every payload byte, so each
    /// byte is written only after the previous one was acknowledged. The
    /// whole payload (register byte included) must fit the configured bulk
    /// write limit.
    pub async fn write(&mut self, register: u8, data: &[u8]) -> Result<()> {
        self.ensure_active()?;
        if data.is_empty() {
            return Err(self.bp.report(Error::InvalidArgument(
                "bulk write needs at least one data byte".into(),
            )));
        }
        let payload_len = data.len() + 1;
        let limit = self.bp.config.i2c_write_limit;
        if payload_len > limit {
            return Err(self.bp.report(Error::InvalidArgument(format!(
                "bulk write takes at most {} bytes including the register, got {}",
                limit, payload_len
            ))));
        }
        debug!(
            "i2c bulk write, register {:#04x}, {} data byte(s)",
            register,
            data.len()
        );
        let interval = self.bp.config.ack_interval;
        self.bp
            .send(&[CMD_I2C_BULK_WRITE | (payload_len as u8 - 1)])
            .await?;
        self.bp.wait_for_ack(interval).await?;
        self.bp.send(&[register]).await?;
        self.bp.wait_for_ack(interval).await?;
        for &byte in data {
            self.bp.send(&[byte]).await?;
            self.bp.wait_for_ack(interval).await?;
        }
        self.bp.emit(Event::I2cWriteComplete);
        Ok(())
    }

    /// Combined write-then-read: addresses the target, then streams
    /// `num_bytes` bytes back.
    ///
    /// Each byte is emitted as [`Event::I2cReadData`] the moment it is
    /// consumed from the intake queue; the collected bytes are also returned.
    /// A `0x00` status means the target NACKed the transaction.
    pub async fn read_from(
        &mut self,
        address: u8,
        register: u8,
        num_bytes: usize,
    ) -> Result<Vec<u8>> {
        self.ensure_active()?;
        if num_bytes == 0 || num_bytes > MAX_COMBINED_READ {
            return Err(self.bp.report(Error::InvalidArgument(format!(
                "read count must be between 1 and {}, got {}",
                MAX_COMBINED_READ, num_bytes
            ))));
        }
        debug!(
            "i2c read: {} byte(s) from address {:#04x}, register {:#04x}",
            num_bytes, address, register
        );

        // Command frame: op byte, write count (always address + register),
        // read count, then the two bytes to write. Counts are big-endian.
        let mut frame = [0u8; 7];
        frame[0] = CMD_I2C_WRITE_THEN_READ;
        frame[1..3].copy_from_slice(&2u16.to_be_bytes());
        frame[3..5].copy_from_slice(&(num_bytes as u16).to_be_bytes());
        frame[5] = address;
        frame[6] = register;
        self.bp.send(&frame).await?;

        let interval = self.bp.config.poll_interval;
        let deadline = self.bp.deadline();
        loop {
            self.bp.check_deadline(deadline)?;
            if let Some(status) = self.bp.queue.try_consume_bytes(1) {
                match status[0] {
                    ACK => break,
                    NACK => {
                        self.bp.queue.flush();
                        self.bp.emit(Event::I2cReadError);
                        return Err(self
                            .bp
                            .report(Error::DeviceNack("i2c read rejected by target")));
                    }
                    // Not a status byte yet, keep waiting.
                    _ => {}
                }
                continue;
            }
            self.bp.poll_intake(interval).await?;
        }
        self.bp.emit(Event::I2cReadStart);

        let mut received = Vec::with_capacity(num_bytes);
        while received.len() < num_bytes {
            self.bp.check_deadline(deadline)?;
            if let Some(byte) = self.bp.queue.try_consume_bytes(1) {
                self.bp.emit(Event::I2cReadData(byte[0]));
                received.push(byte[0]);
                continue;
            }
            self.bp.poll_intake(interval).await?;
        }
        self.bp.queue.flush();
        self.bp.emit(Event::I2cReadComplete);
        Ok(received)
    }

    fn ensure_active(&mut self) -> Result<()> {
        if self.bp.mode != Mode::I2c {
            return Err(self.bp.report(Error::InvalidState("i2c mode is not active")));
        }
        Ok(())
    }
}

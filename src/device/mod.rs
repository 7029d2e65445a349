//! Connection handle and mode state machine.
//!
//! [`BusPirate`] owns the byte-stream transport and the intake queue, and is
//! the only holder of mutable protocol state. Mode transitions are driven by
//! banner tokens received from the device; the host never assumes a mode it
//! has not seen confirmed on the wire.

use std::io;
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::protocols::i2c::I2c;
use crate::protocols::uart::Uart;
use crate::queue::InputQueue;

mod config;
mod types;

pub use config::*;
pub use types::*;

/// A live session with the device.
///
/// Exactly one protocol operation may be in flight at a time; every
/// operation takes `&mut self` (directly or through a capability handle from
/// [`i2c`](Self::i2c) / [`uart`](Self::uart)), so overlapping commands are
/// ruled out at compile time.
pub struct BusPirate<T> {
    pub(crate) stream: T,
    pub(crate) config: Config,
    pub(crate) queue: InputQueue,
    pub(crate) mode: Mode,
    cancel: CancellationToken,
    events: Option<mpsc::UnboundedSender<Event>>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> BusPirate<T> {
    /// Wraps an open byte stream. The stream stays in terminal mode until
    /// [`start`](Self::start) completes the bit-bang handshake.
    pub fn new(stream: T, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stream,
            config,
            queue: InputQueue::new(),
            mode: Mode::Unknown,
            cancel: CancellationToken::new(),
            events: None,
        })
    }

    /// Attaches an event receiver. Replaces any previous subscription.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// The last mode confirmed by a device banner.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// A token that aborts any in-flight wait loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// I2C capability handle. Operations other than `init` require I2C mode
    /// to be confirmed active.
    pub fn i2c(&mut self) -> I2c<'_, T> {
        I2c::new(self)
    }

    /// UART capability handle.
    pub fn uart(&mut self) -> Uart<'_, T> {
        Uart::new(self)
    }

    /// Consumes the handle and returns the underlying stream.
    pub fn release(self) -> T {
        self.stream
    }

    /// Drives the device into raw bit-bang mode: `0x00` probes at the poll
    /// interval until the `BBIO1` banner arrives.
    pub async fn start(&mut self) -> Result<()> {
        self.emit(Event::Connected);
        info!("entering bitbang mode");
        self.enter_bitbang().await?;
        self.mode = Mode::Bitbang;
        self.emit(Event::Ready);
        Ok(())
    }

    /// Reboots the device: re-confirms bit-bang mode, then writes the
    /// hardware-reset byte. The device falls back to its terminal mode and
    /// needs a fresh [`start`](Self::start) afterwards.
    pub async fn reset(&mut self) -> Result<()> {
        info!("resetting device");
        self.enter_bitbang().await?;
        self.mode = Mode::Resetting;
        self.send(&[CMD_HARDWARE_RESET]).await?;
        self.queue.flush();
        self.mode = Mode::Unknown;
        self.emit(Event::ModeReset);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Shared wait loops used by the mode machine and both engines
    // ------------------------------------------------------------------

    /// Probes with `0x00` until the five-character `BBIO1` banner is
    /// consumed. Stray tokens are discarded and the wait retried; only the
    /// deadline or cancellation escapes the loop.
    pub(crate) async fn enter_bitbang(&mut self) -> Result<()> {
        let deadline = self.deadline();
        let interval = self.config.poll_interval;
        self.queue.flush();
        loop {
            self.check_deadline(deadline)?;
            self.send(&[CMD_ENTER_BITBANG]).await?;
            self.poll_intake(interval).await?;
            if let Some(token) = self.queue.try_consume_text(BANNER_BITBANG.len()) {
                if token == BANNER_BITBANG {
                    self.queue.flush();
                    return Ok(());
                }
                trace!("discarding stray token {:?}", token);
                self.queue.flush();
            }
        }
    }

    /// Sends a mode-entry byte and waits for its four-character banner.
    ///
    /// Seeing `BBIO` instead means the device reset itself (a malformed
    /// prior command makes it fall back to bit-bang); the entry byte is
    /// re-issued and the wait continues.
    pub(crate) async fn enter_mode(&mut self, entry: u8, banner: &str) -> Result<()> {
        let deadline = self.deadline();
        let interval = self.config.poll_interval;
        self.queue.flush();
        self.send(&[entry]).await?;
        loop {
            self.check_deadline(deadline)?;
            if let Some(token) = self.queue.try_consume_text(banner.len()) {
                if token == banner {
                    self.queue.flush();
                    return Ok(());
                }
                if token == BANNER_BITBANG_PREFIX {
                    debug!("device reset itself, re-sending mode entry {:#04x}", entry);
                    self.queue.flush();
                    self.send(&[entry]).await?;
                } else {
                    trace!("discarding stray token {:?}", token);
                    self.queue.flush();
                }
                continue;
            }
            self.poll_intake(interval).await?;
        }
    }

    /// Waits for the single `0x01` acknowledgment byte. Anything else is
    /// treated as "not yet" and retried until the deadline.
    pub(crate) async fn wait_for_ack(&mut self, interval: Duration) -> Result<()> {
        let deadline = self.deadline();
        loop {
            self.check_deadline(deadline)?;
            if let Some(byte) = self.queue.try_consume_bytes(1) {
                if byte[0] == ACK {
                    self.queue.flush();
                    return Ok(());
                }
                trace!("ignoring non-ack byte {:#04x}", byte[0]);
                continue;
            }
            self.poll_intake(interval).await?;
        }
    }

    /// One intake step: read whatever the transport has, or give up after
    /// `interval`, racing both against cancellation.
    pub(crate) async fn poll_intake(&mut self, interval: Duration) -> Result<()> {
        let mut chunk = [0u8; 512];
        let outcome: Result<usize> = tokio::select! {
            read = self.stream.read(&mut chunk) => match read {
                Ok(0) => Err(Error::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream closed",
                ))),
                Ok(n) => Ok(n),
                Err(e) => Err(Error::Transport(e)),
            },
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = sleep(interval) => Ok(0),
        };
        match outcome {
            Ok(0) => Ok(()),
            Ok(n) => {
                trace!("intake: {} byte(s)", n);
                self.queue.append(&chunk[..n]);
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    pub(crate) async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        trace!("write: {:02X?}", bytes);
        if let Err(e) = self.stream.write_all(bytes).await {
            return Err(self.report(Error::Transport(e)));
        }
        if let Err(e) = self.stream.flush().await {
            return Err(self.report(Error::Transport(e)));
        }
        Ok(())
    }

    pub(crate) fn deadline(&self) -> Instant {
        Instant::now() + self.config.timeout
    }

    /// Fails the current wait once its deadline has passed. The queue is
    /// flushed so a late reply cannot corrupt the next phase; mode flags are
    /// left untouched and the connection stays usable.
    pub(crate) fn check_deadline(&mut self, deadline: Instant) -> Result<()> {
        if Instant::now() >= deadline {
            self.queue.flush();
            return Err(self.report(Error::Timeout));
        }
        Ok(())
    }

    pub(crate) fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            // A dropped receiver just means nobody is watching.
            let _ = tx.send(event);
        }
    }

    /// Publishes a failure on the event channel and hands it back for `?`.
    pub(crate) fn report(&self, err: Error) -> Error {
        warn!("{}", err);
        self.emit(Event::Error {
            kind: err.kind(),
            detail: err.to_string(),
        });
        err
    }
}

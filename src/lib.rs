//! Bus Pirate host driver
//!
//! This library drives a Bus Pirate adapter over its binary command protocol,
//! turning the unframed serial byte stream into reliable mode transitions and
//! request/response exchanges.
//!
//! # Features
//! - Bit-bang handshake with banner detection and reset recovery
//! - I2C mode: peripheral configuration, acknowledged bulk writes, streaming
//!   combined write-then-read
//! - UART mode: baud selection, line configuration, peripheral control,
//!   chunked transmit
//! - Deadline-bounded, cancellable polling on every wait
//! - Event channel mirroring every completion and failure
//!
//! # Examples
//!
//! ## Reading from an I2C sensor
//! ```no_run
//! use buspirate::{Config, PeripheralConfig};
//!
//! #[tokio::main]
//! async fn main() -> buspirate::Result<()> {
//!     let mut bp = buspirate::open("/dev/ttyUSB0", Config::default())?;
//!     bp.start().await?;
//!
//!     let mut i2c = bp.i2c();
//!     i2c.init().await?;
//!     i2c.configure(PeripheralConfig {
//!         power: true,
//!         pullups: true,
//!         ..Default::default()
//!     })
//!     .await?;
//!     let bytes = i2c.read_from(0x29, 0x3A, 3).await?;
//!     println!("{:02X?}", bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Driving a UART peripheral
//! ```no_run
//! use buspirate::{Config, UartConfig};
//!
//! #[tokio::main]
//! async fn main() -> buspirate::Result<()> {
//!     let mut bp = buspirate::open("/dev/ttyUSB0", Config::default())?;
//!     bp.start().await?;
//!
//!     let mut uart = bp.uart();
//!     uart.init().await?;
//!     uart.set_speed(9600).await?;
//!     uart.configure(UartConfig::default()).await?;
//!     uart.write(b"hello").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Watching the event stream
//! ```no_run
//! use buspirate::{Config, Event};
//!
//! #[tokio::main]
//! async fn main() -> buspirate::Result<()> {
//!     let mut bp = buspirate::open("/dev/ttyUSB0", Config::default())?;
//!     let mut events = bp.subscribe();
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("{:?}", event);
//!         }
//!     });
//!     bp.start().await
//! }
//! ```

mod device;
mod error;
mod protocols;
mod queue;

pub use device::{
    BusPirate, Config, Event, Mode, PeripheralConfig, MAX_BULK_WRITE, MAX_COMBINED_READ,
};
pub use error::{Error, ErrorKind, Result};
pub use protocols::i2c::I2c;
pub use protocols::uart::{
    DataBitsParity, PinOutput, Polarity, StopBits, Uart, UartConfig, UartSpeed,
};

use tokio_serial::SerialPortBuilderExt;

/// The Bus Pirate's fixed control-link speed.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Opens the serial device at the control-link speed and wraps it in a
/// driver handle. Call [`BusPirate::start`] to run the handshake.
pub fn open(path: &str, config: Config) -> Result<BusPirate<tokio_serial::SerialStream>> {
    let stream = tokio_serial::new(path, DEFAULT_BAUD)
        .open_native_async()
        .map_err(|e| Error::Configuration(format!("cannot open {}: {}", path, e)))?;
    BusPirate::new(stream, config)
}

/// Names of the serial ports visible on this host. Discovery glue for
/// callers that want to prompt for a device.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()
        .map_err(|e| Error::Configuration(e.to_string()))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

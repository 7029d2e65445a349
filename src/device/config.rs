use std::time::Duration;

use super::types::MAX_BULK_WRITE;
use crate::error::{Error, Result};

/// Driver tuning knobs.
///
/// The defaults match the cadence of the device firmware: banner waits poll
/// every 10 ms, per-byte ACK waits every 50 ms, and every operation gives up
/// after five seconds. The link itself runs at 115200 bps, so nothing here
/// needs sub-millisecond precision.
#[derive(Debug, Clone)]
pub struct Config {
    /// Poll cadence for banner and status waits.
    pub poll_interval: Duration,
    /// Poll cadence for per-byte ACK waits during bulk writes.
    pub ack_interval: Duration,
    /// Deadline applied to each operation's wait loops.
    pub timeout: Duration,
    /// Payload cap for one I2C bulk write. The command byte can express at
    /// most [`MAX_BULK_WRITE`]; some firmware revisions accept less.
    pub i2c_write_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            ack_interval: Duration::from_millis(50),
            timeout: Duration::from_secs(5),
            i2c_write_limit: MAX_BULK_WRITE,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_ack_interval(mut self, interval: Duration) -> Self {
        self.ack_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_i2c_write_limit(mut self, limit: usize) -> Self {
        self.i2c_write_limit = limit;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() || self.ack_interval.is_zero() {
            return Err(Error::Configuration(
                "poll intervals must be non-zero".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::Configuration("timeout must be non-zero".into()));
        }
        if self.i2c_write_limit == 0 || self.i2c_write_limit > MAX_BULK_WRITE {
            return Err(Error::Configuration(format!(
                "i2c write limit must be between 1 and {}, got {}",
                MAX_BULK_WRITE, self.i2c_write_limit
            )));
        }
        Ok(())
    }
}

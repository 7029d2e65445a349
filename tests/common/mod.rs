//! Scripted mock-device helpers shared by the integration tests.
//!
//! Each test spawns a task that plays the device side of a
//! `tokio::io::duplex` pair, reading host commands and answering with
//! banners, ACKs and data exactly like the firmware would. The task returns
//! the stream so the transport stays open until the test is done with it.

#![allow(dead_code)]

use std::time::Duration;

use buspirate::{Config, Event};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc::UnboundedReceiver;

pub fn test_config() -> Config {
    Config::new()
        .with_poll_interval(Duration::from_millis(2))
        .with_ack_interval(Duration::from_millis(2))
        .with_timeout(Duration::from_millis(500))
}

/// Waits for a `0x00` probe from the host and answers with the bit-bang
/// banner.
pub async fn confirm_bitbang(dev: &mut DuplexStream) {
    let mut byte = [0u8; 1];
    dev.read_exact(&mut byte).await.unwrap();
    assert_eq!(byte[0], 0x00, "expected a bitbang probe, got {:#04x}", byte[0]);
    dev.write_all(b"BBIO1").await.unwrap();
}

/// Reads the next command byte, skipping any stray probes the host sent
/// before it noticed the banner.
pub async fn next_command(dev: &mut DuplexStream) -> u8 {
    loop {
        let mut byte = [0u8; 1];
        dev.read_exact(&mut byte).await.unwrap();
        if byte[0] != 0x00 {
            return byte[0];
        }
    }
}

pub async fn read_exact(dev: &mut DuplexStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    dev.read_exact(&mut buf).await.unwrap();
    buf
}

/// Collects every event already delivered.
pub fn drain_events(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn count(events: &[Event], wanted: &Event) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}

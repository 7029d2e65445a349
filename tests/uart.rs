//! UART engine behavior against a scripted device.

mod common;

use buspirate::{
    BusPirate, DataBitsParity, Error, Event, Mode, PeripheralConfig, PinOutput, Polarity,
    StopBits, UartConfig,
};
use common::{confirm_bitbang, count, drain_events, next_command, read_exact, test_config};
use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

/// Plays the device side of `uart.init()`: the forced bitbang re-entry
/// followed by the UART entry byte and its banner.
async fn confirm_uart(dev: &mut DuplexStream) {
    confirm_bitbang(dev).await;
    assert_eq!(next_command(dev).await, 0x03);
    dev.write_all(b"ART1").await.unwrap();
}

#[tokio::test]
async fn init_reenters_bitbang_then_confirms_uart_mode() {
    let (host, mut dev) = duplex(4096);
    let mut bp = BusPirate::new(host, test_config()).unwrap();
    let mut events = bp.subscribe();

    let device = tokio::spawn(async move {
        confirm_bitbang(&mut dev).await; // start()
        confirm_uart(&mut dev).await; // init() starts from bitbang again
        dev
    });

    bp.start().await.unwrap();
    bp.uart().init().await.unwrap();
    assert_eq!(bp.mode(), Mode::Uart);

    let events = drain_events(&mut events);
    assert_eq!(count(&events, &Event::UartReady), 1);

    device.await.unwrap();
}

#[tokio::test]
async fn init_recovers_from_an_accidental_reset() {
    let (host, mut dev) = duplex(4096);
    let mut bp = BusPirate::new(host, test_config()).unwrap();
    let mut events = bp.subscribe();

    let device = tokio::spawn(async move {
        confirm_bitbang(&mut dev).await;
        confirm_bitbang(&mut dev).await;
        assert_eq!(next_command(&mut dev).await, 0x03);
        dev.write_all(b"BBIO1").await.unwrap();
        assert_eq!(next_command(&mut dev).await, 0x03);
        dev.write_all(b"ART1").await.unwrap();
        dev
    });

    bp.start().await.unwrap();
    bp.uart().init().await.unwrap();
    assert_eq!(bp.mode(), Mode::Uart);

    let events = drain_events(&mut events);
    assert_eq!(count(&events, &Event::UartReady), 1);

    device.await.unwrap();
}

#[tokio::test]
async fn set_speed_writes_the_coded_byte_and_waits_for_the_ack() {
    let (host, mut dev) = duplex(4096);
    let mut bp = BusPirate::new(host, test_config()).unwrap();
    let mut events = bp.subscribe();

    let device = tokio::spawn(async move {
        confirm_bitbang(&mut dev).await;
        confirm_uart(&mut dev).await;

        assert_eq!(read_exact(&mut dev, 1).await[0], 0x64); // 9600
        dev.write_all(&[0x01]).await.unwrap();
        assert_eq!(read_exact(&mut dev, 1).await[0], 0x6A); // 115200
        dev.write_all(&[0x01]).await.unwrap();
        dev
    });

    bp.start().await.unwrap();
    let mut uart = bp.uart();
    uart.init().await.unwrap();
    uart.set_speed(9600).await.unwrap();
    uart.set_speed(115_200).await.unwrap();

    let events = drain_events(&mut events);
    assert_eq!(count(&events, &Event::UartSpeedSet), 2);

    device.await.unwrap();
}

#[tokio::test]
async fn set_speed_rejects_an_unknown_baud_without_touching_the_wire() {
    let (host, mut dev) = duplex(4096);
    let mut bp = BusPirate::new(host, test_config()).unwrap();

    let device = tokio::spawn(async move {
        confirm_bitbang(&mut dev).await;
        confirm_uart(&mut dev).await;
        // The only byte after the failed call must be the sentinel.
        assert_eq!(next_command(&mut dev).await, 0xAA);
        dev
    });

    bp.start().await.unwrap();
    let mut uart = bp.uart();
    uart.init().await.unwrap();

    let err = uart.set_speed(14_400).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(bp.mode(), Mode::Uart);

    let mut stream = bp.release();
    stream.write_all(&[0xAA]).await.unwrap();

    device.await.unwrap();
}

#[tokio::test]
async fn configure_is_fire_and_forget() {
    let (host, mut dev) = duplex(4096);
    let mut bp = BusPirate::new(host, test_config()).unwrap();
    let mut events = bp.subscribe();

    let device = tokio::spawn(async move {
        confirm_bitbang(&mut dev).await;
        confirm_uart(&mut dev).await;
        // 3V3 output, 8/E, two stop bits, idle low. No ACK is sent back.
        assert_eq!(read_exact(&mut dev, 1).await[0], 0x97);
        dev
    });

    bp.start().await.unwrap();
    let mut uart = bp.uart();
    uart.init().await.unwrap();
    uart.configure(UartConfig {
        pin_output: PinOutput::V3_3,
        data_bits: DataBitsParity::EightEven,
        stop_bits: StopBits::Two,
        polarity: Polarity::IdleLow,
    })
    .await
    .unwrap();

    let events = drain_events(&mut events);
    assert_eq!(count(&events, &Event::UartConfigured), 1);

    device.await.unwrap();
}

#[tokio::test]
async fn rx_echo_and_peripherals_write_single_command_bytes() {
    let (host, mut dev) = duplex(4096);
    let mut bp = BusPirate::new(host, test_config()).unwrap();

    let device = tokio::spawn(async move {
        confirm_bitbang(&mut dev).await;
        confirm_uart(&mut dev).await;

        assert_eq!(read_exact(&mut dev, 1).await[0], 0x02); // echo on
        assert_eq!(read_exact(&mut dev, 1).await[0], 0x03); // echo off
        assert_eq!(read_exact(&mut dev, 1).await[0], 0x49); // power + cs
        dev
    });

    bp.start().await.unwrap();
    let mut uart = bp.uart();
    uart.init().await.unwrap();
    uart.set_rx_echo(true).await.unwrap();
    uart.set_rx_echo(false).await.unwrap();
    uart.set_peripherals(PeripheralConfig {
        power: true,
        cs: true,
        ..Default::default()
    })
    .await
    .unwrap();

    device.await.unwrap();
}

#[tokio::test]
async fn write_chunks_the_payload_with_length_headers() {
    let (host, mut dev) = duplex(4096);
    let mut bp = BusPirate::new(host, test_config()).unwrap();

    let payload: Vec<u8> = (0..20).collect();
    let expected = payload.clone();

    let device = tokio::spawn(async move {
        confirm_bitbang(&mut dev).await;
        confirm_uart(&mut dev).await;

        let first = read_exact(&mut dev, 17).await;
        assert_eq!(first[0], 0x1F); // 0x10 | (16 - 1)
        assert_eq!(&first[1..], &expected[..16]);

        let second = read_exact(&mut dev, 5).await;
        assert_eq!(second[0], 0x13); // 0x10 | (4 - 1)
        assert_eq!(&second[1..], &expected[16..]);
        dev
    });

    bp.start().await.unwrap();
    let mut uart = bp.uart();
    uart.init().await.unwrap();
    uart.write(&payload).await.unwrap();

    device.await.unwrap();
}

#[tokio::test]
async fn operations_require_uart_mode() {
    let (host, mut dev) = duplex(4096);
    let mut bp = BusPirate::new(host, test_config()).unwrap();

    let device = tokio::spawn(async move {
        confirm_bitbang(&mut dev).await;
        dev
    });

    bp.start().await.unwrap();

    let err = bp.uart().set_speed(9600).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    let err = bp.uart().configure(UartConfig::default()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    let err = bp.uart().write(b"data").await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    device.await.unwrap();
}

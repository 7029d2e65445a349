use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Device NACK: {0}")]
    DeviceNack(&'static str),

    #[error("Timeout")]
    Timeout,

    #[error("Cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl Error {
    /// The coarse failure category carried on the event channel.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::DeviceNack(_) => ErrorKind::DeviceNack,
            Error::Timeout => ErrorKind::Timeout,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Transport(_) => ErrorKind::Transport,
        }
    }
}

/// Failure categories, mirroring the variants of [`Error`] without their
/// payloads so they can be cloned into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidArgument,
    InvalidState,
    DeviceNack,
    Timeout,
    Cancelled,
    Transport,
}

pub type Result<T> = std::result::Result<T, Error>;

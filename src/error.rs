//! Result codes shared by the transport, the drivers and the apps.
//!
//! Every fallible call in this crate returns `Result<_, Error>`. The variants fall in a few
//! groups:
//!
//! - **buffer errors** ([`Error::SpiBuf`]): a telegram or buffer size violates the transport
//!   limits, i.e. a caller bug
//! - **transport errors** ([`Error::SpiNoClock`], [`Error::SpiLength`], [`Error::Bus`],
//!   [`Error::Pin`]): the wire did not behave
//! - **device errors** ([`Error::NoI2cBridge`], [`Error::NoI2cDevice`], [`Error::I2cNack`],
//!   [`Error::I2cTimeout`], [`Error::CompareFail`], [`Error::Other`])
//! - **invariant violations** ([`Error::Assert`], [`Error::NotBound`],
//!   [`Error::PinConfig`]): the crate was used out of order or misconfigured
//!
//! Invariant violations are returned instead of halting, so the caller decides whether to
//! panic.

use thiserror::Error;

/// Reasons a selector pin configuration word is rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinConfigError {
    /// The physical pin is used by more than one button or LED.
    #[error("I/O-expander pin {0} is claimed twice")]
    DuplicatePin(u8),
    /// Not all 8 physical pins are claimed; the payload holds the unclaimed ones.
    #[error("I/O-expander pins {0:#04x} are not claimed")]
    Incomplete(u8),
}

/// Crate-wide error type.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Telegram or receive buffer size out of range.
    #[error("telegram buffer size out of range")]
    SpiBuf,
    /// No clock edge seen on the receive side before the timeout.
    #[error("no response clock from the chain")]
    SpiNoClock,
    /// The response size differs from the expected size.
    #[error("response has unexpected length")]
    SpiLength,
    /// Internal invariant violated (double init, use before init, stale receive queue).
    #[error("internal invariant violated")]
    Assert,
    /// A control line could not be driven or sampled.
    #[error("control pin error")]
    Pin,
    /// The SPI or CAN peripheral reported an error.
    #[error("bus peripheral error")]
    Bus,
    /// The node has no enabled I2C bridge.
    #[error("node has no I2C bridge")]
    NoI2cBridge,
    /// No device answers at the I2C address behind the bridge.
    #[error("no I2C device behind bridge")]
    NoI2cDevice,
    /// The I2C device did not acknowledge.
    #[error("I2C nack")]
    I2cNack,
    /// The I2C transaction timed out.
    #[error("I2C timeout")]
    I2cTimeout,
    /// The device answers but is in an invalid physical state.
    #[error("device check failed")]
    CompareFail,
    /// Any other failure reported by a collaborator.
    #[error("other failure")]
    Other,
    /// A driver was used before it was bound to a device.
    #[error("driver not bound to a device")]
    NotBound,
    /// A selector pin configuration was rejected.
    #[error("invalid pin configuration: {0}")]
    PinConfig(#[from] PinConfigError),
}

impl Error {
    /// Maps the I2C "nobody answered" errors to [`Error::NoI2cDevice`], leaves the rest alone.
    ///
    /// Device probes use this: a nack or timeout means absent, anything else is a real error.
    pub fn absent_on_nack(self) -> Self {
        match self {
            Error::I2cNack | Error::I2cTimeout => Error::NoI2cDevice,
            other => other,
        }
    }
}

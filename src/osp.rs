//! OSP command layer consumed by the drivers and apps.
//!
//! The drivers in [`crate::drivers`] never talk to the transport directly. They access the
//! registers of their I2C device through a bridge node (a SAID with I2C enabled), using the
//! OSP command telegrams wrapped by [`OspI2c`]. The sensors app also reads the built-in
//! temperature sensor of a node through [`OspNode`].
//!
//! Implementations are expected to map an I2C nack or timeout reported by the bridge to
//! [`Error::I2cNack`](crate::Error::I2cNack) / [`Error::I2cTimeout`](crate::Error::I2cTimeout),
//! which device probes treat as "device absent".

use crate::error::Error;

/// Register access to I2C devices behind an OSP bridge node.
pub trait OspI2c {
    /// Whether the I2C bridge of node `said` is enabled.
    fn i2c_enable_get(&mut self, said: u16) -> Result<bool, Error>;

    /// Reads `buf.len()` bytes starting at 8-bit register `raddr` of device `daddr7`.
    fn i2c_read8(&mut self, said: u16, daddr7: u8, raddr: u8, buf: &mut [u8])
    -> Result<(), Error>;

    /// Writes `buf` starting at 8-bit register `raddr` of device `daddr7`.
    fn i2c_write8(&mut self, said: u16, daddr7: u8, raddr: u8, buf: &[u8]) -> Result<(), Error>;
}

/// Node level commands.
pub trait OspNode {
    /// Reads the raw value of the built-in temperature sensor of node `said`.
    fn read_temp(&mut self, said: u16) -> Result<u8, Error>;
}

/// Converts a raw SAID temperature reading to degrees Celsius.
pub fn said_temp_celsius(raw: u8) -> f64 {
    f64::from(raw) - 86.0
}

/// Probes for an I2C device: bridge enabled, and a one byte read of `raddr` acknowledged.
///
/// # Errors
/// - [`Error::NoI2cBridge`] when the node has no enabled bridge; the device is not accessed
/// - [`Error::NoI2cDevice`] when the read is not acknowledged or times out
/// - any other error of the collaborator, unchanged
pub fn probe<O: OspI2c>(osp: &mut O, said: u16, daddr7: u8, raddr: u8) -> Result<(), Error> {
    if !osp.i2c_enable_get(said)? {
        return Err(Error::NoI2cBridge);
    }
    let mut buf = [0u8; 1];
    osp.i2c_read8(said, daddr7, raddr, &mut buf)
        .map_err(Error::absent_on_nack)
}

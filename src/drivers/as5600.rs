//! AS5600 magnetic rotary position sensor.
//!
//! The sensor reports the angle of a diametric magnet above it as a 12-bit value. It sits
//! at I2C address [`AS5600_DADDR7_SAIDSENSE`] on the SAIDsense board.
//!
//! ## Functions
//! - [`As5600::present`]: probe, including a check of the magnet
//! - [`As5600::init`]: bind and clear the angle range, slow filter, no watchdog
//! - [`As5600::angle_get`]: raw 12-bit angle, see [`angle_degrees`]
//! - [`As5600::force_get`]: automatic gain and magnitude of the magnetic field

use crate::consts::AS5600_DADDR7_SAIDSENSE;
use crate::error::Error;
use crate::osp::OspI2c;

const REG_ZPOS: u8 = 0x01;
const REG_MPOS: u8 = 0x03;
const REG_MANG: u8 = 0x05;
const REG_CONF: u8 = 0x07;
const REG_STATUS: u8 = 0x0B;
const REG_ANGLE: u8 = 0x0E;
const REG_AGC: u8 = 0x1A;

/// Magnet detected
const STATUS_MD: u8 = 0x20;
/// Magnet too weak
const STATUS_ML: u8 = 0x10;
/// Magnet too strong
const STATUS_MH: u8 = 0x08;

/// Watchdog off, slow filter 16x, hysteresis off, analog output, normal power mode
const CONF_DEFAULT: [u8; 2] = [0x00, 0x00];
/// Mid range gain, written at init
const AGC_DEFAULT: u8 = 0x80;

/// Largest raw angle.
pub const ANGLE_MAX: u16 = 4095;
/// Largest automatic gain value (5 V operation).
pub const AGC_MAX: u8 = 128;
/// Largest magnitude.
pub const MAG_MAX: u16 = 4095;

/// Converts a raw angle to degrees in `[0, 360)`.
pub fn angle_degrees(raw: u16) -> f64 {
    f64::from(raw) * 360.0 / f64::from(ANGLE_MAX + 1)
}

/// An AS5600, bound to a bridge node by [`As5600::init`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct As5600 {
    said: Option<u16>,
}

impl As5600 {
    /// Creates an unbound driver.
    pub const fn new() -> Self {
        Self { said: None }
    }

    /// Address of the bridge node, `None` while unbound.
    pub fn said(&self) -> Option<u16> {
        self.said
    }

    /// Checks that an AS5600 is reachable via node `said` and sees a usable magnet.
    ///
    /// # Errors
    /// - [`Error::NoI2cBridge`]: `said` has no enabled I2C bridge; the sensor is not read
    /// - [`Error::NoI2cDevice`]: the status register read is not acknowledged
    /// - [`Error::CompareFail`]: no magnet detected
    /// - [`Error::Other`]: the magnet is too weak or too strong
    pub fn present<O: OspI2c>(osp: &mut O, said: u16) -> Result<(), Error> {
        if !osp.i2c_enable_get(said)? {
            return Err(Error::NoI2cBridge);
        }
        let mut status = [0u8; 1];
        osp.i2c_read8(said, AS5600_DADDR7_SAIDSENSE, REG_STATUS, &mut status)
            .map_err(Error::absent_on_nack)?;
        let status = status[0];
        if status & STATUS_MD == 0 {
            return Err(Error::CompareFail);
        }
        if status & (STATUS_ML | STATUS_MH) != 0 {
            return Err(Error::Other);
        }
        Ok(())
    }

    /// Binds to the AS5600 behind node `said` and configures it.
    ///
    /// Clears the start position, stop position and maximum angle so the full circle is
    /// reported, then writes the default configuration and gain.
    pub fn init<O: OspI2c>(&mut self, osp: &mut O, said: u16) -> Result<(), Error> {
        self.said = Some(said);
        for reg in [REG_ZPOS, REG_MPOS, REG_MANG] {
            osp.i2c_write8(said, AS5600_DADDR7_SAIDSENSE, reg, &[0x00, 0x00])?;
        }
        osp.i2c_write8(said, AS5600_DADDR7_SAIDSENSE, REG_CONF, &CONF_DEFAULT)?;
        osp.i2c_write8(said, AS5600_DADDR7_SAIDSENSE, REG_AGC, &[AGC_DEFAULT])
    }

    /// Reads the angle, `0..=ANGLE_MAX` for a full turn.
    pub fn angle_get<O: OspI2c>(&self, osp: &mut O) -> Result<u16, Error> {
        let said = self.said.ok_or(Error::NotBound)?;
        let mut buf = [0u8; 2];
        osp.i2c_read8(said, AS5600_DADDR7_SAIDSENSE, REG_ANGLE, &mut buf)?;
        Ok(u16::from_be_bytes(buf) & ANGLE_MAX)
    }

    /// Reads the automatic gain (`0..=AGC_MAX`) and the magnitude (`0..=MAG_MAX`).
    ///
    /// A low gain means a strong field. Both registers are read in one transfer.
    pub fn force_get<O: OspI2c>(&self, osp: &mut O) -> Result<(u8, u16), Error> {
        let said = self.said.ok_or(Error::NotBound)?;
        let mut buf = [0u8; 3];
        osp.i2c_read8(said, AS5600_DADDR7_SAIDSENSE, REG_AGC, &mut buf)?;
        Ok((buf[0], u16::from_be_bytes([buf[1], buf[2]])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeOsp;

    const SAID: u16 = 0x005;
    const DADDR: u8 = AS5600_DADDR7_SAIDSENSE;

    #[test]
    fn test_present_without_bridge_never_reads_status() {
        let mut osp = FakeOsp::new();
        assert_eq!(As5600::present(&mut osp, SAID), Err(Error::NoI2cBridge));
        assert!(osp.reads.is_empty());
    }

    #[test]
    fn test_present_decodes_status() {
        let mut osp = FakeOsp::new();
        osp.bridge(SAID);
        assert_eq!(As5600::present(&mut osp, SAID), Err(Error::NoI2cDevice));

        osp.device(SAID, DADDR);
        osp.set_reg(SAID, DADDR, REG_STATUS, &[0x00]);
        assert_eq!(As5600::present(&mut osp, SAID), Err(Error::CompareFail));
        osp.set_reg(SAID, DADDR, REG_STATUS, &[STATUS_MD | STATUS_ML]);
        assert_eq!(As5600::present(&mut osp, SAID), Err(Error::Other));
        osp.set_reg(SAID, DADDR, REG_STATUS, &[STATUS_MD | STATUS_MH]);
        assert_eq!(As5600::present(&mut osp, SAID), Err(Error::Other));
        osp.set_reg(SAID, DADDR, REG_STATUS, &[STATUS_MD]);
        assert_eq!(As5600::present(&mut osp, SAID), Ok(()));

        osp.fail_next(Error::SpiNoClock);
        assert_eq!(As5600::present(&mut osp, SAID), Err(Error::SpiNoClock));
    }

    #[test]
    fn test_unbound_driver_is_an_error() {
        let mut osp = FakeOsp::new();
        let dev = As5600::new();
        assert_eq!(dev.said(), None);
        assert_eq!(dev.angle_get(&mut osp), Err(Error::NotBound));
        assert_eq!(dev.force_get(&mut osp), Err(Error::NotBound));
    }

    #[test]
    fn test_init_writes_configuration() {
        let mut osp = FakeOsp::new();
        osp.device(SAID, DADDR);
        let mut dev = As5600::new();
        dev.init(&mut osp, SAID).unwrap();
        assert_eq!(dev.said(), Some(SAID));
        let regs: Vec<u8> = osp.writes.iter().map(|((_, _, r), _)| *r).collect();
        assert_eq!(regs, [REG_ZPOS, REG_MPOS, REG_MANG, REG_CONF, REG_AGC]);
        assert_eq!(osp.reg(SAID, DADDR, REG_CONF), Some(&[0x00, 0x00][..]));
        assert_eq!(osp.reg(SAID, DADDR, REG_AGC), Some(&[0x80][..]));
    }

    #[test]
    fn test_angle_and_force() {
        let mut osp = FakeOsp::new();
        osp.device(SAID, DADDR);
        let mut dev = As5600::new();
        dev.init(&mut osp, SAID).unwrap();

        osp.set_reg(SAID, DADDR, REG_ANGLE, &[0xF8, 0x00]);
        assert_eq!(dev.angle_get(&mut osp), Ok(0x0800));
        assert_eq!(angle_degrees(0x0800), 180.0);
        assert_eq!(angle_degrees(0), 0.0);

        osp.set_reg(SAID, DADDR, REG_AGC, &[0x40, 0x01, 0x23]);
        assert_eq!(dev.force_get(&mut osp), Ok((0x40, 0x0123)));
    }
}

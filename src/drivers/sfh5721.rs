//! SFH 5721 ambient light sensor.
//!
//! After [`Sfh5721::init`] the sensor converts continuously with 4x gain and 25 ms
//! integration time. With those settings the raw ALS count is close to the illuminance
//! in lux.

use crate::consts::SFH5721_DADDR7_SAIDSENSE;
use crate::error::Error;
use crate::osp::{OspI2c, probe};
use embedded_hal::delay::DelayNs;

const REG_OPSEL: u8 = 0x00;
const REG_MCONFA: u8 = 0x09;
const REG_MCONFB: u8 = 0x0A;
const REG_MCONFC: u8 = 0x0B;
const REG_DATA1ALS: u8 = 0x10;
const REG_DEVID: u8 = 0x14;

const OPSEL_SWRESET: u8 = 0x80;
const OPSEL_ALS_CONTINUOUS: u8 = 0x04;
/// Integration time 25 ms (0x38) with analog gain 4x (0x01)
const MCONFA_DEFAULT: u8 = 0x39;
const MCONFB_DEFAULT: u8 = 0x00;
/// ALS channel enabled (0x04), low pass filter depth 3 (0x10)
const MCONFC_DEFAULT: u8 = 0x14;
const DEVID_EXPECTED: u8 = 0x01;

/// Time for the OTP to load after a software reset.
const STARTUP_MS: u32 = 5;

/// An SFH 5721, bound to a bridge node by [`Sfh5721::init`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sfh5721 {
    said: Option<u16>,
}

impl Sfh5721 {
    /// Creates an unbound driver.
    pub const fn new() -> Self {
        Self { said: None }
    }

    /// Checks that an SFH 5721 answers behind node `said`.
    pub fn present<O: OspI2c>(osp: &mut O, said: u16) -> Result<(), Error> {
        probe(osp, said, SFH5721_DADDR7_SAIDSENSE, REG_OPSEL)
    }

    /// Binds to the SFH 5721 behind node `said`, resets it and starts continuous ALS
    /// conversions.
    ///
    /// The bus also provides the 5 ms wait after the reset.
    ///
    /// # Errors
    /// [`Error::NoI2cDevice`] when the device id read after the reset is not the one of
    /// an SFH 5721.
    pub fn init<B: OspI2c + DelayNs>(&mut self, bus: &mut B, said: u16) -> Result<(), Error> {
        self.said = Some(said);

        bus.i2c_write8(said, SFH5721_DADDR7_SAIDSENSE, REG_OPSEL, &[OPSEL_SWRESET])?;
        bus.delay_ms(STARTUP_MS);
        let mut devid = [0u8; 1];
        bus.i2c_read8(said, SFH5721_DADDR7_SAIDSENSE, REG_DEVID, &mut devid)?;
        if devid[0] != DEVID_EXPECTED {
            return Err(Error::NoI2cDevice);
        }

        for (reg, value) in [
            (REG_MCONFA, MCONFA_DEFAULT),
            (REG_MCONFB, MCONFB_DEFAULT),
            (REG_MCONFC, MCONFC_DEFAULT),
            (REG_OPSEL, OPSEL_ALS_CONTINUOUS),
        ] {
            bus.i2c_write8(said, SFH5721_DADDR7_SAIDSENSE, reg, &[value])?;
        }
        Ok(())
    }

    /// Reads the latest ALS count.
    pub fn als_get<O: OspI2c>(&self, osp: &mut O) -> Result<u16, Error> {
        let said = self.said.ok_or(Error::NotBound)?;
        let mut buf = [0u8; 2];
        osp.i2c_read8(said, SFH5721_DADDR7_SAIDSENSE, REG_DATA1ALS, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
}

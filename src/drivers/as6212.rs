//! AS6212 digital temperature sensor.
//!
//! Registers are 16 bits wide and big-endian. The temperature register holds a signed
//! value with 1/128 °C resolution.

use crate::consts::AS6212_DADDR7_SAIDSENSE;
use crate::error::Error;
use crate::osp::{OspI2c, probe};

const REG_TVAL: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

/// Power-on configuration: 250 ms conversions, comparator mode, active low alert.
const CONFIG_DEFAULT: u16 = 0x40A0;
const CONFIG_CR_SHIFT: u16 = 6;
const CONFIG_CR_MASK: u16 = !(0b11 << CONFIG_CR_SHIFT);

/// Conversion period in ms, indexed by the CR field of CONFIG.
const CONVRATE_MS: [u32; 4] = [4000, 1000, 250, 125];

/// An AS6212, bound to a bridge node by [`As6212::init`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct As6212 {
    said: Option<u16>,
}

impl As6212 {
    /// Creates an unbound driver.
    pub const fn new() -> Self {
        Self { said: None }
    }

    /// Checks that an AS6212 answers behind node `said`.
    pub fn present<O: OspI2c>(osp: &mut O, said: u16) -> Result<(), Error> {
        probe(osp, said, AS6212_DADDR7_SAIDSENSE, REG_TVAL)
    }

    /// Binds to the AS6212 behind node `said` and restores the default configuration.
    pub fn init<O: OspI2c>(&mut self, osp: &mut O, said: u16) -> Result<(), Error> {
        self.said = Some(said);
        self.write16(osp, REG_CONFIG, CONFIG_DEFAULT)
    }

    /// Reads the temperature in milli-°C.
    pub fn temp_get<O: OspI2c>(&self, osp: &mut O) -> Result<i32, Error> {
        let raw = self.read16(osp, REG_TVAL)? as i16;
        Ok(1000 * i32::from(raw) / 128)
    }

    /// Sets the conversion period to the supported one nearest below `ms`.
    ///
    /// Supported periods are 4000, 1000, 250 and 125 ms; anything above 2000 ms selects
    /// 4000, above 500 selects 1000, above 150 selects 250, the rest 125.
    pub fn convrate_set<O: OspI2c>(&self, osp: &mut O, ms: u32) -> Result<(), Error> {
        let cr: u16 = match ms {
            2001.. => 0,
            501..=2000 => 1,
            151..=500 => 2,
            _ => 3,
        };
        self.write16(
            osp,
            REG_CONFIG,
            (CONFIG_DEFAULT & CONFIG_CR_MASK) | (cr << CONFIG_CR_SHIFT),
        )
    }

    /// Reads back the conversion period in ms.
    pub fn convrate_get<O: OspI2c>(&self, osp: &mut O) -> Result<u32, Error> {
        let config = self.read16(osp, REG_CONFIG)?;
        Ok(CONVRATE_MS[usize::from((config >> CONFIG_CR_SHIFT) & 0b11)])
    }

    fn read16<O: OspI2c>(&self, osp: &mut O, raddr: u8) -> Result<u16, Error> {
        let said = self.said.ok_or(Error::NotBound)?;
        let mut buf = [0u8; 2];
        osp.i2c_read8(said, AS6212_DADDR7_SAIDSENSE, raddr, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn write16<O: OspI2c>(&self, osp: &mut O, raddr: u8, value: u16) -> Result<(), Error> {
        let said = self.said.ok_or(Error::NotBound)?;
        osp.i2c_write8(said, AS6212_DADDR7_SAIDSENSE, raddr, &value.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeOsp;

    const SAID: u16 = 0x00A;
    const DADDR: u8 = AS6212_DADDR7_SAIDSENSE;

    fn bound() -> (FakeOsp, As6212) {
        let mut osp = FakeOsp::new();
        osp.device(SAID, DADDR);
        let mut dev = As6212::new();
        dev.init(&mut osp, SAID).unwrap();
        (osp, dev)
    }

    #[test]
    fn test_present() {
        let mut osp = FakeOsp::new();
        assert_eq!(As6212::present(&mut osp, SAID), Err(Error::NoI2cBridge));
        osp.device(SAID, DADDR);
        assert_eq!(As6212::present(&mut osp, SAID), Ok(()));
    }

    #[test]
    fn test_init_writes_default_big_endian() {
        let (osp, _) = bound();
        assert_eq!(osp.reg(SAID, DADDR, REG_CONFIG), Some(&[0x40, 0xA0][..]));
    }

    #[test]
    fn test_temperature_scaling() {
        let (mut osp, dev) = bound();
        // 25 °C = 25 * 128
        osp.set_reg(SAID, DADDR, REG_TVAL, &[0x0C, 0x80]);
        assert_eq!(dev.temp_get(&mut osp), Ok(25_000));
        // -0.5 °C
        osp.set_reg(SAID, DADDR, REG_TVAL, &[0xFF, 0xC0]);
        assert_eq!(dev.temp_get(&mut osp), Ok(-500));
        assert_eq!(As6212::new().temp_get(&mut osp), Err(Error::NotBound));
    }

    #[test]
    fn test_convrate_round_trip() {
        let (mut osp, dev) = bound();
        assert_eq!(dev.convrate_get(&mut osp), Ok(250));
        for (ms, expected) in [(5000, 4000), (2001, 4000), (2000, 1000), (501, 1000), (500, 250), (151, 250), (150, 125), (0, 125)] {
            dev.convrate_set(&mut osp, ms).unwrap();
            assert_eq!(dev.convrate_get(&mut osp), Ok(expected));
        }
        // only the CR bits change
        dev.convrate_set(&mut osp, 125).unwrap();
        assert_eq!(osp.reg(SAID, DADDR, REG_CONFIG), Some(&[0x40, 0xE0][..]));
    }
}

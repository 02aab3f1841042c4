//! Quad 7-segment display.
//!
//! The display is four modules, each a PCA9554-style I/O expander driving one digit
//! (active low). Module `i` sits at I2C address [`SSEG_0_DADDR7_SAIDSENSE`]` + i`,
//! module 0 is the left-most digit. All four hang off the same bridge node.
//!
//! ## Functions
//! - [`Sseg::present`], [`Sseg::init`]
//! - [`Sseg::set`] and [`Sseg::clr`]: raw segment masks, see [`font`](super::font)
//! - [`Sseg::print`], [`Sseg::print_bytes`] and [`Sseg::printf`]: text
//!
//! ## Text rendering
//!
//! Characters are looked up in the font, a `.` following a character lights the decimal
//! point of that digit instead of taking a digit of its own (so `"12.3C"` fits). A leading
//! `.` is shown as a digit. Missing digits are blank, text beyond four digits is dropped.

use super::font::{SEG_DP, glyph};
use crate::consts::{SSEG_0_DADDR7_SAIDSENSE, SSEG_MODULES};
use crate::error::Error;
use crate::osp::OspI2c;
use core::fmt::{self, Write};
use heapless::String;

const REG_OUTPUT: u8 = 0x01;
const REG_CONFIG: u8 = 0x03;

/// All outputs high: segments off.
const OUTPUT_BLANK: u8 = 0xFF;
/// All pins outputs.
const CONFIG_OUTPUTS: u8 = 0x00;

/// Longest `printf` result kept: a digit and a dot per module.
const PRINTF_MAX: usize = 2 * SSEG_MODULES;

fn module_daddr7(module: usize) -> u8 {
    SSEG_0_DADDR7_SAIDSENSE + module as u8
}

/// Renders text to one segment mask per module.
///
/// Bytes with bit 7 set are shown with their decimal point on.
pub fn render(text: &[u8]) -> [u8; SSEG_MODULES] {
    let mut segs = [0u8; SSEG_MODULES];
    let mut chars = text.iter().copied().peekable();
    for seg in segs.iter_mut() {
        let Some(ch) = chars.next() else { break };
        *seg = glyph(ch & !SEG_DP) | (ch & SEG_DP);
        if chars.next_if_eq(&b'.').is_some() {
            *seg |= SEG_DP;
        }
    }
    segs
}

/// A `fmt::Write` sink that silently drops what does not fit.
struct Truncating<'a, const N: usize>(&'a mut String<N>);

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// A quad 7-segment display, bound to a bridge node by [`Sseg::init`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sseg {
    said: Option<u16>,
}

impl Sseg {
    /// Creates an unbound driver.
    pub const fn new() -> Self {
        Self { said: None }
    }

    /// Checks that all four modules answer behind node `said`.
    pub fn present<O: OspI2c>(osp: &mut O, said: u16) -> Result<(), Error> {
        if !osp.i2c_enable_get(said)? {
            return Err(Error::NoI2cBridge);
        }
        let mut buf = [0u8; 1];
        for module in 0..SSEG_MODULES {
            osp.i2c_read8(said, module_daddr7(module), REG_CONFIG, &mut buf)
                .map_err(Error::absent_on_nack)?;
        }
        Ok(())
    }

    /// Binds to the display behind node `said` and blanks it.
    ///
    /// # Errors
    /// [`Error::CompareFail`] when a module does not read back its output register.
    pub fn init<O: OspI2c>(&mut self, osp: &mut O, said: u16) -> Result<(), Error> {
        self.said = Some(said);
        for module in 0..SSEG_MODULES {
            let daddr7 = module_daddr7(module);
            osp.i2c_write8(said, daddr7, REG_OUTPUT, &[OUTPUT_BLANK])?;
            let mut buf = [0u8; 1];
            osp.i2c_read8(said, daddr7, REG_OUTPUT, &mut buf)?;
            if buf[0] != OUTPUT_BLANK {
                return Err(Error::CompareFail);
            }
            osp.i2c_write8(said, daddr7, REG_CONFIG, &[CONFIG_OUTPUTS])?;
        }
        Ok(())
    }

    /// Shows raw segment masks (`0bPGFEDCBA`, set is on), left-most digit first.
    pub fn set<O: OspI2c>(&self, osp: &mut O, segs: &[u8; SSEG_MODULES]) -> Result<(), Error> {
        let said = self.said.ok_or(Error::NotBound)?;
        for (module, seg) in segs.iter().enumerate() {
            osp.i2c_write8(said, module_daddr7(module), REG_OUTPUT, &[!seg])?;
        }
        Ok(())
    }

    /// Switches all segments off.
    pub fn clr<O: OspI2c>(&self, osp: &mut O) -> Result<(), Error> {
        self.set(osp, &[0; SSEG_MODULES])
    }

    /// Shows `text`.
    pub fn print<O: OspI2c>(&self, osp: &mut O, text: &str) -> Result<(), Error> {
        self.print_bytes(osp, text.as_bytes())
    }

    /// Shows `text`; bytes with bit 7 set also light the decimal point.
    pub fn print_bytes<O: OspI2c>(&self, osp: &mut O, text: &[u8]) -> Result<(), Error> {
        self.set(osp, &render(text))
    }

    /// Shows formatted text, e.g. `sseg.printf(osp, format_args!("{:5.1}", temp))`.
    ///
    /// At most 8 characters of the formatted text are kept.
    ///
    /// # Errors
    /// [`Error::Other`] when one of the formatted values fails to format; the display is
    /// left as it was.
    pub fn printf<O: OspI2c>(&self, osp: &mut O, args: fmt::Arguments<'_>) -> Result<(), Error> {
        let mut text: String<PRINTF_MAX> = String::new();
        Truncating(&mut text)
            .write_fmt(args)
            .map_err(|_| Error::Other)?;
        self.print(osp, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeOsp;

    const SAID: u16 = 0x009;

    fn bound() -> (FakeOsp, Sseg) {
        let mut osp = FakeOsp::new();
        for module in 0..SSEG_MODULES {
            osp.device(SAID, module_daddr7(module));
        }
        let mut sseg = Sseg::new();
        sseg.init(&mut osp, SAID).unwrap();
        (osp, sseg)
    }

    fn outputs(osp: &FakeOsp) -> Vec<u8> {
        (0..SSEG_MODULES)
            .map(|m| osp.reg(SAID, module_daddr7(m), REG_OUTPUT).unwrap()[0])
            .collect()
    }

    #[test]
    fn test_render_inline_dot() {
        assert_eq!(render(b"12.3C"), [0x06, 0x5B | SEG_DP, 0x4F, 0x39]);
        assert_eq!(render(b"12.3C and more"), render(b"12.3C"));
        assert_eq!(render(b".5"), [0x80, 0x6D, 0, 0]);
        assert_eq!(render(b"1..2"), [0x86, 0x80, 0x5B, 0]);
        assert_eq!(render(b"A.B.C.D."), [0xF7, 0xFC, 0xB9, 0xDE]);
        assert_eq!(render(b""), [0; 4]);
        assert_eq!(render(&[b'1' | SEG_DP, b'2']), [0x86, 0x5B, 0, 0]);
    }

    #[test]
    fn test_init_blanks_and_configures() {
        let (osp, _) = bound();
        assert_eq!(outputs(&osp), [0xFF; 4]);
        for module in 0..SSEG_MODULES {
            assert_eq!(osp.reg(SAID, module_daddr7(module), REG_CONFIG), Some(&[0x00][..]));
        }
    }

    #[test]
    fn test_print_writes_inverted_masks() {
        let (mut osp, sseg) = bound();
        sseg.print(&mut osp, "12.3C").unwrap();
        let expected: Vec<u8> = render(b"12.3C").iter().map(|s| !s).collect();
        assert_eq!(outputs(&osp), expected);
        assert_eq!(expected[1], !0xDBu8);
        sseg.clr(&mut osp).unwrap();
        assert_eq!(outputs(&osp), [0xFF; 4]);
    }

    #[test]
    fn test_printf_formats_and_truncates() {
        let (mut osp, sseg) = bound();
        sseg.printf(&mut osp, format_args!("{:5.1}", 23.45f64)).unwrap();
        // " 23.4" or " 23.5": blank, 2, 3 with dot, last digit
        let out = outputs(&osp);
        assert_eq!(out[..3], [0xFFu8, !0x5Bu8, !0xCFu8]);

        sseg.printf(&mut osp, format_args!("{}", "123456789")).unwrap();
        assert_eq!(outputs(&osp), [!0x06u8, !0x5Bu8, !0x4Fu8, !0x66u8]);

        let mut text: String<4> = String::new();
        Truncating(&mut text)
            .write_fmt(format_args!("{}", 123_456))
            .unwrap();
        assert_eq!(text.as_str(), "1234");
    }

    struct Unprintable;

    impl fmt::Display for Unprintable {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn test_printf_reports_format_errors() {
        let (mut osp, sseg) = bound();
        sseg.print(&mut osp, "12").unwrap();
        let before = outputs(&osp);
        assert_eq!(
            sseg.printf(&mut osp, format_args!("{}", Unprintable)),
            Err(Error::Other)
        );
        assert_eq!(outputs(&osp), before);
    }

    #[test]
    fn test_present_and_unbound() {
        let mut osp = FakeOsp::new();
        osp.bridge(SAID);
        for module in 0..SSEG_MODULES - 1 {
            osp.device(SAID, module_daddr7(module));
        }
        assert_eq!(Sseg::present(&mut osp, SAID), Err(Error::NoI2cDevice));
        osp.device(SAID, module_daddr7(SSEG_MODULES - 1));
        assert_eq!(Sseg::present(&mut osp, SAID), Ok(()));
        assert_eq!(Sseg::present(&mut osp, SAID + 1), Err(Error::NoI2cBridge));

        let sseg = Sseg::new();
        assert_eq!(sseg.print(&mut osp, "1"), Err(Error::NotBound));
    }

    #[test]
    fn test_init_detects_stuck_output() {
        let mut osp = FakeOsp::new();
        for module in 0..SSEG_MODULES {
            osp.device(SAID, module_daddr7(module));
        }
        osp.stick_reg(SAID, module_daddr7(2), REG_OUTPUT, &[0x7F]);
        let mut sseg = Sseg::new();
        assert_eq!(sseg.init(&mut osp, SAID), Err(Error::CompareFail));
        // modules left of the stuck one are configured
        assert_eq!(osp.reg(SAID, module_daddr7(1), REG_CONFIG), Some(&[0x00][..]));
        assert_eq!(osp.reg(SAID, module_daddr7(2), REG_CONFIG), None);
    }
}

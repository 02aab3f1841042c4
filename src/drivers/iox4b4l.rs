//! Selector: an 8-pin I/O expander wired to 4 buttons and 4 indicator LEDs.
//!
//! Which expander pin drives which LED (or senses which button), and whether it is active
//! high or low, differs per board. The wiring is described by a [`PinConfig`], usually
//! parsed from one of the `IOX4B4L_PINCFG_*` words in [`crate::consts`].
//!
//! The driver works in logical terms: bit `i` of an LED mask is LED `i` (see [`LED0`] and
//! friends), bit `i` of a button mask is button `i`, and a set bit means on or pressed,
//! whatever the pin polarity.
//!
//! ## Pin configuration word
//!
//! Eight nibbles, least significant first: buttons 0 to 3, then LEDs 0 to 3. Each nibble
//! holds the expander pin number in bits 0-2 and the polarity in bit 3 (set for active
//! high). Every pin must be used exactly once.
//!
//! ## Buttons
//!
//! [`Iox4b4l::but_scan`] samples the buttons and keeps the previous sample, the queries
//! ([`Iox4b4l::but_wentdown`] etc.) compare the two. Scan once per poll, then query.

use crate::error::{Error, PinConfigError};
use crate::osp::{OspI2c, probe};

const REG_INVAL: u8 = 0x00;
const REG_OUTVAL: u8 = 0x01;
const REG_CFGINP: u8 = 0x03;

/// Indicator LED 0
pub const LED0: u8 = 0x01;
/// Indicator LED 1
pub const LED1: u8 = 0x02;
/// Indicator LED 2
pub const LED2: u8 = 0x04;
/// Indicator LED 3
pub const LED3: u8 = 0x08;
/// No indicator LED
pub const LEDNONE: u8 = 0x00;
/// All indicator LEDs
pub const LEDALL: u8 = 0x0F;

/// Button 0
pub const BUT0: u8 = 0x01;
/// Button 1
pub const BUT1: u8 = 0x02;
/// Button 2
pub const BUT2: u8 = 0x04;
/// Button 3
pub const BUT3: u8 = 0x08;
/// All buttons
pub const BUTALL: u8 = 0x0F;

/// One logical button or LED: the expander pin it uses and its polarity.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinSlot {
    /// Expander pin, 0 to 7
    pub pin: u8,
    /// The pin is high when the LED is on or the button is pressed
    pub active_high: bool,
}

impl PinSlot {
    fn from_nibble(nibble: u8) -> Self {
        Self {
            pin: nibble & 0x07,
            active_high: nibble & 0x08 != 0,
        }
    }

    fn nibble(self) -> u32 {
        u32::from(self.pin & 0x07) | if self.active_high { 0x08 } else { 0x00 }
    }

    fn bit(self) -> u8 {
        1u8.checked_shl(u32::from(self.pin)).unwrap_or(0)
    }
}

/// Validated wiring of a selector board.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    buttons: [PinSlot; 4],
    leds: [PinSlot; 4],
}

impl PinConfig {
    /// Builds a configuration, checking that the 8 slots use every pin exactly once.
    ///
    /// # Errors
    /// - [`PinConfigError::DuplicatePin`]: a pin is used by two slots
    /// - [`PinConfigError::Incomplete`]: some pin is not used (a slot names a pin above 7)
    pub fn new(buttons: [PinSlot; 4], leds: [PinSlot; 4]) -> Result<Self, PinConfigError> {
        let mut pins = 0u8;
        for slot in buttons.iter().chain(leds.iter()) {
            if pins & slot.bit() != 0 {
                return Err(PinConfigError::DuplicatePin(slot.pin));
            }
            pins |= slot.bit();
        }
        if pins != 0xFF {
            return Err(PinConfigError::Incomplete(!pins));
        }
        Ok(Self { buttons, leds })
    }

    /// Parses a pin configuration word.
    pub fn parse(word: u32) -> Result<Self, PinConfigError> {
        let slot = |i: u32| PinSlot::from_nibble(((word >> (4 * i)) & 0x0F) as u8);
        Self::new(
            [slot(0), slot(1), slot(2), slot(3)],
            [slot(4), slot(5), slot(6), slot(7)],
        )
    }

    /// Packs the configuration back into a word.
    pub fn word(&self) -> u32 {
        self.buttons
            .iter()
            .chain(self.leds.iter())
            .enumerate()
            .fold(0, |word, (i, slot)| word | slot.nibble() << (4 * i))
    }

    /// Button slots, button 0 first.
    pub fn buttons(&self) -> &[PinSlot; 4] {
        &self.buttons
    }

    /// LED slots, LED 0 first.
    pub fn leds(&self) -> &[PinSlot; 4] {
        &self.leds
    }

    fn slots(&self) -> impl Iterator<Item = &PinSlot> {
        self.buttons.iter().chain(self.leds.iter())
    }

    /// Pins that are sampled (the button pins).
    fn input_pins(&self) -> u8 {
        self.buttons.iter().fold(0, |mask, slot| mask | slot.bit())
    }

    fn led_pins(&self) -> u8 {
        self.leds.iter().fold(0, |mask, slot| mask | slot.bit())
    }

    /// Pins that are active low.
    fn inverted(&self) -> u8 {
        self.slots()
            .filter(|slot| !slot.active_high)
            .fold(0, |mask, slot| mask | slot.bit())
    }

    /// Maps a logical word (bits 0-3 buttons, bits 4-7 LEDs, set = active) to pin levels.
    ///
    /// Bits are moved to their pins first, then active low pins are inverted.
    pub fn sw_to_hw(&self, sw: u8) -> u8 {
        let levels = self
            .slots()
            .enumerate()
            .filter(|(i, _)| sw & (1 << i) != 0)
            .fold(0, |hw, (_, slot)| hw | slot.bit());
        levels ^ self.inverted()
    }

    /// Maps pin levels to a logical word, the inverse of [`PinConfig::sw_to_hw`].
    ///
    /// Active low pins are inverted first, then bits are moved from their pins.
    pub fn hw_to_sw(&self, hw: u8) -> u8 {
        let active = hw ^ self.inverted();
        self.slots()
            .enumerate()
            .filter(|(_, slot)| active & slot.bit() != 0)
            .fold(0, |sw, (i, _)| sw | 1 << i)
    }

    fn led_sw2hw(&self, leds: u8) -> u8 {
        self.sw_to_hw((leds & LEDALL) << 4) & self.led_pins()
    }

    fn but_hw2sw(&self, hw: u8) -> u8 {
        self.hw_to_sw(hw) & BUTALL
    }
}

impl TryFrom<u32> for PinConfig {
    type Error = PinConfigError;

    fn try_from(word: u32) -> Result<Self, Self::Error> {
        Self::parse(word)
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Binding {
    said: u16,
    daddr7: u8,
}

/// A selector, bound to an expander by [`Iox4b4l::init`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Iox4b4l {
    binding: Option<Binding>,
    config: PinConfig,
    leds: u8,
    but_prev: u8,
    but_cur: u8,
}

impl Iox4b4l {
    /// Creates an unbound driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that an expander answers at `daddr7` behind node `said`.
    pub fn present<O: OspI2c>(osp: &mut O, said: u16, daddr7: u8) -> Result<(), Error> {
        probe(osp, said, daddr7, REG_INVAL)
    }

    /// Binds to the expander at `daddr7` behind node `said`, wired as `pincfg` describes.
    ///
    /// Switches all LEDs off, makes the button pins inputs and takes a first button
    /// sample, so the first edge query after the next scan is meaningful.
    ///
    /// # Errors
    /// [`Error::PinConfig`] when `pincfg` is invalid; the driver is left untouched.
    pub fn init<O: OspI2c>(
        &mut self,
        osp: &mut O,
        said: u16,
        daddr7: u8,
        pincfg: u32,
    ) -> Result<(), Error> {
        let config = PinConfig::parse(pincfg)?;
        *self = Self {
            binding: Some(Binding { said, daddr7 }),
            config,
            ..Self::default()
        };
        self.led_set(osp, LEDNONE)?;
        self.write(osp, REG_CFGINP, config.input_pins())?;
        self.but_scan(osp)
    }

    /// The wiring in use.
    pub fn config(&self) -> &PinConfig {
        &self.config
    }

    /// LEDs that are on.
    pub fn led_states(&self) -> u8 {
        self.leds
    }

    /// Switches on the LEDs in `leds`, others keep their state.
    pub fn led_on<O: OspI2c>(&mut self, osp: &mut O, leds: u8) -> Result<(), Error> {
        self.led_set(osp, self.leds | leds)
    }

    /// Switches off the LEDs in `leds`, others keep their state.
    pub fn led_off<O: OspI2c>(&mut self, osp: &mut O, leds: u8) -> Result<(), Error> {
        self.led_set(osp, self.leds & !leds)
    }

    /// Toggles the LEDs in `leds`.
    pub fn led_tgl<O: OspI2c>(&mut self, osp: &mut O, leds: u8) -> Result<(), Error> {
        self.led_set(osp, self.leds ^ leds)
    }

    /// Switches on exactly the LEDs in `leds`.
    pub fn led_set<O: OspI2c>(&mut self, osp: &mut O, leds: u8) -> Result<(), Error> {
        let binding = self.binding.ok_or(Error::NotBound)?;
        self.leds = leds & LEDALL;
        osp.i2c_write8(
            binding.said,
            binding.daddr7,
            REG_OUTVAL,
            &[self.config.led_sw2hw(self.leds)],
        )
    }

    /// Samples the buttons; the previous sample is kept for the edge queries.
    ///
    /// On a read error both samples are left as they were.
    pub fn but_scan<O: OspI2c>(&mut self, osp: &mut O) -> Result<(), Error> {
        let binding = self.binding.ok_or(Error::NotBound)?;
        let mut hw = [0u8; 1];
        osp.i2c_read8(binding.said, binding.daddr7, REG_INVAL, &mut hw)?;
        self.but_prev = self.but_cur;
        self.but_cur = self.config.but_hw2sw(hw[0]);
        Ok(())
    }

    /// Buttons of `buts` that are pressed now and were not in the previous scan.
    pub fn but_wentdown(&self, buts: u8) -> u8 {
        !self.but_prev & self.but_cur & buts
    }

    /// Buttons of `buts` that were pressed in the previous scan and are released now.
    pub fn but_wentup(&self, buts: u8) -> u8 {
        self.but_prev & !self.but_cur & buts
    }

    /// Buttons of `buts` that are pressed now.
    pub fn but_isdown(&self, buts: u8) -> u8 {
        self.but_cur & buts
    }

    /// Buttons of `buts` that are released now.
    pub fn but_isup(&self, buts: u8) -> u8 {
        !self.but_cur & buts
    }

    fn write<O: OspI2c>(&self, osp: &mut O, raddr: u8, value: u8) -> Result<(), Error> {
        let binding = self.binding.ok_or(Error::NotBound)?;
        osp.i2c_write8(binding.said, binding.daddr7, raddr, &[value])
    }
}

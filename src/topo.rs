//! Topology of the chain, as consumed by the apps.
//!
//! A topology layer resets and initializes the chain, discovers which nodes drive RGB
//! triplets and which have an I2C bridge, and knows where each I2C device lives. Apps only
//! see the result: a flat list of triplets to color, and a lookup from I2C device address
//! to bridge node.

use crate::error::Error;

/// Largest value of an RGB channel.
pub const BRIGHTNESS_MAX: u16 = 0x7FFF;

/// A color for one RGB triplet, 15 bits per channel.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    /// Red channel
    pub r: u16,
    /// Green channel
    pub g: u16,
    /// Blue channel
    pub b: u16,
}

impl Rgb {
    /// All channels off.
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    /// Full red.
    pub const RED: Rgb = Rgb::new(BRIGHTNESS_MAX, 0, 0);
    /// Full blue.
    pub const BLUE: Rgb = Rgb::new(0, 0, BRIGHTNESS_MAX);
    /// A dim yellow, a quarter of the maximum on red and green.
    pub const DIM_YELLOW: Rgb = Rgb::new(0x1FFF, 0x1FFF, 0);

    /// Creates a color from its channels.
    pub const fn new(r: u16, g: u16, b: u16) -> Self {
        Self { r, g, b }
    }
}

/// A discovered chain.
pub trait Topology {
    /// Resets and initializes the chain, then discovers triplets and I2C devices.
    fn build(&mut self) -> Result<(), Error>;

    /// Address of the bridge node with device `daddr7` on its I2C bus, `None` if absent.
    fn i2c_find(&mut self, daddr7: u8) -> Result<Option<u16>, Error>;

    /// Number of RGB triplets in the chain.
    fn triplet_count(&self) -> u16;

    /// Sets the color of triplet `index` (0-based, in chain order).
    fn set_triplet(&mut self, index: u16, rgb: &Rgb) -> Result<(), Error>;
}

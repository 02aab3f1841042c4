//! Drivers for the I2C devices found behind OSP bridge nodes.
//!
//! Every driver is an owned struct that starts unbound. `init` binds it to a bridge node
//! (and, for the selector, a device address and pin configuration), then applies the
//! device configuration. Using an unbound driver returns [`Error::NotBound`](crate::Error::NotBound).
//! Calling `init` again rebinds the driver.
//!
//! All register access goes through an [`OspI2c`](crate::osp::OspI2c) passed to each call,
//! so one bus can serve any number of drivers.
//!
//! `present` is an associated function: it probes a node without binding anything and
//! tells "no bridge" ([`Error::NoI2cBridge`](crate::Error::NoI2cBridge)) apart from
//! "no device" ([`Error::NoI2cDevice`](crate::Error::NoI2cDevice)).
//!
//! ## Drivers
//! - [`as5600`]: magnetic rotary position sensor
//! - [`as6212`]: temperature sensor
//! - [`sfh5721`]: ambient light sensor
//! - [`iox4b4l`]: I/O expander wired to 4 buttons and 4 indicator LEDs
//! - [`sseg`]: quad 7-segment display, with its [`font`]

pub mod as5600;
pub mod as6212;
pub mod font;
pub mod iox4b4l;
pub mod sfh5721;
pub mod sseg;

pub use as5600::As5600;
pub use as6212::As6212;
pub use iox4b4l::{Iox4b4l, PinConfig};
pub use sfh5721::Sfh5721;
pub use sseg::Sseg;

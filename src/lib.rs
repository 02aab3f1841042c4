//! # aospi
//!
//! A portable, no_std Rust stack for the OSP (Open System Protocol) daisy-chained LED and
//! sensor bus: the telegram transport towards the first node of the chain, drivers for the
//! I2C devices hanging behind OSP bridge nodes, and a sensors demo app coordinating them.
//!
//! This crate implements:
//! - `embedded-hal` traits for the control lines, the SPI master and delays
//! - 1-wire Manchester (MCU mode type A) and 2-wire SPI (type B) telegram transmission
//! - request/response round trips with timeout, length checks and hop estimation
//! - a CAN-FD tunnel backend for boards that reach the chain over CAN
//! - owned, explicitly bound drivers for the AS5600, AS6212, SFH5721, the 4-button/4-LED
//!   selector and the quad 7-segment display
//!
//! ## Crate features
//! | Feature            | Description |
//! |--------------------|-------------|
//! | `std`              | Disables `#![no_std]` support |
//! | `delay-loop`       | Blocking app loop driven by `embedded_hal::delay::DelayNs` |
//! | `global` (default) | `critical_section` guarded global transport |
//! | `defmt`            | Logs through `defmt` |
//! | `log` (default)    | Logs through `log` |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aospi::transport::{Phy, Transport};
//!
//! let mut spi = Transport::new(pins, link, delay, clock);
//! spi.init(Phy::Mcub)?;
//! let mut rx = [0u8; 4];
//! spi.txrx(&[0xA0, 0x04, 0x02, 0xA9], &mut rx)?;
//! let hops = spi.txrx_hops(aospi::consts::TXRX_HOPS_T_EXTRA_DEFAULT);
//! ```
//!
//! Or, run an app with `run_app_loop()` on a board that also implements `DelayNs`:
//!
//! ```rust,ignore
//! let mut app = aospi::apps::sensors::SensorsApp::new();
//! let Err(e) = aospi::timer::run_app_loop(&mut app, &mut board, 10);
//! ```
//!
//! ## Integration Notes
//!
//! - The OSP chain expects 2.4 MHz +/- 50% on the SPI lines, configure the SPI peripheral for
//!   [`transport::Phy::out_frequency_hz`]
//! - Only one round trip may be in flight; the transport is not reentrant
//! - Telegram framing (addresses, CRC) is left to the caller, the transport only moves bytes
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "global")]
pub use critical_section;

#[cfg(not(feature = "std"))]
pub use heapless;

pub mod apps;
pub mod can;
pub mod consts;
pub mod drivers;
pub mod encoding;
pub mod error;
pub mod osp;
pub mod timer;
pub mod topo;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, PinConfigError};

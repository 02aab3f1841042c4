//! Constants used across the OSP transport, drivers and apps.
//!
//! This module defines bus-wide constants for telegram sizing, line frequencies and the
//! timing budget of a round trip, plus the I2C device addresses used on the SAIDsense and
//! SAIDbasic evaluation boards.
//!
//! ## Key Concepts
//!
//! - **Telegrams**: at most 12 bytes, 24 after Manchester expansion.
//! - **Round trip**: the first node answers in BiDir, the last node in Loop. The response
//!   timeout covers the longest chain (1002 nodes) in BiDir.
//! - **Hops**: every node forwards with a propagation delay of 7.5 µs, which the hop
//!   estimator uses to turn a trip time into a node count.

/// Maximum size (in bytes) of a telegram, command or response.
pub const TELE_MAXSIZE: usize = 12;

/// Maximum size (in bytes) of a telegram after Manchester expansion.
pub const TELE_MAXSIZE_MANCHESTER: usize = 2 * TELE_MAXSIZE;

/// SPI clock for MCU mode type A (1-wire Manchester, two symbols per bit).
pub const TYPEA_FREQ_HZ: u32 = 2 * 2_400_000;

/// SPI clock for MCU mode type B (2-wire SPI).
pub const TYPEB_FREQ_HZ: u32 = 2_400_000;

/// Number of nodes in the longest supported chain.
pub const CHAIN_MAXNODES: u32 = 1002;

/// Worst case time (µs) until a response starts.
///
/// 1400 µs service time of a node plus 2×8 µs forwarding per hop, for all hops of the
/// longest chain in BiDir.
pub const IN_TIMEOUT_US: u32 = 1400 + 2 * 8 * (CHAIN_MAXNODES - 1);

/// Software overhead (µs) included in a measured trip time.
pub const TXRX_SW_OVERHEAD_US: u32 = 11;

/// Default `t_extra` (µs) for the hop estimator: a SAID in BiDir delays its answer by 5 µs.
pub const TXRX_HOPS_T_EXTRA_DEFAULT: u32 = 5;

/// Time (µs) needed to clock in `rxsize` response bytes, assuming a slightly slow 2.3 MHz.
pub const fn tele_us(rxsize: usize) -> u32 {
    (rxsize as u32 * 800) / 230
}

/// OSP address of the node used for temperature when no AS6212 is found.
pub const SAID_DEFAULT_ADDR: u16 = 0x001;

/// I2C address of the AS5600 rotary sensor on the SAIDsense board.
pub const AS5600_DADDR7_SAIDSENSE: u8 = 0x36;

/// I2C address of the AS6212 temperature sensor on the SAIDsense board.
pub const AS6212_DADDR7_SAIDSENSE: u8 = 0x48;

/// I2C address of the SFH5721 light sensor on the SAIDsense board.
pub const SFH5721_DADDR7_SAIDSENSE: u8 = 0x26;

/// Alternative I2C address of the SFH5721 (ADDR pin high).
pub const SFH5721_DADDR7_ALT: u8 = 0x27;

/// I2C address of the left-most (most significant) 7-segment module.
pub const SSEG_0_DADDR7_SAIDSENSE: u8 = 0x38;

/// Number of 7-segment modules forming the display.
pub const SSEG_MODULES: usize = 4;

/// I2C address of the selector I/O-expander on the SAIDsense board.
pub const IOX4B4L_DADDR7_SAIDSENSE: u8 = 0x3C;

/// Pin configuration of the selector on the SAIDsense board (all pins low active).
pub const IOX4B4L_PINCFG_SAIDSENSE: u32 = 0x7531_6420;

/// I2C address of the selector I/O-expander on the pre-production SAIDsense V2 board.
pub const IOX4B4L_DADDR7_SAIDSENSEV2: u8 = 0x3F;

/// Pin configuration of the selector on the SAIDsense V2 board (LEDs high active).
pub const IOX4B4L_PINCFG_SAIDSENSEV2: u32 = 0x7420_6531 | 0x8888_0000;

/// I2C address of the selector I/O-expander on the SAIDbasic board.
pub const IOX4B4L_DADDR7_SAIDBASIC: u8 = 0x20;

/// Pin configuration of the selector on the SAIDbasic board (LEDs high active).
pub const IOX4B4L_PINCFG_SAIDBASIC: u32 = 0x7531_6420 | 0x8888_0000;

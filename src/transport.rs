//! Telegram transport towards and from an OSP chain.
//!
//! This module provides the [`Transport`] struct, which moves telegrams between the MCU and
//! the first (BiDir) or last (Loop) node of a daisy chain. It sends command telegrams with
//! [`tx()`](Transport::tx) and does request/response round trips with
//! [`txrx()`](Transport::txrx), measuring the trip time for hop estimation.
//!
//! ## Physical layer
//!
//! - **MCU mode type A** ([`Phy::Mcua`]): 1-wire, every byte is Manchester encoded and sent at
//!   4.8 MHz
//! - **MCU mode type B** ([`Phy::Mcub`]): 2-wire SPI, bytes are sent as is at 2.4 MHz
//!
//! Responses always come back as plain SPI; the MCU acts as SPI slave for them.
//!
//! ## Control lines
//!
//! | Line       | Purpose |
//! |------------|---------|
//! | `out_oena` | enables the level shifter between SPI out and the first node |
//! | `in_oena`  | enables the level shifter on the response side |
//! | `in_msel`  | low-active select of the SPI slave receiving the response |
//! | `dirl`     | direction mux: low routes the first node (BiDir), high the last node (Loop) |
//!
//! `out_oena` is only high while a telegram is sent: the first node samples this line after
//! a reset telegram to determine its own communication mode.
//!
//! ## Backends
//!
//! The wire itself is reached through a [`Link`]. [`SpiLink`] combines an SPI master, a
//! background [`SlaveSpi`] receiver and a tap of the response clock. The CAN-FD tunnel in
//! [`crate::can`] is the other implementation.

use crate::consts::{
    IN_TIMEOUT_US, TELE_MAXSIZE, TELE_MAXSIZE_MANCHESTER, TXRX_SW_OVERHEAD_US, TYPEA_FREQ_HZ,
    TYPEB_FREQ_HZ, tele_us,
};
use crate::encoding::encode_buffer;
use crate::error::Error;
use crate::timer::{Monotonic, estimate_hops};
use defmt_or_log::{debug, info};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

/// Physical layer used towards the first node, selected once in [`Transport::init`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phy {
    /// Not yet initialized.
    #[default]
    Undef,
    /// MCU mode type A: 1-wire Manchester.
    Mcua,
    /// MCU mode type B: 2-wire SPI.
    Mcub,
}

impl Phy {
    /// Printable name of the physical layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Phy::Undef => "<unknown>",
            Phy::Mcua => "MCU-A",
            Phy::Mcub => "MCU-B",
        }
    }

    /// SPI clock needed to send telegrams on this physical layer.
    pub fn out_frequency_hz(self) -> Option<u32> {
        match self {
            Phy::Undef => None,
            Phy::Mcua => Some(TYPEA_FREQ_HZ),
            Phy::Mcub => Some(TYPEB_FREQ_HZ),
        }
    }
}

/// Routing of the direction mux.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dir {
    /// The first node answers (bidirectional chain).
    #[default]
    BiDir,
    /// The last node answers (chain wired as a loop).
    Loop,
}

/// The wire between the MCU and the chain.
///
/// A round trip calls, in order: [`arm`](Link::arm), [`send`](Link::send),
/// [`listen`](Link::listen), [`activity`](Link::activity) until it reports `true` or the
/// transport times out, and finally [`take`](Link::take). When the round trip fails
/// after `arm`, [`disarm`](Link::disarm) is called instead of `take`.
pub trait Link {
    /// Sends telegram bytes (already Manchester encoded for type A).
    fn send(&mut self, bytes: &[u8]) -> Result<(), Error>;
    /// Prepares reception of one response, before the command is sent.
    fn arm(&mut self) -> Result<(), Error>;
    /// Called once the response path is enabled and selected.
    fn listen(&mut self) -> Result<(), Error>;
    /// Whether the response has started arriving since [`listen`](Link::listen).
    fn activity(&mut self) -> Result<bool, Error>;
    /// Copies the response into `buf` and returns the number of bytes received.
    fn take(&mut self, buf: &mut [u8]) -> Result<usize, Error>;
    /// Drops whatever reception state `arm` and `activity` left behind.
    fn disarm(&mut self);
    /// Time (µs) to wait after activity for a response of `rxsize` bytes to complete.
    fn settle_us(&self, rxsize: usize) -> u32 {
        tele_us(rxsize)
    }
}

/// Background SPI slave reception, as offered by slave drivers with a transaction queue.
///
/// A queued buffer stays in flight while chip-select is asserted and completes when
/// chip-select is released, holding however many bytes were clocked in (possibly none).
pub trait SlaveSpi {
    /// Number of queued buffers not yet completed.
    fn num_in_flight(&self) -> usize;
    /// Number of completed buffers not yet read.
    fn num_completed(&self) -> usize;
    /// Queues a receive buffer of `len` bytes and starts listening.
    fn queue(&mut self, len: usize) -> Result<(), Error>;
    /// Copies the oldest completed buffer into `buf`, returns the bytes received in it.
    fn read(&mut self, buf: &mut [u8]) -> usize;
    /// Cancels buffers in flight and drops completed buffers not yet read.
    fn abort(&mut self);
}

/// SPI master out, [`SlaveSpi`] in, and an input tapping the response clock line.
#[derive(Debug)]
pub struct SpiLink<S, SL, I> {
    /// SPI master sending the telegrams
    pub out: S,
    /// SPI slave receiving the responses
    pub slave: SL,
    /// Tap of the response clock (CINT)
    pub cint: I,
    cint_ref: bool,
}

impl<S, SL, I> SpiLink<S, SL, I>
where
    S: SpiBus,
    SL: SlaveSpi,
    I: InputPin,
{
    /// Combines the three parts of an SPI based link.
    pub fn new(out: S, slave: SL, cint: I) -> Self {
        Self {
            out,
            slave,
            cint,
            cint_ref: false,
        }
    }
}

impl<S, SL, I> Link for SpiLink<S, SL, I>
where
    S: SpiBus,
    SL: SlaveSpi,
    I: InputPin,
{
    fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.out.write(bytes).map_err(|_| Error::Bus)?;
        self.out.flush().map_err(|_| Error::Bus)
    }

    fn arm(&mut self) -> Result<(), Error> {
        if self.slave.num_in_flight() != 0 || self.slave.num_completed() != 0 {
            return Err(Error::Assert);
        }
        self.slave.queue(TELE_MAXSIZE)
    }

    fn listen(&mut self) -> Result<(), Error> {
        self.cint_ref = self.cint.is_high().map_err(|_| Error::Pin)?;
        Ok(())
    }

    fn activity(&mut self) -> Result<bool, Error> {
        Ok(self.cint.is_high().map_err(|_| Error::Pin)? != self.cint_ref)
    }

    fn take(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if self.slave.num_in_flight() != 0 || self.slave.num_completed() != 1 {
            return Err(Error::Assert);
        }
        Ok(self.slave.read(buf))
    }

    fn disarm(&mut self) {
        self.slave.abort();
    }
}

/// The four control lines of the transport.
#[derive(Debug)]
pub struct ControlPins<P> {
    /// Output enable of the level shifter towards the first node
    pub out_oena: P,
    /// Output enable of the level shifter on the response side
    pub in_oena: P,
    /// Select of the response SPI slave, low active
    pub in_msel: P,
    /// Direction mux, low is BiDir
    pub dirl: P,
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), Error> {
    if high {
        pin.set_high().map_err(|_| Error::Pin)
    } else {
        pin.set_low().map_err(|_| Error::Pin)
    }
}

/// Telegram transport over a [`Link`], with control lines, a delay and a clock.
///
/// ## Type Parameters
///
/// - `L`: the [`Link`] backend
/// - `P`: a type implementing [`OutputPin`] for all four control lines
/// - `D`: a [`DelayNs`] provider, used to wait for a response to be clocked in
/// - `C`: a [`Monotonic`] clock, used for timeouts and trip times
///
/// ## Notes
///
/// - Calls must not overlap: one `txrx()` fully completes (select released, level shifters
///   restored) before the next starts.
/// - Every operation but the constructor fails with [`Error::Assert`] before
///   [`init()`](Transport::init).
#[derive(Debug)]
pub struct Transport<L, P, D, C> {
    /// Control lines
    pub pins: ControlPins<P>,
    /// Backend moving the bytes
    pub link: L,
    delay: D,
    clock: C,
    phy: Phy,
    dir: Dir,
    out_oena: bool,
    in_oena: bool,
    txcount: u32,
    rxcount: u32,
    txrx_us: u32,
    txrx_size: usize,
    rxbuf: [u8; TELE_MAXSIZE],
}

impl<L, P, D, C> Transport<L, P, D, C>
where
    L: Link,
    P: OutputPin,
    D: DelayNs,
    C: Monotonic,
{
    /// Creates an uninitialized transport. No lines are driven until [`init()`](Self::init).
    pub fn new(pins: ControlPins<P>, link: L, delay: D, clock: C) -> Self {
        Self {
            pins,
            link,
            delay,
            clock,
            phy: Phy::Undef,
            dir: Dir::BiDir,
            out_oena: false,
            in_oena: false,
            txcount: 0,
            rxcount: 0,
            txrx_us: 0,
            txrx_size: 0,
            rxbuf: [0; TELE_MAXSIZE],
        }
    }

    /// Selects the physical layer and drives all control lines to their idle level.
    ///
    /// Both level shifters are disabled, the response slave is deselected and the direction
    /// mux is set to BiDir.
    ///
    /// # Errors
    /// - [`Error::Assert`] when already initialized or when `phy` is [`Phy::Undef`]
    /// - [`Error::Pin`] when a control line can not be driven
    pub fn init(&mut self, phy: Phy) -> Result<(), Error> {
        if self.phy != Phy::Undef || phy == Phy::Undef {
            return Err(Error::Assert);
        }
        drive(&mut self.pins.out_oena, false)?;
        drive(&mut self.pins.in_msel, true)?;
        drive(&mut self.pins.in_oena, false)?;
        drive(&mut self.pins.dirl, false)?;
        self.out_oena = false;
        self.in_oena = false;
        self.dir = Dir::BiDir;
        self.phy = phy;
        info!("aospi: init phy {}", phy.as_str());
        Ok(())
    }

    /// The physical layer selected in [`init()`](Self::init).
    pub fn phy(&self) -> Phy {
        self.phy
    }

    fn ensure_init(&self) -> Result<(), Error> {
        if self.phy == Phy::Undef {
            Err(Error::Assert)
        } else {
            Ok(())
        }
    }

    fn send(&mut self, tx: &[u8]) -> Result<(), Error> {
        let mut wire = [0u8; TELE_MAXSIZE_MANCHESTER];
        let bytes = match self.phy {
            Phy::Mcua => {
                let n = encode_buffer(tx, &mut wire);
                &wire[..n]
            }
            _ => tx,
        };
        drive(&mut self.pins.out_oena, true)?;
        let sent = self.link.send(bytes);
        let released = drive(&mut self.pins.out_oena, false);
        sent.and(released)
    }

    /// Sends a command telegram; no response is expected.
    ///
    /// # Errors
    /// - [`Error::Assert`] before [`init()`](Self::init)
    /// - [`Error::SpiBuf`] when `tx` exceeds [`TELE_MAXSIZE`]
    /// - [`Error::Bus`] / [`Error::Pin`] from the link or the control lines
    pub fn tx(&mut self, tx: &[u8]) -> Result<(), Error> {
        self.ensure_init()?;
        if tx.len() > TELE_MAXSIZE {
            return Err(Error::SpiBuf);
        }
        self.send(tx)?;
        self.txcount = self.txcount.wrapping_add(1);
        Ok(())
    }

    /// Sends a command telegram and receives a response of exactly `rx.len()` bytes.
    ///
    /// When fewer or more bytes arrive, the unreliable tail of `rx` is zeroed and
    /// [`Error::SpiLength`] is returned.
    ///
    /// # Errors
    /// As [`tx()`](Self::tx), plus
    /// - [`Error::SpiBuf`] when `rx` exceeds [`TELE_MAXSIZE`]
    /// - [`Error::SpiNoClock`] when no response started within [`IN_TIMEOUT_US`]
    /// - [`Error::SpiLength`] when the response size differs from `rx.len()`
    /// - [`Error::Assert`] when the receive queue was not in the expected state
    pub fn txrx(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Error> {
        self.txrx_internal(tx, rx, true).map(|_| ())
    }

    /// Sends a command telegram and receives a response of at most `rx.len()` bytes.
    ///
    /// Returns the number of bytes the chain sent, which may exceed `rx.len()`; only the
    /// bytes that fit are copied. There is no length check.
    pub fn txrx_dynamic(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<usize, Error> {
        self.txrx_internal(tx, rx, false)
    }

    fn txrx_internal(&mut self, tx: &[u8], rx: &mut [u8], exact: bool) -> Result<usize, Error> {
        self.ensure_init()?;
        if tx.len() > TELE_MAXSIZE || rx.len() > TELE_MAXSIZE {
            return Err(Error::SpiBuf);
        }

        self.link.arm()?;
        let start = self.clock.now_us();
        let taken = self
            .exchange(tx, rx.len())
            .and_then(|trip| self.link.take(&mut self.rxbuf).map(|n| (trip, n)));
        let ((clkflip, end), rxact) = match taken {
            Ok(taken) => taken,
            Err(e) => {
                // nothing of this trip may answer the next command
                self.link.disarm();
                return Err(e);
            }
        };
        let n = rxact.min(rx.len());
        rx[..n].copy_from_slice(&self.rxbuf[..n]);
        if exact && rxact != rx.len() {
            rx[n..].fill(0);
        }

        self.txcount = self.txcount.wrapping_add(1);
        self.rxcount = self.rxcount.wrapping_add(1);
        self.txrx_size = tx.len() + rxact;
        self.txrx_us = u32::try_from(end.saturating_sub(start))
            .unwrap_or(u32::MAX)
            .saturating_sub(TXRX_SW_OVERHEAD_US);

        if !clkflip {
            debug!("aospi: no response clock within {} us", IN_TIMEOUT_US);
            return Err(Error::SpiNoClock);
        }
        if exact && rxact != rx.len() {
            debug!("aospi: expected {} response bytes, got {}", rx.len(), rxact);
            return Err(Error::SpiLength);
        }
        Ok(rxact)
    }

    // Returns whether the response clock flipped, and the end stamp of the trip.
    fn exchange(&mut self, tx: &[u8], rxsize: usize) -> Result<(bool, u64), Error> {
        self.send(tx)?;
        // Select must be released on every path from here
        let waited = self.enable_rx().and_then(|()| self.await_response(rxsize));
        let released = self.release_rx();
        let trip = waited?;
        released?;
        Ok(trip)
    }

    fn enable_rx(&mut self) -> Result<(), Error> {
        drive(&mut self.pins.in_oena, true)?;
        self.in_oena = true;
        drive(&mut self.pins.in_msel, false)
    }

    fn release_rx(&mut self) -> Result<(), Error> {
        let deselected = drive(&mut self.pins.in_msel, true);
        let disabled = drive(&mut self.pins.in_oena, false);
        self.in_oena = false;
        deselected.and(disabled)
    }

    fn await_response(&mut self, rxsize: usize) -> Result<(bool, u64), Error> {
        self.link.listen()?;
        let t0 = self.clock.now_us();
        let mut clkflip = false;
        while self.clock.now_us().saturating_sub(t0) < u64::from(IN_TIMEOUT_US) {
            if self.link.activity()? {
                clkflip = true;
                break;
            }
        }
        self.delay.delay_us(self.link.settle_us(rxsize));
        Ok((clkflip, self.clock.now_us()))
    }

    /// Number of telegrams sent by `tx()` and `txrx()` since the last reset.
    pub fn txcount(&self) -> u32 {
        self.txcount
    }

    /// Number of responses received by `txrx()` since the last reset.
    pub fn rxcount(&self) -> u32 {
        self.rxcount
    }

    /// Resets the transmit counter.
    pub fn txcount_reset(&mut self) {
        self.txcount = 0;
    }

    /// Resets the receive counter.
    pub fn rxcount_reset(&mut self) {
        self.rxcount = 0;
    }

    /// Trip time (µs) of the last `txrx()`, from the first bit sent to the last bit received.
    pub fn txrx_us(&self) -> u32 {
        self.txrx_us
    }

    /// Estimated number of hops of the last `txrx()`.
    ///
    /// `t_extra` is the execution time of the command plus the artificial delay of the
    /// answering node, see [`estimate_hops`].
    pub fn txrx_hops(&self, t_extra: u32) -> u32 {
        estimate_hops(self.txrx_us, self.txrx_size, t_extra)
    }

    /// Routes the response of the first (BiDir) or last (Loop) node to the MCU.
    ///
    /// Only reception is affected; telegrams are always sent to the first node.
    pub fn dirmux_set(&mut self, dir: Dir) -> Result<(), Error> {
        self.ensure_init()?;
        drive(&mut self.pins.dirl, dir == Dir::Loop)?;
        self.dir = dir;
        Ok(())
    }

    /// Current routing of the direction mux.
    pub fn dirmux(&self) -> Result<Dir, Error> {
        self.ensure_init()?;
        Ok(self.dir)
    }

    /// Drives the output enable towards the first node; for PCB tests only.
    pub fn outoena_set(&mut self, enable: bool) -> Result<(), Error> {
        self.ensure_init()?;
        drive(&mut self.pins.out_oena, enable)?;
        self.out_oena = enable;
        Ok(())
    }

    /// Last level driven on the output enable towards the first node.
    pub fn outoena_get(&self) -> Result<bool, Error> {
        self.ensure_init()?;
        Ok(self.out_oena)
    }

    /// Drives the output enable on the response side; for PCB tests only.
    pub fn inoena_set(&mut self, enable: bool) -> Result<(), Error> {
        self.ensure_init()?;
        drive(&mut self.pins.in_oena, enable)?;
        self.in_oena = enable;
        Ok(())
    }

    /// Last level driven on the output enable on the response side.
    pub fn inoena_get(&self) -> Result<bool, Error> {
        self.ensure_init()?;
        Ok(self.in_oena)
    }
}

//! CAN-FD tunnel backend for the telegram transport.
//!
//! Some boards do not drive the OSP chain directly but through a bridge reached over CAN-FD.
//! Telegrams (Manchester expanded for type A) travel to the bridge in frames with id
//! [`TX_ID`], responses come back in frames with id [`RX_ID`]. [`CanTunnel`] implements
//! [`Link`] on top of any [`CanFdBus`].
//!
//! ## Frame layout
//!
//! - outgoing frames always carry [`TX_DLC`] (24 bytes, room for a Manchester expanded
//!   telegram), zero padded, with bit rate switch and extended data length set
//! - payload bytes are packed into 32-bit data words, first byte in the most significant
//!   position
//! - the size of a response is derived from the DLC of the incoming frame
//!
//! A bus error while sending or receiving is reported as [`Error::Bus`]; frames with other
//! ids are dropped. A round trip starts with an empty inbox, so a response that arrives
//! after its round trip timed out is never taken for the next one.

use crate::error::Error;
use crate::transport::Link;
use defmt_or_log::debug;
use nb::block;

/// Standard id of frames towards the chain.
pub const TX_ID: u16 = 0x123;

/// Standard id of frames coming from the chain.
pub const RX_ID: u16 = 0x321;

/// DLC of every frame towards the chain (24 bytes).
pub const TX_DLC: u8 = 12;

/// Number of 32-bit data words in the largest CAN-FD frame.
pub const DATA_WORDS: usize = 16;

/// Payload size in bytes for a DLC code.
///
/// Codes up to 8 are literal, larger ones follow the CAN-FD table. Codes above 15 are
/// clamped to 64 bytes.
pub const fn dlc_to_len(dlc: u8) -> usize {
    match dlc {
        0..=8 => dlc as usize,
        9 => 12,
        10 => 16,
        11 => 20,
        12 => 24,
        13 => 32,
        14 => 48,
        _ => 64,
    }
}

/// Smallest DLC code whose payload holds `len` bytes, or `None` above 64 bytes.
pub const fn len_to_dlc(len: usize) -> Option<u8> {
    let mut dlc = 0;
    while dlc <= 15 {
        if dlc_to_len(dlc) >= len {
            return Some(dlc);
        }
        dlc += 1;
    }
    None
}

/// A CAN-FD data frame with an 11-bit identifier.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanFdFrame {
    /// Standard (11-bit) identifier
    pub id: u16,
    /// Data length code
    pub dlc: u8,
    /// Bit rate switch
    pub brs: bool,
    /// Extended data length (FD format)
    pub edl: bool,
    /// Payload, packed big-endian into words
    pub data: [u32; DATA_WORDS],
}

impl CanFdFrame {
    /// Builds an FD frame carrying `bytes`, zero padded to the payload size of `dlc`.
    ///
    /// Returns `None` when `bytes` does not fit.
    pub fn pack(id: u16, dlc: u8, bytes: &[u8]) -> Option<Self> {
        if bytes.len() > dlc_to_len(dlc) {
            return None;
        }
        let mut data = [0u32; DATA_WORDS];
        for (word, chunk) in data.iter_mut().zip(bytes.chunks(4)) {
            let mut be = [0u8; 4];
            be[..chunk.len()].copy_from_slice(chunk);
            *word = u32::from_be_bytes(be);
        }
        Some(Self {
            id,
            dlc,
            brs: true,
            edl: true,
            data,
        })
    }

    /// Payload size in bytes.
    pub fn data_len(&self) -> usize {
        dlc_to_len(self.dlc)
    }

    /// Copies the payload into `buf`, returns the number of bytes copied.
    pub fn unpack(&self, buf: &mut [u8]) -> usize {
        let n = self.data_len().min(buf.len());
        for (i, b) in buf[..n].iter_mut().enumerate() {
            *b = self.data[i / 4].to_be_bytes()[i % 4];
        }
        n
    }
}

/// A CAN-FD controller with non-blocking send and receive.
pub trait CanFdBus {
    /// Controller specific error.
    type Error;
    /// Starts sending `frame`; `WouldBlock` while no transmit buffer is free.
    fn transmit(&mut self, frame: &CanFdFrame) -> nb::Result<(), Self::Error>;
    /// Returns the next received frame; `WouldBlock` while none is pending.
    fn receive(&mut self) -> nb::Result<CanFdFrame, Self::Error>;
}

/// Telegram link tunneled over CAN-FD.
#[derive(Debug)]
pub struct CanTunnel<B> {
    /// The CAN-FD controller
    pub bus: B,
    pending: Option<CanFdFrame>,
}

impl<B: CanFdBus> CanTunnel<B> {
    /// Wraps a CAN-FD controller.
    pub fn new(bus: B) -> Self {
        Self { bus, pending: None }
    }
}

impl<B: CanFdBus> Link for CanTunnel<B> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let frame = CanFdFrame::pack(TX_ID, TX_DLC, bytes).ok_or(Error::SpiBuf)?;
        block!(self.bus.transmit(&frame)).map_err(|_| Error::Bus)
    }

    fn arm(&mut self) -> Result<(), Error> {
        // Replies that showed up after an earlier timeout answer an earlier command
        self.pending = None;
        loop {
            match self.bus.receive() {
                Ok(frame) => {
                    if frame.id == RX_ID {
                        debug!("aospi: dropping late response frame");
                    }
                }
                Err(nb::Error::WouldBlock) => return Ok(()),
                Err(nb::Error::Other(_)) => return Err(Error::Bus),
            }
        }
    }

    fn listen(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn activity(&mut self) -> Result<bool, Error> {
        match self.bus.receive() {
            Ok(frame) if frame.id == RX_ID => {
                self.pending = Some(frame);
                Ok(true)
            }
            Ok(_) | Err(nb::Error::WouldBlock) => Ok(false),
            Err(nb::Error::Other(_)) => Err(Error::Bus),
        }
    }

    fn take(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.pending.take() {
            Some(frame) => Ok(frame.unpack(buf)),
            // no frame arrived; the transport reports the missing clock
            None => Ok(0),
        }
    }

    fn disarm(&mut self) {
        self.pending = None;
    }

    fn settle_us(&self, _rxsize: usize) -> u32 {
        0
    }
}

//! Fakes shared by the unit tests: a steppable clock, an OSP bus with I2C devices behind
//! bridge nodes, and a board bundling the bus with topology and UI buttons.

use crate::apps::{UiButton, UiButtons};
use crate::error::Error;
use crate::osp::{OspI2c, OspNode};
use crate::timer::Monotonic;
use crate::topo::{Rgb, Topology};
use core::cell::Cell;
use embedded_hal::delay::DelayNs;
use std::collections::{HashMap, HashSet, VecDeque};

/// A clock that advances by `step` µs every time it is read.
#[derive(Debug)]
pub(crate) struct FakeClock {
    now: Cell<u64>,
    step: u64,
}

impl FakeClock {
    pub(crate) fn new(step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }

    pub(crate) fn advance_ms(&self, ms: u64) {
        self.now.set(self.now.get() + ms * 1_000);
    }
}

impl Monotonic for FakeClock {
    fn now_us(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

type RegKey = (u16, u8, u8);

/// An OSP chain seen through the I2C bridge commands.
///
/// Registers behave like memory: a write replaces the value, a read returns it, unless the
/// register was stuck with [`FakeOsp::stick_reg`]. Values
/// queued with [`FakeOsp::queue_reg`] are returned one per read, the last one sticks.
/// Registers never written read as zeros.
#[derive(Debug, Default)]
pub(crate) struct FakeOsp {
    bridges: HashSet<u16>,
    devices: HashSet<(u16, u8)>,
    regs: HashMap<RegKey, VecDeque<Vec<u8>>>,
    stuck: HashSet<RegKey>,
    temps: HashMap<u16, u8>,
    failures: VecDeque<Error>,
    pub(crate) reads: Vec<RegKey>,
    pub(crate) writes: Vec<(RegKey, Vec<u8>)>,
    pub(crate) delayed_ns: u64,
}

impl FakeOsp {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enables the I2C bridge of node `said`.
    pub(crate) fn bridge(&mut self, said: u16) {
        let _ = self.bridges.insert(said);
    }

    /// Attaches device `daddr7` to the (enabled) bridge of node `said`.
    pub(crate) fn device(&mut self, said: u16, daddr7: u8) {
        self.bridge(said);
        let _ = self.devices.insert((said, daddr7));
    }

    pub(crate) fn set_reg(&mut self, said: u16, daddr7: u8, raddr: u8, bytes: &[u8]) {
        let _ = self
            .regs
            .insert((said, daddr7, raddr), VecDeque::from([bytes.to_vec()]));
    }

    pub(crate) fn queue_reg(&mut self, said: u16, daddr7: u8, raddr: u8, bytes: &[u8]) {
        self.regs
            .entry((said, daddr7, raddr))
            .or_default()
            .push_back(bytes.to_vec());
    }

    /// Sets a register that ignores writes.
    pub(crate) fn stick_reg(&mut self, said: u16, daddr7: u8, raddr: u8, bytes: &[u8]) {
        self.set_reg(said, daddr7, raddr, bytes);
        let _ = self.stuck.insert((said, daddr7, raddr));
    }

    /// Current value of a register, as last written or set.
    pub(crate) fn reg(&self, said: u16, daddr7: u8, raddr: u8) -> Option<&[u8]> {
        self.regs
            .get(&(said, daddr7, raddr))
            .and_then(|q| q.back())
            .map(Vec::as_slice)
    }

    pub(crate) fn set_temp(&mut self, said: u16, raw: u8) {
        let _ = self.temps.insert(said, raw);
    }

    /// Makes the next bus access fail with `err`; calls stack up.
    pub(crate) fn fail_next(&mut self, err: Error) {
        self.failures.push_back(err);
    }

    fn access(&mut self, said: u16, daddr7: u8) -> Result<(), Error> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        if !self.devices.contains(&(said, daddr7)) {
            return Err(Error::I2cNack);
        }
        Ok(())
    }
}

impl OspI2c for FakeOsp {
    fn i2c_enable_get(&mut self, said: u16) -> Result<bool, Error> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        Ok(self.bridges.contains(&said))
    }

    fn i2c_read8(
        &mut self,
        said: u16,
        daddr7: u8,
        raddr: u8,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        self.reads.push((said, daddr7, raddr));
        self.access(said, daddr7)?;
        buf.fill(0);
        if let Some(queue) = self.regs.get_mut(&(said, daddr7, raddr)) {
            let value = if queue.len() > 1 {
                queue.pop_front().unwrap_or_default()
            } else {
                queue.front().cloned().unwrap_or_default()
            };
            let n = value.len().min(buf.len());
            buf[..n].copy_from_slice(&value[..n]);
        }
        Ok(())
    }

    fn i2c_write8(&mut self, said: u16, daddr7: u8, raddr: u8, buf: &[u8]) -> Result<(), Error> {
        self.access(said, daddr7)?;
        self.writes.push(((said, daddr7, raddr), buf.to_vec()));
        if !self.stuck.contains(&(said, daddr7, raddr)) {
            self.set_reg(said, daddr7, raddr, buf);
        }
        Ok(())
    }
}

impl OspNode for FakeOsp {
    fn read_temp(&mut self, said: u16) -> Result<u8, Error> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        self.temps.get(&said).copied().ok_or(Error::Other)
    }
}

impl DelayNs for FakeOsp {
    fn delay_ns(&mut self, ns: u32) {
        self.delayed_ns += u64::from(ns);
    }
}

/// Everything the sensors app talks to.
#[derive(Debug)]
pub(crate) struct FakeBoard {
    pub(crate) osp: FakeOsp,
    pub(crate) clock: FakeClock,
    pub(crate) triplets: Vec<Rgb>,
    pub(crate) builds: u32,
    found: HashMap<u8, u16>,
    pressed: Vec<UiButton>,
}

impl FakeBoard {
    pub(crate) fn new(triplets: usize) -> Self {
        Self {
            osp: FakeOsp::new(),
            clock: FakeClock::new(0),
            triplets: vec![Rgb::OFF; triplets],
            builds: 0,
            found: HashMap::new(),
            pressed: Vec::new(),
        }
    }

    /// Places device `daddr7` behind node `said`, visible to both the topology and the bus.
    pub(crate) fn attach(&mut self, said: u16, daddr7: u8) {
        self.osp.device(said, daddr7);
        let _ = self.found.insert(daddr7, said);
    }

    /// Registers a press of `button`, reported once.
    pub(crate) fn press(&mut self, button: UiButton) {
        self.pressed.push(button);
    }
}

impl OspI2c for FakeBoard {
    fn i2c_enable_get(&mut self, said: u16) -> Result<bool, Error> {
        self.osp.i2c_enable_get(said)
    }

    fn i2c_read8(
        &mut self,
        said: u16,
        daddr7: u8,
        raddr: u8,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        self.osp.i2c_read8(said, daddr7, raddr, buf)
    }

    fn i2c_write8(&mut self, said: u16, daddr7: u8, raddr: u8, buf: &[u8]) -> Result<(), Error> {
        self.osp.i2c_write8(said, daddr7, raddr, buf)
    }
}

impl OspNode for FakeBoard {
    fn read_temp(&mut self, said: u16) -> Result<u8, Error> {
        self.osp.read_temp(said)
    }
}

impl DelayNs for FakeBoard {
    fn delay_ns(&mut self, ns: u32) {
        self.osp.delay_ns(ns);
    }
}

impl Monotonic for FakeBoard {
    fn now_us(&self) -> u64 {
        self.clock.now_us()
    }
}

impl Topology for FakeBoard {
    fn build(&mut self) -> Result<(), Error> {
        self.builds += 1;
        Ok(())
    }

    fn i2c_find(&mut self, daddr7: u8) -> Result<Option<u16>, Error> {
        Ok(self.found.get(&daddr7).copied())
    }

    fn triplet_count(&self) -> u16 {
        self.triplets.len() as u16
    }

    fn set_triplet(&mut self, index: u16, rgb: &Rgb) -> Result<(), Error> {
        let slot = self
            .triplets
            .get_mut(usize::from(index))
            .ok_or(Error::Other)?;
        *slot = *rgb;
        Ok(())
    }
}

impl UiButtons for FakeBoard {
    fn went_down(&mut self, button: UiButton) -> bool {
        match self.pressed.iter().position(|&b| b == button) {
            Some(i) => {
                let _ = self.pressed.remove(i);
                true
            }
            None => false,
        }
    }
}

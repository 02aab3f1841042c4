//! The "sensors" app for the SAIDsense board.
//!
//! One of three sensors is active at a time: the AS6212 temperature sensor, the AS5600
//! rotary sensor under the knob or the SFH 5721 ambient light sensor. The quad 7-segment
//! display shows the reading of the active sensor and the chain animates it:
//!
//! - temperature: a blue part and a red part, split where the current temperature sits
//!   in a window around the long term average (warmer moves the split towards the start)
//! - angle: a dim yellow bar growing from 0 to 180 degrees and shrinking back to 360
//! - light: all triplets green, brighter with more light
//!
//! X cycles through the sensors that are present and flashes the unit on the display. Y
//! scrolls the type number of the active sensor over the display. The selector buttons
//! pick a sensor directly (temperature, angle, light, and the fourth falls back to
//! temperature); the indicator LED of the active sensor is on.
//!
//! Older boards may lack the rotary sensor, the light sensor, the display or the selector.
//! Without a temperature sensor the app reads the temperature of node
//! [`SAID_DEFAULT_ADDR`], so temperature mode always works.

use super::{App, AppDescriptor, AppFlags, UiButton, UiButtons};
use crate::consts::{
    AS5600_DADDR7_SAIDSENSE, AS6212_DADDR7_SAIDSENSE, IOX4B4L_DADDR7_SAIDSENSE,
    IOX4B4L_DADDR7_SAIDSENSEV2, IOX4B4L_PINCFG_SAIDSENSE, IOX4B4L_PINCFG_SAIDSENSEV2,
    SAID_DEFAULT_ADDR, SFH5721_DADDR7_SAIDSENSE, SSEG_0_DADDR7_SAIDSENSE,
};
use crate::drivers::as5600::angle_degrees;
use crate::drivers::iox4b4l::{BUT0, BUT1, BUT2, BUT3, LED0, LED1, LED2, LEDALL};
use crate::drivers::{As5600, As6212, Iox4b4l, Sfh5721, Sseg};
use crate::error::Error;
use crate::osp::{OspI2c, OspNode, said_temp_celsius};
use crate::timer::Monotonic;
use crate::topo::{BRIGHTNESS_MAX, Rgb, Topology};
use defmt_or_log::{info, warn};
use embedded_hal::delay::DelayNs;
use libm::round;

/// Time between measurements (ms).
pub const ANIM_MS: u64 = 50;
/// How long a unit stays on the display after a mode change (ms).
pub const HOLD_MS: u64 = 1500;
/// Time between two scroll steps of a label (ms).
pub const SCROLL_MS: u64 = 200;

const TEMP_TRIES: usize = 4;
const TEMP_RETRY_MS: u32 = 10;
/// Conversion period requested from the AS6212 (8 Hz)
const TEMP_CONVRATE_MS: u32 = 125;

/// Weight of the old average in the temperature baseline.
const FILTER_WEIGHT: f64 = 0.98;
/// The color window spans from this far below the baseline...
const TEMP_BELOW: f64 = 2.0;
/// ...to this far above it; warming up is easier than cooling down.
const TEMP_ABOVE: f64 = 3.0;

const LIGHT_OFFSET: i64 = 2000;
const LIGHT_GAIN: i64 = 4;

/// Everything the sensors app needs from its host.
pub trait SensorsHost: OspI2c + OspNode + Topology + UiButtons + Monotonic + DelayNs {}

impl<T> SensorsHost for T where T: OspI2c + OspNode + Topology + UiButtons + Monotonic + DelayNs {}

/// The active sensor.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// AS6212, or the fallback node
    #[default]
    Temp,
    /// AS5600
    Angle,
    /// SFH 5721
    Light,
}

impl Mode {
    /// Unit flashed on the display when the mode becomes active.
    pub fn unit(self) -> &'static str {
        match self {
            Mode::Temp => " #C ",
            Mode::Angle => "#360",
            Mode::Light => "lu><",
        }
    }

    /// Selector LED of the mode.
    pub fn indicator(self) -> u8 {
        match self {
            Mode::Temp => LED0,
            Mode::Angle => LED1,
            Mode::Light => LED2,
        }
    }

    /// Label scrolled over the display on Y.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Temp => "    AS6212    ",
            Mode::Angle => "    AS5600    ",
            Mode::Light => "    SFH 5721    ",
        }
    }

    fn next(self) -> Mode {
        match self {
            Mode::Temp => Mode::Angle,
            Mode::Angle => Mode::Light,
            Mode::Light => Mode::Temp,
        }
    }
}

/// Arduino style integer linear map of `x` from `[in_min, in_max]` to `[out_min, out_max]`.
fn map_range(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    if in_max == in_min {
        return out_min;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// State of the sensors app.
#[derive(Debug, Default)]
pub struct SensorsApp {
    temp: Option<As6212>,
    angle: Option<As5600>,
    light: Option<Sfh5721>,
    sseg: Option<Sseg>,
    selector: Option<Iox4b4l>,
    mode: Mode,
    temp_current: f64,
    temp_average: f64,
    angle_current: f64,
    light_current: f64,
    last_ms: u64,
    hold_ms: Option<u64>,
    scroll: &'static str,
    scroll_ms: u64,
}

impl SensorsApp {
    /// Registration data for the app manager.
    pub const DESCRIPTOR: AppDescriptor = AppDescriptor {
        name: "sensors",
        title: "Sensors",
        xlabel: "modality",
        ylabel: "show type",
        flags: AppFlags::WITHTOPO.union(AppFlags::WITHREPAIR),
    };

    /// Creates the app; nothing is discovered until [`App::start`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The active sensor.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Last temperature (°C).
    pub fn temperature(&self) -> f64 {
        self.temp_current
    }

    /// Last knob angle (degrees).
    pub fn angle(&self) -> f64 {
        self.angle_current
    }

    /// Last light level (lux).
    pub fn light(&self) -> f64 {
        self.light_current
    }

    /// Blanks the display and the selector LEDs after a reboot.
    ///
    /// Builds the topology first. Meant for boot code of firmware that contains this app:
    /// the app manager restarts with its first app, which may leave the display lit.
    ///
    /// # Errors
    /// [`Error::NoI2cDevice`] when the chain has no display.
    pub fn reset_hardware<H: OspI2c + Topology>(host: &mut H) -> Result<(), Error> {
        host.build()?;

        let said = host
            .i2c_find(SSEG_0_DADDR7_SAIDSENSE)?
            .ok_or(Error::NoI2cDevice)?;
        Sseg::new().init(host, said)?;

        for (daddr7, pincfg) in [
            (IOX4B4L_DADDR7_SAIDSENSEV2, IOX4B4L_PINCFG_SAIDSENSEV2),
            (IOX4B4L_DADDR7_SAIDSENSE, IOX4B4L_PINCFG_SAIDSENSE),
        ] {
            if let Some(said) = host.i2c_find(daddr7)? {
                Iox4b4l::new().init(host, said, daddr7, pincfg)?;
            }
        }
        Ok(())
    }

    fn discover<H: SensorsHost>(&mut self, host: &mut H) -> Result<(), Error> {
        self.temp = None;
        self.angle = None;
        self.light = None;
        self.sseg = None;
        self.selector = None;

        if let Some(said) = host.i2c_find(AS6212_DADDR7_SAIDSENSE)? {
            let mut dev = As6212::new();
            dev.init(host, said)?;
            dev.convrate_set(host, TEMP_CONVRATE_MS)?;
            info!("sensors: using temp sensor 0x{:x} on SAID 0x{:x}", AS6212_DADDR7_SAIDSENSE, said);
            self.temp = Some(dev);
        } else {
            info!("sensors: no temp sensor found, falling back on SAID 0x{:x}", SAID_DEFAULT_ADDR);
        }

        if let Some(said) = host.i2c_find(AS5600_DADDR7_SAIDSENSE)? {
            let mut dev = As5600::new();
            dev.init(host, said)?;
            info!("sensors: using rotation sensor 0x{:x} on SAID 0x{:x}", AS5600_DADDR7_SAIDSENSE, said);
            self.angle = Some(dev);
        } else {
            info!("sensors: no rotation sensor found");
        }

        if let Some(said) = host.i2c_find(SFH5721_DADDR7_SAIDSENSE)? {
            let mut dev = Sfh5721::new();
            dev.init(host, said)?;
            info!("sensors: using light sensor 0x{:x} on SAID 0x{:x}", SFH5721_DADDR7_SAIDSENSE, said);
            self.light = Some(dev);
        } else {
            info!("sensors: no light sensor found");
        }

        if let Some(said) = host.i2c_find(SSEG_0_DADDR7_SAIDSENSE)? {
            let mut dev = Sseg::new();
            dev.init(host, said)?;
            info!("sensors: using display 0x{:x} on SAID 0x{:x}", SSEG_0_DADDR7_SAIDSENSE, said);
            self.sseg = Some(dev);
        } else {
            info!("sensors: no display found");
        }

        // the pre-production V2 board has its selector elsewhere
        for (daddr7, pincfg) in [
            (IOX4B4L_DADDR7_SAIDSENSE, IOX4B4L_PINCFG_SAIDSENSE),
            (IOX4B4L_DADDR7_SAIDSENSEV2, IOX4B4L_PINCFG_SAIDSENSEV2),
        ] {
            if let Some(said) = host.i2c_find(daddr7)? {
                let mut dev = Iox4b4l::new();
                dev.init(host, said, daddr7, pincfg)?;
                info!("sensors: using selector 0x{:x} on SAID 0x{:x}", daddr7, said);
                self.selector = Some(dev);
                return Ok(());
            }
        }
        info!("sensors: no selector found");
        Ok(())
    }

    fn measure_temp<H: SensorsHost>(&mut self, host: &mut H) -> Result<(), Error> {
        let Some(dev) = self.temp else {
            let raw = host.read_temp(SAID_DEFAULT_ADDR)?;
            self.temp_current = said_temp_celsius(raw);
            return Ok(());
        };
        let mut result = Err(Error::Other);
        for _ in 0..TEMP_TRIES {
            result = dev.temp_get(host);
            if result.is_ok() {
                break;
            }
            host.delay_ms(TEMP_RETRY_MS);
        }
        self.temp_current = f64::from(result?) / 1000.0;
        Ok(())
    }

    fn measure_angle<H: SensorsHost>(&mut self, host: &mut H) -> Result<(), Error> {
        if let Some(dev) = self.angle {
            self.angle_current = angle_degrees(dev.angle_get(host)?);
        }
        Ok(())
    }

    fn measure_light<H: SensorsHost>(&mut self, host: &mut H) -> Result<(), Error> {
        if let Some(dev) = self.light {
            // 4x gain and 25 ms integration: one count is one lux
            self.light_current = f64::from(dev.als_get(host)?);
        }
        Ok(())
    }

    fn display<H: SensorsHost>(&mut self, host: &mut H) -> Result<(), Error> {
        let Some(sseg) = self.sseg else {
            return Ok(());
        };
        let now = host.now_ms();
        if self
            .hold_ms
            .is_some_and(|hold| now.saturating_sub(hold) < HOLD_MS)
        {
            return Ok(());
        }

        if !self.scroll.is_empty() {
            if now.saturating_sub(self.scroll_ms) < SCROLL_MS {
                return Ok(());
            }
            sseg.printf(host, format_args!("{}", self.scroll))?;
            self.scroll = self.scroll.get(1..).unwrap_or("");
            self.scroll_ms = now;
            return Ok(());
        }

        match self.mode {
            Mode::Temp => sseg.printf(host, format_args!("{:5.1}", self.temp_current)),
            Mode::Angle => sseg.printf(host, format_args!("{:5.1}", self.angle_current)),
            Mode::Light => sseg.printf(host, format_args!("{:4.0}", self.light_current)),
        }
    }

    fn fill<H: SensorsHost>(host: &mut H, color: impl Fn(u16) -> Rgb) -> Result<(), Error> {
        for tix in 0..host.triplet_count() {
            host.set_triplet(tix, &color(tix))?;
        }
        Ok(())
    }

    fn color_triplets<H: SensorsHost>(&mut self, host: &mut H) -> Result<(), Error> {
        let count = host.triplet_count();
        match self.mode {
            Mode::Temp => {
                self.temp_average =
                    FILTER_WEIGHT * self.temp_average + (1.0 - FILTER_WEIGHT) * self.temp_current;
                let min = self.temp_average - TEMP_BELOW;
                let max = self.temp_average + TEMP_ABOVE;
                // in centi-degrees; hot maps to the start of the chain
                let midtix = map_range(
                    round(self.temp_current * 100.0) as i64,
                    round(max * 100.0) as i64,
                    round(min * 100.0) as i64,
                    0,
                    i64::from(count),
                );
                Self::fill(host, |tix| {
                    if i64::from(tix) <= midtix {
                        Rgb::BLUE
                    } else {
                        Rgb::RED
                    }
                })
            }
            Mode::Angle => {
                let angle = self.angle_current;
                let span = if angle < 180.0 { angle } else { 360.0 - angle };
                let stoptix = (f64::from(count) * span / 180.0) as i64;
                Self::fill(host, |tix| {
                    if i64::from(tix) <= stoptix {
                        Rgb::DIM_YELLOW
                    } else {
                        Rgb::OFF
                    }
                })
            }
            Mode::Light => {
                let green1 = (f64::from(BRIGHTNESS_MAX) * self.light_current / 100.0) as i64;
                let green2 = (LIGHT_GAIN * (green1 - LIGHT_OFFSET))
                    .clamp(0, i64::from(BRIGHTNESS_MAX));
                let green = u16::try_from(green2).unwrap_or(BRIGHTNESS_MAX);
                Self::fill(host, |_| Rgb::new(0, green, 0))
            }
        }
    }

    /// Polls X, Y and the selector, switching to `force` or the requested mode.
    ///
    /// A new mode (also the same mode picked again) flashes its unit, lights its
    /// indicator and cancels a pending scroll.
    fn mode_switch<H: SensorsHost>(&mut self, host: &mut H, force: Option<Mode>) -> Result<(), Error> {
        let mut mode = force;

        if host.went_down(UiButton::X) {
            let mut next = self.mode.next();
            if next == Mode::Angle && self.angle.is_none() {
                next = Mode::Light;
            }
            if next == Mode::Light && self.light.is_none() {
                next = Mode::Temp;
            }
            mode = Some(next);
        }

        if host.went_down(UiButton::Y) {
            self.scroll = self.mode.label();
            self.scroll_ms = host.now_ms();
        }

        if let Some(selector) = self.selector.as_mut() {
            selector.but_scan(host)?;
            if selector.but_wentdown(BUT0) != 0 {
                mode = Some(Mode::Temp);
            }
            if selector.but_wentdown(BUT1) != 0 {
                mode = Some(if self.angle.is_some() { Mode::Angle } else { self.mode });
            }
            if selector.but_wentdown(BUT2) != 0 {
                mode = Some(if self.light.is_some() { Mode::Light } else { self.mode });
            }
            if selector.but_wentdown(BUT3) != 0 {
                mode = Some(Mode::Temp);
            }
        }

        let Some(mode) = mode else {
            return Ok(());
        };
        self.mode = mode;
        if let Some(sseg) = self.sseg {
            sseg.printf(host, format_args!("{}", mode.unit()))?;
            self.hold_ms = Some(host.now_ms());
        }
        if let Some(selector) = self.selector.as_mut() {
            selector.led_set(host, mode.indicator())?;
        }
        self.scroll = "";
        Ok(())
    }
}

impl<H: SensorsHost> App<H> for SensorsApp {
    fn descriptor(&self) -> AppDescriptor {
        Self::DESCRIPTOR
    }

    fn start(&mut self, host: &mut H) -> Result<(), Error> {
        self.discover(host)?;
        self.scroll = "";
        self.hold_ms = None;

        // first reading is the baseline
        self.measure_temp(host)?;
        self.temp_average = self.temp_current;

        self.mode = Mode::Temp;
        self.mode_switch(host, Some(Mode::Temp))?;
        self.last_ms = host.now_ms();
        Ok(())
    }

    fn step(&mut self, host: &mut H) -> Result<(), Error> {
        // every call, to not miss a button edge
        self.mode_switch(host, None)?;

        if host.now_ms().saturating_sub(self.last_ms) < ANIM_MS {
            return Ok(());
        }

        self.measure_temp(host)
            .inspect_err(|e| warn!("sensors: error reading temperature sensor: {}", e))?;
        self.measure_angle(host)
            .inspect_err(|e| warn!("sensors: error reading rotation sensor: {}", e))?;
        self.measure_light(host)
            .inspect_err(|e| warn!("sensors: error reading light sensor: {}", e))?;
        self.display(host)
            .inspect_err(|e| warn!("sensors: error updating display: {}", e))?;
        self.color_triplets(host)
            .inspect_err(|e| warn!("sensors: error updating triplets: {}", e))?;

        self.last_ms = host.now_ms();
        Ok(())
    }

    fn stop(&mut self, host: &mut H) -> Result<(), Error> {
        let mut result = Ok(());
        if let Some(sseg) = self.sseg {
            result = result.and(sseg.clr(host));
        }
        if let Some(selector) = self.selector.as_mut() {
            result = result.and(selector.led_off(host, LEDALL));
        }
        if let Err(e) = result {
            warn!("sensors: cleanup failed: {}", e);
        }
        result
    }
}

//! Apps: long running behaviors driven by an app manager.
//!
//! An app manager owns the board, starts one [`App`], polls its `step` and stops it before
//! switching to another. It learns about an app from its [`AppDescriptor`].
//!
//! Apps reach the hardware through a host type chosen by the board support code; each app
//! states the traits its host must implement.

pub mod sensors;

use crate::error::Error;

/// Capability flags of an app.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppFlags(u8);

impl AppFlags {
    /// No flags.
    pub const NONE: AppFlags = AppFlags(0x00);
    /// The manager builds the chain topology before starting the app.
    pub const WITHTOPO: AppFlags = AppFlags(0x01);
    /// The manager may repair the chain (rebuild and restart) when a step fails.
    pub const WITHREPAIR: AppFlags = AppFlags(0x02);

    /// Whether all flags of `other` are set.
    pub const fn contains(self, other: AppFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flags of both `self` and `other`.
    pub const fn union(self, other: AppFlags) -> AppFlags {
        AppFlags(self.0 | other.0)
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl core::ops::BitOr for AppFlags {
    type Output = AppFlags;

    fn bitor(self, rhs: AppFlags) -> AppFlags {
        self.union(rhs)
    }
}

/// What an app manager needs to know to list and run an app.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppDescriptor {
    /// Short name, used on the command line
    pub name: &'static str,
    /// Human readable name
    pub title: &'static str,
    /// What the X button does
    pub xlabel: &'static str,
    /// What the Y button does
    pub ylabel: &'static str,
    /// Capabilities
    pub flags: AppFlags,
}

/// The user interface buttons of the board.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UiButton {
    /// Primary button, usually switches the app mode
    X,
    /// Secondary button
    Y,
}

/// Edge detection on the user interface buttons.
pub trait UiButtons {
    /// Whether `button` was pressed since the previous scan of the buttons.
    fn went_down(&mut self, button: UiButton) -> bool;
}

/// An app, run by a manager on host `H`.
pub trait App<H> {
    /// Describes the app.
    fn descriptor(&self) -> AppDescriptor;

    /// Discovers the hardware the app needs and shows the initial state.
    fn start(&mut self, host: &mut H) -> Result<(), Error>;

    /// Polled repeatedly while the app runs. An error ends this step only.
    fn step(&mut self, host: &mut H) -> Result<(), Error>;

    /// Leaves the hardware in a neutral state for the next app.
    fn stop(&mut self, host: &mut H) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let flags = AppFlags::WITHTOPO | AppFlags::WITHREPAIR;
        assert!(flags.contains(AppFlags::WITHTOPO));
        assert!(flags.contains(AppFlags::WITHREPAIR));
        assert!(!AppFlags::WITHTOPO.contains(flags));
        assert!(AppFlags::NONE.contains(AppFlags::NONE));
        assert_eq!(flags.bits(), 0x03);
    }
}

//! Panel buses.
//!
//! A bus owns the link to its host and the *control panel* (the command IO
//! channel to the controller). LCDs and touch panels share a bus through
//! `Rc<RefCell<B>>`.

pub mod dsi;
pub mod i2c;
pub mod rgb;
pub mod spi;

pub use dsi::DsiBus;
pub use i2c::I2cBus;
pub use rgb::RgbBus;
pub use spi::{QspiBus, SpiBus};

use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use crate::bus::dsi::DpiPanelConfig;
use crate::bus::rgb::RgbPanelConfig;
use crate::error::Error;
use crate::native::{Platform, RawHandle};
use crate::state::{Device, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusType {
    I2c,
    Spi,
    Qspi,
    Rgb,
    MipiDsi,
}

/// How an LCD creates its refresh panel on a bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelSource<'a> {
    /// From the control panel only (SPI, QSPI, I2C).
    ControlPanel,
    /// An RGB panel driven by the LCD peripheral.
    Rgb(&'a RgbPanelConfig),
    /// A DPI panel on a started MIPI-DSI bus.
    Dsi { bus: RawHandle, dpi: &'a DpiPanelConfig },
}

pub trait Bus: Device {
    type Platform: Platform;

    fn bus_type(&self) -> BusType;

    /// Handle of the control panel, once begun. `None` for buses without one.
    fn control_panel_handle(&self) -> Option<RawHandle>;

    fn panel_source(&self) -> Result<PanelSource<'_>, Error> {
        Ok(PanelSource::ControlPanel)
    }
}

/// A device's share of a bus.
///
/// Active devices own the bus. A deleted device that is not the last owner
/// keeps only a weak reference, so the bus is torn down by the last device
/// still using it. `init()` takes the strong reference back.
pub(crate) enum BusShare<B> {
    Active(Rc<RefCell<B>>),
    Parked(Weak<RefCell<B>>),
}

impl<B: Bus> BusShare<B> {
    pub(crate) fn new(bus: Rc<RefCell<B>>) -> Self {
        Self::Active(bus)
    }

    pub(crate) fn get(&self) -> Option<Rc<RefCell<B>>> {
        match self {
            Self::Active(bus) => Some(bus.clone()),
            Self::Parked(bus) => bus.upgrade(),
        }
    }

    pub(crate) fn active(&self) -> Result<&Rc<RefCell<B>>, Error> {
        match self {
            Self::Active(bus) => Ok(bus),
            Self::Parked(_) => Err(Error::NotInitialized),
        }
    }

    pub(crate) fn resume(&mut self) -> Result<(), Error> {
        if let Self::Parked(bus) = self {
            let bus = bus.upgrade().ok_or(Error::BusReleased)?;
            *self = Self::Active(bus);
        }
        Ok(())
    }

    /// Give up this device's share: delete the bus when this is its last
    /// owner, otherwise drop to a weak reference.
    pub(crate) fn park(&mut self) -> Result<(), Error> {
        let Self::Active(bus) = self else {
            return Ok(());
        };

        if Rc::strong_count(bus) > 1 {
            *self = Self::Parked(Rc::downgrade(bus));
            return Ok(());
        }

        let mut bus = bus.borrow_mut();
        if bus.state() != State::Deinit {
            bus.del()?;
        }
        Ok(())
    }
}

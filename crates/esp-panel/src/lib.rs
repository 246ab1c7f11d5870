#![no_std]
//! Board-support core for ESP32 display panels.
//!
//! Buses, LCDs, touch controllers, backlights and IO expanders share one
//! lifecycle ([`State`]: `Deinit` → `Init` → `Begin`) and one configuration
//! scheme ([`Config`]: a sparse partial struct promoted to the native layout on
//! `init`). Physical hosts (I2C ports, SPI buses, the MIPI-DSI bus) are shared
//! through [`host_registry`], so an LCD and a touch panel on the same I2C port
//! bring the port up once and release it only when both are gone.
//!
//! Every vendor-SDK call goes through the [`Platform`] trait.

extern crate alloc;

mod fmt;

pub mod backlight;
pub mod board;
pub mod bus;
pub mod config;
pub mod error;
pub mod host;
pub mod io_expander;
pub mod lcd;
pub mod native;
pub mod state;
pub mod touch;

pub use backlight::{Backlight, BacklightCustom, BacklightPwmLedc, BacklightSwitchGpio};
pub use board::{Board, BoardConfig, NoDevice};
pub use bus::{Bus, BusType, DsiBus, I2cBus, PanelSource, QspiBus, RgbBus, SpiBus};
pub use config::{Config, PartialConfig};
pub use error::Error;
pub use host::Hosts;
pub use io_expander::{ExpanderChip, IoExpander, PinMode};
pub use lcd::{Display, Lcd};
pub use native::{EspError, Platform, RawHandle, GPIO_NUM_NC};
pub use state::{Device, State};
pub use touch::{Touch, TouchPoint};

pub use host_registry::{HostError, HostId};

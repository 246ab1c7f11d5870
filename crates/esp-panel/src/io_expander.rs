//! IO expanders.
//!
//! [`IoExpander`] wraps a vendor chip object and gives it the same lifecycle
//! and I2C host sharing as the panel buses. Chip-specific operations stay on
//! the chip, reachable through [`IoExpander::chip_mut`].

use host_registry::HostId;

use crate::config::Config;
use crate::error::Error;
use crate::host::{HostLink, I2cHost, I2cHostPartial, I2cHosts, I2C_HOST_NUM};
use crate::native::{EspError, Platform};
use crate::state::{self, Device, Lifecycle, State};

const TAG: &str = "Expander";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input,
    Output,
}

/// A vendor IO-expander driver on an I2C port.
pub trait ExpanderChip {
    /// Name used in diagnostics, e.g. `"TCA95xx_8bit"`.
    const NAME: &'static str;

    /// Attach to the already running I2C host `host` at `address`.
    fn begin(&mut self, host: HostId, address: u8) -> Result<(), EspError>;
    fn del(&mut self) -> Result<(), EspError>;
    fn reset(&mut self) -> Result<(), EspError>;

    fn pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), EspError>;
    fn digital_write(&mut self, pin: u8, high: bool) -> Result<(), EspError>;
    fn digital_read(&mut self, pin: u8) -> Result<bool, EspError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct IoExpanderConfig {
    pub host_id: HostId,
    pub address: u8,
    pub host: Config<I2cHostPartial>,
    pub skip_init_host: bool,
}

pub struct IoExpander<'r, P: Platform, C: ExpanderChip> {
    chip: C,
    config: IoExpanderConfig,
    host: HostLink<'r, I2cHost<P>, I2C_HOST_NUM>,
    lifecycle: Lifecycle,
}

impl<'r, P: Platform, C: ExpanderChip> IoExpander<'r, P, C> {
    pub fn new(
        chip: C,
        hosts: &'r I2cHosts<P>,
        host_id: HostId,
        address: u8,
        scl_io: i32,
        sda_io: i32,
    ) -> Self {
        Self::from_config(
            chip,
            hosts,
            IoExpanderConfig {
                host_id,
                address,
                host: Config::from_partial(I2cHostPartial::new(scl_io, sda_io)),
                skip_init_host: false,
            },
        )
    }

    pub fn from_config(chip: C, hosts: &'r I2cHosts<P>, config: IoExpanderConfig) -> Self {
        Self { chip, config, host: HostLink::new(hosts), lifecycle: Lifecycle::new() }
    }

    pub fn config(&self) -> &IoExpanderConfig {
        &self.config
    }

    pub fn chip(&self) -> &C {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut C {
        &mut self.chip
    }

    pub fn config_host_clk_speed(&mut self, hz: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Init, TAG)?;
        self.config.host.full_mut().clk_speed = hz;
        Ok(())
    }

    pub fn config_skip_init_host(&mut self, skip: bool) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Init, TAG)?;
        self.config.skip_init_host = skip;
        Ok(())
    }

    pub fn config_address(&mut self, address: u8) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.address = address;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begun(TAG)?;
        self.chip.reset()?;
        Ok(())
    }

    pub fn pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), Error> {
        self.lifecycle.check_begun(TAG)?;
        self.chip.pin_mode(pin, mode)?;
        Ok(())
    }

    pub fn digital_write(&mut self, pin: u8, high: bool) -> Result<(), Error> {
        self.lifecycle.check_begun(TAG)?;
        self.chip.digital_write(pin, high)?;
        Ok(())
    }

    pub fn digital_read(&mut self, pin: u8) -> Result<bool, Error> {
        self.lifecycle.check_begun(TAG)?;
        Ok(self.chip.digital_read(pin)?)
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(TAG)?;

        self.host.begin()?;
        self.chip.begin(self.config.host_id, self.config.address)?;

        self.lifecycle.advance(State::Begin);
        info!("[{}] {} at address {} begun", TAG, C::NAME, self.config.address);
        Ok(())
    }
}

impl<P: Platform, C: ExpanderChip> Device for IoExpander<'_, P, C> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(TAG)?;

        let host = self.config.host.full_mut();
        if !self.config.skip_init_host {
            self.host.acquire(self.config.host_id, host)?;
        }

        self.lifecycle.advance(State::Init);
        Ok(())
    }

    fn begin(&mut self) -> Result<(), Error> {
        state::begin_with(self, Self::bring_up)
    }

    fn del(&mut self) -> Result<(), Error> {
        let mut result = Ok(());
        if self.lifecycle.is_over(State::Begin) {
            if let Err(err) = self.chip.del() {
                error!("[{}] {} delete failed", TAG, C::NAME);
                result = Err(err.into());
            }
        }
        self.host.release();
        self.lifecycle.clear();
        result
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl<P: Platform, C: ExpanderChip> Drop for IoExpander<'_, P, C> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

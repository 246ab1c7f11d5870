use bitflags::bitflags;
use host_registry::HostId;

use crate::bus::{Bus, BusType};
use crate::config::{Config, PartialConfig};
use crate::error::Error;
use crate::host::{HostLink, I2cHost, I2cHostPartial, I2cHosts, I2C_HOST_NUM};
use crate::native::{Platform, RawHandle};
use crate::state::{self, Device, Lifecycle, State};

const TAG: &str = "I2C";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct I2cIoFlags: u32 {
        const DC_LOW_ON_DATA = 1 << 0;
        const DISABLE_CONTROL_PHASE = 1 << 1;
    }
}

/// `esp_lcd_panel_io_i2c_config_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cPanelIoConfig {
    pub dev_addr: u32,
    pub control_phase_bytes: usize,
    pub dc_bit_offset: u32,
    pub lcd_cmd_bits: i32,
    pub lcd_param_bits: i32,
    pub flags: I2cIoFlags,
    /// 0 keeps the host clock.
    pub scl_speed_hz: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cPanelIoPartial {
    pub address: u8,
    pub control_phase_bytes: usize,
    pub dc_bit_offset: u32,
    pub lcd_cmd_bits: i32,
    pub lcd_param_bits: i32,
    pub dc_low_on_data: bool,
    pub disable_control_phase: bool,
}

impl I2cPanelIoPartial {
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            control_phase_bytes: 1,
            dc_bit_offset: 6,
            lcd_cmd_bits: 8,
            lcd_param_bits: 8,
            dc_low_on_data: false,
            disable_control_phase: false,
        }
    }
}

impl PartialConfig for I2cPanelIoPartial {
    type Full = I2cPanelIoConfig;

    fn to_full(&self) -> I2cPanelIoConfig {
        let mut flags = I2cIoFlags::empty();
        flags.set(I2cIoFlags::DC_LOW_ON_DATA, self.dc_low_on_data);
        flags.set(I2cIoFlags::DISABLE_CONTROL_PHASE, self.disable_control_phase);

        I2cPanelIoConfig {
            dev_addr: u32::from(self.address),
            control_phase_bytes: self.control_phase_bytes,
            dc_bit_offset: self.dc_bit_offset,
            lcd_cmd_bits: self.lcd_cmd_bits,
            lcd_param_bits: self.lcd_param_bits,
            flags,
            scl_speed_hz: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct I2cBusConfig {
    pub host_id: HostId,
    pub host: Config<I2cHostPartial>,
    pub control_panel: Config<I2cPanelIoPartial>,
    /// The host is set up by someone else; the bus only creates its IO.
    pub skip_init_host: bool,
}

/// Control-panel bus on an I2C port.
pub struct I2cBus<'r, P: Platform> {
    config: I2cBusConfig,
    host: HostLink<'r, I2cHost<P>, I2C_HOST_NUM>,
    lifecycle: Lifecycle,
    io: Option<RawHandle>,
}

impl<'r, P: Platform> I2cBus<'r, P> {
    pub fn new(
        hosts: &'r I2cHosts<P>,
        host_id: HostId,
        scl_io: i32,
        sda_io: i32,
        address: u8,
    ) -> Self {
        Self::from_config(
            hosts,
            I2cBusConfig {
                host_id,
                host: Config::from_partial(I2cHostPartial::new(scl_io, sda_io)),
                control_panel: Config::from_partial(I2cPanelIoPartial::new(address)),
                skip_init_host: false,
            },
        )
    }

    pub fn from_config(hosts: &'r I2cHosts<P>, config: I2cBusConfig) -> Self {
        Self { config, host: HostLink::new(hosts), lifecycle: Lifecycle::new(), io: None }
    }

    pub fn config(&self) -> &I2cBusConfig {
        &self.config
    }

    pub fn host_id(&self) -> HostId {
        self.config.host_id
    }

    pub fn config_host_id(&mut self, host_id: HostId) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Init, TAG)?;
        self.config.host_id = host_id;
        Ok(())
    }

    pub fn config_skip_init_host(&mut self, skip: bool) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Init, TAG)?;
        self.config.skip_init_host = skip;
        Ok(())
    }

    pub fn config_host_clk_speed(&mut self, hz: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Init, TAG)?;
        self.config.host.full_mut().clk_speed = hz;
        Ok(())
    }

    pub fn config_host_pullup(&mut self, sda: bool, scl: bool) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Init, TAG)?;
        let host = self.config.host.full_mut();
        host.sda_pullup_en = sda;
        host.scl_pullup_en = scl;
        Ok(())
    }

    pub fn config_address(&mut self, address: u8) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.control_panel.full_mut().dev_addr = u32::from(address);
        Ok(())
    }

    pub fn config_control_phase_bytes(&mut self, bytes: usize) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.control_panel.full_mut().control_phase_bytes = bytes;
        Ok(())
    }

    pub fn config_dc_bit_offset(&mut self, offset: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.control_panel.full_mut().dc_bit_offset = offset;
        Ok(())
    }

    pub fn config_command_bits(&mut self, cmd_bits: i32, param_bits: i32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        let io = self.config.control_panel.full_mut();
        io.lcd_cmd_bits = cmd_bits;
        io.lcd_param_bits = param_bits;
        Ok(())
    }

    pub fn config_io_flags(&mut self, flags: I2cIoFlags) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.control_panel.full_mut().flags = flags;
        Ok(())
    }

    /// Whether this bus holds a share of its host.
    pub fn holds_host(&self) -> bool {
        self.host.is_held()
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(TAG)?;

        self.host.begin()?;
        let io = P::new_panel_io_i2c(self.config.host_id, self.config.control_panel.full_mut())?;
        self.io = Some(io);

        self.lifecycle.advance(State::Begin);
        debug!("[{}] bus on host {} begun", TAG, self.config.host_id);
        Ok(())
    }
}

impl<P: Platform> Device for I2cBus<'_, P> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(TAG)?;

        self.config.control_panel.convert_partial_to_full();
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
        if let Some(io) = self.io.take() {
            if let Err(err) = P::del_panel_io(io) {
                error!("[{}] delete control panel failed", TAG);
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

impl<P: Platform> Bus for I2cBus<'_, P> {
    type Platform = P;

    fn bus_type(&self) -> BusType {
        BusType::I2c
    }

    fn control_panel_handle(&self) -> Option<RawHandle> {
        self.io
    }
}

impl<P: Platform> Drop for I2cBus<'_, P> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

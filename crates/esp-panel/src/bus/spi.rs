use bitflags::bitflags;
use host_registry::HostId;

use crate::bus::{Bus, BusType};
use crate::config::{Config, PartialConfig};
use crate::error::Error;
use crate::host::{
    HostLink, QspiHostPartial, SpiHost, SpiHostConfig, SpiHostPartial, SpiHosts, SPI_HOST_NUM,
};
use crate::native::{Platform, RawHandle, GPIO_NUM_NC};
use crate::state::{self, Device, Lifecycle, State};

const TAG: &str = "SPI";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpiIoFlags: u32 {
        const DC_HIGH_ON_CMD = 1 << 0;
        const DC_LOW_ON_DATA = 1 << 1;
        const DC_LOW_ON_PARAM = 1 << 2;
        const OCTAL_MODE = 1 << 3;
        const QUAD_MODE = 1 << 4;
        const SIO_MODE = 1 << 5;
        const LSB_FIRST = 1 << 6;
        const CS_HIGH_ACTIVE = 1 << 7;
    }
}

/// `esp_lcd_panel_io_spi_config_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiPanelIoConfig {
    pub cs_gpio_num: i32,
    pub dc_gpio_num: i32,
    pub spi_mode: i32,
    pub pclk_hz: u32,
    pub trans_queue_depth: usize,
    pub lcd_cmd_bits: i32,
    pub lcd_param_bits: i32,
    pub flags: SpiIoFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiPanelIoPartial {
    pub cs_gpio_num: i32,
    pub dc_gpio_num: i32,
    pub spi_mode: i32,
    pub pclk_hz: u32,
    pub lcd_cmd_bits: i32,
    pub lcd_param_bits: i32,
    /// 3-line SPI, MOSI doubles as MISO.
    pub sio_mode: bool,
}

impl SpiPanelIoPartial {
    /// Mode 0, 40 MHz, 8-bit commands and parameters.
    pub const fn new(cs_gpio_num: i32, dc_gpio_num: i32) -> Self {
        Self {
            cs_gpio_num,
            dc_gpio_num,
            spi_mode: 0,
            pclk_hz: 40_000_000,
            lcd_cmd_bits: 8,
            lcd_param_bits: 8,
            sio_mode: false,
        }
    }
}

impl PartialConfig for SpiPanelIoPartial {
    type Full = SpiPanelIoConfig;

    fn to_full(&self) -> SpiPanelIoConfig {
        let mut flags = SpiIoFlags::empty();
        flags.set(SpiIoFlags::SIO_MODE, self.sio_mode);

        SpiPanelIoConfig {
            cs_gpio_num: self.cs_gpio_num,
            dc_gpio_num: self.dc_gpio_num,
            spi_mode: self.spi_mode,
            pclk_hz: self.pclk_hz,
            trans_queue_depth: 10,
            lcd_cmd_bits: self.lcd_cmd_bits,
            lcd_param_bits: self.lcd_param_bits,
            flags,
        }
    }
}

/// QSPI control panel: no D/C line, commands are sent as 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QspiPanelIoPartial {
    pub cs_gpio_num: i32,
    pub spi_mode: i32,
    pub pclk_hz: u32,
    pub lcd_cmd_bits: i32,
    pub lcd_param_bits: i32,
}

impl QspiPanelIoPartial {
    pub const fn new(cs_gpio_num: i32) -> Self {
        Self { cs_gpio_num, spi_mode: 0, pclk_hz: 40_000_000, lcd_cmd_bits: 32, lcd_param_bits: 8 }
    }
}

impl PartialConfig for QspiPanelIoPartial {
    type Full = SpiPanelIoConfig;

    fn to_full(&self) -> SpiPanelIoConfig {
        SpiPanelIoConfig {
            cs_gpio_num: self.cs_gpio_num,
            dc_gpio_num: GPIO_NUM_NC,
            spi_mode: self.spi_mode,
            pclk_hz: self.pclk_hz,
            trans_queue_depth: 10,
            lcd_cmd_bits: self.lcd_cmd_bits,
            lcd_param_bits: self.lcd_param_bits,
            flags: SpiIoFlags::QUAD_MODE,
        }
    }
}

/// Partial host config accepted by an SPI bus.
pub trait SpiHostFlavor: PartialConfig<Full = SpiHostConfig> {}

impl SpiHostFlavor for SpiHostPartial {}
impl SpiHostFlavor for QspiHostPartial {}

/// Partial control-panel config accepted by an SPI bus; fixes the bus type.
pub trait SpiIoFlavor: PartialConfig<Full = SpiPanelIoConfig> {
    const BUS_TYPE: BusType;
}

impl SpiIoFlavor for SpiPanelIoPartial {
    const BUS_TYPE: BusType = BusType::Spi;
}

impl SpiIoFlavor for QspiPanelIoPartial {
    const BUS_TYPE: BusType = BusType::Qspi;
}

pub struct SpiBusConfig<H: SpiHostFlavor = SpiHostPartial, I: SpiIoFlavor = SpiPanelIoPartial> {
    pub host_id: HostId,
    pub host: Config<H>,
    pub control_panel: Config<I>,
    pub skip_init_host: bool,
}

impl<H: SpiHostFlavor + Clone, I: SpiIoFlavor + Clone> Clone for SpiBusConfig<H, I> {
    fn clone(&self) -> Self {
        Self {
            host_id: self.host_id,
            host: self.host.clone(),
            control_panel: self.control_panel.clone(),
            skip_init_host: self.skip_init_host,
        }
    }
}

impl<H: SpiHostFlavor + core::fmt::Debug, I: SpiIoFlavor + core::fmt::Debug> core::fmt::Debug
    for SpiBusConfig<H, I>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpiBusConfig")
            .field("host_id", &self.host_id)
            .field("host", &self.host)
            .field("control_panel", &self.control_panel)
            .field("skip_init_host", &self.skip_init_host)
            .finish()
    }
}

/// Control-panel bus on an SPI host, single line or quad.
pub struct SpiBus<
    'r,
    P: Platform,
    H: SpiHostFlavor = SpiHostPartial,
    I: SpiIoFlavor = SpiPanelIoPartial,
> {
    config: SpiBusConfig<H, I>,
    host: HostLink<'r, SpiHost<P>, SPI_HOST_NUM>,
    lifecycle: Lifecycle,
    io: Option<RawHandle>,
}

/// SPI bus with four data lines.
pub type QspiBus<'r, P> = SpiBus<'r, P, QspiHostPartial, QspiPanelIoPartial>;

impl<'r, P: Platform> SpiBus<'r, P> {
    pub fn new(
        hosts: &'r SpiHosts<P>,
        host_id: HostId,
        sclk_io: i32,
        mosi_io: i32,
        miso_io: i32,
        cs_io: i32,
        dc_io: i32,
    ) -> Self {
        Self::from_config(
            hosts,
            SpiBusConfig {
                host_id,
                host: Config::from_partial(SpiHostPartial::new(sclk_io, mosi_io, miso_io)),
                control_panel: Config::from_partial(SpiPanelIoPartial::new(cs_io, dc_io)),
                skip_init_host: false,
            },
        )
    }
}

impl<'r, P: Platform> QspiBus<'r, P> {
    pub fn new_qspi(
        hosts: &'r SpiHosts<P>,
        host_id: HostId,
        cs_io: i32,
        sclk_io: i32,
        data_ios: [i32; 4],
    ) -> Self {
        Self::from_config(
            hosts,
            SpiBusConfig {
                host_id,
                host: Config::from_partial(QspiHostPartial::new(sclk_io, data_ios)),
                control_panel: Config::from_partial(QspiPanelIoPartial::new(cs_io)),
                skip_init_host: false,
            },
        )
    }
}

impl<'r, P: Platform, H: SpiHostFlavor, I: SpiIoFlavor> SpiBus<'r, P, H, I> {
    pub fn from_config(hosts: &'r SpiHosts<P>, config: SpiBusConfig<H, I>) -> Self {
        Self { config, host: HostLink::new(hosts), lifecycle: Lifecycle::new(), io: None }
    }

    pub fn config(&self) -> &SpiBusConfig<H, I> {
        &self.config
    }

    pub fn host_id(&self) -> HostId {
        self.config.host_id
    }

    pub fn config_skip_init_host(&mut self, skip: bool) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Init, TAG)?;
        self.config.skip_init_host = skip;
        Ok(())
    }

    pub fn config_host_max_transfer_size(&mut self, bytes: i32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Init, TAG)?;
        self.config.host.full_mut().max_transfer_sz = bytes;
        Ok(())
    }

    pub fn config_spi_mode(&mut self, mode: i32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.control_panel.full_mut().spi_mode = mode;
        Ok(())
    }

    pub fn config_frequency_hz(&mut self, hz: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.control_panel.full_mut().pclk_hz = hz;
        Ok(())
    }

    pub fn config_command_bits(&mut self, cmd_bits: i32, param_bits: i32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        let io = self.config.control_panel.full_mut();
        io.lcd_cmd_bits = cmd_bits;
        io.lcd_param_bits = param_bits;
        Ok(())
    }

    pub fn config_trans_queue_depth(&mut self, depth: usize) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.control_panel.full_mut().trans_queue_depth = depth;
        Ok(())
    }

    pub fn config_io_flags(&mut self, flags: SpiIoFlags) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.control_panel.full_mut().flags = flags;
        Ok(())
    }

    pub fn holds_host(&self) -> bool {
        self.host.is_held()
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(TAG)?;

        self.host.begin()?;
        let io = P::new_panel_io_spi(self.config.host_id, self.config.control_panel.full_mut())?;
        self.io = Some(io);

        self.lifecycle.advance(State::Begin);
        debug!("[{}] bus on host {} begun", TAG, self.config.host_id);
        Ok(())
    }
}

impl<P: Platform, H: SpiHostFlavor, I: SpiIoFlavor> Device for SpiBus<'_, P, H, I> {
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

impl<P: Platform, H: SpiHostFlavor, I: SpiIoFlavor> Bus for SpiBus<'_, P, H, I> {
    type Platform = P;

    fn bus_type(&self) -> BusType {
        I::BUS_TYPE
    }

    fn control_panel_handle(&self) -> Option<RawHandle> {
        self.io
    }
}

impl<P: Platform, H: SpiHostFlavor, I: SpiIoFlavor> Drop for SpiBus<'_, P, H, I> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

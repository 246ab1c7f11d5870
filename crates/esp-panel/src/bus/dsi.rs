use bitflags::bitflags;
use host_registry::HostId;

use crate::bus::{Bus, BusType, PanelSource};
use crate::config::{Config, PartialConfig};
use crate::error::Error;
use crate::host::{DsiHost, DsiHostPartial, DsiHosts, HostLink, DSI_HOST_NUM};
use crate::native::{Platform, RawHandle};
use crate::state::{self, Device, Lifecycle, State};

const TAG: &str = "DSI";

/// `esp_lcd_dbi_io_config_t`: command channel over the DSI bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbiIoConfig {
    pub virtual_channel: u8,
    pub lcd_cmd_bits: i32,
    pub lcd_param_bits: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbiIoPartial {
    pub lcd_cmd_bits: i32,
    pub lcd_param_bits: i32,
}

impl Default for DbiIoPartial {
    fn default() -> Self {
        Self { lcd_cmd_bits: 8, lcd_param_bits: 8 }
    }
}

impl PartialConfig for DbiIoPartial {
    type Full = DbiIoConfig;

    fn to_full(&self) -> DbiIoConfig {
        DbiIoConfig {
            virtual_channel: 0,
            lcd_cmd_bits: self.lcd_cmd_bits,
            lcd_param_bits: self.lcd_param_bits,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum DpiClkSrc {
    #[default]
    Default = 0,
    Xtal = 1,
    Apll = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DpiPixelFormat {
    Rgb565 = 0,
    Rgb666 = 1,
    Rgb888 = 2,
}

impl DpiPixelFormat {
    pub const fn from_bits(bits: u8) -> Self {
        match bits {
            16 => Self::Rgb565,
            18 => Self::Rgb666,
            _ => Self::Rgb888,
        }
    }

    /// Storage size of one pixel in the frame buffer.
    pub const fn bits_per_pixel(self) -> usize {
        match self {
            Self::Rgb565 => 16,
            Self::Rgb666 | Self::Rgb888 => 24,
        }
    }
}

/// Porches, sync widths and active area of a video-mode panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoTiming {
    pub h_size: u32,
    pub v_size: u32,
    pub hsync_pulse_width: u32,
    pub hsync_back_porch: u32,
    pub hsync_front_porch: u32,
    pub vsync_pulse_width: u32,
    pub vsync_back_porch: u32,
    pub vsync_front_porch: u32,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DpiFlags: u32 {
        const USE_DMA2D = 1 << 0;
        const DISABLE_LP = 1 << 1;
    }
}

/// `esp_lcd_dpi_panel_config_t`: the refresh side of a DSI panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpiPanelConfig {
    pub virtual_channel: u8,
    pub dpi_clk_src: DpiClkSrc,
    pub dpi_clock_freq_mhz: u32,
    pub pixel_format: DpiPixelFormat,
    pub num_fbs: u8,
    pub video_timing: VideoTiming,
    pub flags: DpiFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpiPanelPartial {
    pub dpi_clock_freq_mhz: u32,
    /// 16, 18 or 24.
    pub pixel_bits: u8,
    pub timing: VideoTiming,
    pub use_dma2d: bool,
}

impl PartialConfig for DpiPanelPartial {
    type Full = DpiPanelConfig;

    fn to_full(&self) -> DpiPanelConfig {
        let mut flags = DpiFlags::empty();
        flags.set(DpiFlags::USE_DMA2D, self.use_dma2d);

        DpiPanelConfig {
            virtual_channel: 0,
            dpi_clk_src: DpiClkSrc::Default,
            dpi_clock_freq_mhz: self.dpi_clock_freq_mhz,
            pixel_format: DpiPixelFormat::from_bits(self.pixel_bits),
            num_fbs: 1,
            video_timing: self.timing,
            flags,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DsiBusConfig {
    pub host_id: HostId,
    pub host: Config<DsiHostPartial>,
    pub control_panel: Config<DbiIoPartial>,
    pub refresh_panel: Config<DpiPanelPartial>,
}

/// MIPI-DSI bus: a DBI control panel plus the DPI refresh configuration.
///
/// The DSI host is always acquired from the registry; its native handle is
/// what both the control panel and the LCD's DPI panel are created on.
pub struct DsiBus<'r, P: Platform> {
    config: DsiBusConfig,
    host: HostLink<'r, DsiHost<P>, DSI_HOST_NUM>,
    lifecycle: Lifecycle,
    io: Option<RawHandle>,
}

impl<'r, P: Platform> DsiBus<'r, P> {
    pub fn new(
        hosts: &'r DsiHosts<P>,
        data_lane_num: u8,
        lane_bit_rate_mbps: u32,
        dpi_clock_freq_mhz: u32,
        pixel_bits: u8,
        timing: VideoTiming,
    ) -> Self {
        Self::from_config(
            hosts,
            DsiBusConfig {
                host_id: 0,
                host: Config::from_partial(DsiHostPartial::new(data_lane_num, lane_bit_rate_mbps)),
                control_panel: Config::from_partial(DbiIoPartial::default()),
                refresh_panel: Config::from_partial(DpiPanelPartial {
                    dpi_clock_freq_mhz,
                    pixel_bits,
                    timing,
                    use_dma2d: false,
                }),
            },
        )
    }

    pub fn from_config(hosts: &'r DsiHosts<P>, config: DsiBusConfig) -> Self {
        Self { config, host: HostLink::new(hosts), lifecycle: Lifecycle::new(), io: None }
    }

    pub fn config(&self) -> &DsiBusConfig {
        &self.config
    }

    pub fn config_lane_bit_rate(&mut self, mbps: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Init, TAG)?;
        self.config.host.full_mut().lane_bit_rate_mbps = mbps;
        Ok(())
    }

    pub fn config_dpi_clock_freq(&mut self, mhz: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.refresh_panel.full_mut().dpi_clock_freq_mhz = mhz;
        Ok(())
    }

    pub fn config_dpi_pixel_bits(&mut self, bits: u8) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.refresh_panel.full_mut().pixel_format = DpiPixelFormat::from_bits(bits);
        Ok(())
    }

    pub fn config_dpi_frame_buffer_number(&mut self, num: u8) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.refresh_panel.full_mut().num_fbs = num;
        Ok(())
    }

    pub fn config_dpi_use_dma2d(&mut self, enable: bool) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.refresh_panel.full_mut().flags.set(DpiFlags::USE_DMA2D, enable);
        Ok(())
    }

    /// Native DSI bus handle, once the host is begun.
    pub fn dsi_bus_handle(&self) -> Option<RawHandle> {
        self.host.native()
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(TAG)?;

        let bus = self.host.begin()?.ok_or(Error::NotInitialized)?;
        let io = P::new_panel_io_dbi(bus, self.config.control_panel.full_mut())?;
        self.io = Some(io);

        self.lifecycle.advance(State::Begin);
        debug!("[{}] bus begun", TAG);
        Ok(())
    }
}

impl<P: Platform> Device for DsiBus<'_, P> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(TAG)?;

        self.config.control_panel.convert_partial_to_full();
        self.config.refresh_panel.convert_partial_to_full();
        let host = self.config.host.full_mut();
        self.host.acquire(self.config.host_id, host)?;

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

impl<P: Platform> Bus for DsiBus<'_, P> {
    type Platform = P;

    fn bus_type(&self) -> BusType {
        BusType::MipiDsi
    }

    fn control_panel_handle(&self) -> Option<RawHandle> {
        self.io
    }

    fn panel_source(&self) -> Result<PanelSource<'_>, Error> {
        let bus = self.host.native().ok_or(Error::NotBegun)?;
        let dpi = self.config.refresh_panel.full().ok_or(Error::NotInitialized)?;
        Ok(PanelSource::Dsi { bus, dpi })
    }
}

impl<P: Platform> Drop for DsiBus<'_, P> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

use core::marker::PhantomData;

use bitflags::bitflags;

use crate::bus::{Bus, BusType, PanelSource};
use crate::config::{Config, PartialConfig};
use crate::error::Error;
use crate::native::{Platform, RawHandle, GPIO_NUM_NC};
use crate::state::{self, Device, Lifecycle, State};

const TAG: &str = "RGB";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum LcdClkSrc {
    #[default]
    Default = 0,
    Pll160M = 1,
    Xtal = 2,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RgbTimingFlags: u32 {
        const HSYNC_IDLE_LOW = 1 << 0;
        const VSYNC_IDLE_LOW = 1 << 1;
        const DE_IDLE_HIGH = 1 << 2;
        const PCLK_ACTIVE_NEG = 1 << 3;
        const PCLK_IDLE_HIGH = 1 << 4;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RgbPanelFlags: u32 {
        const DISP_ACTIVE_LOW = 1 << 0;
        const REFRESH_ON_DEMAND = 1 << 1;
        const FB_IN_PSRAM = 1 << 2;
        const DOUBLE_FB = 1 << 3;
        const NO_FB = 1 << 4;
        const BB_INVALIDATE_CACHE = 1 << 5;
    }
}

/// `esp_lcd_rgb_timing_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbTiming {
    pub pclk_hz: u32,
    pub h_res: u32,
    pub v_res: u32,
    pub hsync_pulse_width: u32,
    pub hsync_back_porch: u32,
    pub hsync_front_porch: u32,
    pub vsync_pulse_width: u32,
    pub vsync_back_porch: u32,
    pub vsync_front_porch: u32,
    pub flags: RgbTimingFlags,
}

/// `esp_lcd_rgb_panel_config_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbPanelConfig {
    pub clk_src: LcdClkSrc,
    pub timings: RgbTiming,
    pub data_width: usize,
    pub bits_per_pixel: usize,
    pub num_fbs: usize,
    pub bounce_buffer_size_px: usize,
    pub sram_trans_align: usize,
    pub psram_trans_align: usize,
    pub hsync_gpio_num: i32,
    pub vsync_gpio_num: i32,
    pub de_gpio_num: i32,
    pub pclk_gpio_num: i32,
    pub disp_gpio_num: i32,
    pub data_gpio_nums: [i32; 16],
    pub flags: RgbPanelFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbPanelPartial {
    pub pclk_hz: u32,
    pub h_res: u16,
    pub v_res: u16,
    pub hpw: u16,
    pub hbp: u16,
    pub hfp: u16,
    pub vpw: u16,
    pub vbp: u16,
    pub vfp: u16,
    pub pclk_active_neg: bool,
    /// 8 or 16 data lines.
    pub data_width: u8,
    /// Color depth sent to the panel: 16, 18 or 24.
    pub pixel_bits: u8,
    pub bounce_buffer_size_px: usize,
    pub hsync_io: i32,
    pub vsync_io: i32,
    pub pclk_io: i32,
    pub de_io: i32,
    pub disp_io: i32,
    pub data_ios: [i32; 16],
}

impl RgbPanelPartial {
    /// 16-bit RGB565 panel with all control pins unassigned.
    pub const fn new(h_res: u16, v_res: u16, pclk_hz: u32) -> Self {
        Self {
            pclk_hz,
            h_res,
            v_res,
            hpw: 10,
            hbp: 10,
            hfp: 20,
            vpw: 10,
            vbp: 10,
            vfp: 10,
            pclk_active_neg: true,
            data_width: 16,
            pixel_bits: 16,
            bounce_buffer_size_px: 0,
            hsync_io: GPIO_NUM_NC,
            vsync_io: GPIO_NUM_NC,
            pclk_io: GPIO_NUM_NC,
            de_io: GPIO_NUM_NC,
            disp_io: GPIO_NUM_NC,
            data_ios: [GPIO_NUM_NC; 16],
        }
    }
}

impl PartialConfig for RgbPanelPartial {
    type Full = RgbPanelConfig;

    fn to_full(&self) -> RgbPanelConfig {
        let mut timing_flags = RgbTimingFlags::empty();
        timing_flags.set(RgbTimingFlags::PCLK_ACTIVE_NEG, self.pclk_active_neg);

        // Only an 8-bit bus can stream RGB888 (three bytes per pixel). Every
        // other combination keeps an RGB565 frame buffer and the panel expands.
        let bits_per_pixel: u8 =
            if self.data_width == 8 && self.pixel_bits == 24 { 24 } else { 16 };

        RgbPanelConfig {
            clk_src: LcdClkSrc::Default,
            timings: RgbTiming {
                pclk_hz: self.pclk_hz,
                h_res: u32::from(self.h_res),
                v_res: u32::from(self.v_res),
                hsync_pulse_width: u32::from(self.hpw),
                hsync_back_porch: u32::from(self.hbp),
                hsync_front_porch: u32::from(self.hfp),
                vsync_pulse_width: u32::from(self.vpw),
                vsync_back_porch: u32::from(self.vbp),
                vsync_front_porch: u32::from(self.vfp),
                flags: timing_flags,
            },
            data_width: usize::from(self.data_width),
            bits_per_pixel: usize::from(bits_per_pixel),
            num_fbs: 1,
            bounce_buffer_size_px: self.bounce_buffer_size_px,
            sram_trans_align: 4,
            psram_trans_align: 64,
            hsync_gpio_num: self.hsync_io,
            vsync_gpio_num: self.vsync_io,
            de_gpio_num: self.de_io,
            pclk_gpio_num: self.pclk_io,
            disp_gpio_num: self.disp_io,
            data_gpio_nums: self.data_ios,
            flags: RgbPanelFlags::FB_IN_PSRAM,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThreeWireFlags: u32 {
        const USE_DC_BIT = 1 << 0;
        const DC_ZERO_ON_DATA = 1 << 1;
        const LSB_FIRST = 1 << 2;
        const CS_HIGH_ACTIVE = 1 << 3;
        const DEL_KEEP_CS_INACTIVE = 1 << 4;
    }
}

/// `esp_lcd_panel_io_3wire_spi_config_t` with GPIO lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreeWireSpiConfig {
    pub cs_gpio_num: i32,
    pub scl_gpio_num: i32,
    pub sda_gpio_num: i32,
    pub expect_clk_speed: u32,
    pub spi_mode: u32,
    pub lcd_cmd_bytes: u32,
    pub lcd_param_bytes: u32,
    pub flags: ThreeWireFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreeWireSpiPartial {
    pub cs_io: i32,
    pub scl_io: i32,
    pub sda_io: i32,
    pub lcd_cmd_bytes: u32,
    pub lcd_param_bytes: u32,
}

impl ThreeWireSpiPartial {
    pub const fn new(cs_io: i32, scl_io: i32, sda_io: i32) -> Self {
        Self { cs_io, scl_io, sda_io, lcd_cmd_bytes: 1, lcd_param_bytes: 1 }
    }
}

impl PartialConfig for ThreeWireSpiPartial {
    type Full = ThreeWireSpiConfig;

    fn to_full(&self) -> ThreeWireSpiConfig {
        ThreeWireSpiConfig {
            cs_gpio_num: self.cs_io,
            scl_gpio_num: self.scl_io,
            sda_gpio_num: self.sda_io,
            expect_clk_speed: 500_000,
            spi_mode: 0,
            lcd_cmd_bytes: self.lcd_cmd_bytes,
            lcd_param_bytes: self.lcd_param_bytes,
            flags: ThreeWireFlags::USE_DC_BIT | ThreeWireFlags::DEL_KEEP_CS_INACTIVE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RgbBusConfig {
    pub refresh_panel: Config<RgbPanelPartial>,
    /// Optional 3-wire SPI command channel for controllers that need one.
    pub control_panel: Option<Config<ThreeWireSpiPartial>>,
}

/// Parallel RGB bus. It has no shared host.
pub struct RgbBus<P: Platform> {
    config: RgbBusConfig,
    lifecycle: Lifecycle,
    io: Option<RawHandle>,
    _platform: PhantomData<fn() -> P>,
}

impl<P: Platform> RgbBus<P> {
    pub fn new(refresh_panel: RgbPanelPartial) -> Self {
        Self::from_config(RgbBusConfig {
            refresh_panel: Config::from_partial(refresh_panel),
            control_panel: None,
        })
    }

    /// RGB bus whose controller is configured over 3-wire SPI.
    pub fn with_3wire_spi(
        refresh_panel: RgbPanelPartial,
        control_panel: ThreeWireSpiPartial,
    ) -> Self {
        Self::from_config(RgbBusConfig {
            refresh_panel: Config::from_partial(refresh_panel),
            control_panel: Some(Config::from_partial(control_panel)),
        })
    }

    pub fn from_config(config: RgbBusConfig) -> Self {
        Self { config, lifecycle: Lifecycle::new(), io: None, _platform: PhantomData }
    }

    pub fn config(&self) -> &RgbBusConfig {
        &self.config
    }

    pub fn config_frame_buffer_number(&mut self, num: usize) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        let panel = self.config.refresh_panel.full_mut();
        panel.num_fbs = num;
        panel.flags.set(RgbPanelFlags::DOUBLE_FB, num == 2);
        Ok(())
    }

    pub fn config_bounce_buffer_size(&mut self, px: usize) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.refresh_panel.full_mut().bounce_buffer_size_px = px;
        Ok(())
    }

    pub fn config_frequency_hz(&mut self, hz: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.refresh_panel.full_mut().timings.pclk_hz = hz;
        Ok(())
    }

    pub fn config_panel_flags(&mut self, flags: RgbPanelFlags) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.refresh_panel.full_mut().flags = flags;
        Ok(())
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(TAG)?;

        if let Some(control_panel) = self.config.control_panel.as_mut() {
            let io = P::new_panel_io_3wire_spi(control_panel.full_mut())?;
            self.io = Some(io);
        }

        self.lifecycle.advance(State::Begin);
        debug!("[{}] bus begun", TAG);
        Ok(())
    }
}

impl<P: Platform> Device for RgbBus<P> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(TAG)?;

        self.config.refresh_panel.convert_partial_to_full();
        if let Some(control_panel) = self.config.control_panel.as_mut() {
            control_panel.convert_partial_to_full();
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
        self.lifecycle.clear();
        result
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl<P: Platform> Bus for RgbBus<P> {
    type Platform = P;

    fn bus_type(&self) -> BusType {
        BusType::Rgb
    }

    fn control_panel_handle(&self) -> Option<RawHandle> {
        self.io
    }

    fn panel_source(&self) -> Result<PanelSource<'_>, Error> {
        let rgb = self.config.refresh_panel.full().ok_or(Error::NotInitialized)?;
        Ok(PanelSource::Rgb(rgb))
    }
}

impl<P: Platform> Drop for RgbBus<P> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

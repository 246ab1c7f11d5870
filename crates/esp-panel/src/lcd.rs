//! LCD devices.
//!
//! An [`Lcd`] owns the *refresh panel* (the native panel object that accepts
//! pixels) and shares its bus with other devices. The controller is picked by
//! name; [`Platform::new_lcd_panel`] maps the name to the vendor constructor.

use alloc::rc::Rc;
use core::cell::RefCell;
use core::marker::PhantomData;

use crate::bus::{Bus, BusShare, BusType, PanelSource};
use crate::config::{Config, PartialConfig};
use crate::error::Error;
use crate::native::{optional, Platform, RawHandle, GPIO_NUM_NC};
use crate::state::{self, Device, Lifecycle, State};

const TAG: &str = "LCD";

/// One step of a controller init sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LcdInitCmd {
    pub cmd: i32,
    pub data: &'static [u8],
    pub delay_ms: u32,
}

/// Extra arguments handed to the controller constructor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VendorConfig<'a> {
    pub bus_type: BusType,
    pub source: PanelSource<'a>,
    pub hor_res: u16,
    pub ver_res: u16,
    /// Replaces the controller's built-in init sequence when not empty.
    pub init_cmds: &'a [LcdInitCmd],
    /// Mirror through controller commands instead of the refresh panel.
    pub mirror_by_cmd: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ColorOrder {
    #[default]
    Rgb = 0,
    Bgr = 1,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum DataEndian {
    #[default]
    Big = 0,
    Little = 1,
}

/// `esp_lcd_panel_dev_config_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelDevConfig {
    pub reset_gpio_num: i32,
    pub rgb_ele_order: ColorOrder,
    pub data_endian: DataEndian,
    pub bits_per_pixel: u32,
    pub reset_active_high: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcdDevicePartial {
    pub reset_gpio_num: i32,
    pub rgb_ele_order: ColorOrder,
    pub bits_per_pixel: u8,
    pub reset_active_high: bool,
}

impl LcdDevicePartial {
    pub const fn new(bits_per_pixel: u8, reset_gpio_num: i32) -> Self {
        Self {
            reset_gpio_num,
            rgb_ele_order: ColorOrder::Rgb,
            bits_per_pixel,
            reset_active_high: false,
        }
    }
}

impl PartialConfig for LcdDevicePartial {
    type Full = PanelDevConfig;

    fn to_full(&self) -> PanelDevConfig {
        PanelDevConfig {
            reset_gpio_num: self.reset_gpio_num,
            rgb_ele_order: self.rgb_ele_order,
            data_endian: DataEndian::Big,
            bits_per_pixel: u32::from(self.bits_per_pixel),
            reset_active_high: self.reset_active_high,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LcdConfig {
    pub width: u16,
    pub height: u16,
    pub device: Config<LcdDevicePartial>,
    pub init_cmds: &'static [LcdInitCmd],
    pub mirror_by_cmd: bool,
}

impl LcdConfig {
    pub const fn new(width: u16, height: u16, bits_per_pixel: u8, reset_gpio_num: i32) -> Self {
        Self {
            width,
            height,
            device: Config::from_partial(LcdDevicePartial::new(bits_per_pixel, reset_gpio_num)),
            init_cmds: &[],
            mirror_by_cmd: false,
        }
    }
}

/// Transformations re-applied every time the panel is (re)started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Orientation {
    mirror_x: bool,
    mirror_y: bool,
    swap_xy: bool,
    gap_x: i32,
    gap_y: i32,
    invert_color: bool,
}

/// A device with a native pixel resolution.
pub trait Display: Device {
    /// Width and height before any `swap_xy`. `None` when there is no panel.
    fn resolution(&self) -> Option<(u16, u16)>;
}

/// An LCD controller on a shared bus.
pub struct Lcd<P: Platform, B: Bus<Platform = P>> {
    controller: &'static str,
    bus: BusShare<B>,
    config: LcdConfig,
    lifecycle: Lifecycle,
    panel: Option<RawHandle>,
    orientation: Orientation,
    _platform: PhantomData<fn() -> P>,
}

impl<P: Platform, B: Bus<Platform = P>> Lcd<P, B> {
    pub fn new(
        controller: &'static str,
        bus: Rc<RefCell<B>>,
        width: u16,
        height: u16,
        bits_per_pixel: u8,
        reset_io: i32,
    ) -> Self {
        Self::from_config(controller, bus, LcdConfig::new(width, height, bits_per_pixel, reset_io))
    }

    pub fn from_config(controller: &'static str, bus: Rc<RefCell<B>>, config: LcdConfig) -> Self {
        Self {
            controller,
            bus: BusShare::new(bus),
            config,
            lifecycle: Lifecycle::new(),
            panel: None,
            orientation: Orientation::default(),
            _platform: PhantomData,
        }
    }

    pub fn controller(&self) -> &'static str {
        self.controller
    }

    /// The shared bus, unless it went away while this LCD was deleted.
    pub fn bus(&self) -> Option<Rc<RefCell<B>>> {
        self.bus.get()
    }

    pub fn config(&self) -> &LcdConfig {
        &self.config
    }

    pub fn refresh_panel_handle(&self) -> Option<RawHandle> {
        self.panel
    }

    /// Visible width and height, taking `swap_xy` into account.
    pub fn frame_size(&self) -> (u16, u16) {
        if self.orientation.swap_xy {
            (self.config.height, self.config.width)
        } else {
            (self.config.width, self.config.height)
        }
    }

    /// Whether the reset repair path is armed.
    pub fn is_reset(&self) -> bool {
        self.lifecycle.is_reset()
    }

    pub fn config_reset_io(&mut self, io: i32, active_high: bool) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        let device = self.config.device.full_mut();
        device.reset_gpio_num = io;
        device.reset_active_high = active_high;
        Ok(())
    }

    pub fn config_color_order(&mut self, order: ColorOrder) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.device.full_mut().rgb_ele_order = order;
        Ok(())
    }

    pub fn config_bits_per_pixel(&mut self, bits: u8) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.device.full_mut().bits_per_pixel = u32::from(bits);
        Ok(())
    }

    pub fn config_init_commands(&mut self, cmds: &'static [LcdInitCmd]) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.init_cmds = cmds;
        Ok(())
    }

    pub fn config_mirror_by_command(&mut self, enable: bool) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        self.config.mirror_by_cmd = enable;
        Ok(())
    }

    /// Hardware-reset the started panel.
    ///
    /// Arms the repair path: the next `begin()` re-runs panel init and
    /// orientation on the existing panel without resetting it again.
    pub fn reset(&mut self) -> Result<(), Error> {
        let panel = self.begun_panel()?;
        P::panel_reset(panel)?;
        self.lifecycle.mark_reset();
        debug!("[{}] {} reset", TAG, self.controller);
        Ok(())
    }

    /// Draw `data` at `(x, y)` with the given size in pixels.
    pub fn draw_bitmap(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        data: &[u8],
    ) -> Result<(), Error> {
        let panel = self.begun_panel()?;

        let (frame_w, frame_h) = self.frame_size();
        let x_end = u32::from(x) + u32::from(width);
        let y_end = u32::from(y) + u32::from(height);
        if width == 0 || height == 0 || x_end > u32::from(frame_w) || y_end > u32::from(frame_h) {
            warn!("[{}] bitmap {}x{} at ({}, {}) outside frame", TAG, width, height, x, y);
            return Err(Error::InvalidArgument);
        }

        let pixels = usize::from(width) * usize::from(height);
        if data.len() < pixels * self.bytes_per_pixel()? {
            warn!("[{}] bitmap buffer too small: {} bytes", TAG, data.len());
            return Err(Error::InvalidArgument);
        }

        P::panel_draw_bitmap(panel, i32::from(x), i32::from(y), x_end as i32, y_end as i32, data)?;
        Ok(())
    }

    pub fn mirror_x(&mut self, enable: bool) -> Result<(), Error> {
        let panel = self.begun_panel()?;
        P::panel_mirror(panel, enable, self.orientation.mirror_y)?;
        self.orientation.mirror_x = enable;
        Ok(())
    }

    pub fn mirror_y(&mut self, enable: bool) -> Result<(), Error> {
        let panel = self.begun_panel()?;
        P::panel_mirror(panel, self.orientation.mirror_x, enable)?;
        self.orientation.mirror_y = enable;
        Ok(())
    }

    pub fn swap_xy(&mut self, enable: bool) -> Result<(), Error> {
        let panel = self.begun_panel()?;
        P::panel_swap_xy(panel, enable)?;
        self.orientation.swap_xy = enable;
        Ok(())
    }

    pub fn set_gap(&mut self, x_gap: i32, y_gap: i32) -> Result<(), Error> {
        let panel = self.begun_panel()?;
        P::panel_set_gap(panel, x_gap, y_gap)?;
        self.orientation.gap_x = x_gap;
        self.orientation.gap_y = y_gap;
        Ok(())
    }

    pub fn invert_color(&mut self, enable: bool) -> Result<(), Error> {
        let panel = self.begun_panel()?;
        P::panel_invert_color(panel, enable)?;
        self.orientation.invert_color = enable;
        Ok(())
    }

    pub fn display_on_off(&mut self, on: bool) -> Result<(), Error> {
        let panel = self.begun_panel()?;
        P::panel_disp_on_off(panel, on)?;
        Ok(())
    }

    fn begun_panel(&self) -> Result<RawHandle, Error> {
        self.lifecycle.check_begun(TAG)?;
        self.panel.ok_or(Error::NotBegun)
    }

    /// Bytes per pixel of the buffer the panel reads, which for RGB and DPI
    /// panels is set by the frame buffer rather than the controller.
    fn bytes_per_pixel(&self) -> Result<usize, Error> {
        let bus = self.bus.active()?.borrow();
        let bits = match bus.panel_source()? {
            PanelSource::Rgb(rgb) => rgb.bits_per_pixel,
            PanelSource::Dsi { dpi, .. } => dpi.pixel_format.bits_per_pixel(),
            PanelSource::ControlPanel => self.config.device.promoted().bits_per_pixel as usize,
        };
        Ok(bits.div_ceil(8))
    }

    fn create_panel(&self) -> Result<RawHandle, Error> {
        let device = self.config.device.full().ok_or(Error::NotInitialized)?;
        let bus = self.bus.active()?.borrow();
        let vendor = VendorConfig {
            bus_type: bus.bus_type(),
            source: bus.panel_source()?,
            hor_res: self.config.width,
            ver_res: self.config.height,
            init_cmds: self.config.init_cmds,
            mirror_by_cmd: self.config.mirror_by_cmd,
        };
        let panel = P::new_lcd_panel(self.controller, bus.control_panel_handle(), device, &vendor)?;
        debug!("[{}] {} panel created", TAG, self.controller);
        Ok(panel)
    }

    fn start_panel(&self, panel: RawHandle) -> Result<(), Error> {
        if !self.lifecycle.is_reset() {
            P::panel_reset(panel)?;
        }
        P::panel_init(panel)?;

        let o = self.orientation;
        if o.mirror_x || o.mirror_y {
            P::panel_mirror(panel, o.mirror_x, o.mirror_y)?;
        }
        if o.swap_xy {
            P::panel_swap_xy(panel, true)?;
        }
        if o.gap_x != 0 || o.gap_y != 0 {
            P::panel_set_gap(panel, o.gap_x, o.gap_y)?;
        }
        if o.invert_color {
            P::panel_invert_color(panel, true)?;
        }

        optional(P::panel_disp_on_off(panel, true))?;
        Ok(())
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(TAG)?;

        {
            let mut bus = self.bus.active()?.borrow_mut();
            if !bus.is_over_state(State::Begin) {
                bus.begin()?;
            }
        }

        let (panel, created) = match self.panel {
            Some(panel) => (panel, false),
            None => (self.create_panel()?, true),
        };

        if let Err(err) = self.start_panel(panel) {
            if created {
                let _ = P::panel_del(panel);
            }
            return Err(err);
        }

        self.panel = Some(panel);
        self.lifecycle.advance(State::Begin);
        info!("[{}] {} begun", TAG, self.controller);
        Ok(())
    }
}

impl<P: Platform, B: Bus<Platform = P>> Device for Lcd<P, B> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(TAG)?;
        self.bus.resume()?;

        let device = self.config.device.full_mut();
        if device.reset_gpio_num == GPIO_NUM_NC {
            trace!("[{}] no reset line, software reset only", TAG);
        }

        self.lifecycle.advance(State::Init);
        Ok(())
    }

    fn begin(&mut self) -> Result<(), Error> {
        state::begin_with(self, Self::bring_up)
    }

    /// Delete the refresh panel, and the bus too if no other device shares it.
    fn del(&mut self) -> Result<(), Error> {
        if self.lifecycle.state() == State::Deinit {
            return Ok(());
        }

        let mut result = Ok(());
        if let Some(panel) = self.panel.take() {
            if let Err(err) = P::panel_del(panel) {
                error!("[{}] delete panel failed", TAG);
                result = Err(err.into());
            }
        }
        if let Err(err) = self.bus.park() {
            result = result.and(Err(err));
        }

        self.orientation = Orientation::default();
        self.lifecycle.clear();
        result
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl<P: Platform, B: Bus<Platform = P>> Display for Lcd<P, B> {
    fn resolution(&self) -> Option<(u16, u16)> {
        Some((self.config.width, self.config.height))
    }
}

impl<P: Platform, B: Bus<Platform = P>> Drop for Lcd<P, B> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

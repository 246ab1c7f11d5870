//! Seam to the vendor SDK.
//!
//! The SDK is reached through associated functions of a [`Platform`] type, so a
//! firmware binds it to the real ESP-IDF drivers once and host tests bind it to
//! a recording mock.

use core::ffi::c_void;
use core::ptr::NonNull;

use host_registry::HostId;

use crate::backlight::{GpioOutputConfig, LedcConfig};
use crate::bus::dsi::DbiIoConfig;
use crate::bus::i2c::I2cPanelIoConfig;
use crate::bus::rgb::ThreeWireSpiConfig;
use crate::bus::spi::SpiPanelIoConfig;
use crate::host::{DsiHostConfig, I2cHostConfig, SpiHostConfig};
use crate::lcd::{PanelDevConfig, VendorConfig};
use crate::touch::{TouchDevConfig, TouchPoint};

/// Pin number meaning "not connected".
pub const GPIO_NUM_NC: i32 = -1;

/// Non-zero `esp_err_t` returned by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EspError(i32);

impl EspError {
    pub const FAIL: Self = Self(-1);
    pub const NO_MEM: Self = Self(0x101);
    pub const INVALID_ARG: Self = Self(0x102);
    pub const INVALID_STATE: Self = Self(0x103);
    pub const NOT_SUPPORTED: Self = Self(0x106);
    pub const TIMEOUT: Self = Self(0x107);

    /// Wrap a raw code; `ESP_OK` (0) is not an error.
    pub const fn from_code(code: i32) -> Option<Self> {
        if code == 0 {
            None
        } else {
            Some(Self(code))
        }
    }

    /// Turn a raw SDK return value into a `Result`.
    pub const fn check(code: i32) -> Result<(), Self> {
        match Self::from_code(code) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    pub const fn code(&self) -> i32 {
        self.0
    }
}

/// Opaque, non-null handle owned by the SDK (`esp_lcd_panel_handle_t`,
/// `esp_lcd_panel_io_handle_t`, `esp_lcd_touch_handle_t`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHandle(NonNull<c_void>);

// SAFETY: SDK handles point at heap objects that are not bound to the task
// that created them; the drivers serialize access internally.
unsafe impl Send for RawHandle {}

impl RawHandle {
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RawHandle {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "RawHandle({=usize:#x})", self.0.as_ptr() as usize)
    }
}

/// Map `NOT_SUPPORTED` to success, for optional panel operations.
pub(crate) fn optional(result: Result<(), EspError>) -> Result<(), EspError> {
    match result {
        Err(EspError::NOT_SUPPORTED) => Ok(()),
        other => other,
    }
}

/// Vendor SDK entry points used by this crate.
///
/// All functions are associated (no receiver): the SDK is global state.
/// Operations a controller may not implement default to
/// [`EspError::NOT_SUPPORTED`].
pub trait Platform: 'static {
    // Hosts

    fn i2c_host_begin(id: HostId, config: &I2cHostConfig) -> Result<(), EspError>;
    fn i2c_host_end(id: HostId) -> Result<(), EspError>;

    fn spi_host_begin(id: HostId, config: &SpiHostConfig) -> Result<(), EspError>;
    fn spi_host_end(id: HostId) -> Result<(), EspError>;

    /// Create the MIPI-DSI bus; the handle is shared by every panel on it.
    fn dsi_host_begin(id: HostId, config: &DsiHostConfig) -> Result<RawHandle, EspError>;
    fn dsi_host_end(id: HostId, bus: RawHandle) -> Result<(), EspError>;

    // Control panels

    fn new_panel_io_i2c(host: HostId, config: &I2cPanelIoConfig) -> Result<RawHandle, EspError>;
    fn new_panel_io_spi(host: HostId, config: &SpiPanelIoConfig) -> Result<RawHandle, EspError>;
    fn new_panel_io_dbi(bus: RawHandle, config: &DbiIoConfig) -> Result<RawHandle, EspError>;

    fn new_panel_io_3wire_spi(_config: &ThreeWireSpiConfig) -> Result<RawHandle, EspError> {
        Err(EspError::NOT_SUPPORTED)
    }

    fn del_panel_io(io: RawHandle) -> Result<(), EspError>;

    // LCD

    /// Run the constructor of LCD controller `controller`.
    ///
    /// `io` is `None` for panels without a control panel (plain RGB).
    fn new_lcd_panel(
        controller: &str,
        io: Option<RawHandle>,
        config: &PanelDevConfig,
        vendor: &VendorConfig<'_>,
    ) -> Result<RawHandle, EspError>;

    fn panel_reset(panel: RawHandle) -> Result<(), EspError>;
    fn panel_init(panel: RawHandle) -> Result<(), EspError>;
    fn panel_del(panel: RawHandle) -> Result<(), EspError>;

    /// Draw `data` into the half-open window `[x_start, x_end) x [y_start, y_end)`.
    fn panel_draw_bitmap(
        panel: RawHandle,
        x_start: i32,
        y_start: i32,
        x_end: i32,
        y_end: i32,
        data: &[u8],
    ) -> Result<(), EspError>;

    fn panel_mirror(_panel: RawHandle, _mirror_x: bool, _mirror_y: bool) -> Result<(), EspError> {
        Err(EspError::NOT_SUPPORTED)
    }

    fn panel_swap_xy(_panel: RawHandle, _swap: bool) -> Result<(), EspError> {
        Err(EspError::NOT_SUPPORTED)
    }

    fn panel_set_gap(_panel: RawHandle, _x_gap: i32, _y_gap: i32) -> Result<(), EspError> {
        Err(EspError::NOT_SUPPORTED)
    }

    fn panel_invert_color(_panel: RawHandle, _invert: bool) -> Result<(), EspError> {
        Err(EspError::NOT_SUPPORTED)
    }

    fn panel_disp_on_off(_panel: RawHandle, _on: bool) -> Result<(), EspError> {
        Err(EspError::NOT_SUPPORTED)
    }

    // Touch

    fn new_touch(
        controller: &str,
        io: RawHandle,
        config: &TouchDevConfig,
    ) -> Result<RawHandle, EspError>;
    fn touch_read_data(touch: RawHandle) -> Result<(), EspError>;

    /// Copy the points of the last `touch_read_data` into `points`, returning
    /// how many were written.
    fn touch_get_points(touch: RawHandle, points: &mut [TouchPoint]) -> Result<usize, EspError>;

    fn touch_del(touch: RawHandle) -> Result<(), EspError>;

    fn touch_set_swap_xy(_touch: RawHandle, _swap: bool) -> Result<(), EspError> {
        Err(EspError::NOT_SUPPORTED)
    }

    fn touch_set_mirror_x(_touch: RawHandle, _mirror: bool) -> Result<(), EspError> {
        Err(EspError::NOT_SUPPORTED)
    }

    fn touch_set_mirror_y(_touch: RawHandle, _mirror: bool) -> Result<(), EspError> {
        Err(EspError::NOT_SUPPORTED)
    }

    // Backlight

    /// Configure the LEDC timer and channel.
    fn ledc_begin(config: &LedcConfig) -> Result<(), EspError>;
    fn ledc_set_duty(config: &LedcConfig, duty: u32) -> Result<(), EspError>;
    fn ledc_end(config: &LedcConfig) -> Result<(), EspError>;

    fn gpio_output_begin(config: &GpioOutputConfig) -> Result<(), EspError>;
    fn gpio_set_level(io_num: i32, high: bool) -> Result<(), EspError>;
    fn gpio_reset(io_num: i32) -> Result<(), EspError>;
}

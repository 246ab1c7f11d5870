#![allow(dead_code)]

use std::cell::RefCell;
use std::ffi::c_void;

use esp_panel::backlight::{GpioOutputConfig, LedcConfig};
use esp_panel::bus::dsi::DbiIoConfig;
use esp_panel::bus::i2c::I2cPanelIoConfig;
use esp_panel::bus::rgb::ThreeWireSpiConfig;
use esp_panel::bus::spi::SpiPanelIoConfig;
use esp_panel::host::{DsiHostConfig, I2cHostConfig, SpiHostConfig};
use esp_panel::io_expander::{ExpanderChip, PinMode};
use esp_panel::lcd::{PanelDevConfig, VendorConfig};
use esp_panel::touch::{TouchDevConfig, TouchPoint};
use esp_panel::{BusType, EspError, HostId, Platform, RawHandle};

/// One recorded SDK call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    I2cHostBegin(HostId),
    I2cHostEnd(HostId),
    SpiHostBegin(HostId),
    SpiHostEnd(HostId),
    DsiHostBegin(HostId),
    DsiHostEnd(HostId),
    NewIoI2c(HostId),
    NewIoSpi(HostId),
    NewIoDbi,
    NewIo3Wire,
    DelIo,
    NewPanel { controller: String, bus_type: BusType, with_io: bool },
    PanelReset,
    PanelInit,
    PanelDel,
    DrawBitmap { x_start: i32, y_start: i32, x_end: i32, y_end: i32 },
    Mirror(bool, bool),
    SwapXy(bool),
    SetGap(i32, i32),
    InvertColor(bool),
    DispOnOff(bool),
    NewTouch(String),
    TouchRead,
    TouchDel,
    TouchSwapXy(bool),
    LedcBegin,
    LedcDuty(u32),
    LedcEnd,
    GpioBegin(u64),
    GpioLevel(i32, bool),
    GpioReset(i32),
    ChipBegin(HostId, u8),
    ChipDel,
    ChipWrite(u8, bool),
}

#[derive(Default)]
pub struct MockState {
    pub calls: Vec<Call>,
    pub next_handle: usize,
    /// Operations that fail once, by name.
    pub fail: Vec<&'static str>,
    pub touch_points: Vec<TouchPoint>,
    pub last_i2c_io: Option<I2cPanelIoConfig>,
    pub last_spi_io: Option<SpiPanelIoConfig>,
    pub last_panel_dev: Option<PanelDevConfig>,
    pub last_touch_dev: Option<TouchDevConfig>,
    pub last_ledc: Option<LedcConfig>,
}

// Every #[test] runs on its own thread, so the mock is per-test.
std::thread_local! {
    static STATE: RefCell<MockState> = RefCell::new(MockState::default());
}

pub fn with_state<R>(f: impl FnOnce(&mut MockState) -> R) -> R {
    STATE.with(|cell| f(&mut cell.borrow_mut()))
}

pub fn calls() -> Vec<Call> {
    with_state(|s| s.calls.clone())
}

pub fn count(call: &Call) -> usize {
    with_state(|s| s.calls.iter().filter(|c| *c == call).count())
}

pub fn count_where(pred: impl Fn(&Call) -> bool) -> usize {
    with_state(|s| s.calls.iter().filter(|c| pred(c)).count())
}

pub fn clear_calls() {
    with_state(|s| s.calls.clear());
}

/// Make the next call to `op` fail with `ESP_FAIL`.
pub fn fail_next(op: &'static str) {
    with_state(|s| s.fail.push(op));
}

pub fn set_touch_points(points: &[TouchPoint]) {
    with_state(|s| s.touch_points = points.to_vec());
}

fn record(op: &'static str, call: Call) -> Result<(), EspError> {
    with_state(|s| {
        if let Some(pos) = s.fail.iter().position(|f| *f == op) {
            s.fail.remove(pos);
            return Err(EspError::FAIL);
        }
        s.calls.push(call);
        Ok(())
    })
}

fn mint() -> RawHandle {
    with_state(|s| {
        s.next_handle += 1;
        RawHandle::new((s.next_handle * 0x10) as *mut c_void).unwrap()
    })
}

pub struct Mock;

impl Platform for Mock {
    fn i2c_host_begin(id: HostId, _config: &I2cHostConfig) -> Result<(), EspError> {
        record("i2c_host_begin", Call::I2cHostBegin(id))
    }

    fn i2c_host_end(id: HostId) -> Result<(), EspError> {
        record("i2c_host_end", Call::I2cHostEnd(id))
    }

    fn spi_host_begin(id: HostId, _config: &SpiHostConfig) -> Result<(), EspError> {
        record("spi_host_begin", Call::SpiHostBegin(id))
    }

    fn spi_host_end(id: HostId) -> Result<(), EspError> {
        record("spi_host_end", Call::SpiHostEnd(id))
    }

    fn dsi_host_begin(id: HostId, _config: &DsiHostConfig) -> Result<RawHandle, EspError> {
        record("dsi_host_begin", Call::DsiHostBegin(id))?;
        Ok(mint())
    }

    fn dsi_host_end(id: HostId, _bus: RawHandle) -> Result<(), EspError> {
        record("dsi_host_end", Call::DsiHostEnd(id))
    }

    fn new_panel_io_i2c(host: HostId, config: &I2cPanelIoConfig) -> Result<RawHandle, EspError> {
        record("new_panel_io_i2c", Call::NewIoI2c(host))?;
        with_state(|s| s.last_i2c_io = Some(*config));
        Ok(mint())
    }

    fn new_panel_io_spi(host: HostId, config: &SpiPanelIoConfig) -> Result<RawHandle, EspError> {
        record("new_panel_io_spi", Call::NewIoSpi(host))?;
        with_state(|s| s.last_spi_io = Some(*config));
        Ok(mint())
    }

    fn new_panel_io_dbi(_bus: RawHandle, _config: &DbiIoConfig) -> Result<RawHandle, EspError> {
        record("new_panel_io_dbi", Call::NewIoDbi)?;
        Ok(mint())
    }

    fn new_panel_io_3wire_spi(_config: &ThreeWireSpiConfig) -> Result<RawHandle, EspError> {
        record("new_panel_io_3wire_spi", Call::NewIo3Wire)?;
        Ok(mint())
    }

    fn del_panel_io(_io: RawHandle) -> Result<(), EspError> {
        record("del_panel_io", Call::DelIo)
    }

    fn new_lcd_panel(
        controller: &str,
        io: Option<RawHandle>,
        config: &PanelDevConfig,
        vendor: &VendorConfig<'_>,
    ) -> Result<RawHandle, EspError> {
        record(
            "new_lcd_panel",
            Call::NewPanel {
                controller: controller.to_string(),
                bus_type: vendor.bus_type,
                with_io: io.is_some(),
            },
        )?;
        with_state(|s| s.last_panel_dev = Some(*config));
        Ok(mint())
    }

    fn panel_reset(_panel: RawHandle) -> Result<(), EspError> {
        record("panel_reset", Call::PanelReset)
    }

    fn panel_init(_panel: RawHandle) -> Result<(), EspError> {
        record("panel_init", Call::PanelInit)
    }

    fn panel_del(_panel: RawHandle) -> Result<(), EspError> {
        record("panel_del", Call::PanelDel)
    }

    fn panel_draw_bitmap(
        _panel: RawHandle,
        x_start: i32,
        y_start: i32,
        x_end: i32,
        y_end: i32,
        _data: &[u8],
    ) -> Result<(), EspError> {
        record("panel_draw_bitmap", Call::DrawBitmap { x_start, y_start, x_end, y_end })
    }

    fn panel_mirror(_panel: RawHandle, mirror_x: bool, mirror_y: bool) -> Result<(), EspError> {
        record("panel_mirror", Call::Mirror(mirror_x, mirror_y))
    }

    fn panel_swap_xy(_panel: RawHandle, swap: bool) -> Result<(), EspError> {
        record("panel_swap_xy", Call::SwapXy(swap))
    }

    fn panel_set_gap(_panel: RawHandle, x_gap: i32, y_gap: i32) -> Result<(), EspError> {
        record("panel_set_gap", Call::SetGap(x_gap, y_gap))
    }

    fn panel_invert_color(_panel: RawHandle, invert: bool) -> Result<(), EspError> {
        record("panel_invert_color", Call::InvertColor(invert))
    }

    // panel_disp_on_off keeps the NOT_SUPPORTED default on purpose: begin()
    // must tolerate it.

    fn new_touch(
        controller: &str,
        _io: RawHandle,
        config: &TouchDevConfig,
    ) -> Result<RawHandle, EspError> {
        record("new_touch", Call::NewTouch(controller.to_string()))?;
        with_state(|s| s.last_touch_dev = Some(*config));
        Ok(mint())
    }

    fn touch_read_data(_touch: RawHandle) -> Result<(), EspError> {
        record("touch_read_data", Call::TouchRead)
    }

    fn touch_get_points(_touch: RawHandle, points: &mut [TouchPoint]) -> Result<usize, EspError> {
        with_state(|s| {
            let n = s.touch_points.len().min(points.len());
            points[..n].copy_from_slice(&s.touch_points[..n]);
            Ok(n)
        })
    }

    fn touch_del(_touch: RawHandle) -> Result<(), EspError> {
        record("touch_del", Call::TouchDel)
    }

    fn touch_set_swap_xy(_touch: RawHandle, swap: bool) -> Result<(), EspError> {
        record("touch_set_swap_xy", Call::TouchSwapXy(swap))
    }

    fn ledc_begin(config: &LedcConfig) -> Result<(), EspError> {
        record("ledc_begin", Call::LedcBegin)?;
        with_state(|s| s.last_ledc = Some(*config));
        Ok(())
    }

    fn ledc_set_duty(_config: &LedcConfig, duty: u32) -> Result<(), EspError> {
        record("ledc_set_duty", Call::LedcDuty(duty))
    }

    fn ledc_end(_config: &LedcConfig) -> Result<(), EspError> {
        record("ledc_end", Call::LedcEnd)
    }

    fn gpio_output_begin(config: &GpioOutputConfig) -> Result<(), EspError> {
        record("gpio_output_begin", Call::GpioBegin(config.pin_bit_mask))
    }

    fn gpio_set_level(io_num: i32, high: bool) -> Result<(), EspError> {
        record("gpio_set_level", Call::GpioLevel(io_num, high))
    }

    fn gpio_reset(io_num: i32) -> Result<(), EspError> {
        record("gpio_reset", Call::GpioReset(io_num))
    }
}

/// Expander chip recording into the same call log.
#[derive(Debug, Default)]
pub struct MockChip {
    pub outputs: u8,
}

impl ExpanderChip for MockChip {
    const NAME: &'static str = "MOCK_CHIP";

    fn begin(&mut self, host: HostId, address: u8) -> Result<(), EspError> {
        record("chip_begin", Call::ChipBegin(host, address))
    }

    fn del(&mut self) -> Result<(), EspError> {
        record("chip_del", Call::ChipDel)
    }

    fn reset(&mut self) -> Result<(), EspError> {
        self.outputs = 0;
        Ok(())
    }

    fn pin_mode(&mut self, _pin: u8, _mode: PinMode) -> Result<(), EspError> {
        Ok(())
    }

    fn digital_write(&mut self, pin: u8, high: bool) -> Result<(), EspError> {
        record("chip_write", Call::ChipWrite(pin, high))?;
        if high {
            self.outputs |= 1 << pin;
        } else {
            self.outputs &= !(1 << pin);
        }
        Ok(())
    }

    fn digital_read(&mut self, pin: u8) -> Result<bool, EspError> {
        Ok(self.outputs & (1 << pin) != 0)
    }
}

use alloc::rc::Rc;
use core::cell::RefCell;
use core::marker::PhantomData;

use bitflags::bitflags;
use heapless::Vec;

use crate::bus::{Bus, BusShare};
use crate::config::{Config, PartialConfig};
use crate::error::Error;
use crate::native::{Platform, RawHandle, GPIO_NUM_NC};
use crate::state::{self, Device, Lifecycle, State};

const TAG: &str = "Touch";

/// Points kept by [`Touch::read_points`].
pub const MAX_POINTS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
    pub strength: u16,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TouchFlags: u32 {
        const SWAP_XY = 1 << 0;
        const MIRROR_X = 1 << 1;
        const MIRROR_Y = 1 << 2;
    }
}

/// `esp_lcd_touch_config_t` without callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchDevConfig {
    pub x_max: u16,
    pub y_max: u16,
    pub rst_gpio_num: i32,
    pub int_gpio_num: i32,
    pub reset_level: u32,
    pub interrupt_level: u32,
    pub flags: TouchFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPartial {
    pub x_max: u16,
    pub y_max: u16,
    pub rst_gpio_num: i32,
    pub int_gpio_num: i32,
    pub reset_level_high: bool,
    pub interrupt_level_high: bool,
    pub swap_xy: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

impl TouchPartial {
    pub const fn new(x_max: u16, y_max: u16, rst_gpio_num: i32, int_gpio_num: i32) -> Self {
        Self {
            x_max,
            y_max,
            rst_gpio_num,
            int_gpio_num,
            reset_level_high: false,
            interrupt_level_high: false,
            swap_xy: false,
            mirror_x: false,
            mirror_y: false,
        }
    }
}

impl PartialConfig for TouchPartial {
    type Full = TouchDevConfig;

    fn to_full(&self) -> TouchDevConfig {
        let mut flags = TouchFlags::empty();
        flags.set(TouchFlags::SWAP_XY, self.swap_xy);
        flags.set(TouchFlags::MIRROR_X, self.mirror_x);
        flags.set(TouchFlags::MIRROR_Y, self.mirror_y);

        TouchDevConfig {
            x_max: self.x_max,
            y_max: self.y_max,
            rst_gpio_num: self.rst_gpio_num,
            int_gpio_num: self.int_gpio_num,
            reset_level: u32::from(self.reset_level_high),
            interrupt_level: u32::from(self.interrupt_level_high),
            flags,
        }
    }
}

/// A touch controller sharing a bus with an LCD.
pub struct Touch<P: Platform, B: Bus<Platform = P>> {
    controller: &'static str,
    bus: BusShare<B>,
    config: Config<TouchPartial>,
    lifecycle: Lifecycle,
    handle: Option<RawHandle>,
    points: Vec<TouchPoint, MAX_POINTS>,
    _platform: PhantomData<fn() -> P>,
}

impl<P: Platform, B: Bus<Platform = P>> Touch<P, B> {
    pub fn new(controller: &'static str, bus: Rc<RefCell<B>>, width: u16, height: u16) -> Self {
        Self::from_config(
            controller,
            bus,
            Config::from_partial(TouchPartial::new(width, height, GPIO_NUM_NC, GPIO_NUM_NC)),
        )
    }

    pub fn from_config(
        controller: &'static str,
        bus: Rc<RefCell<B>>,
        config: Config<TouchPartial>,
    ) -> Self {
        Self {
            controller,
            bus: BusShare::new(bus),
            config,
            lifecycle: Lifecycle::new(),
            handle: None,
            points: Vec::new(),
            _platform: PhantomData,
        }
    }

    pub fn controller(&self) -> &'static str {
        self.controller
    }

    pub fn bus(&self) -> Option<Rc<RefCell<B>>> {
        self.bus.get()
    }

    pub fn config(&self) -> &Config<TouchPartial> {
        &self.config
    }

    pub fn handle(&self) -> Option<RawHandle> {
        self.handle
    }

    pub fn config_reset_io(&mut self, io: i32, level_high: bool) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        let device = self.config.full_mut();
        device.rst_gpio_num = io;
        device.reset_level = u32::from(level_high);
        Ok(())
    }

    pub fn config_interrupt_io(&mut self, io: i32, level_high: bool) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        let device = self.config.full_mut();
        device.int_gpio_num = io;
        device.interrupt_level = u32::from(level_high);
        Ok(())
    }

    /// Orientation applied by the driver from the start.
    pub fn config_orientation(
        &mut self,
        swap_xy: bool,
        mirror_x: bool,
        mirror_y: bool,
    ) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, TAG)?;
        let flags = &mut self.config.full_mut().flags;
        flags.set(TouchFlags::SWAP_XY, swap_xy);
        flags.set(TouchFlags::MIRROR_X, mirror_x);
        flags.set(TouchFlags::MIRROR_Y, mirror_y);
        Ok(())
    }

    /// Poll the controller. Points are available through
    /// [`get_points`](Self::get_points) afterwards.
    pub fn read_raw_data(&mut self) -> Result<(), Error> {
        let handle = self.begun_handle()?;
        P::touch_read_data(handle)?;
        Ok(())
    }

    /// Copy the points of the last read into `points`; returns the count.
    pub fn get_points(&mut self, points: &mut [TouchPoint]) -> Result<usize, Error> {
        let handle = self.begun_handle()?;
        let count = P::touch_get_points(handle, points)?;
        Ok(count.min(points.len()))
    }

    /// Read the controller and return the current points.
    pub fn read_points(&mut self) -> Result<&[TouchPoint], Error> {
        self.read_raw_data()?;

        let mut buf = [TouchPoint::default(); MAX_POINTS];
        let count = self.get_points(&mut buf)?;

        self.points.clear();
        for point in &buf[..count] {
            let _ = self.points.push(*point);
        }
        trace!("[{}] {} points", TAG, count);
        Ok(self.points.as_slice())
    }

    pub fn swap_xy(&mut self, enable: bool) -> Result<(), Error> {
        let handle = self.begun_handle()?;
        P::touch_set_swap_xy(handle, enable)?;
        self.config.full_mut().flags.set(TouchFlags::SWAP_XY, enable);
        Ok(())
    }

    pub fn mirror_x(&mut self, enable: bool) -> Result<(), Error> {
        let handle = self.begun_handle()?;
        P::touch_set_mirror_x(handle, enable)?;
        self.config.full_mut().flags.set(TouchFlags::MIRROR_X, enable);
        Ok(())
    }

    pub fn mirror_y(&mut self, enable: bool) -> Result<(), Error> {
        let handle = self.begun_handle()?;
        P::touch_set_mirror_y(handle, enable)?;
        self.config.full_mut().flags.set(TouchFlags::MIRROR_Y, enable);
        Ok(())
    }

    fn begun_handle(&self) -> Result<RawHandle, Error> {
        self.lifecycle.check_begun(TAG)?;
        self.handle.ok_or(Error::NotBegun)
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(TAG)?;

        let mut bus = self.bus.active()?.borrow_mut();
        if !bus.is_over_state(State::Begin) {
            bus.begin()?;
        }
        let io = bus.control_panel_handle().ok_or(Error::NotBegun)?;
        drop(bus);

        let device = self.config.full().ok_or(Error::NotInitialized)?;
        let handle = P::new_touch(self.controller, io, device)?;
        self.handle = Some(handle);

        self.lifecycle.advance(State::Begin);
        info!("[{}] {} begun", TAG, self.controller);
        Ok(())
    }
}

impl<P: Platform, B: Bus<Platform = P>> Device for Touch<P, B> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(TAG)?;
        self.bus.resume()?;
        self.config.convert_partial_to_full();
        self.lifecycle.advance(State::Init);
        Ok(())
    }

    fn begin(&mut self) -> Result<(), Error> {
        state::begin_with(self, Self::bring_up)
    }

    /// Delete the touch handle, and the bus too if no other device shares it.
    fn del(&mut self) -> Result<(), Error> {
        if self.lifecycle.state() == State::Deinit {
            return Ok(());
        }

        let mut result = Ok(());
        if let Some(handle) = self.handle.take() {
            if let Err(err) = P::touch_del(handle) {
                error!("[{}] delete touch failed", TAG);
                result = Err(err.into());
            }
        }
        if let Err(err) = self.bus.park() {
            result = result.and(Err(err));
        }

        self.points.clear();
        self.lifecycle.clear();
        result
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl<P: Platform, B: Bus<Platform = P>> Drop for Touch<P, B> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

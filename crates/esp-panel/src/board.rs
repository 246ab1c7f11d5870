//! Whole-board composition.
//!
//! A [`Board`] starts its devices in dependency order: the IO expander first
//! (it may drive reset or power lines of the others), then the LCD, the touch
//! panel and finally the backlight, so the screen lights up only once it shows
//! something. Teardown runs in reverse.

use crate::backlight::Backlight;
use crate::error::Error;
use crate::lcd::Display;
use crate::state::{self, Device, Lifecycle, State};

const TAG: &str = "Board";

/// Placeholder for a device slot the board does not have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDevice;

impl Device for NoDevice {
    fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn begin(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn del(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn state(&self) -> State {
        State::Deinit
    }
}

impl Display for NoDevice {
    fn resolution(&self) -> Option<(u16, u16)> {
        None
    }
}

impl Backlight for NoDevice {
    fn set_brightness(&mut self, _percent: u8) -> Result<(), Error> {
        Ok(())
    }

    fn brightness(&self) -> u8 {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    pub name: &'static str,
    /// Resolution the board's LCD must report.
    pub width: u16,
    pub height: u16,
    /// Brightness applied once everything is started.
    pub brightness: u8,
}

impl BoardConfig {
    pub const fn new(name: &'static str, width: u16, height: u16) -> Self {
        Self { name, width, height, brightness: 100 }
    }
}

pub struct Board<L = NoDevice, T = NoDevice, B = NoDevice, E = NoDevice>
where
    L: Display,
    T: Device,
    B: Backlight,
    E: Device,
{
    config: BoardConfig,
    lcd: Option<L>,
    touch: Option<T>,
    backlight: Option<B>,
    io_expander: Option<E>,
    lifecycle: Lifecycle,
}

impl<L: Display, T: Device, B: Backlight, E: Device> Board<L, T, B, E> {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            config,
            lcd: None,
            touch: None,
            backlight: None,
            io_expander: None,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn with_lcd(mut self, lcd: L) -> Self {
        self.lcd = Some(lcd);
        self
    }

    pub fn with_touch(mut self, touch: T) -> Self {
        self.touch = Some(touch);
        self
    }

    pub fn with_backlight(mut self, backlight: B) -> Self {
        self.backlight = Some(backlight);
        self
    }

    pub fn with_io_expander(mut self, io_expander: E) -> Self {
        self.io_expander = Some(io_expander);
        self
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn lcd(&mut self) -> Option<&mut L> {
        self.lcd.as_mut()
    }

    pub fn touch(&mut self) -> Option<&mut T> {
        self.touch.as_mut()
    }

    pub fn backlight(&mut self) -> Option<&mut B> {
        self.backlight.as_mut()
    }

    pub fn io_expander(&mut self) -> Option<&mut E> {
        self.io_expander.as_mut()
    }

    fn check_resolution(&self) -> Result<(), Error> {
        let expected = (self.config.width, self.config.height);
        match self.lcd.as_ref().and_then(Display::resolution) {
            Some(actual) if actual != expected => {
                error!(
                    "[{}] {} expects a {}x{} LCD, got {}x{}",
                    TAG, self.config.name, expected.0, expected.1, actual.0, actual.1
                );
                Err(Error::InvalidArgument)
            }
            _ => Ok(()),
        }
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(TAG)?;

        begin_device(self.io_expander.as_mut())?;
        begin_device(self.lcd.as_mut())?;
        begin_device(self.touch.as_mut())?;
        if let Some(backlight) = self.backlight.as_mut() {
            begin_device(Some(&mut *backlight))?;
            backlight.set_brightness(self.config.brightness)?;
        }

        self.lifecycle.advance(State::Begin);
        info!("[{}] {} begun", TAG, self.config.name);
        Ok(())
    }
}

fn init_device<D: Device>(device: Option<&mut D>) -> Result<(), Error> {
    match device {
        Some(device) if !device.is_over_state(State::Init) => device.init(),
        _ => Ok(()),
    }
}

fn begin_device<D: Device>(device: Option<&mut D>) -> Result<(), Error> {
    match device {
        Some(device) if !device.is_over_state(State::Begin) => device.begin(),
        _ => Ok(()),
    }
}

fn del_device<D: Device>(device: Option<&mut D>, result: &mut Result<(), Error>) {
    if let Some(device) = device {
        if let Err(err) = device.del() {
            if result.is_ok() {
                *result = Err(err);
            }
        }
    }
}

impl<L: Display, T: Device, B: Backlight, E: Device> Device for Board<L, T, B, E> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(TAG)?;
        self.check_resolution()?;

        init_device(self.io_expander.as_mut())?;
        init_device(self.lcd.as_mut())?;
        init_device(self.touch.as_mut())?;
        init_device(self.backlight.as_mut())?;

        self.lifecycle.advance(State::Init);
        Ok(())
    }

    fn begin(&mut self) -> Result<(), Error> {
        state::begin_with(self, Self::bring_up)
    }

    /// Delete every device in reverse start order, continuing past failures.
    fn del(&mut self) -> Result<(), Error> {
        let mut result = Ok(());

        if let Some(backlight) = self.backlight.as_mut() {
            if backlight.is_over_state(State::Begin) {
                let _ = backlight.off();
            }
        }
        del_device(self.backlight.as_mut(), &mut result);
        del_device(self.touch.as_mut(), &mut result);
        del_device(self.lcd.as_mut(), &mut result);
        del_device(self.io_expander.as_mut(), &mut result);

        if result.is_err() {
            warn!("[{}] {} teardown incomplete", TAG, self.config.name);
        }
        self.lifecycle.clear();
        result
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl<L: Display, T: Device, B: Backlight, E: Device> Drop for Board<L, T, B, E> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

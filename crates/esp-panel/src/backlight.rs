//! Backlight drivers.
//!
//! Brightness is a percentage. A switch backlight is either fully on or off;
//! the LEDC backlight maps the percentage onto its PWM duty.

use core::marker::PhantomData;
use core::ops::RangeInclusive;

use crate::config::{Config, PartialConfig};
use crate::error::Error;
use crate::native::{EspError, Platform};
use crate::state::{self, Device, Lifecycle, State};

pub trait Backlight: Device {
    /// Set the brightness, `0..=100`; larger values are clamped.
    fn set_brightness(&mut self, percent: u8) -> Result<(), Error>;

    /// Last brightness set, in percent.
    fn brightness(&self) -> u8;

    fn on(&mut self) -> Result<(), Error> {
        self.set_brightness(100)
    }

    fn off(&mut self) -> Result<(), Error> {
        self.set_brightness(0)
    }
}

// ---------------------------------------------------------------------------
// GPIO switch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum GpioIntrType {
    #[default]
    Disable = 0,
    PosEdge = 1,
    NegEdge = 2,
    AnyEdge = 3,
}

/// `gpio_config_t` for a plain push-pull output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioOutputConfig {
    pub pin_bit_mask: u64,
    pub pull_up_en: bool,
    pub pull_down_en: bool,
    pub intr_type: GpioIntrType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchGpioConfig {
    pub io_num: i32,
    pub on_level_high: bool,
    pub gpio: GpioOutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchGpioPartial {
    pub io_num: i32,
    pub on_level_high: bool,
}

impl PartialConfig for SwitchGpioPartial {
    type Full = SwitchGpioConfig;

    fn to_full(&self) -> SwitchGpioConfig {
        let pin_bit_mask = u32::try_from(self.io_num)
            .map_or(0, |io| 1u64.checked_shl(io).unwrap_or(0));
        SwitchGpioConfig {
            io_num: self.io_num,
            on_level_high: self.on_level_high,
            gpio: GpioOutputConfig {
                pin_bit_mask,
                pull_up_en: false,
                pull_down_en: false,
                intr_type: GpioIntrType::Disable,
            },
        }
    }
}

/// Backlight switched by one GPIO.
pub struct BacklightSwitchGpio<P: Platform> {
    config: Config<SwitchGpioPartial>,
    lifecycle: Lifecycle,
    brightness: u8,
    _platform: PhantomData<fn() -> P>,
}

impl<P: Platform> BacklightSwitchGpio<P> {
    const TAG: &'static str = "BL-GPIO";

    pub fn new(io_num: i32, on_level_high: bool) -> Self {
        Self::from_config(Config::from_partial(SwitchGpioPartial { io_num, on_level_high }))
    }

    pub fn from_config(config: Config<SwitchGpioPartial>) -> Self {
        Self { config, lifecycle: Lifecycle::new(), brightness: 0, _platform: PhantomData }
    }

    pub fn config(&self) -> &Config<SwitchGpioPartial> {
        &self.config
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(Self::TAG)?;

        let config = *self.config.full_mut();
        P::gpio_output_begin(&config.gpio)?;
        P::gpio_set_level(config.io_num, !config.on_level_high)?;
        self.brightness = 0;

        self.lifecycle.advance(State::Begin);
        Ok(())
    }
}

impl<P: Platform> Device for BacklightSwitchGpio<P> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(Self::TAG)?;
        let config = self.config.full_mut();
        if config.gpio.pin_bit_mask == 0 {
            warn!("[{}] invalid pin {}", Self::TAG, config.io_num);
            return Err(Error::InvalidArgument);
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
            if let Some(config) = self.config.full() {
                if let Err(err) = P::gpio_reset(config.io_num) {
                    error!("[{}] reset pin failed", Self::TAG);
                    result = Err(err.into());
                }
            }
        }
        self.brightness = 0;
        self.lifecycle.clear();
        result
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl<P: Platform> Backlight for BacklightSwitchGpio<P> {
    /// Any non-zero brightness switches the light on.
    fn set_brightness(&mut self, percent: u8) -> Result<(), Error> {
        self.lifecycle.check_begun(Self::TAG)?;
        let config = self.config.full().ok_or(Error::NotInitialized)?;

        let on = percent > 0;
        P::gpio_set_level(config.io_num, on == config.on_level_high)?;
        self.brightness = if on { 100 } else { 0 };
        Ok(())
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }
}

impl<P: Platform> Drop for BacklightSwitchGpio<P> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

// ---------------------------------------------------------------------------
// PWM (LEDC)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum LedcSpeedMode {
    #[default]
    LowSpeed = 0,
    HighSpeed = 1,
}

/// `ledc_timer_config_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedcTimerConfig {
    pub speed_mode: LedcSpeedMode,
    pub duty_resolution: u32,
    pub timer_num: u32,
    pub freq_hz: u32,
}

/// `ledc_channel_config_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedcChannelConfig {
    pub gpio_num: i32,
    pub speed_mode: LedcSpeedMode,
    pub channel: u32,
    pub timer_sel: u32,
    pub duty: u32,
    pub hpoint: i32,
    pub output_invert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedcConfig {
    pub timer: LedcTimerConfig,
    pub channel: LedcChannelConfig,
}

impl LedcConfig {
    /// Duty resolutions the LEDC timer accepts, in bits.
    pub const DUTY_RESOLUTION: RangeInclusive<u32> = 1..=20;

    /// Duty value for `percent` at the configured resolution.
    ///
    /// Resolutions past the hardware limit are clamped to it.
    pub fn duty_for(&self, percent: u8) -> u32 {
        let bits = self.timer.duty_resolution.min(*Self::DUTY_RESOLUTION.end());
        let max = (1u64 << bits) - 1;
        (max * u64::from(percent.min(100)) / 100) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedcPartial {
    pub io_num: i32,
    pub on_level_high: bool,
}

impl PartialConfig for LedcPartial {
    type Full = LedcConfig;

    fn to_full(&self) -> LedcConfig {
        LedcConfig {
            timer: LedcTimerConfig {
                speed_mode: LedcSpeedMode::LowSpeed,
                duty_resolution: 13,
                timer_num: 0,
                freq_hz: 5_000,
            },
            channel: LedcChannelConfig {
                gpio_num: self.io_num,
                speed_mode: LedcSpeedMode::LowSpeed,
                channel: 0,
                timer_sel: 0,
                duty: 0,
                hpoint: 0,
                output_invert: !self.on_level_high,
            },
        }
    }
}

/// PWM-dimmed backlight on an LEDC channel.
pub struct BacklightPwmLedc<P: Platform> {
    config: Config<LedcPartial>,
    lifecycle: Lifecycle,
    brightness: u8,
    _platform: PhantomData<fn() -> P>,
}

impl<P: Platform> BacklightPwmLedc<P> {
    const TAG: &'static str = "BL-LEDC";

    pub fn new(io_num: i32, on_level_high: bool) -> Self {
        Self::from_config(Config::from_partial(LedcPartial { io_num, on_level_high }))
    }

    pub fn from_config(config: Config<LedcPartial>) -> Self {
        Self { config, lifecycle: Lifecycle::new(), brightness: 0, _platform: PhantomData }
    }

    pub fn config(&self) -> &Config<LedcPartial> {
        &self.config
    }

    pub fn config_frequency_hz(&mut self, hz: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, Self::TAG)?;
        self.config.full_mut().timer.freq_hz = hz;
        Ok(())
    }

    pub fn config_duty_resolution(&mut self, bits: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, Self::TAG)?;
        if !LedcConfig::DUTY_RESOLUTION.contains(&bits) {
            return Err(Error::InvalidArgument);
        }
        self.config.full_mut().timer.duty_resolution = bits;
        Ok(())
    }

    pub fn config_channel(&mut self, timer_num: u32, channel: u32) -> Result<(), Error> {
        self.lifecycle.check_mutable(State::Begin, Self::TAG)?;
        let config = self.config.full_mut();
        config.timer.timer_num = timer_num;
        config.channel.timer_sel = timer_num;
        config.channel.channel = channel;
        Ok(())
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        self.lifecycle.check_begin(Self::TAG)?;

        P::ledc_begin(self.config.full_mut())?;
        self.brightness = 0;

        self.lifecycle.advance(State::Begin);
        Ok(())
    }
}

impl<P: Platform> Device for BacklightPwmLedc<P> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(Self::TAG)?;
        let bits = self.config.full_mut().timer.duty_resolution;
        if !LedcConfig::DUTY_RESOLUTION.contains(&bits) {
            warn!("[{}] unsupported duty resolution: {} bits", Self::TAG, bits);
            return Err(Error::InvalidArgument);
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
            if let Some(config) = self.config.full() {
                if let Err(err) = P::ledc_end(config) {
                    error!("[{}] stop channel failed", Self::TAG);
                    result = Err(err.into());
                }
            }
        }
        self.brightness = 0;
        self.lifecycle.clear();
        result
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl<P: Platform> Backlight for BacklightPwmLedc<P> {
    fn set_brightness(&mut self, percent: u8) -> Result<(), Error> {
        self.lifecycle.check_begun(Self::TAG)?;
        let config = self.config.full().ok_or(Error::NotInitialized)?;

        let percent = percent.min(100);
        P::ledc_set_duty(config, config.duty_for(percent))?;
        self.brightness = percent;
        trace!("[{}] brightness {}%", Self::TAG, percent);
        Ok(())
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }
}

impl<P: Platform> Drop for BacklightPwmLedc<P> {
    fn drop(&mut self) {
        if self.lifecycle.state() != State::Deinit {
            let _ = self.del();
        }
    }
}

// ---------------------------------------------------------------------------
// Custom
// ---------------------------------------------------------------------------

/// Backlight driven by a caller closure that receives the percentage.
pub struct BacklightCustom<F: FnMut(u8) -> Result<(), EspError>> {
    set: F,
    lifecycle: Lifecycle,
    brightness: u8,
}

impl<F: FnMut(u8) -> Result<(), EspError>> BacklightCustom<F> {
    const TAG: &'static str = "BL-Custom";

    pub fn new(set: F) -> Self {
        Self { set, lifecycle: Lifecycle::new(), brightness: 0 }
    }
}

impl<F: FnMut(u8) -> Result<(), EspError>> Device for BacklightCustom<F> {
    fn init(&mut self) -> Result<(), Error> {
        self.lifecycle.check_init(Self::TAG)?;
        self.lifecycle.advance(State::Init);
        Ok(())
    }

    fn begin(&mut self) -> Result<(), Error> {
        state::begin_with(self, |bl| {
            bl.lifecycle.check_begin(Self::TAG)?;
            bl.lifecycle.advance(State::Begin);
            Ok(())
        })
    }

    fn del(&mut self) -> Result<(), Error> {
        self.brightness = 0;
        self.lifecycle.clear();
        Ok(())
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl<F: FnMut(u8) -> Result<(), EspError>> Backlight for BacklightCustom<F> {
    fn set_brightness(&mut self, percent: u8) -> Result<(), Error> {
        self.lifecycle.check_begun(Self::TAG)?;
        let percent = percent.min(100);
        (self.set)(percent)?;
        self.brightness = percent;
        Ok(())
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }
}

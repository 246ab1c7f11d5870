mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{calls, clear_calls, count, fail_next, with_state, Call, Mock};
use esp_panel::backlight::{LedcConfig, LedcPartial};
use esp_panel::{
    Backlight, BacklightCustom, BacklightPwmLedc, BacklightSwitchGpio, Config, Device, Error,
    EspError, PartialConfig, State, GPIO_NUM_NC,
};

#[test]
fn scenario_c_begin_after_del_initializes_again() {
    let mut backlight = BacklightPwmLedc::<Mock>::new(45, true);

    backlight.begin().unwrap();
    assert_eq!(backlight.state(), State::Begin);

    backlight.del().unwrap();
    assert_eq!(backlight.state(), State::Deinit);

    backlight.begin().unwrap();
    assert_eq!(backlight.state(), State::Begin);
    assert_eq!(calls(), vec![Call::LedcBegin, Call::LedcEnd, Call::LedcBegin]);
}

#[test]
fn ledc_defaults() {
    let mut backlight = BacklightPwmLedc::<Mock>::new(45, false);
    backlight.begin().unwrap();

    let ledc = with_state(|s| s.last_ledc).unwrap();
    assert_eq!(ledc.timer.duty_resolution, 13);
    assert_eq!(ledc.timer.freq_hz, 5_000);
    assert_eq!(ledc.channel.gpio_num, 45);
    assert!(ledc.channel.output_invert);
}

#[test]
fn ledc_brightness_maps_onto_duty() {
    let mut backlight = BacklightPwmLedc::<Mock>::new(45, true);
    backlight.begin().unwrap();
    clear_calls();

    backlight.set_brightness(50).unwrap();
    backlight.on().unwrap();
    backlight.off().unwrap();
    backlight.set_brightness(250).unwrap();

    assert_eq!(
        calls(),
        vec![Call::LedcDuty(4095), Call::LedcDuty(8191), Call::LedcDuty(0), Call::LedcDuty(8191)]
    );
    assert_eq!(backlight.brightness(), 100);
}

#[test]
fn ledc_setters() {
    let mut backlight = BacklightPwmLedc::<Mock>::new(45, true);
    backlight.config_duty_resolution(10).unwrap();
    backlight.config_frequency_hz(20_000).unwrap();
    backlight.config_channel(1, 3).unwrap();
    assert_eq!(backlight.config_duty_resolution(0), Err(Error::InvalidArgument));
    assert_eq!(backlight.config_duty_resolution(21), Err(Error::InvalidArgument));

    backlight.begin().unwrap();
    let ledc = with_state(|s| s.last_ledc).unwrap();
    assert_eq!(ledc.timer.freq_hz, 20_000);
    assert_eq!((ledc.timer.timer_num, ledc.channel.timer_sel, ledc.channel.channel), (1, 1, 3));

    backlight.set_brightness(100).unwrap();
    assert_eq!(calls().last(), Some(&Call::LedcDuty(1023)));

    assert_eq!(backlight.config_frequency_hz(1_000), Err(Error::ConfigLocked));
}

#[test]
fn brightness_requires_begin() {
    let mut backlight = BacklightPwmLedc::<Mock>::new(45, true);
    assert_eq!(backlight.set_brightness(10), Err(Error::NotBegun));
    backlight.init().unwrap();
    assert_eq!(backlight.on(), Err(Error::NotBegun));
    assert!(calls().is_empty());
}

#[test]
fn ledc_full_config_with_bad_resolution_is_rejected() {
    let mut ledc = LedcPartial { io_num: 45, on_level_high: true }.to_full();
    ledc.timer.duty_resolution = 26;
    let mut backlight = BacklightPwmLedc::<Mock>::from_config(Config::from_full(ledc));

    assert_eq!(backlight.begin(), Err(Error::InvalidArgument));
    assert_eq!(backlight.state(), State::Deinit);
    assert_eq!(backlight.set_brightness(100), Err(Error::NotBegun));
    assert!(calls().is_empty());

    ledc.timer.duty_resolution = 0;
    let mut backlight = BacklightPwmLedc::<Mock>::from_config(Config::from_full(ledc));
    assert_eq!(backlight.init(), Err(Error::InvalidArgument));
}

#[test]
fn ledc_duty_never_overflows() {
    let mut ledc: LedcConfig = LedcPartial { io_num: 45, on_level_high: true }.to_full();
    for bits in [20, 26, 31, 32, 40] {
        ledc.timer.duty_resolution = bits;
        assert_eq!(ledc.duty_for(100), (1 << 20) - 1);
    }
}

#[test]
fn failed_ledc_begin_rolls_back() {
    let mut backlight = BacklightPwmLedc::<Mock>::new(45, true);
    fail_next("ledc_begin");

    assert_eq!(backlight.begin(), Err(Error::Native(EspError::FAIL)));
    assert_eq!(backlight.state(), State::Deinit);
    assert_eq!(count(&Call::LedcEnd), 0);

    backlight.begin().unwrap();
}

#[test]
fn switch_starts_off_and_follows_the_on_level() {
    let mut backlight = BacklightSwitchGpio::<Mock>::new(2, false);

    backlight.begin().unwrap();
    assert_eq!(calls(), vec![Call::GpioBegin(1 << 2), Call::GpioLevel(2, true)]);
    assert_eq!(backlight.brightness(), 0);
    clear_calls();

    backlight.set_brightness(30).unwrap();
    assert_eq!(backlight.brightness(), 100);
    backlight.off().unwrap();
    assert_eq!(backlight.brightness(), 0);
    assert_eq!(calls(), vec![Call::GpioLevel(2, false), Call::GpioLevel(2, true)]);

    backlight.del().unwrap();
    assert_eq!(calls().last(), Some(&Call::GpioReset(2)));
}

#[test]
fn switch_rejects_unconnected_pin() {
    let mut backlight = BacklightSwitchGpio::<Mock>::new(GPIO_NUM_NC, true);

    assert_eq!(backlight.begin(), Err(Error::InvalidArgument));
    assert_eq!(backlight.state(), State::Deinit);
    assert!(calls().is_empty());
}

#[test]
fn switch_del_is_idempotent() {
    let mut backlight = BacklightSwitchGpio::<Mock>::new(4, true);
    backlight.init().unwrap();
    backlight.del().unwrap();
    assert!(calls().is_empty());

    backlight.begin().unwrap();
    backlight.del().unwrap();
    backlight.del().unwrap();
    assert_eq!(count(&Call::GpioReset(4)), 1);
}

#[test]
fn custom_backlight_calls_the_closure() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut backlight = BacklightCustom::new(move |percent| {
        sink.borrow_mut().push(percent);
        Ok(())
    });

    assert_eq!(backlight.set_brightness(10), Err(Error::NotBegun));
    backlight.begin().unwrap();
    backlight.set_brightness(60).unwrap();
    backlight.set_brightness(120).unwrap();
    backlight.off().unwrap();

    assert_eq!(*seen.borrow(), vec![60, 100, 0]);
    assert_eq!(backlight.brightness(), 0);

    backlight.del().unwrap();
    backlight.begin().unwrap();
    assert_eq!(backlight.state(), State::Begin);
}

#[test]
fn custom_backlight_reports_closure_errors() {
    let mut backlight = BacklightCustom::new(|_| Err(EspError::INVALID_STATE));
    backlight.begin().unwrap();

    assert_eq!(backlight.on(), Err(Error::Native(EspError::INVALID_STATE)));
    assert_eq!(backlight.brightness(), 0);
}

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{calls, count, fail_next, set_touch_points, with_state, Call, Mock};
use esp_panel::touch::{TouchFlags, MAX_POINTS};
use esp_panel::{
    Device, Error, EspError, Hosts, I2cBus, Lcd, State, Touch, TouchPoint, GPIO_NUM_NC,
};

const TOUCH_ADDR: u8 = 0x5d;

fn point(x: u16, y: u16) -> TouchPoint {
    TouchPoint { x, y, strength: 40 }
}

fn gt911(hosts: &Hosts<Mock>) -> Touch<Mock, I2cBus<'_, Mock>> {
    let bus = I2cBus::new(&hosts.i2c, 0, 18, 8, TOUCH_ADDR);
    Touch::new("GT911", Rc::new(RefCell::new(bus)), 320, 480)
}

#[test]
fn begin_creates_touch_on_the_control_panel() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);

    touch.begin().unwrap();
    assert_eq!(touch.state(), State::Begin);
    assert!(touch.handle().is_some());
    assert_eq!(
        calls(),
        vec![Call::I2cHostBegin(0), Call::NewIoI2c(0), Call::NewTouch("GT911".into())]
    );

    let dev = with_state(|s| s.last_touch_dev).unwrap();
    assert_eq!((dev.x_max, dev.y_max), (320, 480));
}

#[test]
fn touch_and_lcd_buses_share_the_host() {
    let hosts = Hosts::<Mock>::new();
    let lcd_bus = I2cBus::new(&hosts.i2c, 0, 18, 8, 0x3c);
    let mut lcd = Lcd::new("SSD1306", Rc::new(RefCell::new(lcd_bus)), 128, 64, 1, GPIO_NUM_NC);
    let mut touch = gt911(&hosts);

    lcd.begin().unwrap();
    touch.begin().unwrap();
    assert_eq!(count(&Call::I2cHostBegin(0)), 1);
    assert_eq!(hosts.i2c.user_count(0), 2);

    touch.del().unwrap();
    assert!(hosts.i2c.is_alive(0));
    lcd.del().unwrap();
    assert!(!hosts.i2c.is_alive(0));
}

#[test]
fn configured_orientation_reaches_the_driver() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);
    touch.config_orientation(true, false, true).unwrap();
    touch.config_interrupt_io(3, false).unwrap();

    touch.begin().unwrap();
    let dev = with_state(|s| s.last_touch_dev).unwrap();
    assert_eq!(dev.flags, TouchFlags::SWAP_XY | TouchFlags::MIRROR_Y);
    assert_eq!(dev.int_gpio_num, 3);

    assert_eq!(touch.config_reset_io(4, false), Err(Error::ConfigLocked));
}

#[test]
fn read_points_returns_current_touches() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);
    touch.begin().unwrap();

    set_touch_points(&[point(10, 20), point(300, 470)]);
    let points = touch.read_points().unwrap().to_vec();
    assert_eq!(points, vec![point(10, 20), point(300, 470)]);
    assert_eq!(count(&Call::TouchRead), 1);

    set_touch_points(&[]);
    assert!(touch.read_points().unwrap().is_empty());
}

#[test]
fn read_points_keeps_at_most_max_points() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);
    touch.begin().unwrap();

    let many: Vec<_> = (0..8).map(|i| point(i, i)).collect();
    set_touch_points(&many);
    assert_eq!(touch.read_points().unwrap(), &many[..MAX_POINTS]);
}

#[test]
fn get_points_fills_the_given_buffer() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);
    touch.begin().unwrap();
    set_touch_points(&[point(1, 1), point(2, 2), point(3, 3)]);

    touch.read_raw_data().unwrap();
    let mut buf = [TouchPoint::default(); 2];
    assert_eq!(touch.get_points(&mut buf).unwrap(), 2);
    assert_eq!(buf, [point(1, 1), point(2, 2)]);
}

#[test]
fn domain_ops_require_begin() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);

    assert_eq!(touch.read_raw_data(), Err(Error::NotBegun));
    assert_eq!(touch.read_points().err(), Some(Error::NotBegun));
    touch.init().unwrap();
    assert_eq!(touch.swap_xy(true), Err(Error::NotBegun));
    assert!(calls().is_empty());
}

#[test]
fn orientation_ops_update_the_config() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);
    touch.begin().unwrap();

    touch.swap_xy(true).unwrap();
    assert_eq!(calls().last(), Some(&Call::TouchSwapXy(true)));
    assert!(touch.config().full().unwrap().flags.contains(TouchFlags::SWAP_XY));

    // The mock driver has no mirror support.
    assert_eq!(touch.mirror_x(true), Err(Error::Native(EspError::NOT_SUPPORTED)));
    assert!(!touch.config().full().unwrap().flags.contains(TouchFlags::MIRROR_X));
}

#[test]
fn failed_driver_creation_rolls_back() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);
    fail_next("new_touch");

    assert_eq!(touch.begin(), Err(Error::Native(EspError::FAIL)));
    assert_eq!(touch.state(), State::Deinit);
    assert!(touch.handle().is_none());
    // Sole owner of its bus, so the bus went down too.
    assert!(!hosts.i2c.is_alive(0));

    touch.begin().unwrap();
    assert_eq!(count(&Call::NewTouch("GT911".into())), 1);
}

#[test]
fn failed_rollback_still_reports_the_begin_error() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);
    fail_next("new_touch");
    fail_next("del_panel_io");

    assert_eq!(touch.begin(), Err(Error::Native(EspError::FAIL)));
    assert_eq!(touch.state(), State::Deinit);
    assert_eq!(touch.bus().unwrap().borrow().state(), State::Deinit);
    assert!(!hosts.i2c.is_alive(0));
    assert_eq!(count(&Call::DelIo), 0);

    touch.begin().unwrap();
    assert_eq!(touch.state(), State::Begin);
}

#[test]
fn del_is_idempotent() {
    let hosts = Hosts::<Mock>::new();
    let mut touch = gt911(&hosts);
    touch.begin().unwrap();

    touch.del().unwrap();
    assert_eq!(count(&Call::TouchDel), 1);
    let after_first = calls();
    touch.del().unwrap();
    assert_eq!(calls(), after_first);
    assert_eq!(touch.state(), State::Deinit);
}

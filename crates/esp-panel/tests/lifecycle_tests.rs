mod common;

use common::{fail_next, with_state, Mock};
use esp_panel::{BacklightPwmLedc, Device, Hosts, I2cBus, State};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Init,
    Begin,
    Del,
    FailingBegin,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Init), Just(Op::Begin), Just(Op::Del), Just(Op::FailingBegin)]
}

/// Apply `ops`, checking that the state never drops between `del()` calls
/// and that `del()` always lands in `Deinit`.
fn check_lifecycle<D: Device>(
    device: &mut D,
    ops: &[Op],
    fail_op: &'static str,
) -> Result<(), TestCaseError> {
    let mut last = device.state();
    for op in ops {
        match op {
            Op::Init => {
                let _ = device.init();
            }
            Op::Begin => {
                if device.begin().is_ok() {
                    prop_assert_eq!(device.state(), State::Begin);
                }
            }
            Op::FailingBegin => {
                let before = device.state();
                fail_next(fail_op);
                if device.begin().is_err() {
                    // A failed begin() undoes only what it did itself.
                    prop_assert_eq!(device.state(), before);
                }
                with_state(|s| s.fail.clear());
            }
            Op::Del => {
                prop_assert!(device.del().is_ok());
                prop_assert_eq!(device.state(), State::Deinit);
                prop_assert!(device.del().is_ok());
                prop_assert_eq!(device.state(), State::Deinit);
                last = State::Deinit;
                continue;
            }
        }
        prop_assert!(device.state() >= last);
        last = device.state();
    }
    Ok(())
}

proptest! {
    #[test]
    fn bus_state_is_monotonic_between_deletes(ops in proptest::collection::vec(op(), 1..24)) {
        let hosts = Hosts::<Mock>::new();
        let mut bus = I2cBus::new(&hosts.i2c, 0, 18, 8, 0x3c);
        check_lifecycle(&mut bus, &ops, "new_panel_io_i2c")?;

        bus.del().unwrap();
        prop_assert!(!hosts.i2c.is_alive(0));
    }

    #[test]
    fn backlight_state_is_monotonic_between_deletes(ops in proptest::collection::vec(op(), 1..24)) {
        let mut backlight = BacklightPwmLedc::<Mock>::new(45, true);
        check_lifecycle(&mut backlight, &ops, "ledc_begin")?;
    }
}

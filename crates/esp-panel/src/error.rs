use derive_more::From;
use host_registry::HostError;

use crate::native::EspError;

/// Errors returned by buses, devices and the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, From)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// `init()` called on a device that is already initialized.
    AlreadyInitialized,
    /// `begin()` called on a started device outside the reset path.
    AlreadyBegun,
    /// The device or its configuration has not been initialized yet.
    NotInitialized,
    /// Domain operation on a device that has not been started.
    NotBegun,
    /// The field was already consumed by the native driver.
    ConfigLocked,
    /// A pin, size or config value the hardware cannot take.
    InvalidArgument,
    /// The shared bus was dropped while this device was deleted.
    BusReleased,
    /// Host lookup, calibration or bring-up failed.
    #[from]
    Host(HostError<EspError>),
    /// A vendor SDK call failed.
    #[from]
    Native(EspError),
}

#![no_std]
//! Generic registry for shared peripheral hosts.
//!
//! A *host* is the low-level controller (an I2C port, a SPI bus, a DSI lane
//! group) that several logical devices talk through. The registry keeps at
//! most one live instance per host id, hands out reference-counted handles,
//! rejects requests whose configuration does not match the live host, and
//! tears the host down once the last holder has let go.
//!
//! The native bring-up is deferred: acquiring a handle only records the
//! configuration, and the first holder that calls [`HostHandle::begin`]
//! actually starts the hardware.

mod fmt;

mod error;
mod handle;
mod kind;
mod registry;

pub use error::HostError;
pub use handle::HostHandle;
pub use kind::{Calibrate, HostId, HostKind};
pub use registry::{HostRegistry, Release};

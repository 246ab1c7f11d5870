use crate::error::Error;

/// Lifecycle stage of a bus or device. Ordered: `Deinit < Init < Begin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum State {
    #[default]
    Deinit = 0,
    /// Configuration promoted, shared host acquired.
    Init,
    /// Native handles created, hardware running.
    Begin,
}

/// Common lifecycle of every bus and device.
pub trait Device {
    /// Promote the configuration and acquire shared resources.
    fn init(&mut self) -> Result<(), Error>;

    /// Start the hardware, running [`init`](Device::init) first if needed.
    fn begin(&mut self) -> Result<(), Error>;

    /// Release everything and return to [`State::Deinit`].
    ///
    /// Always ends in `Deinit`, even when a native teardown fails; the first
    /// failure is returned. Calling it again is a no-op.
    fn del(&mut self) -> Result<(), Error>;

    fn state(&self) -> State;

    fn is_over_state(&self, state: State) -> bool {
        self.state() >= state
    }
}

/// State tracking shared by all components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    state: State,
    reset: bool,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self { state: State::Deinit, reset: false }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_over(&self, state: State) -> bool {
        self.state >= state
    }

    /// Set by an LCD reset; lets `begin()` run again on a started panel.
    pub fn is_reset(&self) -> bool {
        self.reset
    }

    pub fn check_init(&self, tag: &str) -> Result<(), Error> {
        if self.is_over(State::Init) {
            warn!("[{}] already initialized", tag);
            return Err(Error::AlreadyInitialized);
        }
        Ok(())
    }

    pub fn check_begin(&self, tag: &str) -> Result<(), Error> {
        if self.is_over(State::Begin) && !self.reset {
            warn!("[{}] already begun", tag);
            return Err(Error::AlreadyBegun);
        }
        Ok(())
    }

    pub fn check_begun(&self, tag: &str) -> Result<(), Error> {
        if !self.is_over(State::Begin) {
            warn!("[{}] not begun", tag);
            return Err(Error::NotBegun);
        }
        Ok(())
    }

    /// Fail if the component already reached `limit`, the state at which the
    /// field being changed is consumed.
    pub fn check_mutable(&self, limit: State, tag: &str) -> Result<(), Error> {
        if self.is_over(limit) {
            warn!("[{}] configuration is locked", tag);
            return Err(Error::ConfigLocked);
        }
        Ok(())
    }

    pub fn advance(&mut self, state: State) {
        self.state = state;
        if state == State::Begin {
            self.reset = false;
        }
    }

    pub fn mark_reset(&mut self) {
        self.reset = true;
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Shared body of `Device::begin`.
///
/// Runs `init()` when the device is below `Init`, then `bring_up`. If
/// `bring_up` fails after an automatic init, the device is deleted again so a
/// failed `begin()` leaves it in `Deinit`.
pub(crate) fn begin_with<D: Device>(
    device: &mut D,
    bring_up: impl FnOnce(&mut D) -> Result<(), Error>,
) -> Result<(), Error> {
    let auto_init = !device.is_over_state(State::Init);
    if auto_init {
        device.init()?;
    }

    let result = bring_up(device);
    if result.is_err() && auto_init {
        if device.del().is_err() {
            warn!("[State] rollback after failed begin is incomplete");
        }
    }
    result
}

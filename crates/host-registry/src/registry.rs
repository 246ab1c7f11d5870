use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicUsize, Ordering};

use crate::error::HostError;
use crate::handle::HostHandle;
use crate::kind::{Calibrate, HostId, HostKind};

/// A live host: its frozen configuration and, once begun, its native handle.
pub(crate) struct Instance<K: HostKind> {
    pub(crate) config: K::Config,
    pub(crate) native: Option<K::Native>,
}

/// Storage for one host id.
pub(crate) struct Slot<M: RawMutex, K: HostKind> {
    pub(crate) instance: Mutex<M, RefCell<Option<Instance<K>>>>,
    /// Number of live [`HostHandle`]s pointing at this slot.
    pub(crate) users: AtomicUsize,
}

impl<M: RawMutex, K: HostKind> Slot<M, K> {
    const fn new() -> Self {
        Self {
            instance: Mutex::new(RefCell::new(None)),
            users: AtomicUsize::new(0),
        }
    }
}

/// Outcome of [`HostRegistry::try_release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Release {
    /// The last holder was gone; the host has been torn down.
    Destroyed,
    /// `n` handles are still alive, nothing was torn down.
    Retained(usize),
    /// There was no host with this id.
    Vacant,
}

/// Fixed-capacity registry of shared hosts of one kind.
///
/// Holds at most one instance per id in `0..N`. The registry has no lock of
/// its own beyond the caller-chosen `M`: use `NoopRawMutex` for a registry
/// owned by a single thread, `CriticalSectionRawMutex` for one in a `static`.
pub struct HostRegistry<M: RawMutex, K: HostKind, const N: usize> {
    slots: [Slot<M, K>; N],
}

impl<M: RawMutex, K: HostKind, const N: usize> HostRegistry<M, K, N> {
    /// Number of host ids this registry can hold.
    pub const CAPACITY: usize = N;

    /// Create an empty registry.
    pub const fn new() -> Self {
        Self { slots: [const { Slot::new() }; N] }
    }

    fn slot(&self, id: HostId) -> Result<&Slot<M, K>, HostError<K::Error>> {
        self.slots.get(id as usize).ok_or_else(|| {
            warn!("[{}] invalid host id {} (capacity {})", K::NAME, id, N);
            HostError::InvalidId { id, capacity: N }
        })
    }

    /// Get a handle to host `id`, creating the instance if it does not exist.
    ///
    /// A live host is never reconfigured: the request is checked with
    /// [`Calibrate::calibrate`] and rejected with
    /// [`HostError::ConfigMismatch`] if it does not fit. Creating an instance
    /// only stores `config`; the hardware starts on [`HostHandle::begin`].
    pub fn acquire(
        &self,
        id: HostId,
        config: &K::Config,
    ) -> Result<HostHandle<'_, M, K>, HostError<K::Error>> {
        let slot = self.slot(id)?;

        slot.instance.lock(|cell| {
            let mut instance = cell.borrow_mut();

            match instance.as_ref() {
                None => {
                    *instance =
                        Some(Instance { config: config.clone(), native: None });
                    debug!("[{}] host {} created", K::NAME, id);
                }
                Some(live) => {
                    if !live.config.calibrate(config) {
                        warn!(
                            "[{}] host {} already running with another configuration",
                            K::NAME,
                            id
                        );
                        return Err(HostError::ConfigMismatch(id));
                    }
                    trace!("[{}] host {} shared", K::NAME, id);
                }
            }

            slot.users.fetch_add(1, Ordering::AcqRel);
            Ok(HostHandle::new(slot, id))
        })
    }

    /// Tear down host `id` if no handle to it is alive.
    ///
    /// Never blocks on other holders: while handles exist this returns
    /// `Ok(Release::Retained(n))` and leaves the host untouched. A failing
    /// native teardown is logged and the slot is cleared anyway.
    pub fn try_release(
        &self,
        id: HostId,
    ) -> Result<Release, HostError<K::Error>> {
        let slot = self.slot(id)?;

        let released = slot.instance.lock(|cell| {
            let mut instance = cell.borrow_mut();
            if instance.is_none() {
                return Release::Vacant;
            }

            let users = slot.users.load(Ordering::Acquire);
            if users > 0 {
                trace!("[{}] host {} kept, {} users", K::NAME, id, users);
                return Release::Retained(users);
            }

            if let Some(Instance { native: Some(native), .. }) = instance.take()
            {
                if K::end(id, native).is_err() {
                    error!("[{}] host {} native teardown failed", K::NAME, id);
                }
            }
            debug!("[{}] host {} released", K::NAME, id);
            Release::Destroyed
        });

        Ok(released)
    }

    /// Number of live handles to host `id` (0 for an invalid id).
    pub fn user_count(&self, id: HostId) -> usize {
        self.slots
            .get(id as usize)
            .map_or(0, |slot| slot.users.load(Ordering::Relaxed))
    }

    /// Returns `true` if an instance exists for host `id`.
    pub fn is_alive(&self, id: HostId) -> bool {
        self.slots.get(id as usize).is_some_and(|slot| {
            slot.instance.lock(|cell| cell.borrow().is_some())
        })
    }

    /// Returns `true` if host `id` exists and its hardware has been started.
    pub fn is_begun(&self, id: HostId) -> bool {
        self.slots.get(id as usize).is_some_and(|slot| {
            slot.instance.lock(|cell| {
                cell.borrow()
                    .as_ref()
                    .is_some_and(|instance| instance.native.is_some())
            })
        })
    }
}

impl<M: RawMutex, K: HostKind, const N: usize> Default
    for HostRegistry<M, K, N>
{
    fn default() -> Self {
        Self::new()
    }
}

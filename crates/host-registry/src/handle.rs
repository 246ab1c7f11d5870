use embassy_sync::blocking_mutex::raw::RawMutex;
use portable_atomic::Ordering;

use crate::error::HostError;
use crate::kind::{HostId, HostKind};
use crate::registry::{Instance, Slot};

/// RAII handle providing shared ownership of a registered host.
///
/// Cloning a handle adds a holder, dropping one removes it. Dropping the last
/// handle does **not** tear the host down; call
/// [`HostRegistry::try_release`](crate::HostRegistry::try_release) for that.
pub struct HostHandle<'a, M: RawMutex, K: HostKind> {
    slot: &'a Slot<M, K>,
    id: HostId,
}

impl<'a, M: RawMutex, K: HostKind> HostHandle<'a, M, K> {
    /// Create a new handle. Only called by `HostRegistry` after the user
    /// count has been bumped.
    pub(crate) fn new(slot: &'a Slot<M, K>, id: HostId) -> Self {
        Self { slot, id }
    }

    fn with_instance<R>(&self, f: impl FnOnce(&mut Instance<K>) -> R) -> R {
        self.slot.instance.lock(|cell| {
            let mut instance = cell.borrow_mut();
            // `try_release` refuses to clear the slot while users > 0, and
            // this handle is one of them.
            let Some(instance) = instance.as_mut() else {
                unreachable!("host handle outlived its instance")
            };
            f(instance)
        })
    }

    /// Id of the host within its kind.
    pub fn id(&self) -> HostId {
        self.id
    }

    /// Start the host hardware if no holder has done so yet.
    ///
    /// Only the first successful call runs [`HostKind::begin`]; later calls
    /// return the stored native handle. On failure the host stays not-begun
    /// and a later call retries.
    pub fn begin(&self) -> Result<K::Native, HostError<K::Error>> {
        let id = self.id;
        self.with_instance(|instance| {
            if let Some(native) = instance.native {
                return Ok(native);
            }

            let native =
                K::begin(id, &instance.config).map_err(HostError::Native)?;
            instance.native = Some(native);
            debug!("[{}] host {} begun", K::NAME, id);
            Ok(native)
        })
    }

    /// Returns `true` once the host hardware has been started.
    pub fn is_begun(&self) -> bool {
        self.with_instance(|instance| instance.native.is_some())
    }

    /// Native handle of the host, if it has been begun.
    pub fn native(&self) -> Option<K::Native> {
        self.with_instance(|instance| instance.native)
    }

    /// Copy of the configuration the host was created with.
    pub fn config(&self) -> K::Config {
        self.with_instance(|instance| instance.config.clone())
    }

    /// Number of live handles to this host, including `self`.
    pub fn user_count(&self) -> usize {
        self.slot.users.load(Ordering::Relaxed)
    }
}

impl<M: RawMutex, K: HostKind> Clone for HostHandle<'_, M, K> {
    fn clone(&self) -> Self {
        self.slot.users.fetch_add(1, Ordering::AcqRel);
        Self { slot: self.slot, id: self.id }
    }
}

impl<M: RawMutex, K: HostKind> Drop for HostHandle<'_, M, K> {
    fn drop(&mut self) {
        self.slot.users.fetch_sub(1, Ordering::Release);
    }
}

impl<M: RawMutex, K: HostKind> core::fmt::Debug for HostHandle<'_, M, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostHandle")
            .field("kind", &K::NAME)
            .field("id", &self.id)
            .finish()
    }
}

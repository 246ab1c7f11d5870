use crate::kind::HostId;

/// Errors returned by [`HostRegistry`](crate::HostRegistry) and
/// [`HostHandle`](crate::HostHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostError<E: core::fmt::Debug> {
    /// The id is outside `0..capacity` for this host kind.
    InvalidId { id: HostId, capacity: usize },
    /// A host with this id is already live with a different configuration.
    ConfigMismatch(HostId),
    /// The native bring-up of the host failed.
    Native(E),
}

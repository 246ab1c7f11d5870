/// Index of a host within its kind (I2C port number, SPI host number, ...).
pub type HostId = u8;

/// Describes one kind of shared host and how to bring it up and down.
///
/// Implementors are zero-sized markers; the registry never holds a value of
/// the kind itself, only its [`Config`](Self::Config) and
/// [`Native`](Self::Native) handle.
pub trait HostKind {
    /// Fully-resolved configuration required to start the host.
    type Config: Calibrate + Clone;
    /// Native handle produced by a successful bring-up.
    type Native: Copy;
    /// Error type of the native bring-up/teardown routines.
    type Error: core::fmt::Debug;

    /// Tag used in diagnostics, e.g. `"I2C"`.
    const NAME: &'static str;

    /// Start the hardware for host `id`.
    fn begin(id: HostId, config: &Self::Config) -> Result<Self::Native, Self::Error>;

    /// Stop the hardware for host `id`.
    fn end(id: HostId, native: Self::Native) -> Result<(), Self::Error>;
}

/// Decides whether a requested configuration may share an already-live host.
///
/// This is the per-kind strategy behind host sharing: the live configuration
/// is never modified, a request either matches it or is rejected. Implementors
/// compare the fields that matter for the hardware and log both sides of any
/// mismatch.
pub trait Calibrate {
    /// Returns `true` when a host running with `self` can serve `requested`.
    fn calibrate(&self, requested: &Self) -> bool;
}

//! Two-phase configuration.
//!
//! Callers fill in a sparse *partial* struct; the component promotes it to the
//! *full* struct (the native driver's parameter layout) when it initializes.

use core::fmt;

/// A caller-facing configuration that can be promoted to a native one.
pub trait PartialConfig {
    /// Native-layout configuration.
    type Full: Clone + PartialEq + fmt::Debug;

    /// Fill in defaults and derived fields. Must not have side effects.
    fn to_full(&self) -> Self::Full;
}

/// Either the partial or the promoted form of a configuration.
///
/// Promotion is one-way: once full, a `Config` stays full.
pub enum Config<P: PartialConfig> {
    Partial(P),
    Full(P::Full),
}

impl<P: PartialConfig> Config<P> {
    pub const fn from_partial(partial: P) -> Self {
        Self::Partial(partial)
    }

    pub const fn from_full(full: P::Full) -> Self {
        Self::Full(full)
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    pub fn partial(&self) -> Option<&P> {
        match self {
            Self::Partial(partial) => Some(partial),
            Self::Full(_) => None,
        }
    }

    /// The full form, or `None` while the config is still partial.
    pub fn full(&self) -> Option<&P::Full> {
        match self {
            Self::Partial(_) => None,
            Self::Full(full) => Some(full),
        }
    }

    /// The full form of this config, without mutating it.
    pub fn promoted(&self) -> P::Full {
        match self {
            Self::Partial(partial) => partial.to_full(),
            Self::Full(full) => full.clone(),
        }
    }

    /// Promote in place. A no-op on a full config.
    pub fn convert_partial_to_full(&mut self) {
        if let Self::Partial(partial) = self {
            let full = partial.to_full();
            *self = Self::Full(full);
        }
    }

    /// Promote in place and return the full form for editing.
    pub fn full_mut(&mut self) -> &mut P::Full {
        self.convert_partial_to_full();
        match self {
            Self::Full(full) => full,
            Self::Partial(_) => unreachable!("config promoted above"),
        }
    }

    pub fn into_full(self) -> P::Full {
        match self {
            Self::Partial(partial) => partial.to_full(),
            Self::Full(full) => full,
        }
    }
}

impl<P: PartialConfig> From<P> for Config<P> {
    fn from(partial: P) -> Self {
        Self::Partial(partial)
    }
}

impl<P: PartialConfig + Clone> Clone for Config<P> {
    fn clone(&self) -> Self {
        match self {
            Self::Partial(partial) => Self::Partial(partial.clone()),
            Self::Full(full) => Self::Full(full.clone()),
        }
    }
}

impl<P: PartialConfig + PartialEq> PartialEq for Config<P> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Partial(a), Self::Partial(b)) => a == b,
            (Self::Full(a), Self::Full(b)) => a == b,
            _ => false,
        }
    }
}

impl<P: PartialConfig + fmt::Debug> fmt::Debug for Config<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial(partial) => f.debug_tuple("Partial").field(partial).finish(),
            Self::Full(full) => f.debug_tuple("Full").field(full).finish(),
        }
    }
}

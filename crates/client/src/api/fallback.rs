//! Provenance for values that may be synthetic.

/// Synthetic data returned in place of a live response.
#[derive(Debug, Clone, PartialEq)]
pub struct Fallback<T> {
    /// The substitute value.
    pub value: T,
    /// Why the live value was unavailable (for logs, not for users).
    pub reason: String,
}

impl<T> Fallback<T> {
    pub fn new(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            reason: reason.into(),
        }
    }

    /// Transform the substitute value, keeping the reason.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fallback<U> {
        Fallback {
            value: f(self.value),
            reason: self.reason,
        }
    }
}

/// A live value (`Ok`) or a fallback (`Err`). Both arms are usable.
pub type Degradable<T> = Result<T, Fallback<T>>;

/// Accessors that treat both arms of a [`Degradable`] alike.
pub trait DegradableExt<T> {
    /// The value, whichever arm it came from.
    fn into_value(self) -> T;

    /// Borrow the value, whichever arm it came from.
    fn value(&self) -> &T;

    /// Whether the value is synthetic.
    fn is_fallback(&self) -> bool;

    /// Transform the value, preserving provenance.
    fn map_value<U>(self, f: impl FnOnce(T) -> U) -> Degradable<U>;
}

impl<T> DegradableExt<T> for Degradable<T> {
    fn into_value(self) -> T {
        match self {
            Ok(value) | Err(Fallback { value, .. }) => value,
        }
    }

    fn value(&self) -> &T {
        match self {
            Ok(value) | Err(Fallback { value, .. }) => value,
        }
    }

    fn is_fallback(&self) -> bool {
        self.is_err()
    }

    fn map_value<U>(self, f: impl FnOnce(T) -> U) -> Degradable<U> {
        match self {
            Ok(value) => Ok(f(value)),
            Err(fallback) => Err(fallback.map(f)),
        }
    }
}

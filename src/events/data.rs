//! Generic payload wrapper.

/// Wraps a single value as an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DataEventArgs<T> {
    value: T,
}

impl<T> DataEventArgs<T> {
    /// Wraps `value`.
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Borrows the wrapped value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Unwraps the value.
    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T> From<T> for DataEventArgs<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

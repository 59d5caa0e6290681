//! Reactive properties with change detection.
//!
//! A [`Property<T>`] wraps a value and detects changes. When `set()` is
//! called, it compares the new value with the current one and returns whether
//! the value actually changed; the caller emits the paired notification
//! signal when it did. This keeps change notification explicit and avoids
//! spurious emissions.
//!
//! ```
//! use trellis_core::{Property, Signal};
//!
//! struct Counter {
//!     value: Property<i32>,
//!     value_changed: Signal<i32>,
//! }
//!
//! impl Counter {
//!     fn set_value(&self, new_value: i32) {
//!         if self.value.set(new_value) {
//!             self.value_changed.emit(new_value);
//!         }
//!     }
//! }
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A reactive property that tracks changes.
///
/// # Thread Safety
///
/// `Property<T>` uses interior mutability with `RwLock` and is `Send + Sync`
/// when `T` is.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, consider using `with()` instead.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change detection.
    ///
    /// Useful during initialization or batch updates where notifications
    /// are deferred.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    ///
    /// The caller should emit the associated notification signal when this
    /// returns `true`.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            let old = std::mem::replace(&mut *current, value);
            Some(old)
        } else {
            None
        }
    }
}

impl<T: Clone> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

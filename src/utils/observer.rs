//! Observable values
//!
//! Player properties are published through [`Observable`]. Setting a value
//! notifies every live subscriber on the calling thread; dropping the
//! [`Subscription`] returned by [`Observable::subscribe`] unsubscribes.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A value with change notification
pub struct Observable<T> {
    value: RwLock<T>,
    subscribers: Mutex<Vec<(u64, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new observable holding `value`
    pub fn new(value: T) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(value),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// Get a copy of the current value
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Set the value and notify subscribers if it changed
    ///
    /// Returns whether the value changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        {
            let mut current = self.value.write();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.notify(&value);
        true
    }

    /// Set the value and always notify subscribers
    pub fn set_always(&self, value: T) {
        *self.value.write() = value.clone();
        self.notify(&value);
    }

    /// Subscribe to value changes
    ///
    /// The callback is not invoked with the current value. The subscription
    /// lasts until the returned handle is dropped.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((id, Arc::new(callback)));

        let observable: Weak<Self> = Arc::downgrade(self);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(observable) = observable.upgrade() {
                    observable.subscribers.lock().retain(|(sub_id, _)| *sub_id != id);
                }
            })),
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn notify(&self, value: &T) {
        // Callbacks may subscribe or set other observables; don't hold the lock.
        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.value.read())
            .finish()
    }
}

/// Subscription handle, unsubscribes on drop
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_set_if_changed_notifies_once() {
        let value = Observable::new(1);
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let _sub = value.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(value.set_if_changed(2));
        assert!(!value.set_if_changed(2));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(value.get(), 2);

        value.set_always(2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let value = Observable::new(String::from("a"));
        let sub = value.subscribe(|_| {});
        assert_eq!(value.subscriber_count(), 1);
        drop(sub);
        assert_eq!(value.subscriber_count(), 0);
    }

    #[test]
    fn test_subscription_outlives_observable() {
        let value = Observable::new(0u8);
        let sub = value.subscribe(|_| {});
        drop(value);
        drop(sub);
    }
}

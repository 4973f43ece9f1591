//! Candle change notification.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use candela_types::Candle;
use parking_lot::RwLock;

/// Callback invoked with every created or updated candle.
pub type Observer = Arc<dyn Fn(&Candle) + Send + Sync>;

/// Handle identifying a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Ordered list of independent observers.
///
/// Observers are called synchronously, in registration order, outside of
/// any chart lock. An observer must not call back into the chart that is
/// notifying it.
#[derive(Default)]
pub struct Notifier {
    observers: RwLock<Vec<(ObserverId, Observer)>>,
    next_id: AtomicU64,
}

impl Notifier {
    /// Creates a notifier with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer and returns its handle.
    pub fn register<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Candle) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Calls every observer with `candle`.
    pub fn notify(&self, candle: &Candle) {
        let observers: Vec<Observer> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(candle);
        }
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns true if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    fn candle() -> Candle {
        Candle::new(Utc.with_ymd_and_hms(2023, 7, 27, 10, 1, 0).unwrap(), dec!(12), 1).unwrap()
    }

    #[test]
    fn test_observers_called_in_order() {
        let notifier = Notifier::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let calls = Arc::clone(&calls);
            notifier.register(move |_| calls.lock().push(name));
        }
        notifier.notify(&candle());

        assert_eq!(*calls.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_unregister() {
        let notifier = Notifier::new();
        let calls = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&calls);
        let id = notifier.register(move |_| *counter.lock() += 1);
        assert_eq!(notifier.len(), 1);

        assert!(notifier.unregister(id));
        assert!(!notifier.unregister(id));
        notifier.notify(&candle());

        assert_eq!(*calls.lock(), 0);
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_observer_may_unregister_itself() {
        let notifier = Arc::new(Notifier::new());
        let slot = Arc::new(Mutex::new(None));

        let inner = Arc::clone(&notifier);
        let own_id = Arc::clone(&slot);
        let id = notifier.register(move |_| {
            if let Some(id) = own_id.lock().take() {
                inner.unregister(id);
            }
        });
        *slot.lock() = Some(id);

        notifier.notify(&candle());
        assert!(notifier.is_empty());
    }
}

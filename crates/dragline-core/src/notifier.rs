//! Callback registration with scoped disconnection.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Listener<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// A list of callbacks interested in events of type `T`.
///
/// Each notifier is owned by the component that emits the events; there is no
/// global registry. Listeners stay connected for as long as the returned
/// [`Subscription`] lives.
pub struct Notifier<T: 'static> {
    inner: Rc<RefCell<Listeners<T>>>,
}

impl<T: 'static> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Notifier<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a callback. Dropping the returned guard disconnects it.
    #[must_use = "dropping the subscription disconnects the listener immediately"]
    pub fn subscribe(&self, listener: impl FnMut(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            let listener: Listener<T> = Rc::new(RefCell::new(listener));
            inner.entries.push((id, listener));
            id
        };

        let weak: Weak<RefCell<Listeners<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            disconnect: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Call every connected listener in subscription order.
    ///
    /// Listeners may subscribe or unsubscribe while being notified. A listener
    /// that (indirectly) triggers a notification of itself is not re-entered.
    pub fn notify(&self, event: &T) {
        let snapshot: Vec<(u64, Listener<T>)> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            let connected = self.inner.borrow().entries.iter().any(|(entry, _)| *entry == id);
            if !connected {
                continue;
            }
            if let Ok(mut callback) = listener.try_borrow_mut() {
                callback(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

/// Guard returned by [`Notifier::subscribe`].
pub struct Subscription {
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Disconnect now instead of at the end of the scope.
    pub fn unsubscribe(mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}

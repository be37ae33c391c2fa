use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::Hash;

/// A set of pending keys with a completion callback that fires exactly once,
/// when the set transitions to empty.
pub struct WaitSet<K> {
    pending: HashSet<K>,
    on_empty: Option<Box<dyn FnOnce() + Send>>,
}

impl<K: Eq + Hash> WaitSet<K> {
    pub fn new<F>(on_empty: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            pending: HashSet::new(),
            on_empty: Some(Box::new(on_empty)),
        }
    }

    /// Returns false if the key was already pending.
    pub fn add(&mut self, key: K) -> bool {
        self.pending.insert(key)
    }

    /// Removing an absent key is a no-op. Removing the last key fires the
    /// callback.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let removed = self.pending.remove(key);
        if removed {
            self.notify_all();
        }
        removed
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.pending.contains(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_fired(&self) -> bool {
        self.on_empty.is_none()
    }

    /// Fire the callback if the set is empty and it has not fired yet.
    /// Needed for a set that never had keys.
    pub fn notify_all(&mut self) -> bool {
        if !self.pending.is_empty() {
            return false;
        }
        match self.on_empty.take() {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }
}

impl<K: std::fmt::Debug> std::fmt::Debug for WaitSet<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitSet")
            .field("pending", &self.pending)
            .field("fired", &self.on_empty.is_none())
            .finish()
    }
}

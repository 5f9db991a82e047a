use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use kurbo::Size;

type Listener = Rc<dyn Fn(Size)>;

struct Entry {
    generation: u64,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    next_generation: u64,
    entries: BTreeMap<String, Entry>,
}

/// Process-wide resize fan-out with at most one listener per surface key.
///
/// Subscribing again under a key replaces the previous listener, so repeated
/// activations of the same surface never stack up re-routing work.
#[derive(Clone, Default)]
pub struct ResizeHub {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for ResizeHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeHub")
            .field("listeners", &self.keys())
            .finish()
    }
}

impl ResizeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, key: impl Into<String>, listener: impl Fn(Size) + 'static) -> Subscription {
        let key = key.into();
        let mut registry = self.registry.borrow_mut();
        registry.next_generation += 1;
        let generation = registry.next_generation;
        let replaced = registry
            .entries
            .insert(
                key.clone(),
                Entry {
                    generation,
                    listener: Rc::new(listener),
                },
            )
            .is_some();
        if replaced {
            tracing::debug!(surface = %key, "resize listener replaced");
        }
        Subscription {
            registry: Rc::downgrade(&self.registry),
            key,
            generation,
        }
    }

    /// Call every listener once with the new host size. Listeners may
    /// subscribe or unsubscribe while being notified.
    pub fn notify(&self, size: Size) -> usize {
        let listeners: Vec<Listener> = self
            .registry
            .borrow()
            .entries
            .values()
            .map(|entry| Rc::clone(&entry.listener))
            .collect();
        for listener in &listeners {
            listener(size);
        }
        listeners.len()
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_subscribed(&self, key: &str) -> bool {
        self.registry.borrow().entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.registry.borrow().entries.keys().cloned().collect()
    }
}

/// Keeps a resize listener alive; dropping it unsubscribes. A subscription
/// that was replaced by a newer one for the same key is inert.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    key: String,
    generation: u64,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry
                .borrow()
                .entries
                .get(&self.key)
                .is_some_and(|entry| entry.generation == self.generation)
        })
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let Ok(mut registry) = registry.try_borrow_mut() else {
            tracing::warn!(surface = %self.key, "resize registry busy; listener left in place");
            return;
        };
        let current = registry
            .entries
            .get(&self.key)
            .is_some_and(|entry| entry.generation == self.generation);
        if current {
            registry.entries.remove(&self.key);
        }
    }
}

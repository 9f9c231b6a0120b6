//! Typed, scoped, observable key/value store shared across ticks.
//!
//! The blackboard is the context object handed to every node tick and state
//! callback. Values are stored type-erased; `get` with a mismatched type
//! returns `None` rather than failing. A single mutex guards all mutation,
//! and the lock is released before any observer callback runs so observers
//! may re-enter the store without deadlocking.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Value = Arc<dyn Any + Send + Sync>;
type ObserverFn = dyn Fn(&BlackboardEvent) + Send + Sync;

/// Events delivered to the blackboard observer, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlackboardEvent {
    /// A key was written.
    Set { key: String },
    /// A key was read; `hit` is false on a missing key or a type mismatch.
    Get { key: String, hit: bool },
    /// A key was removed.
    Remove { key: String },
    /// The store was cleared.
    Clear,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Value>,
    // One undo map per live scope: key -> binding before the scope first
    // touched it (None = key was absent).
    scopes: Vec<HashMap<String, Option<Value>>>,
    observer: Option<Arc<ObserverFn>>,
}

impl Inner {
    /// Record the current binding of `key` in the innermost scope, first
    /// touch only.
    fn shadow(&mut self, key: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            if !scope.contains_key(key) {
                scope.insert(key.to_string(), self.data.get(key).cloned());
            }
        }
    }
}

/// Concurrent mapping from string keys to type-erased values, with scoped
/// overlays and an optional observer hook.
///
/// Cloning a `Blackboard` yields another handle to the same store.
#[derive(Clone, Default)]
pub struct Blackboard {
    inner: Arc<Mutex<Inner>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, tagged with its runtime type.
    pub fn set<T: Clone + Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        let observer = {
            let mut inner = self.inner.lock();
            inner.shadow(&key);
            inner.data.insert(key.clone(), Arc::new(value));
            inner.observer.clone()
        };
        if let Some(observer) = observer {
            observer(&BlackboardEvent::Set { key });
        }
    }

    /// Read the value under `key` as a `T`.
    ///
    /// Returns `None` when the key is missing *or* holds a different type.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
        let (result, observer) = {
            let inner = self.inner.lock();
            let result = inner
                .data
                .get(key)
                .and_then(|value| value.downcast_ref::<T>().cloned());
            (result, inner.observer.clone())
        };
        if let Some(observer) = observer {
            observer(&BlackboardEvent::Get {
                key: key.to_string(),
                hit: result.is_some(),
            });
        }
        result
    }

    /// True when `key` is present, regardless of its type.
    pub fn has(&self, key: &str) -> bool {
        self.inner.lock().data.contains_key(key)
    }

    pub fn remove(&self, key: &str) {
        let observer = {
            let mut inner = self.inner.lock();
            inner.shadow(key);
            inner.data.remove(key);
            inner.observer.clone()
        };
        if let Some(observer) = observer {
            observer(&BlackboardEvent::Remove {
                key: key.to_string(),
            });
        }
    }

    pub fn clear(&self) {
        let observer = {
            let mut inner = self.inner.lock();
            let keys: Vec<String> = inner.data.keys().cloned().collect();
            for key in keys {
                inner.shadow(&key);
            }
            inner.data.clear();
            inner.observer.clone()
        };
        if let Some(observer) = observer {
            observer(&BlackboardEvent::Clear);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().data.is_empty()
    }

    /// Push a scope. While the returned guard lives, writes shadow outer
    /// bindings; releasing the guard restores the prior binding of exactly
    /// the keys this scope touched. Scopes nest; a guard released out of
    /// order also unwinds any scopes pushed after it.
    ///
    /// Scope push/pop is not a cross-thread protocol: the thread that pushed
    /// a scope is the one that releases it.
    pub fn push_scope(&self) -> ScopeGuard {
        let depth = {
            let mut inner = self.inner.lock();
            inner.scopes.push(HashMap::new());
            inner.scopes.len()
        };
        ScopeGuard {
            inner: Arc::clone(&self.inner),
            depth,
            released: false,
        }
    }

    /// Install an observer receiving [`BlackboardEvent`]s in issue order.
    ///
    /// The internal lock is released before the callback is invoked, so the
    /// observer may call back into the blackboard.
    pub fn set_observer<F>(&self, observer: F)
    where
        F: Fn(&BlackboardEvent) + Send + Sync + 'static,
    {
        self.inner.lock().observer = Some(Arc::new(observer));
    }

    pub fn clear_observer(&self) {
        self.inner.lock().observer = None;
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Blackboard")
            .field("len", &inner.data.len())
            .field("scopes", &inner.scopes.len())
            .finish()
    }
}

/// Guard returned by [`Blackboard::push_scope`]. Restores shadowed bindings
/// when released or dropped.
pub struct ScopeGuard {
    inner: Arc<Mutex<Inner>>,
    depth: usize,
    released: bool,
}

impl ScopeGuard {
    /// Restore shadowed bindings now instead of at drop.
    pub fn release(mut self) {
        self.unwind();
    }

    fn unwind(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut inner = self.inner.lock();
        while inner.scopes.len() >= self.depth {
            let scope = match inner.scopes.pop() {
                Some(scope) => scope,
                None => break,
            };
            for (key, prior) in scope {
                match prior {
                    Some(value) => {
                        inner.data.insert(key, value);
                    }
                    None => {
                        inner.data.remove(&key);
                    }
                }
            }
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.unwind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    #[test]
    fn set_then_get_round_trips() {
        let bb = Blackboard::new();
        bb.set("count", 42_i64);
        bb.set("name", "scout".to_string());
        assert_eq!(bb.get::<i64>("count"), Some(42));
        assert_eq!(bb.get::<String>("name"), Some("scout".to_string()));
    }

    #[test]
    fn type_mismatch_reads_absent() {
        let bb = Blackboard::new();
        bb.set("count", 42_i64);
        assert_eq!(bb.get::<String>("count"), None);
        assert_eq!(bb.get::<f64>("count"), None);
        // The key is still there with its original type.
        assert!(bb.has("count"));
        assert_eq!(bb.get::<i64>("count"), Some(42));
    }

    #[test]
    fn missing_key_reads_absent() {
        let bb = Blackboard::new();
        assert_eq!(bb.get::<i64>("nope"), None);
        assert!(!bb.has("nope"));
    }

    #[test]
    fn remove_and_clear() {
        let bb = Blackboard::new();
        bb.set("a", 1_i32);
        bb.set("b", 2_i32);
        bb.remove("a");
        assert!(!bb.has("a"));
        assert!(bb.has("b"));
        bb.clear();
        assert!(bb.is_empty());
    }

    #[test]
    fn scope_restores_only_touched_keys() {
        let bb = Blackboard::new();
        bb.set("shared", 1_i32);
        bb.set("untouched", 7_i32);

        let scope = bb.push_scope();
        bb.set("shared", 2_i32);
        bb.set("inner_only", 99_i32);
        assert_eq!(bb.get::<i32>("shared"), Some(2));
        scope.release();

        assert_eq!(bb.get::<i32>("shared"), Some(1));
        assert_eq!(bb.get::<i32>("untouched"), Some(7));
        assert_eq!(bb.get::<i32>("inner_only"), None);
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let bb = Blackboard::new();
        bb.set("k", 1_i32);

        let outer = bb.push_scope();
        bb.set("k", 2_i32);
        {
            let inner = bb.push_scope();
            bb.set("k", 3_i32);
            assert_eq!(bb.get::<i32>("k"), Some(3));
            inner.release();
        }
        assert_eq!(bb.get::<i32>("k"), Some(2));
        outer.release();
        assert_eq!(bb.get::<i32>("k"), Some(1));
    }

    #[test]
    fn dropping_outer_guard_unwinds_inner_scopes_too() {
        let bb = Blackboard::new();
        bb.set("k", 1_i32);
        let outer = bb.push_scope();
        let _inner = bb.push_scope();
        bb.set("k", 3_i32);
        // Releasing the outer guard unwinds the inner scope as well.
        outer.release();
        assert_eq!(bb.get::<i32>("k"), Some(1));
    }

    #[test]
    fn scope_restores_removed_keys() {
        let bb = Blackboard::new();
        bb.set("k", 5_i32);
        {
            let _scope = bb.push_scope();
            bb.remove("k");
            assert!(!bb.has("k"));
        }
        assert_eq!(bb.get::<i32>("k"), Some(5));
    }

    #[test]
    fn observer_sees_events_in_issue_order() {
        let bb = Blackboard::new();
        let events = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        bb.set_observer(move |event| sink.lock().push(event.clone()));

        bb.set("key", 42_i32);
        let _ = bb.get::<i32>("key");
        let _ = bb.get::<i32>("missing");
        bb.remove("key");
        bb.clear();

        let events = events.lock();
        assert_eq!(
            events[0],
            BlackboardEvent::Set {
                key: "key".to_string()
            }
        );
        assert_eq!(
            events[1],
            BlackboardEvent::Get {
                key: "key".to_string(),
                hit: true
            }
        );
        assert_eq!(
            events[2],
            BlackboardEvent::Get {
                key: "missing".to_string(),
                hit: false
            }
        );
        assert_eq!(
            events[3],
            BlackboardEvent::Remove {
                key: "key".to_string()
            }
        );
        assert_eq!(events[4], BlackboardEvent::Clear);
    }

    #[test]
    fn observer_may_reenter_the_store() {
        let bb = Blackboard::new();
        let probe = bb.clone();
        bb.set_observer(move |event| {
            if matches!(event, BlackboardEvent::Set { key } if key == "trigger") {
                // Reads from within the observer must not deadlock.
                let _ = probe.has("trigger");
            }
        });
        bb.set("trigger", 1_i32);
        assert!(bb.has("trigger"));
    }

    #[test]
    fn clones_share_state() {
        let bb = Blackboard::new();
        let other = bb.clone();
        bb.set("k", 10_i32);
        assert_eq!(other.get::<i32>("k"), Some(10));
    }
}

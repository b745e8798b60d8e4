//! Storage lifecycle hook invocation.
//!
//! After an entity is retrieved (from cache or store) or written to the
//! cache, it gets a chance to emit a diagnostic note through its optional
//! [`StorageHooks`] capability. Notes go to a [`LifecycleSink`]; nothing
//! here affects the retrieval outcome, and a failing hook is reported to
//! the sink rather than propagated.

use std::sync::Arc;
use tracing::{error, info, warn};
use warden_core::{CacheableEntity, EntitySource, StorageHooks};

/// Severity of a lifecycle note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleLevel {
    Info,
    Warning,
    Error,
}

/// Sink for lifecycle notes emitted around retrieval and cache storage.
///
/// Implementations must not fail; anything that can go wrong belongs inside
/// the implementation, not on the caller.
pub trait LifecycleSink: Send + Sync {
    fn record(&self, level: LifecycleLevel, note: &str, origin: Option<&str>, is_automatic: bool);
}

/// Default sink forwarding notes to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LifecycleSink for TracingSink {
    fn record(&self, level: LifecycleLevel, note: &str, origin: Option<&str>, is_automatic: bool) {
        match level {
            LifecycleLevel::Info => info!(origin, is_automatic, "{note}"),
            LifecycleLevel::Warning => warn!(origin, is_automatic, "{note}"),
            LifecycleLevel::Error => error!(origin, is_automatic, "{note}"),
        }
    }
}

/// Invokes an entity's storage hooks and forwards notes to the sink.
#[derive(Clone)]
pub struct HookInvoker {
    sink: Arc<dyn LifecycleSink>,
}

impl HookInvoker {
    pub fn new(sink: Arc<dyn LifecycleSink>) -> Self {
        Self { sink }
    }

    /// Invoker backed by the default tracing sink.
    pub fn with_tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Fire the retrieval hook and, when `stored_in_cache` is set, the
    /// cache-store hook. Pass-through: observability only.
    ///
    /// The capability is checked explicitly; entities without hooks cost one
    /// virtual call. Hook failures are recorded at error level and swallowed.
    pub fn invoke<T: CacheableEntity>(
        &self,
        entity: &T,
        source: EntitySource,
        stored_in_cache: bool,
    ) {
        let Some(hooks) = entity.storage_hooks() else {
            return;
        };
        let origin = T::entity_kind();

        match hooks.on_retrieved(source) {
            Ok(Some(note)) => {
                self.sink
                    .record(LifecycleLevel::Info, &note, Some(origin), true);
            }
            Ok(None) => {}
            Err(err) => {
                self.sink.record(
                    LifecycleLevel::Error,
                    &format!("retrieval hook failed: {err}"),
                    Some(origin),
                    true,
                );
            }
        }

        if stored_in_cache {
            self.record_stored(hooks, origin);
        }
    }

    /// Fire only the cache-store hook.
    ///
    /// For write paths that refresh the cache without retrieving anything,
    /// so no retrieval note is emitted.
    pub fn invoke_stored<T: CacheableEntity>(&self, entity: &T) {
        let Some(hooks) = entity.storage_hooks() else {
            return;
        };
        self.record_stored(hooks, T::entity_kind());
    }

    fn record_stored(&self, hooks: &dyn StorageHooks, origin: &str) {
        match hooks.on_stored_in_cache() {
            Ok(Some(note)) => {
                self.sink
                    .record(LifecycleLevel::Info, &note, Some(origin), true);
            }
            Ok(None) => {}
            Err(err) => {
                self.sink.record(
                    LifecycleLevel::Error,
                    &format!("cache-store hook failed: {err}"),
                    Some(origin),
                    true,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;
    use warden_core::HookError;

    #[derive(Default)]
    struct RecordingSink {
        notes: Mutex<Vec<(LifecycleLevel, String, Option<String>, bool)>>,
    }

    impl LifecycleSink for RecordingSink {
        fn record(
            &self,
            level: LifecycleLevel,
            note: &str,
            origin: Option<&str>,
            is_automatic: bool,
        ) {
            self.notes.lock().unwrap().push((
                level,
                note.to_string(),
                origin.map(str::to_string),
                is_automatic,
            ));
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Chatty {
        id: u32,
        #[serde(skip)]
        fail_hooks: bool,
    }

    impl StorageHooks for Chatty {
        fn on_retrieved(&self, source: EntitySource) -> Result<Option<String>, HookError> {
            if self.fail_hooks {
                return Err(HookError::new("retrieval probe failure"));
            }
            Ok(Some(format!("chatty {} retrieved from {source}", self.id)))
        }

        fn on_stored_in_cache(&self) -> Result<Option<String>, HookError> {
            if self.fail_hooks {
                return Err(HookError::new("store probe failure"));
            }
            Ok(Some(format!("chatty {} stored in cache", self.id)))
        }
    }

    impl CacheableEntity for Chatty {
        fn entity_kind() -> &'static str {
            "chatty"
        }

        fn cache_key(&self) -> String {
            format!("chatty.{}", self.id)
        }

        fn storage_hooks(&self) -> Option<&dyn StorageHooks> {
            Some(self)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Silent {
        id: u32,
    }

    impl CacheableEntity for Silent {
        fn entity_kind() -> &'static str {
            "silent"
        }

        fn cache_key(&self) -> String {
            format!("silent.{}", self.id)
        }
    }

    fn invoker() -> (HookInvoker, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (HookInvoker::new(sink.clone()), sink)
    }

    #[test]
    fn test_retrieval_note_forwarded() {
        let (invoker, sink) = invoker();
        let entity = Chatty {
            id: 7,
            fail_hooks: false,
        };
        invoker.invoke(&entity, EntitySource::Cache, false);

        let notes = sink.notes.lock().unwrap();
        assert_eq!(notes.len(), 1);
        let (level, note, origin, automatic) = &notes[0];
        assert_eq!(*level, LifecycleLevel::Info);
        assert!(note.contains("retrieved from cache"));
        assert_eq!(origin.as_deref(), Some("chatty"));
        assert!(*automatic);
    }

    #[test]
    fn test_stored_in_cache_fires_both_hooks() {
        let (invoker, sink) = invoker();
        let entity = Chatty {
            id: 7,
            fail_hooks: false,
        };
        invoker.invoke(&entity, EntitySource::DurableStore, true);

        let notes = sink.notes.lock().unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes[0].1.contains("retrieved from durable store"));
        assert!(notes[1].1.contains("stored in cache"));
    }

    #[test]
    fn test_hook_failure_reported_not_propagated() {
        let (invoker, sink) = invoker();
        let entity = Chatty {
            id: 7,
            fail_hooks: true,
        };
        // Must not panic or return an error.
        invoker.invoke(&entity, EntitySource::Cache, true);

        let notes = sink.notes.lock().unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|(level, ..)| *level == LifecycleLevel::Error));
        assert!(notes[0].1.contains("retrieval hook failed"));
        assert!(notes[1].1.contains("cache-store hook failed"));
    }

    #[test]
    fn test_invoke_stored_skips_retrieval_hook() {
        let (invoker, sink) = invoker();
        let entity = Chatty {
            id: 7,
            fail_hooks: false,
        };
        invoker.invoke_stored(&entity);

        let notes = sink.notes.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].1.contains("stored in cache"));
        assert!(!notes[0].1.contains("retrieved"));
    }

    #[test]
    fn test_entity_without_capability_is_noop() {
        let (invoker, sink) = invoker();
        invoker.invoke(&Silent { id: 1 }, EntitySource::Cache, true);
        assert!(sink.notes.lock().unwrap().is_empty());
    }
}

// Copyright 2025 The Kindred Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Observer registration and best-effort asynchronous notification fan-out.
//!
//! Observability is an auditing concern, never a correctness dependency:
//! delivery is at-most-once, unordered across observers and across
//! successive notifications, and a failure in an observer's receive path is
//! invisible to the caller of the operation that triggered it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use tokio::sync::RwLock;

use crate::error::SdkError;
use crate::event::NotificationEvent;

/// A party interested in lifecycle/mutation events, keyed by id.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Unique identifier of this observer within a hub.
    fn id(&self) -> &str;

    /// Receive one serialized [`NotificationEvent`].
    async fn observe(&self, event: String);
}

/// Registration plus fan-out of structured events to zero or more observers.
///
/// An empty observer set is represented as `None`, not an empty map, so
/// [`ObserverHub::notify`] on a hub nobody listens to returns before
/// building an event or spawning anything.
#[derive(Default)]
pub struct ObserverHub {
    observers: RwLock<Option<HashMap<String, Arc<dyn Observer>>>>,
}

impl std::fmt::Debug for ObserverHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverHub").finish_non_exhaustive()
    }
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Re-registering an id replaces the previous entry.
    pub async fn register(&self, observer: Arc<dyn Observer>) {
        let mut guard = self.observers.write().await;
        guard
            .get_or_insert_with(HashMap::new)
            .insert(observer.id().to_string(), observer);
    }

    /// Remove an observer by id. When the last observer leaves, the set
    /// collapses back to `None` and the hub drops its `Arc` references.
    pub async fn unregister(&self, observer_id: &str) {
        let mut guard = self.observers.write().await;
        if let Some(map) = guard.as_mut() {
            map.remove(observer_id);
            if map.is_empty() {
                *guard = None;
            }
        }
    }

    pub async fn has_observers(&self) -> bool {
        self.observers.read().await.is_some()
    }

    /// Build one event and dispatch it to every registered observer on an
    /// independent detached task.
    ///
    /// The observer set is snapshotted under the read lock before the
    /// fan-out loop, so a concurrent (un)registration between the presence
    /// check and the loop cannot tear the dispatch.
    pub async fn notify(
        &self,
        subject_id: u16,
        message_id: u16,
        error: Option<&SdkError>,
        details: HashMap<String, String>,
    ) {
        let snapshot: Vec<Arc<dyn Observer>> = {
            let guard = self.observers.read().await;
            match guard.as_ref() {
                Some(map) => map.values().cloned().collect(),
                None => return,
            }
        };

        let event = NotificationEvent::new(subject_id, message_id, error, details);
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping notification {subject_id}/{message_id}: {e}");
                return;
            }
        };

        for observer in snapshot {
            let payload = payload.clone();
            tokio::spawn(async move {
                observer.observe(payload).await;
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

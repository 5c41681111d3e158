// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - Session and favorites synchronizer
//
// Owns the signed-in session, the saved-property set and the profile stats.
// State is published as immutable snapshots over a watch channel; the
// synchronizer is the only writer.
//
// Every session transition bumps a generation counter. A refresh captures the
// generation when it starts and drops its results if a newer transition
// happened before they arrived. Toggles made while a refresh is in flight are
// logged and replayed over the fetched saved set, so a late refresh cannot
// undo them.

use crate::identity::IdentityProvider;
use crate::store::PropertyStore;
use crate::types::{AppError, Session, Stats};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Capacity of the sync event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What presentation code sees: session, favorites and counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub session: Option<Session>,
    pub saved: HashSet<String>,
    pub stats: Stats,
}

impl SyncSnapshot {
    pub fn is_saved(&self, property_id: &str) -> bool {
        self.saved.contains(property_id)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}

/// Non-fatal notifications for frontends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    SessionChanged { user_id: Option<String> },
    Refreshed { user_id: String, stats: Stats },
    RefreshFailed { user_id: String, error: String },
    WriteFailed { property_id: String, error: String },
    SignOutFailed { error: String },
}

/// Result of a `refresh_user_data` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fresh data replaced the saved set and stats
    Applied(Stats),
    /// A query failed; previous state kept
    Failed,
    /// A newer session transition happened while the queries ran
    Stale,
    /// The user is not the one currently signed in
    NoSession,
}

/// Handle to the background write started by `toggle_save`
#[derive(Debug)]
pub struct PendingWrite {
    pub property_id: String,
    /// Membership after the optimistic update
    pub saved: bool,
    handle: JoinHandle<bool>,
}

impl PendingWrite {
    /// Wait for the remote write; true if it was persisted
    pub async fn wait(self) -> bool {
        match self.handle.await {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::error!("Save task for {} aborted: {}", self.property_id, e);
                false
            }
        }
    }
}

struct LocalWrite {
    id: u64,
    property_id: String,
    saved: bool,
    /// Clock value when the remote write finished, if it has
    settled_at: Option<u64>,
}

/// Optimistic toggles that a running refresh may not have seen
///
/// A refresh replays every toggle that was unsettled when it started or
/// settled after it started. Settled entries are pruned once no refresh
/// is running. Lock order: watch state first, then this log.
#[derive(Default)]
struct LocalWrites {
    entries: Mutex<Vec<LocalWrite>>,
    clock: AtomicU64,
    refreshes: AtomicUsize,
}

impl LocalWrites {
    fn lock(&self) -> MutexGuard<'_, Vec<LocalWrite>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record(&self, property_id: &str, saved: bool) -> u64 {
        let id = self.tick();
        self.lock().push(LocalWrite {
            id,
            property_id: property_id.to_string(),
            saved,
            settled_at: None,
        });
        id
    }

    fn settle(&self, id: u64) {
        let mut entries = self.lock();
        if self.refreshes.load(Ordering::SeqCst) == 0 {
            entries.retain(|e| e.id != id);
        } else if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.settled_at = Some(self.tick());
        }
    }

    /// Register a running refresh; returns the clock value it started at
    fn begin_refresh(&self) -> u64 {
        let _entries = self.lock();
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.clock.load(Ordering::SeqCst)
    }

    fn end_refresh(&self) {
        let mut entries = self.lock();
        if self.refreshes.fetch_sub(1, Ordering::SeqCst) == 1 {
            entries.retain(|e| e.settled_at.is_none());
        }
    }

    fn replay(&self, saved: &mut HashSet<String>, since: u64) {
        for entry in self
            .lock()
            .iter()
            .filter(|e| e.settled_at.map_or(true, |at| at > since))
        {
            if entry.saved {
                saved.insert(entry.property_id.clone());
            } else {
                saved.remove(&entry.property_id);
            }
        }
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

/// Ends a refresh registration on every exit path
struct RefreshGuard<'a>(&'a LocalWrites);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.end_refresh();
    }
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn PropertyStore>,
    state: watch::Sender<SyncSnapshot>,
    events: broadcast::Sender<SyncEvent>,
    generation: AtomicU64,
    local_writes: Arc<LocalWrites>,
    initialized: AtomicBool,
}

/// Cloneable handle to the shared synchronizer
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<Inner>,
}

impl Synchronizer {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn PropertyStore>) -> Self {
        let (state, _) = watch::channel(SyncSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                identity,
                store,
                state,
                events,
                generation: AtomicU64::new(0),
                local_writes: Arc::default(),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> SyncSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receive a new snapshot after every state change
    pub fn watch(&self) -> watch::Receiver<SyncSnapshot> {
        self.inner.state.subscribe()
    }

    /// Subscribe to non-fatal sync events
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_saved(&self, property_id: &str) -> bool {
        self.inner.state.borrow().is_saved(property_id)
    }

    /// The store used for user data, shared with listing views
    pub fn store(&self) -> Arc<dyn PropertyStore> {
        self.inner.store.clone()
    }

    fn publish(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Load any existing session and follow provider notifications
    ///
    /// The returned task runs until the provider's channel closes or the
    /// last `Synchronizer` handle is dropped.
    pub async fn initialize(&self) -> Option<JoinHandle<()>> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            tracing::warn!("Synchronizer already initialized");
            return None;
        }

        // Subscribe before the lookup so no transition slips between them
        let mut rx = self.inner.identity.subscribe();

        match self.inner.identity.current_session().await {
            Ok(Some(session)) => {
                tracing::info!("Resuming session for user {}", session.user_id);
                self.on_session_changed(Some(session)).await;
            }
            Ok(None) => tracing::info!("No existing session"),
            Err(e) => tracing::warn!("Failed to look up session: {}", e),
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Some(tokio::spawn(async move {
            loop {
                let event = rx.recv().await;
                let Some(inner) = weak.upgrade() else { break };
                let sync = Synchronizer { inner };

                match event {
                    Ok(event) => {
                        tracing::debug!("Auth event: {:?}", event.kind);
                        sync.on_session_changed(event.session).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("Missed {} auth events, re-reading session", missed);
                        match sync.inner.identity.current_session().await {
                            Ok(session) => sync.on_session_changed(session).await,
                            Err(e) => tracing::warn!("Failed to look up session: {}", e),
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("Auth listener stopped");
        }))
    }

    /// Apply a session transition reported by the identity provider
    pub async fn on_session_changed(&self, new_session: Option<Session>) {
        let Some(session) = new_session else {
            self.clear_session();
            return;
        };

        let user_id = session.user_id.clone();
        let changed = self.inner.state.send_if_modified(|state| {
            if state.session.as_ref() == Some(&session) {
                return false;
            }
            self.inner.generation.fetch_add(1, Ordering::SeqCst);

            // Another user's favorites must never show under this session
            if state.user_id() != Some(user_id.as_str()) {
                state.saved.clear();
                state.stats = Stats::default();
                self.inner.local_writes.clear();
            }
            state.session = Some(session);
            true
        });

        if !changed {
            tracing::debug!("Session for {} unchanged, skipping refresh", user_id);
            return;
        }

        tracing::info!("Signed in as {}", user_id);
        self.publish(SyncEvent::SessionChanged {
            user_id: Some(user_id.clone()),
        });
        self.refresh_user_data(&user_id).await;
    }

    fn clear_session(&self) {
        let was_active = self.inner.state.send_if_modified(|state| {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            self.inner.local_writes.clear();
            let was_active = *state != SyncSnapshot::default();
            *state = SyncSnapshot::default();
            was_active
        });

        if was_active {
            tracing::info!("Session cleared");
            self.publish(SyncEvent::SessionChanged { user_id: None });
        }
    }

    /// Refetch the saved set and stats for the signed-in user
    ///
    /// The three queries run concurrently and are applied all-or-nothing.
    pub async fn refresh_user_data(&self, user_id: &str) -> RefreshOutcome {
        let current = {
            let state = self.inner.state.borrow();
            state
                .session
                .clone()
                .filter(|s| s.user_id == user_id)
                .map(|s| {
                    let generation = self.inner.generation.load(Ordering::SeqCst);
                    (s, generation, self.inner.local_writes.begin_refresh())
                })
        };
        let Some((session, generation, since)) = current else {
            tracing::debug!("Skipping refresh, {} is not signed in", user_id);
            return RefreshOutcome::NoSession;
        };
        let _running = RefreshGuard(&self.inner.local_writes);

        let store = &self.inner.store;
        let fetched = tokio::try_join!(
            store.saved_property_ids(&session),
            store.viewed_ids(&session),
            store.inquiry_ids(&session),
        );

        let (saved_ids, viewed, inquiries) = match fetched {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Error fetching user data for {}: {}", user_id, e);
                self.publish(SyncEvent::RefreshFailed {
                    user_id: user_id.to_string(),
                    error: e.to_string(),
                });
                return RefreshOutcome::Failed;
            }
        };

        let mut stats = None;
        self.inner.state.send_if_modified(|state| {
            if self.inner.generation.load(Ordering::SeqCst) != generation {
                return false;
            }

            let mut saved: HashSet<String> = saved_ids.into_iter().collect();
            self.inner.local_writes.replay(&mut saved, since);
            state.saved = saved;
            // Counted from the set so duplicate links cannot break saved == |set|
            let fresh = Stats {
                saved: state.saved.len() as u64,
                viewed: viewed.len() as u64,
                inquiries: inquiries.len() as u64,
            };
            state.stats = fresh;
            stats = Some(fresh);
            true
        });

        match stats {
            Some(stats) => {
                tracing::debug!("Refreshed user data for {}: {:?}", user_id, stats);
                self.publish(SyncEvent::Refreshed {
                    user_id: user_id.to_string(),
                    stats,
                });
                RefreshOutcome::Applied(stats)
            }
            None => {
                tracing::debug!("Discarding stale refresh for {}", user_id);
                RefreshOutcome::Stale
            }
        }
    }

    /// Save or unsave a property for the signed-in user
    ///
    /// Local state changes immediately; the remote write runs in the
    /// background and is not rolled back if it fails.
    pub fn toggle_save(&self, property_id: &str) -> Result<PendingWrite, AppError> {
        let mut decided = None;
        self.inner.state.send_if_modified(|state| {
            let Some(session) = state.session.clone() else {
                return false;
            };

            let was_saved = state.saved.remove(property_id);
            if was_saved {
                state.stats.saved = state.stats.saved.saturating_sub(1);
            } else {
                state.saved.insert(property_id.to_string());
                state.stats.saved += 1;
            }
            let write_id = self.inner.local_writes.record(property_id, !was_saved);
            decided = Some((session, was_saved, write_id));
            true
        });

        let Some((session, was_saved, write_id)) = decided else {
            tracing::info!("Save of {} rejected: not signed in", property_id);
            return Err(AppError::SignInRequired);
        };

        let store = self.inner.store.clone();
        let events = self.inner.events.clone();
        let local_writes = self.inner.local_writes.clone();
        let id = property_id.to_string();
        let handle = tokio::spawn(async move {
            let result = if was_saved {
                store.delete_saved(&session, &id).await
            } else {
                store.insert_saved(&session, &id).await
            };
            local_writes.settle(write_id);

            match result {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("Error toggling save for {}: {}", id, e);
                    let _ = events.send(SyncEvent::WriteFailed {
                        property_id: id,
                        error: e.to_string(),
                    });
                    false
                }
            }
        });

        Ok(PendingWrite {
            property_id: property_id.to_string(),
            saved: !was_saved,
            handle,
        })
    }

    /// Sign out with the provider and clear all user state
    pub async fn sign_out(&self) {
        if let Err(e) = self.inner.identity.sign_out().await {
            tracing::warn!("Sign-out failed: {}", e);
            self.publish(SyncEvent::SignOutFailed {
                error: e.to_string(),
            });
        }
        self.clear_session();
    }
}

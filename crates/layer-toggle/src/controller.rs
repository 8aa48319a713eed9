// Copyright 2025 Chris Custine
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

//! Toggle controller: the per-key state machine behind every toolbar button.
//!
//! Each key is independently `Idle`, `Pending` or `Active`:
//!
//! | State   | Event                 | Effect                         | Next    |
//! |---------|-----------------------|--------------------------------|---------|
//! | Idle    | toggle                | mark pending, run action       | Pending |
//! | Pending | action yields a layer | attach to canvas, store it     | Active  |
//! | Pending | action yields nothing | discard                        | Idle    |
//! | Pending | action fails          | log, discard                   | Idle    |
//! | Pending | toggle                | ignored                        | Pending |
//! | Active  | toggle                | detach from canvas, drop entry | Idle    |
//!
//! The pending gate is taken synchronously before any action runs, so a key
//! never has more than one action in flight and never gets two layers.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::action::{ActionError, ActionResult, ResolveFuture};
use crate::canvas::MapCanvas;
use crate::key::LayerKey;
use crate::registry::ActionRegistry;
use crate::store::{ActiveLayerStore, Entry, Status, Ticket};

/// Controller settings.
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Upper bound on a single action run. `None` waits indefinitely.
    pub action_timeout: Option<Duration>,
}

/// Observable state of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Idle,
    Pending,
    Active,
}

/// The single side effect a toggle had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A fresh layer was attached to the canvas.
    Attached,
    /// The existing layer was detached.
    Detached,
    /// The action produced no layer.
    NoLayer,
    /// The action failed, timed out, or the canvas refused its layer.
    Failed,
    /// A previous toggle for this key is still resolving.
    IgnoredPending,
    /// Nothing is registered for this key.
    UnknownKey,
    /// The map session was shut down.
    Cancelled,
}

impl ToggleOutcome {
    /// Whether the canvas was modified.
    #[must_use]
    pub fn changed_canvas(self) -> bool {
        matches!(self, ToggleOutcome::Attached | ToggleOutcome::Detached)
    }
}

impl fmt::Display for ToggleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ToggleOutcome::Attached => "attached",
            ToggleOutcome::Detached => "detached",
            ToggleOutcome::NoLayer => "no layer",
            ToggleOutcome::Failed => "failed",
            ToggleOutcome::IgnoredPending => "still loading",
            ToggleOutcome::UnknownKey => "not available",
            ToggleOutcome::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Result of the synchronous half of a toggle.
enum Begin<L> {
    Done(ToggleOutcome),
    Resolve(Ticket, ResolveFuture<L>),
}

struct Inner<C: MapCanvas> {
    registry: ActionRegistry<C::Layer>,
    store: Mutex<ActiveLayerStore<C::Layer>>,
    canvas: C,
    config: ControllerConfig,
    cancel_token: CancellationToken,
}

impl<C: MapCanvas> Inner<C> {
    fn lock_store(&self) -> MutexGuard<'_, ActiveLayerStore<C::Layer>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Detach every active layer and forget pending entries.
    fn detach_all(&self) -> usize {
        let entries = self.lock_store().drain();
        let mut detached = 0;
        for entry in entries {
            let key = entry.key;
            if let Some(layer) = entry.into_layer() {
                if let Err(e) = self.canvas.remove_layer(&layer) {
                    warn!("Failed to detach layer {}: {}", key, e);
                }
                detached += 1;
            }
        }
        detached
    }
}

impl<C: MapCanvas> Drop for Inner<C> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        self.detach_all();
    }
}

/// Handle to the toggle controller of one map session.
///
/// Clones share the same store, registry and canvas.
pub struct ToggleController<C: MapCanvas> {
    inner: Arc<Inner<C>>,
}

impl<C: MapCanvas> Clone for ToggleController<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: MapCanvas> fmt::Debug for ToggleController<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.inner.lock_store();
        f.debug_struct("ToggleController")
            .field("active", &store.keys_with_status(Status::Active))
            .field("pending", &store.keys_with_status(Status::Pending))
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<C: MapCanvas + 'static> ToggleController<C> {
    #[must_use]
    pub fn new(registry: ActionRegistry<C::Layer>, canvas: C) -> Self {
        Self::with_config(registry, canvas, ControllerConfig::default())
    }

    #[must_use]
    pub fn with_config(
        registry: ActionRegistry<C::Layer>,
        canvas: C,
        config: ControllerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                store: Mutex::new(ActiveLayerStore::new()),
                canvas,
                config,
                cancel_token: CancellationToken::new(),
            }),
        }
    }

    /// Toggle a key and wait for the outcome.
    ///
    /// Never fails: action errors are logged and reported as
    /// [`ToggleOutcome::Failed`]. Dropping the returned future does not
    /// abandon the toggle; the key still settles once its action resolves.
    pub async fn toggle(&self, key: &LayerKey) -> ToggleOutcome {
        match self.spawn_toggle(*key).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Toggle task for {} failed: {}", key, e);
                ToggleOutcome::Failed
            }
        }
    }

    /// Toggle a key without waiting, for use from a UI event loop.
    ///
    /// The gate is taken before this returns, so a second call for the same
    /// key is ignored until the first one has resolved. Must be called from
    /// within a tokio runtime.
    pub fn spawn_toggle(&self, key: LayerKey) -> JoinHandle<ToggleOutcome> {
        match self.begin(&key) {
            Begin::Done(outcome) => tokio::spawn(std::future::ready(outcome)),
            Begin::Resolve(ticket, resolving) => {
                let controller = self.clone();
                tokio::spawn(async move { controller.finish(key, ticket, resolving).await })
            }
        }
    }

    /// Gate on the key's current state. Detaching happens entirely here.
    fn begin(&self, key: &LayerKey) -> Begin<C::Layer> {
        if self.inner.cancel_token.is_cancelled() {
            debug!("Ignoring toggle of {}: session closed", key);
            return Begin::Done(ToggleOutcome::Cancelled);
        }

        let mut store = self.inner.lock_store();
        match store.get(key).map(Entry::status) {
            Some(Status::Pending) => {
                debug!("Ignoring toggle of {}: still resolving", key);
                Begin::Done(ToggleOutcome::IgnoredPending)
            }
            Some(Status::Active) => {
                if let Some(layer) = store.remove(key).and_then(Entry::into_layer) {
                    if let Err(e) = self.inner.canvas.remove_layer(&layer) {
                        warn!("Canvas could not detach layer {}: {}", key, e);
                    }
                }
                info!("Detached layer {}", key);
                Begin::Done(ToggleOutcome::Detached)
            }
            None => {
                let Some(action) = self.inner.registry.get(key).cloned() else {
                    warn!("No action registered for {}", key);
                    return Begin::Done(ToggleOutcome::UnknownKey);
                };

                let ticket = match store.begin_pending(*key) {
                    Ok(ticket) => ticket,
                    Err(e) => {
                        // Only reachable if the status check above is wrong.
                        error!("{}", e);
                        debug_assert!(false, "{e}");
                        return Begin::Done(ToggleOutcome::IgnoredPending);
                    }
                };
                drop(store);

                debug!("Resolving '{}' for {}", action.title(), key);
                Begin::Resolve(ticket, action.resolve())
            }
        }
    }

    /// Await the action, then apply its result if the entry is still ours.
    async fn finish(
        &self,
        key: LayerKey,
        ticket: Ticket,
        resolving: ResolveFuture<C::Layer>,
    ) -> ToggleOutcome {
        let task = tokio::spawn(resolving);
        let abort = task.abort_handle();

        let result = tokio::select! {
            result = join_action(task, self.inner.config.action_timeout) => result,
            () = self.inner.cancel_token.cancelled() => {
                abort.abort();
                self.inner.lock_store().discard_pending(&key, ticket);
                debug!("Dropped in-flight action for {}: session closed", key);
                return ToggleOutcome::Cancelled;
            }
        };

        let mut store = self.inner.lock_store();
        if !store.is_pending_with(&key, ticket) {
            debug!("Discarding stale result for {}", key);
            return ToggleOutcome::Cancelled;
        }

        match result {
            Ok(Some(layer)) => {
                if let Err(e) = self.inner.canvas.add_layer(&layer) {
                    warn!("Canvas refused layer {}: {}", key, e);
                    store.discard_pending(&key, ticket);
                    return ToggleOutcome::Failed;
                }
                if let Err(layer) = store.activate(&key, ticket, layer) {
                    error!("Pending entry for {} vanished under the store lock", key);
                    debug_assert!(false, "pending entry for {key} vanished");
                    if let Err(e) = self.inner.canvas.remove_layer(&layer) {
                        warn!("Canvas could not detach layer {}: {}", key, e);
                    }
                    return ToggleOutcome::Cancelled;
                }
                info!("Attached layer {}", key);
                ToggleOutcome::Attached
            }
            Ok(None) => {
                store.discard_pending(&key, ticket);
                info!("{} produced no layer", key);
                ToggleOutcome::NoLayer
            }
            Err(e) => {
                store.discard_pending(&key, ticket);
                error!("Layer {} failed: {}", key, e);
                ToggleOutcome::Failed
            }
        }
    }
}

impl<C: MapCanvas> ToggleController<C> {
    /// Whether the key has a layer attached. Pending keys are not active.
    #[must_use]
    pub fn is_active(&self, key: &LayerKey) -> bool {
        self.state(key) == KeyState::Active
    }

    #[must_use]
    pub fn is_pending(&self, key: &LayerKey) -> bool {
        self.state(key) == KeyState::Pending
    }

    #[must_use]
    pub fn state(&self, key: &LayerKey) -> KeyState {
        match self.inner.lock_store().get(key).map(Entry::status) {
            None => KeyState::Idle,
            Some(Status::Pending) => KeyState::Pending,
            Some(Status::Active) => KeyState::Active,
        }
    }

    /// How long the key's action has been running, if it is pending.
    #[must_use]
    pub fn pending_for(&self, key: &LayerKey) -> Option<Duration> {
        self.inner.lock_store().get(key).and_then(Entry::pending_for)
    }

    /// Keys with an attached layer, sorted.
    #[must_use]
    pub fn active_keys(&self) -> Vec<LayerKey> {
        self.inner.lock_store().keys_with_status(Status::Active)
    }

    /// Keys whose action is still resolving, sorted.
    #[must_use]
    pub fn pending_keys(&self) -> Vec<LayerKey> {
        self.inner.lock_store().keys_with_status(Status::Pending)
    }

    #[must_use]
    pub fn registry(&self) -> &ActionRegistry<C::Layer> {
        &self.inner.registry
    }

    #[must_use]
    pub fn canvas(&self) -> &C {
        &self.inner.canvas
    }

    /// End the map session: abandon in-flight actions, detach every layer
    /// and refuse further toggles. Returns the number of layers detached.
    pub fn shutdown(&self) -> usize {
        self.inner.cancel_token.cancel();
        let detached = self.inner.detach_all();
        info!("Map session closed, detached {} layer(s)", detached);
        detached
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel_token.is_cancelled()
    }
}

async fn join_action<L>(
    task: JoinHandle<ActionResult<L>>,
    limit: Option<Duration>,
) -> ActionResult<L> {
    let abort = task.abort_handle();
    let joined = match limit {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                abort.abort();
                return Err(ActionError::TimedOut(limit));
            }
        },
        None => task.await,
    };

    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ActionError::Panicked(panic_message(e.into_panic()))),
        Err(e) => Err(ActionError::Other(Box::new(e))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

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

//! Layer actions: declarative descriptions of how to produce one overlay.
//!
//! An action may finish immediately (a static image overlay) or suspend on a
//! network fetch. Both shapes are unified behind a single boxed future so the
//! controller never needs to know which kind it is running.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use thiserror::Error;

/// Reasons an action failed to produce a layer.
///
/// The controller treats every variant the same way: the failure is logged
/// and the key returns to idle.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("action panicked: {0}")]
    Panicked(String),

    #[error("action timed out after {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// What an action resolves to: a layer, nothing, or a failure.
pub type ActionResult<L> = Result<Option<L>, ActionError>;

/// Future returned by [`LayerAction::resolve`].
pub type ResolveFuture<L> = Pin<Box<dyn Future<Output = ActionResult<L>> + Send + 'static>>;

type Resolver<L> = Arc<dyn Fn() -> ResolveFuture<L> + Send + Sync>;

/// A toolbar sub-button: display metadata plus a resolver.
///
/// Each call to [`resolve`](Self::resolve) is independent and must produce a
/// fresh layer.
pub struct LayerAction<L> {
    title: String,
    icon: String,
    resolver: Resolver<L>,
}

impl<L: Send + 'static> LayerAction<L> {
    /// Create an action from an async resolver.
    pub fn new<F, Fut>(title: impl Into<String>, icon: impl Into<String>, resolve: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<L>> + Send + 'static,
    {
        Self {
            title: title.into(),
            icon: icon.into(),
            resolver: Arc::new(move || Box::pin(resolve())),
        }
    }

    /// Create an action from a synchronous resolver.
    ///
    /// The resolver runs when the returned future is first polled, not when
    /// [`resolve`](Self::resolve) is called.
    pub fn ready<F>(title: impl Into<String>, icon: impl Into<String>, resolve: F) -> Self
    where
        F: Fn() -> ActionResult<L> + Send + Sync + 'static,
    {
        let resolve = Arc::new(resolve);
        Self::new(title, icon, move || {
            let resolve = Arc::clone(&resolve);
            async move { resolve() }
        })
    }

    /// Placeholder for a button whose feature does not exist yet.
    /// Always resolves to no layer.
    pub fn unimplemented(title: impl Into<String>, icon: impl Into<String>) -> Self {
        let title = title.into();
        let name = title.clone();
        Self::ready(title, icon, move || {
            info!("'{}' is not implemented yet", name);
            Ok(None)
        })
    }
}

impl<L> LayerAction<L> {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Presentation-only icon name.
    #[must_use]
    pub fn icon(&self) -> &str {
        &self.icon
    }

    /// Start one invocation of the action.
    #[must_use]
    pub fn resolve(&self) -> ResolveFuture<L> {
        (self.resolver)()
    }
}

impl<L> Clone for LayerAction<L> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            icon: self.icon.clone(),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<L> fmt::Debug for LayerAction<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerAction")
            .field("title", &self.title)
            .field("icon", &self.icon)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_ready_action_resolves() {
        let action = LayerAction::ready("Radar", "satellite-dish", || Ok(Some(7_u32)));
        assert_eq!(action.title(), "Radar");
        assert_eq!(action.icon(), "satellite-dish");
        assert_eq!(action.resolve().await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_unimplemented_resolves_to_nothing() {
        let action = LayerAction::<u32>::unimplemented("IDW", "wind");
        assert!(action.resolve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_each_invocation_is_fresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let action = LayerAction::new("Stations", "tint", move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Some(n)) }
        });

        assert_eq!(action.resolve().await.unwrap(), Some(0));
        assert_eq!(action.clone().resolve().await.unwrap(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let action = LayerAction::<u32>::new("CAP", "triangle", || async {
            Err(ActionError::Fetch("HTTP error: 503".to_string()))
        });
        let err = action.resolve().await.unwrap_err();
        assert_eq!(err.to_string(), "fetch failed: HTTP error: 503");
    }
}

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

//! Layer toggle controller for map overlay buttons.
//!
//! Each toolbar sub-button is addressed by a [`LayerKey`] and backed by a
//! [`LayerAction`] that may resolve immediately or after a network fetch.
//! The [`ToggleController`] decides, per key, whether a press creates and
//! attaches a layer or detaches the existing one, while guaranteeing at most
//! one live layer and at most one in-flight action per key.
//!
//! The crate is split into small layers that can be used on their own:
//!
//! - **Keys**: [`Category`] and [`LayerKey`] with their canonical
//!   `"<category>-<index>"` form
//! - **Actions**: [`LayerAction`] and the read-only [`ActionRegistry`]
//! - **Store**: [`ActiveLayerStore`], the 1:1 mirror of canvas attachment
//! - **Canvas**: the [`MapCanvas`] trait implemented by the map component
//! - **Controller**: the per-key state machine
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Mutex;
//! use layer_toggle::{
//!     ActionRegistry, CanvasError, Category, LayerAction, MapCanvas, ToggleController,
//!     ToggleOutcome,
//! };
//!
//! #[derive(Default)]
//! struct Canvas(Mutex<Vec<String>>);
//!
//! impl MapCanvas for Canvas {
//!     type Layer = String;
//!
//!     fn add_layer(&self, layer: &String) -> Result<(), CanvasError> {
//!         self.0.lock().unwrap().push(layer.clone());
//!         Ok(())
//!     }
//!
//!     fn remove_layer(&self, layer: &String) -> Result<(), CanvasError> {
//!         self.0.lock().unwrap().retain(|l| l != layer);
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = ActionRegistry::builder()
//!     .with(
//!         Category::Weather,
//!         LayerAction::ready("Radar echo", "satellite-dish", || Ok(Some("radar".to_string()))),
//!     )
//!     .build();
//! let controller = ToggleController::new(registry, Canvas::default());
//!
//! let key = Category::Weather.key(0);
//! assert_eq!(controller.toggle(&key).await, ToggleOutcome::Attached);
//! assert!(controller.is_active(&key));
//! assert_eq!(controller.toggle(&key).await, ToggleOutcome::Detached);
//! assert!(!controller.is_active(&key));
//! # }
//! ```

pub mod action;
pub mod canvas;
pub mod controller;
pub mod key;
pub mod registry;
pub mod store;

pub use action::{ActionError, ActionResult, LayerAction, ResolveFuture};
pub use canvas::{CanvasError, MapCanvas};
pub use controller::{ControllerConfig, KeyState, ToggleController, ToggleOutcome};
pub use key::{Category, KeyParseError, LayerKey};
pub use registry::{ActionRegistry, ActionRegistryBuilder};
pub use store::{ActiveLayerStore, Entry, EntryState, Status, StoreError, Ticket};

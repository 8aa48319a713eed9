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

//! Boundary to the map component that actually draws layers.

use thiserror::Error;

/// Errors a canvas may report. The controller logs these and carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanvasError {
    #[error("layer is already attached")]
    AlreadyAttached,

    #[error("layer is not attached")]
    NotAttached,

    #[error("canvas rejected layer: {0}")]
    Rejected(String),
}

/// The two operations the controller needs from a map.
///
/// Both are synchronous; attachment never suspends.
pub trait MapCanvas: Send + Sync {
    /// Opaque drawable object understood by this canvas.
    type Layer: Send + 'static;

    fn add_layer(&self, layer: &Self::Layer) -> Result<(), CanvasError>;

    fn remove_layer(&self, layer: &Self::Layer) -> Result<(), CanvasError>;
}

impl<C: MapCanvas + ?Sized> MapCanvas for std::sync::Arc<C> {
    type Layer = C::Layer;

    fn add_layer(&self, layer: &Self::Layer) -> Result<(), CanvasError> {
        (**self).add_layer(layer)
    }

    fn remove_layer(&self, layer: &Self::Layer) -> Result<(), CanvasError> {
        (**self).remove_layer(layer)
    }
}

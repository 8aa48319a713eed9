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

//! Plain GeoJSON feeds (debris-flow streams, impact ranges, isolated
//! villages).

use serde_json::Value;

use super::{DataClient, ProviderError};
use crate::layer::normalize_geojson;

/// Fetch a GeoJSON document and validate it as a feature collection.
pub async fn fetch(client: &DataClient, url: &str) -> Result<Value, ProviderError> {
    let data: Value = client.get_json(url, &[]).await?;
    normalize_geojson(data).map_err(|e| ProviderError::Invalid(e.to_string()))
}

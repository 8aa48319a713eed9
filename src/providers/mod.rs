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

//! Remote data sources behind the overlay buttons.
//!
//! Each provider fetches one open-data feed and turns it into GeoJSON.
//! Errors are typed here and converted to action failures at the catalog
//! boundary, so the toggle controller never sees raw HTTP errors.

pub mod cap_alerts;
pub mod geojson_source;
pub mod rain_stations;

use std::time::Duration;

use layer_toggle::ActionError;
use log::debug;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that can occur while fetching or decoding a feed.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid data: {0}")]
    Invalid(String),
}

impl From<ProviderError> for ActionError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Http(_) | ProviderError::Status { .. } => {
                ActionError::Fetch(e.to_string())
            }
            ProviderError::Decode(_) | ProviderError::Invalid(_) => {
                ActionError::Transform(e.to_string())
            }
        }
    }
}

/// Shared HTTP client for all providers.
#[derive(Debug, Clone)]
pub struct DataClient {
    http: reqwest::Client,
}

impl DataClient {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hazard-map/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        debug!("GET {}", url);
        let response = self.http.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let invalid: ActionError = ProviderError::Invalid("no stations".to_string()).into();
        assert!(matches!(invalid, ActionError::Transform(_)));

        let decode = serde_json::from_str::<u32>("nope").unwrap_err();
        let decode: ActionError = ProviderError::Decode(decode).into();
        assert!(matches!(decode, ActionError::Transform(_)));

        let status: ActionError = ProviderError::Status {
            url: "https://example.test".to_string(),
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        }
        .into();
        assert_eq!(
            status.to_string(),
            "fetch failed: HTTP error: 503 Service Unavailable from https://example.test"
        );
    }
}

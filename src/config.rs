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

//! Application configuration management.
//!
//! Configuration is stored in TOML via `confy`. API keys may also come from
//! environment variables, which take precedence over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const APP_NAME: &str = "hazard-map";
const CONFIG_NAME: &str = "config";

/// Environment variable holding the Central Weather Administration key.
pub const CWA_API_KEY_ENV: &str = "CWA_API_KEY";

/// Environment variable holding the NCDR alert datastore key.
pub const NCDR_API_KEY_ENV: &str = "NCDR_API_KEY";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// CWA open-data authorization key (env var takes precedence)
    #[serde(default)]
    pub cwa_api_key: Option<String>,

    /// NCDR alert datastore API key (env var takes precedence)
    #[serde(default)]
    pub ncdr_api_key: Option<String>,

    /// Automatic rain gauge observations (O-A0001-001)
    #[serde(default = "default_rain_station_url")]
    pub rain_station_url: String,

    /// CAP alert list endpoint
    #[serde(default = "default_cap_list_url")]
    pub cap_list_url: String,

    /// CAP alert detail endpoint
    #[serde(default = "default_cap_detail_url")]
    pub cap_detail_url: String,

    /// CAP code queried for road alerts
    #[serde(default = "default_cap_code")]
    pub cap_code: String,

    /// GeoJSON of debris-flow potential streams
    #[serde(default)]
    pub debris_flow_url: Option<String>,

    /// GeoJSON of debris-flow impact ranges
    #[serde(default)]
    pub debris_impact_url: Option<String>,

    /// GeoJSON of villages previously isolated by disasters
    #[serde(default)]
    pub isolated_village_url: Option<String>,

    /// Daily accumulated rainfall image
    #[serde(default = "default_daily_rainfall_image_url")]
    pub daily_rainfall_image_url: String,

    /// Radar echo composite image
    #[serde(default = "default_radar_image_url")]
    pub radar_image_url: String,

    /// Image overlay opacity (0.0 - 1.0)
    #[serde(default = "default_overlay_opacity")]
    pub overlay_opacity: f32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Upper bound for a single layer action in seconds (0 disables)
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_rain_station_url() -> String {
    "https://opendata.cwa.gov.tw/api/v1/rest/datastore/O-A0001-001".to_string()
}

fn default_cap_list_url() -> String {
    "https://alerts.ncdr.nat.gov.tw/api/datastore".to_string()
}

fn default_cap_detail_url() -> String {
    "https://alerts.ncdr.nat.gov.tw/api/dump/datastore".to_string()
}

fn default_cap_code() -> String {
    "RC".to_string()
}

fn default_daily_rainfall_image_url() -> String {
    "https://alerts.ncdr.nat.gov.tw/DownLoadNewAssistData.ashx/9".to_string()
}

fn default_radar_image_url() -> String {
    "https://alerts.ncdr.nat.gov.tw/DownLoadNewAssistData.ashx/8".to_string()
}

fn default_overlay_opacity() -> f32 {
    0.7
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_action_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            cwa_api_key: None,
            ncdr_api_key: None,
            rain_station_url: default_rain_station_url(),
            cap_list_url: default_cap_list_url(),
            cap_detail_url: default_cap_detail_url(),
            cap_code: default_cap_code(),
            debris_flow_url: None,
            debris_impact_url: None,
            isolated_village_url: None,
            daily_rainfall_image_url: default_daily_rainfall_image_url(),
            radar_image_url: default_radar_image_url(),
            overlay_opacity: default_overlay_opacity(),
            http_timeout_secs: default_http_timeout_secs(),
            action_timeout_secs: default_action_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from the default location.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, confy::ConfyError> {
        match path {
            Some(path) => confy::load_path(path),
            None => confy::load(APP_NAME, CONFIG_NAME),
        }
    }

    /// Save configuration to `path`, or to the default location
    pub fn save(&self, path: Option<&Path>) -> Result<(), confy::ConfyError> {
        match path {
            Some(path) => confy::store_path(path, self),
            None => confy::store(APP_NAME, CONFIG_NAME, self),
        }
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// CWA key from the environment or the config file
    pub fn cwa_api_key(&self) -> Option<String> {
        resolve_api_key(CWA_API_KEY_ENV, self.cwa_api_key.as_deref())
    }

    /// NCDR key from the environment or the config file
    pub fn ncdr_api_key(&self) -> Option<String> {
        resolve_api_key(NCDR_API_KEY_ENV, self.ncdr_api_key.as_deref())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn action_timeout(&self) -> Option<Duration> {
        (self.action_timeout_secs > 0).then(|| Duration::from_secs(self.action_timeout_secs))
    }

    /// Opacity clamped to the valid range
    pub fn overlay_opacity(&self) -> f32 {
        self.overlay_opacity.clamp(0.0, 1.0)
    }
}

/// Resolve an API key, checking the environment variable first
fn resolve_api_key(env_var: &str, config_key: Option<&str>) -> Option<String> {
    if let Ok(key) = std::env::var(env_var) {
        if !key.trim().is_empty() {
            return Some(key.trim().to_string());
        }
    }

    config_key
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

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

//! Automatic rain gauge observations from the Central Weather Administration
//! open-data platform (dataset `O-A0001-001`).

use chrono::DateTime;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{DataClient, ProviderError};
use crate::layer::{feature_collection, point_feature};

#[derive(Debug, Deserialize)]
pub struct RainStationResponse {
    pub records: Records,
}

#[derive(Debug, Deserialize)]
pub struct Records {
    #[serde(rename = "Station", default)]
    pub stations: Vec<Station>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Station {
    pub station_name: String,
    pub station_id: String,
    pub obs_time: ObsTime,
    pub geo_info: GeoInfo,
    pub weather_element: WeatherElement,
}

#[derive(Debug, Deserialize)]
pub struct ObsTime {
    #[serde(rename = "DateTime")]
    pub date_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeoInfo {
    #[serde(default)]
    pub coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub county_name: String,
    #[serde(default)]
    pub town_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Coordinate {
    #[serde(default)]
    pub coordinate_name: String,
    pub station_latitude: f64,
    pub station_longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherElement {
    #[serde(rename = "Now")]
    pub now: Option<Now>,
}

#[derive(Debug, Deserialize)]
pub struct Now {
    /// Number or numeric string; the feed uses negative sentinels for
    /// missing readings.
    #[serde(rename = "Precipitation", default)]
    pub precipitation: Value,
}

impl Station {
    /// WGS84 position as `(lat, lon)`.
    ///
    /// The feed lists TWD67 first and WGS84 second; prefer the entry named
    /// WGS84, then the second entry, then whatever exists.
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        let coords = &self.geo_info.coordinates;
        coords
            .iter()
            .find(|c| c.coordinate_name.eq_ignore_ascii_case("WGS84"))
            .or_else(|| coords.get(1))
            .or_else(|| coords.first())
            .map(|c| (c.station_latitude, c.station_longitude))
    }

    /// Current precipitation in mm. Missing or unparseable readings are 0.
    #[must_use]
    pub fn rainfall(&self) -> f64 {
        let value = match self.weather_element.now.as_ref().map(|n| &n.precipitation) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0)
    }

    /// Observation time normalised to RFC 3339 when parseable.
    #[must_use]
    pub fn publish_time(&self) -> String {
        DateTime::parse_from_rfc3339(&self.obs_time.date_time)
            .map_or_else(|_| self.obs_time.date_time.clone(), |t| t.to_rfc3339())
    }
}

/// Fetch the latest observations.
pub async fn fetch(
    client: &DataClient,
    url: &str,
    api_key: &str,
) -> Result<RainStationResponse, ProviderError> {
    client
        .get_json(url, &[("Authorization", api_key), ("format", "JSON")])
        .await
}

/// One point feature per station with a known position.
#[must_use]
pub fn to_feature_collection(response: &RainStationResponse) -> Value {
    let features = response
        .records
        .stations
        .iter()
        .filter_map(|station| {
            let (lat, lon) = station.position()?;
            Some(point_feature(
                lat,
                lon,
                json!({
                    "siteName": station.station_name,
                    "siteId": station.station_id,
                    "publishTime": station.publish_time(),
                    "rainfall": station.rainfall(),
                    "county": station.geo_info.county_name,
                    "town": station.geo_info.town_name,
                }),
            ))
        })
        .collect();
    feature_collection(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "success": "true",
        "result": { "resource_id": "O-A0001-001", "fields": [] },
        "records": {
            "Station": [
                {
                    "StationName": "Xinyi",
                    "StationId": "C0AC70",
                    "ObsTime": { "DateTime": "2024-05-01T10:00:00+08:00" },
                    "GeoInfo": {
                        "Coordinates": [
                            { "CoordinateName": "TWD67", "CoordinateFormat": "decimal degrees", "StationLatitude": 25.0353, "StationLongitude": 121.5585 },
                            { "CoordinateName": "WGS84", "CoordinateFormat": "decimal degrees", "StationLatitude": 25.0336, "StationLongitude": 121.5667 }
                        ],
                        "StationAltitude": "27.0",
                        "CountyName": "Taipei City",
                        "TownName": "Xinyi District",
                        "CountyCode": "63000",
                        "TownCode": "6300100"
                    },
                    "WeatherElement": { "Weather": "cloudy", "Now": { "Precipitation": 12.5 } }
                },
                {
                    "StationName": "Alishan",
                    "StationId": "467530",
                    "ObsTime": { "DateTime": "not a date" },
                    "GeoInfo": {
                        "Coordinates": [
                            { "CoordinateName": "WGS84", "CoordinateFormat": "decimal degrees", "StationLatitude": 23.5082, "StationLongitude": 120.8132 }
                        ],
                        "CountyName": "Chiayi County",
                        "TownName": "Alishan"
                    },
                    "WeatherElement": { "Now": { "Precipitation": "-99" } }
                },
                {
                    "StationName": "Nowhere",
                    "StationId": "X00000",
                    "ObsTime": { "DateTime": "2024-05-01T10:00:00+08:00" },
                    "GeoInfo": { "Coordinates": [] },
                    "WeatherElement": { "Now": { "Precipitation": "3.0" } }
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_and_transform() {
        let response: RainStationResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(response.records.stations.len(), 3);

        let collection = to_feature_collection(&response);
        let features = collection["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);

        let xinyi = &features[0];
        assert_eq!(xinyi["geometry"]["coordinates"][0], 121.5667);
        assert_eq!(xinyi["geometry"]["coordinates"][1], 25.0336);
        assert_eq!(xinyi["properties"]["siteId"], "C0AC70");
        assert_eq!(xinyi["properties"]["rainfall"], 12.5);
        assert_eq!(xinyi["properties"]["county"], "Taipei City");
        assert_eq!(xinyi["properties"]["publishTime"], "2024-05-01T10:00:00+08:00");
    }

    #[test]
    fn test_missing_reading_is_zero() {
        let response: RainStationResponse = serde_json::from_str(SAMPLE).unwrap();
        let alishan = &response.records.stations[1];
        assert!(alishan.rainfall().abs() < f64::EPSILON);
        assert_eq!(alishan.publish_time(), "not a date");
        assert_eq!(alishan.position(), Some((23.5082, 120.8132)));
        assert!((response.records.stations[2].rainfall() - 3.0).abs() < f64::EPSILON);
    }
}

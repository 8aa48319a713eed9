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

//! Layer keys: the `(category, index)` address of one toggleable overlay.
//!
//! Keys render canonically as `"<category>-<index>"`, e.g. `weather-2` or
//! `disaster-potential-0`.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

/// Errors that can occur while parsing a canonical key string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("missing sub-button index in key '{0}'")]
    MissingIndex(String),

    #[error("invalid sub-button index '{index}' in key '{key}'")]
    InvalidIndex {
        key: String,
        index: String,
        #[source]
        source: ParseIntError,
    },

    #[error("unknown category '{0}'")]
    UnknownCategory(String),
}

/// Button groups of the map toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Weather,
    DisasterPotential,
    IsolatedDisaster,
    RainfallAnalysis,
    Traffic,
    MathModel,
    MachineLearning,
    DisasterPrediction,
    HistoricalDisaster,
}

impl Category {
    /// Every category, in toolbar order.
    pub const ALL: [Category; 9] = [
        Category::Weather,
        Category::DisasterPotential,
        Category::IsolatedDisaster,
        Category::RainfallAnalysis,
        Category::Traffic,
        Category::MathModel,
        Category::MachineLearning,
        Category::DisasterPrediction,
        Category::HistoricalDisaster,
    ];

    /// Stable slug used in canonical keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Weather => "weather",
            Category::DisasterPotential => "disaster-potential",
            Category::IsolatedDisaster => "isolated-disaster",
            Category::RainfallAnalysis => "rainfall-analysis",
            Category::Traffic => "traffic",
            Category::MathModel => "math-model",
            Category::MachineLearning => "machine-learning",
            Category::DisasterPrediction => "disaster-prediction",
            Category::HistoricalDisaster => "historical-disaster",
        }
    }

    /// Build the key for sub-button `index` of this category.
    #[must_use]
    pub fn key(self, index: usize) -> LayerKey {
        LayerKey::new(self, index)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| KeyParseError::UnknownCategory(s.to_string()))
    }
}

/// Address of a single toggleable layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerKey {
    pub category: Category,
    pub index: usize,
}

impl LayerKey {
    #[must_use]
    pub fn new(category: Category, index: usize) -> Self {
        Self { category, index }
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.category, self.index)
    }
}

impl FromStr for LayerKey {
    type Err = KeyParseError;

    /// Parse `"<category>-<index>"`. The split happens at the last `-`
    /// since category slugs contain dashes themselves.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (category, index) = s
            .rsplit_once('-')
            .ok_or_else(|| KeyParseError::MissingIndex(s.to_string()))?;

        if index.is_empty() {
            return Err(KeyParseError::MissingIndex(s.to_string()));
        }

        let index = index
            .parse()
            .map_err(|source| KeyParseError::InvalidIndex {
                key: s.to_string(),
                index: index.to_string(),
                source,
            })?;

        Ok(Self {
            category: category.parse()?,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        assert_eq!(LayerKey::new(Category::Weather, 2).to_string(), "weather-2");
        assert_eq!(
            Category::DisasterPotential.key(0).to_string(),
            "disaster-potential-0"
        );
    }

    #[test]
    fn test_parse_dashed_category() {
        let key: LayerKey = "historical-disaster-1".parse().unwrap();
        assert_eq!(key.category, Category::HistoricalDisaster);
        assert_eq!(key.index, 1);
    }

    #[test]
    fn test_parse_every_category() {
        for category in Category::ALL {
            let key = category.key(7);
            assert_eq!(key.to_string().parse::<LayerKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "weather".parse::<LayerKey>(),
            Err(KeyParseError::MissingIndex("weather".to_string()))
        );
        assert_eq!(
            "weather-".parse::<LayerKey>(),
            Err(KeyParseError::MissingIndex("weather-".to_string()))
        );
        assert!(matches!(
            "weather-x".parse::<LayerKey>(),
            Err(KeyParseError::InvalidIndex { .. })
        ));
        assert_eq!(
            "lightning-0".parse::<LayerKey>(),
            Err(KeyParseError::UnknownCategory("lightning".to_string()))
        );
    }
}

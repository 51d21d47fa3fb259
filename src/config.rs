//! Timeline configuration file
//!
//! A JSON document describing the tag rules, the row layout and the slide
//! states of a deck. Every field is optional.

use crate::error::{Error, Result};
use har_timeline_core::fit::{Layout, Selection};
use har_timeline_core::tags::{compile_tag_specs, TagSet, TagSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// One slide state and the records it zooms to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateConfig {
    /// State name as reported by the presentation host
    pub name: String,
    /// Records to frame while the state is active
    #[serde(default)]
    pub select: Selection,
    /// Overrides the deck-wide margin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    /// Tags whose bars are highlighted while the state is active
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlight: Vec<String>,
}

/// Deck-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Page title
    pub title: String,
    /// Default zoom margin, as a fraction of the selection's extent
    pub margin: f64,
    /// Row geometry
    pub layout: Layout,
    /// Horizontal resolution of the rendered chart
    pub pixels_per_ms: f64,
    /// Tag name -> rule
    pub tags: BTreeMap<String, TagSpec>,
    /// Slide states, in deck order
    pub states: Vec<StateConfig>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            title: "Request Timeline".to_string(),
            margin: 0.1,
            layout: Layout::default(),
            pixels_per_ms: 0.5,
            tags: BTreeMap::new(),
            states: Vec::new(),
        }
    }
}

impl TimelineConfig {
    /// Load configuration from a JSON file; a missing file yields defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.pixels_per_ms.is_finite() && self.pixels_per_ms > 0.0) {
            return Err(Error::ConfigError(
                "pixels_per_ms must be a positive number".to_string(),
            ));
        }
        if self.layout.item_height <= 0.0 || self.layout.item_margin < 0.0 {
            return Err(Error::ConfigError(
                "layout needs a positive item_height and a non-negative item_margin".to_string(),
            ));
        }

        let margins = std::iter::once(self.margin).chain(self.states.iter().filter_map(|s| s.margin));
        for margin in margins {
            if !(margin.is_finite() && margin >= 0.0) {
                return Err(Error::ConfigError(format!("invalid margin {}", margin)));
            }
        }

        let mut seen = HashSet::new();
        for state in &self.states {
            if state.name.trim().is_empty() {
                return Err(Error::ConfigError("state names cannot be empty".to_string()));
            }
            if !seen.insert(state.name.as_str()) {
                return Err(Error::ConfigError(format!(
                    "duplicate state '{}'",
                    state.name
                )));
            }
            for tag in state.highlight.iter().chain(selection_tag(&state.select)) {
                if !self.tags.contains_key(tag) {
                    return Err(Error::ConfigError(format!(
                        "state '{}' refers to unknown tag '{}'",
                        state.name, tag
                    )));
                }
            }
        }

        Ok(())
    }

    /// Compile the configured tags. `first_party` is the capture's primary
    /// domain, used by `first_party` rules.
    pub fn tag_set(&self, first_party: Option<&str>) -> Result<TagSet> {
        Ok(compile_tag_specs(&self.tags, first_party)?)
    }

    pub fn state(&self, name: &str) -> Option<&StateConfig> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Margin in effect for a state
    pub fn margin_for(&self, state: &StateConfig) -> f64 {
        state.margin.unwrap_or(self.margin)
    }
}

fn selection_tag(selection: &Selection) -> Option<&String> {
    match selection {
        Selection::Tag(name) => Some(name),
        _ => None,
    }
}

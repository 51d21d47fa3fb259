//! Minimal HAR 1.2 structures needed to build a request timeline.
//!
//! Only the fields the normalizer reads are modelled. Unknown fields are
//! ignored, and everything the timeline can live without is optional so
//! that a sparse capture still deserializes and fails later with a
//! descriptive error instead of a serde one.

use serde::{Deserialize, Serialize};

/// Root HAR document (top-level wrapper).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarDocument {
    pub log: HarLog,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HarLog {
    #[serde(default)]
    pub pages: Vec<HarPage>,
    #[serde(default)]
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarPage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Navigation start, ISO 8601
    #[serde(default)]
    pub started_date_time: Option<String>,
    #[serde(default)]
    pub page_timings: Option<PageTimings>,
}

/// Page milestones in ms relative to `startedDateTime`. HAR uses `-1`
/// for "not available".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageTimings {
    #[serde(default)]
    pub on_content_load: Option<f64>,
    #[serde(default)]
    pub on_load: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarEntry {
    #[serde(default)]
    pub pageref: Option<String>,
    pub started_date_time: String,
    /// Total elapsed time of the request in ms
    #[serde(default)]
    pub time: f64,
    pub request: HarRequest,
    #[serde(default)]
    pub response: HarResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarRequest {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HarResponse {
    #[serde(default)]
    pub content: HarContent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarContent {
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl HarDocument {
    /// Parse a HAR document from a JSON string
    pub fn from_json(content: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a HAR document from a JSON file
    pub fn load_from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::error::Error::FileReadError {
                path: path.display().to_string(),
                source: e,
            })?;

        Self::from_json(&content)
    }

    /// The first page, which is the only one a timeline is built for
    pub fn first_page(&self) -> Option<&HarPage> {
        self.log.pages.first()
    }
}

impl HarEntry {
    /// Response MIME type, `""` when the capture omits it
    pub fn mime_type(&self) -> &str {
        self.response.content.mime_type.as_deref().unwrap_or("")
    }
}

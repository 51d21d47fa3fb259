//! Capture loading
//!
//! Reading the HAR file is the only asynchronous step; normalization and
//! fitting run synchronously on the loaded document.

use crate::config::TimelineConfig;
use crate::error::{Error, Result};
use har_timeline_core::{primary_domain, HarDocument, Normalizer, Timeline};
use std::path::Path;
use tracing::{debug, info};

/// Read and parse a HAR file
pub async fn load_document(path: &Path) -> Result<HarDocument> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;

    debug!("Read {} bytes from {:?}", content.len(), path);

    Ok(HarDocument::from_json(&content)?)
}

/// Normalize a loaded document with the tags of `config`
pub fn build_timeline(doc: &HarDocument, config: &TimelineConfig) -> Result<Timeline> {
    let first_party = primary_domain(doc);
    if let Some(domain) = &first_party {
        debug!("Primary domain: {}", domain);
    }

    let tags = config.tag_set(first_party.as_deref())?;
    let timeline = Normalizer::new(tags).normalize(doc)?;

    info!(
        "Loaded {} requests for page '{}' (onLoad at {} ms)",
        timeline.len(),
        timeline.page_id,
        timeline.on_load
    );

    Ok(timeline)
}

/// Load a HAR file and normalize it
pub async fn load_timeline(path: &Path, config: &TimelineConfig) -> Result<Timeline> {
    let doc = load_document(path).await?;
    build_timeline(&doc, config)
}

//! har-timeline - HAR captures as zoomable request timelines for slide decks
//!
//! This library loads a HAR capture, normalizes its first page into a
//! timeline of requests, and renders it as a standalone HTML page whose
//! zoom and highlights follow the states of a presentation.
//!
//! # Features
//!
//! - Tag requests with URL patterns or structured rules from a JSON config
//! - Frame any selection of requests with a per-axis zoom
//! - Map slide states to zoom/highlight handlers
//! - Generate an SVG timeline page
//!
//! # Example
//!
//! ```no_run
//! use har_timeline::{config::TimelineConfig, html, loader, slides::Deck};
//!
//! # async fn run() -> har_timeline::Result<()> {
//! let config = TimelineConfig::load_from_file("deck.json".as_ref())?;
//! let timeline = loader::load_timeline("capture.har".as_ref(), &config).await?;
//!
//! let deck = Deck::from_config(&timeline, &config);
//! let html = html::generate_timeline(&timeline, &config, &deck.state_views())?;
//! println!("{}", html);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod html;
pub mod loader;
pub mod slides;

pub use error::{Error, Result};

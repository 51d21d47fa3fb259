//! har-timeline-core - HAR normalization and viewport fitting
//!
//! This crate turns a HAR capture into an ordered list of typed, tagged
//! request intervals, and computes the zoom needed to frame any subset of
//! them. It does no rendering and no I/O beyond reading a capture file.
//!
//! # Features
//!
//! - Parse the first page of a HAR capture into [`RequestRecord`]s
//! - Tag records with URL patterns or arbitrary predicates
//! - Compute per-axis zoom factors for a selection
//! - Map presentation state changes to enter/exit handlers

pub mod data;
pub mod error;
pub mod fit;
pub mod har;
pub mod normalize;
pub mod states;
pub mod tags;

pub use data::{RequestRecord, ResourceType, Timeline};
pub use error::{Error, Result};
pub use fit::{compute_fit, extent, fit_selection, Extent, Layout, Scale, Selection};
pub use har::HarDocument;
pub use normalize::{
    abbreviate_url, normalize_from_file, normalize_from_str, primary_domain, round_ms, split_url,
    Normalizer,
};
pub use states::{StateHandlers, StateRegistry, Transition};
pub use tags::{compile_tag_specs, TagRule, TagSet, TagSpec};

//! Viewport fitting: how far to magnify the timeline so that a selected
//! subset of records fills the canvas.
//!
//! Every record sits on its own row. Its position is its index in the
//! sequence handed to [`compute_fit`], computed fresh on each call, so the
//! same row layout is used before and after a selection is applied.

use crate::data::{RequestRecord, ResourceType};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row geometry of the rendered timeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Layout {
    /// Height of one bar
    pub item_height: f64,
    /// Gap between two bars
    pub item_margin: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            item_height: 14.0,
            item_margin: 2.0,
        }
    }
}

impl Layout {
    /// Distance between the tops of two consecutive rows
    pub fn row_pitch(&self) -> f64 {
        self.item_height + self.item_margin
    }

    /// Top of the row at `position`
    pub fn row_top(&self, position: usize) -> f64 {
        position as f64 * self.row_pitch()
    }

    /// Bottom edge of the row at `position`
    pub fn row_bottom(&self, position: usize) -> f64 {
        self.row_top(position) + self.item_height
    }
}

/// Far corner of a set of bars (the origin is the top-left)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Extent {
    /// Rightmost `end`, in ms
    pub x: f64,
    /// Top of the lowest row
    pub y: f64,
}

impl Extent {
    fn include(&mut self, position: usize, record: &RequestRecord, layout: &Layout) {
        self.x = self.x.max(record.end);
        self.y = self.y.max(layout.row_top(position));
    }
}

/// Extent of the whole sequence
pub fn extent(records: &[RequestRecord], layout: &Layout) -> Extent {
    let mut extent = Extent::default();
    for (position, record) in records.iter().enumerate() {
        extent.include(position, record, layout);
    }
    extent
}

/// Independent magnification factors for both axes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}x{:.3}", self.x, self.y)
    }
}

/// Compute the scale that makes the records matching `predicate` fill the
/// canvas occupied by all of `records`.
///
/// `None` matches everything and yields [`Scale::IDENTITY`]. On an axis
/// where the selection ends before the full set, the selection's extent is
/// widened by `margin` (a fraction, `0.1` = 10%) but never past the full
/// extent.
///
/// Rows are measured by their top, so a selection of only the first row
/// has no height and fails with [`Error::DegenerateSelection`] unless the
/// whole set is a single row.
pub fn compute_fit(
    records: &[RequestRecord],
    predicate: Option<&dyn Fn(&RequestRecord) -> bool>,
    margin: f64,
    layout: &Layout,
) -> Result<Scale> {
    if !margin.is_finite() || margin < 0.0 {
        return Err(Error::ConfigError(format!(
            "margin must be a non-negative number, got {}",
            margin
        )));
    }

    let full = extent(records, layout);
    let mut selected = Extent::default();
    let mut matched = 0usize;

    for (position, record) in records.iter().enumerate() {
        if predicate.map_or(true, |p| p(record)) {
            selected.include(position, record, layout);
            matched += 1;
        }
    }

    if matched == 0 {
        return Err(Error::EmptySelection);
    }

    Ok(Scale {
        x: axis_scale(full.x, selected.x, margin, "x")?,
        y: axis_scale(full.y, selected.y, margin, "y")?,
    })
}

fn axis_scale(full: f64, selected: f64, margin: f64, axis: &'static str) -> Result<f64> {
    // Nothing to magnify on an axis the whole canvas has no size on
    if full <= 0.0 {
        return Ok(1.0);
    }
    if selected <= 0.0 {
        return Err(Error::DegenerateSelection(axis));
    }

    let selected = if selected < full {
        (selected * (1.0 + margin)).min(full)
    } else {
        selected
    };

    Ok(full / selected)
}

/// Configuration form of a fit predicate
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Every record (zoom reset)
    #[default]
    All,
    /// Records whose tag is set
    Tag(String),
    /// Records of one resource type
    Kind(ResourceType),
    /// Records served from a domain or its subdomains
    Domain(String),
}

impl Selection {
    pub fn matches(&self, record: &RequestRecord) -> bool {
        match self {
            Selection::All => true,
            Selection::Tag(name) => record.has_tag(name),
            Selection::Kind(kind) => record.kind == *kind,
            Selection::Domain(domain) => record.is_under_domain(domain),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Tag(name) => write!(f, "tag:{}", name),
            Selection::Kind(kind) => write!(f, "kind:{}", kind),
            Selection::Domain(domain) => write!(f, "domain:{}", domain),
        }
    }
}

/// [`compute_fit`] for a configured selection
pub fn fit_selection(
    records: &[RequestRecord],
    selection: &Selection,
    margin: f64,
    layout: &Layout,
) -> Result<Scale> {
    match selection {
        Selection::All => compute_fit(records, None, margin, layout),
        _ => {
            let matches = |r: &RequestRecord| selection.matches(r);
            compute_fit(records, Some(&matches), margin, layout)
        }
    }
}

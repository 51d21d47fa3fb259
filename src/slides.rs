//! Slide states wired to viewport fits
//!
//! Each configured state gets an enter handler that frames its selection
//! and turns on its highlights, and an exit handler that resets the
//! viewport. [`Deck::walk`] replays a sequence of states the way a
//! presentation host would report them.

use crate::config::{StateConfig, TimelineConfig};
use crate::error::{Error, Result};
use har_timeline_core::fit::{fit_selection, Layout, Scale};
use har_timeline_core::states::{StateHandlers, StateRegistry, Transition};
use har_timeline_core::{RequestRecord, Timeline};
use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, warn};

/// What the rendering surface currently shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Viewport {
    pub scale: Scale,
    /// Tags whose bars are highlighted
    pub highlight: Vec<String>,
    /// Why the last fit failed, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Precomputed view of one state, for the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateView {
    pub name: String,
    pub scale: Scale,
    pub highlight: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One step of a replayed state sequence
#[derive(Debug, Clone, PartialEq)]
pub struct WalkStep {
    pub state: String,
    pub transition: Transition,
    pub viewport: Viewport,
}

/// State registry for one timeline and configuration
pub struct Deck {
    registry: StateRegistry<Viewport>,
    order: Vec<String>,
}

impl Deck {
    pub fn from_config(timeline: &Timeline, config: &TimelineConfig) -> Self {
        let records: Rc<[RequestRecord]> = timeline.records.clone().into();
        let mut registry = StateRegistry::new();

        for state in &config.states {
            let handlers = state_handlers(
                state,
                Rc::clone(&records),
                config.layout,
                config.margin_for(state),
            );
            registry.register(state.name.clone(), handlers);
        }

        Self {
            registry,
            order: config.states.iter().map(|s| s.name.clone()).collect(),
        }
    }

    /// State names in deck order
    pub fn state_names(&self) -> &[String] {
        &self.order
    }

    /// Enter every state from a blank viewport and record the result
    pub fn state_views(&self) -> Vec<StateView> {
        self.order
            .iter()
            .map(|name| {
                let mut viewport = Viewport::default();
                self.registry.transition(None, Some(name), &mut viewport);
                if let Some(err) = &viewport.error {
                    warn!("State '{}' cannot be framed: {}", name, err);
                }
                StateView {
                    name: name.clone(),
                    scale: viewport.scale,
                    highlight: viewport.highlight,
                    error: viewport.error,
                }
            })
            .collect()
    }

    /// Replay `states` in order, starting from no state
    pub fn walk<S: AsRef<str>>(&self, states: &[S]) -> Result<Vec<WalkStep>> {
        if let Some(unknown) = states
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !self.registry.contains(name))
        {
            return Err(Error::UnknownState(unknown.to_string()));
        }

        let mut viewport = Viewport::default();
        let mut current: Option<&str> = None;
        let mut steps = Vec::with_capacity(states.len());

        for name in states.iter().map(AsRef::as_ref) {
            let transition = self.registry.transition(current, Some(name), &mut viewport);
            debug!("{:?} -> {} ({:?})", current, name, transition);
            current = Some(name);
            steps.push(WalkStep {
                state: name.to_string(),
                transition,
                viewport: viewport.clone(),
            });
        }

        Ok(steps)
    }
}

fn state_handlers(
    state: &StateConfig,
    records: Rc<[RequestRecord]>,
    layout: Layout,
    margin: f64,
) -> StateHandlers<Viewport> {
    let selection = state.select.clone();
    let highlight = state.highlight.clone();

    StateHandlers::new()
        .on_enter(move |viewport: &mut Viewport| {
            match fit_selection(&records, &selection, margin, &layout) {
                Ok(scale) => {
                    viewport.scale = scale;
                    viewport.error = None;
                }
                Err(e) => {
                    viewport.scale = Scale::IDENTITY;
                    viewport.error = Some(e.to_string());
                }
            }
            viewport.highlight = highlight.clone();
        })
        .on_exit(|viewport: &mut Viewport| {
            *viewport = Viewport::default();
        })
}

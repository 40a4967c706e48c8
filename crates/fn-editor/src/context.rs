//! Diagram-context detection.
//!
//! The host SPA navigates without reloading, so the page is watched two ways:
//! an interval poll of the URL and a DOM-mutation signal. Both feed one
//! watcher, which coalesces every signal in a short window into a single
//! evaluation and reports only real transitions.

use fn_core::DiagramId;
use fn_core::page::{BUILDER_PATH, DIAGRAM_ID_PARAM, diagram_id_from_url, is_diagram_page};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// URL poll period.
    pub poll_interval_ms: u32,
    /// Signals within this window after the first are folded into one check.
    pub debounce_ms: f64,
    /// Path fragment that identifies the diagram editor.
    pub builder_path: String,
    /// Query parameter carrying the diagram id.
    pub id_param: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            debounce_ms: 250.0,
            builder_path: BUILDER_PATH.to_string(),
            id_param: DIAGRAM_ID_PARAM.to_string(),
        }
    }
}

/// Where a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    Poll,
    Mutation,
}

/// Evaluated page state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiagramContext {
    pub on_diagram: bool,
    pub diagram: Option<DiagramId>,
}

impl DiagramContext {
    pub fn evaluate(href: &str, config: &WatcherConfig) -> Self {
        let on_diagram = is_diagram_page(href, &config.builder_path);
        Self {
            on_diagram,
            diagram: if on_diagram {
                diagram_id_from_url(href, &config.id_param)
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextChange {
    /// Arrived on a diagram page: inject the toolbar.
    Entered(Option<DiagramId>),
    /// Left the diagram editor: tear everything down.
    Left,
    /// Still in the editor but a different diagram is open.
    Switched {
        from: Option<DiagramId>,
        to: Option<DiagramId>,
    },
    /// The DOM was rebuilt while on a diagram page; the toolbar may need
    /// re-injecting.
    Rebuilt,
}

#[derive(Debug, Clone)]
struct Pending {
    href: String,
    mutated: bool,
    deadline: f64,
}

#[derive(Debug)]
pub struct ContextWatcher {
    config: WatcherConfig,
    current: DiagramContext,
    last_href: String,
    pending: Option<Pending>,
}

impl ContextWatcher {
    /// Start watching from `href`; the initial state is evaluated at once.
    pub fn new(config: WatcherConfig, href: &str) -> Self {
        let current = DiagramContext::evaluate(href, &config);
        Self {
            config,
            current,
            last_href: href.to_string(),
            pending: None,
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn current(&self) -> &DiagramContext {
        &self.current
    }

    /// Record a signal. Unchanged URLs from the poll are dropped here.
    pub fn signal(&mut self, source: SignalSource, href: &str, now_ms: f64) {
        let mutated = source == SignalSource::Mutation;
        if !mutated && self.pending.is_none() && href == self.last_href {
            return;
        }
        match &mut self.pending {
            Some(p) => {
                p.href.clear();
                p.href.push_str(href);
                p.mutated |= mutated;
            }
            None => {
                self.pending = Some(Pending {
                    href: href.to_string(),
                    mutated,
                    deadline: now_ms + self.config.debounce_ms,
                });
            }
        }
    }

    /// Evaluate coalesced signals once their window has elapsed.
    pub fn flush(&mut self, now_ms: f64) -> Option<ContextChange> {
        if self.pending.as_ref().is_none_or(|p| now_ms < p.deadline) {
            return None;
        }
        let pending = self.pending.take()?;
        let next = DiagramContext::evaluate(&pending.href, &self.config);
        self.last_href = pending.href;
        let change = match (self.current.on_diagram, next.on_diagram) {
            (false, true) => Some(ContextChange::Entered(next.diagram.clone())),
            (true, false) => Some(ContextChange::Left),
            (true, true) if self.current.diagram != next.diagram => Some(ContextChange::Switched {
                from: self.current.diagram.clone(),
                to: next.diagram.clone(),
            }),
            (true, true) if pending.mutated => Some(ContextChange::Rebuilt),
            _ => None,
        };
        if let Some(change) = &change
            && !matches!(change, ContextChange::Rebuilt)
        {
            log::debug!("diagram context: {change:?}");
        }
        self.current = next;
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HOME: &str = "https://acme.lightning.force.com/lightning/page/home";
    const FLOW_A: &str =
        "https://acme.lightning.force.com/builder_platform_interaction/flowBuilder.app?flowId=301A";
    const FLOW_B: &str =
        "https://acme.lightning.force.com/builder_platform_interaction/flowBuilder.app?flowId=301B";

    #[test]
    fn initial_state_is_evaluated() {
        let w = ContextWatcher::new(WatcherConfig::default(), FLOW_A);
        assert!(w.current().on_diagram);
        assert_eq!(w.current().diagram, Some(DiagramId::new("301A")));
    }

    #[test]
    fn signals_are_debounced_and_coalesced() {
        let mut w = ContextWatcher::new(WatcherConfig::default(), HOME);
        w.signal(SignalSource::Mutation, HOME, 0.0);
        w.signal(SignalSource::Poll, FLOW_A, 100.0);
        w.signal(SignalSource::Mutation, FLOW_A, 200.0);
        assert_eq!(w.flush(240.0), None);
        assert_eq!(
            w.flush(250.0),
            Some(ContextChange::Entered(Some(DiagramId::new("301A"))))
        );
        assert_eq!(w.flush(1000.0), None);
    }

    #[test]
    fn unchanged_poll_is_ignored() {
        let mut w = ContextWatcher::new(WatcherConfig::default(), FLOW_A);
        w.signal(SignalSource::Poll, FLOW_A, 0.0);
        assert_eq!(w.flush(10_000.0), None);
    }

    #[test]
    fn transitions() {
        let mut w = ContextWatcher::new(WatcherConfig::default(), FLOW_A);
        w.signal(SignalSource::Poll, FLOW_B, 0.0);
        assert_eq!(
            w.flush(300.0),
            Some(ContextChange::Switched {
                from: Some(DiagramId::new("301A")),
                to: Some(DiagramId::new("301B")),
            })
        );
        w.signal(SignalSource::Mutation, FLOW_B, 400.0);
        assert_eq!(w.flush(700.0), Some(ContextChange::Rebuilt));
        w.signal(SignalSource::Poll, HOME, 800.0);
        assert_eq!(w.flush(1100.0), Some(ContextChange::Left));
        // Mutations off the diagram page are not interesting.
        w.signal(SignalSource::Mutation, HOME, 1200.0);
        assert_eq!(w.flush(1500.0), None);
    }
}

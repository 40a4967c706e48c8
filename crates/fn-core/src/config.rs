//! Reconciliation tuning.
//!
//! Every threshold here is empirical. They are plain data so the host can
//! override any subset from JSON (`#[serde(default)]` fills the rest).

use serde::{Deserialize, Serialize};

// ─── Jump suppression ────────────────────────────────────────────────────

/// Thresholds for detecting a position computed from a mid-transition
/// matrix read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpThresholds {
    /// Below this effective scale the canvas counts as heavily zoomed out.
    pub zoomed_out_scale: f64,
    /// Max displacement (px) accepted in one tick while zoomed out.
    pub zoomed_out_max_jump: f64,
    /// Side length (px) of the square at the viewport origin that spurious
    /// reads tend to collapse into.
    pub origin_region: f64,
    /// Min displacement (px) for a move into the origin region to count as
    /// spurious.
    pub origin_jump: f64,
    /// A collapse only counts when the prior position was further than this
    /// (px) from the origin on either axis.
    pub far_from_origin: f64,
}

impl Default for JumpThresholds {
    fn default() -> Self {
        Self {
            zoomed_out_scale: 0.5,
            zoomed_out_max_jump: 300.0,
            origin_region: 200.0,
            origin_jump: 400.0,
            far_from_origin: 300.0,
        }
    }
}

// ─── Reconciler ──────────────────────────────────────────────────────────

/// Configuration for the per-frame reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub jump: JumpThresholds,
    /// Lower clamp for the display scale applied to note overlays.
    pub min_display_scale: f64,
    /// Upper clamp for the display scale applied to note overlays.
    pub max_display_scale: f64,
    /// Below this display scale a note is drawn faded.
    pub fade_below_scale: f64,
    /// Opacity used for faded notes.
    pub faded_opacity: f64,
    /// Projected sizes outside `[min_dimension, max_dimension]` px are
    /// treated as a failed mapping.
    pub min_dimension: f64,
    pub max_dimension: f64,
    /// Baseline note width (px) at display scale 1.0.
    pub base_width: f64,
    /// Baseline note height (px) when none was recorded at creation.
    pub base_height: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            jump: JumpThresholds::default(),
            min_display_scale: 0.5,
            max_display_scale: 2.0,
            fade_below_scale: 0.6,
            faded_opacity: 0.5,
            min_dimension: 1.0,
            max_dimension: 10_000.0,
            base_width: 300.0,
            base_height: 200.0,
        }
    }
}

impl ReconcileConfig {
    /// Parse a (possibly partial) JSON override on top of the defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid reconcile config: {e}"))
    }

    pub fn clamp_display_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_display_scale, self.max_display_scale)
    }

    pub fn dimension_ok(&self, v: f64) -> bool {
        v.is_finite() && v >= self.min_dimension && v <= self.max_dimension
    }
}

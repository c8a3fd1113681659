use log::warn;
use serde::Deserialize;

/// Tunable motion and timing constants for the deck.
///
/// Every field falls back to its default when missing from the manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    /// Minimum release speed (px/ms, either axis) that counts as a flick.
    pub flick_threshold: f64,
    pub reset_delay_ms: u32,
    /// Extra distance past the viewport edge a dismissed card travels.
    pub exit_margin: f64,
    pub drag_scale: f64,
    pub friction: f64,
    pub tension_active: f64,
    pub tension_dismissed: f64,
    pub tension_rest: f64,
    pub entrance_stagger_ms: f64,
    pub stack_step: f64,
    /// Resting tilt is drawn from `[-tilt_spread, tilt_spread)` degrees.
    pub tilt_spread: f64,
    pub entrance_lift: f64,
    pub entrance_scale: f64,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            flick_threshold: 0.2,
            reset_delay_ms: 600,
            exit_margin: 200.0,
            drag_scale: 1.1,
            friction: 50.0,
            tension_active: 800.0,
            tension_dismissed: 200.0,
            tension_rest: 500.0,
            entrance_stagger_ms: 100.0,
            stack_step: 4.0,
            tilt_spread: 10.0,
            entrance_lift: 1000.0,
            entrance_scale: 1.5,
        }
    }
}

impl DeckSettings {
    /// Replaces non-finite or negative values with their defaults.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            flick_threshold: checked("flick_threshold", self.flick_threshold, defaults.flick_threshold),
            reset_delay_ms: self.reset_delay_ms,
            exit_margin: checked("exit_margin", self.exit_margin, defaults.exit_margin),
            drag_scale: positive("drag_scale", self.drag_scale, defaults.drag_scale),
            friction: checked("friction", self.friction, defaults.friction),
            tension_active: positive("tension_active", self.tension_active, defaults.tension_active),
            tension_dismissed: positive(
                "tension_dismissed",
                self.tension_dismissed,
                defaults.tension_dismissed,
            ),
            tension_rest: positive("tension_rest", self.tension_rest, defaults.tension_rest),
            entrance_stagger_ms: checked(
                "entrance_stagger_ms",
                self.entrance_stagger_ms,
                defaults.entrance_stagger_ms,
            ),
            stack_step: checked("stack_step", self.stack_step, defaults.stack_step),
            tilt_spread: checked("tilt_spread", self.tilt_spread, defaults.tilt_spread),
            entrance_lift: checked("entrance_lift", self.entrance_lift, defaults.entrance_lift),
            entrance_scale: positive("entrance_scale", self.entrance_scale, defaults.entrance_scale),
        }
    }
}

fn checked(name: &str, value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!("Ignoring invalid setting {}={}, using {}", name, value, fallback);
        fallback
    }
}

fn positive(name: &str, value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("Ignoring non-positive setting {}={}, using {}", name, value, fallback);
        fallback
    }
}

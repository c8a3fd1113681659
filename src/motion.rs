use rand::Rng;

use crate::config::DeckSettings;

const PERSPECTIVE_PX: f64 = 1500.0;
const BASE_TILT_X_DEG: f64 = 30.0;
const DRAG_TILT_DIVISOR: f64 = 100.0;
const FLICK_TILT_GAIN: f64 = 10.0;

/// Animated transform of a single card. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransform {
    pub x: f64,
    pub y: f64,
    pub rot_x: f64,
    pub rot_y: f64,
    /// Resting tilt of the card inside the stack.
    pub rot_z: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    pub tension: f64,
    pub friction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Option<Self> {
        if width.is_finite() && height.is_finite() && width >= 0.0 && height >= 0.0 {
            Some(Self { width, height })
        } else {
            None
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
        }
    }
}

/// Off-screen above and enlarged, where every card starts.
pub fn entrance(settings: &DeckSettings) -> CardTransform {
    CardTransform {
        x: 0.0,
        y: -settings.entrance_lift,
        rot_x: 0.0,
        rot_y: 0.0,
        rot_z: 0.0,
        scale: settings.entrance_scale,
    }
}

/// Stacked in place; later cards sit slightly higher.
pub fn resting(index: usize, tilt: f64, settings: &DeckSettings) -> CardTransform {
    CardTransform {
        x: 0.0,
        y: index as f64 * -settings.stack_step,
        rot_x: 0.0,
        rot_y: 0.0,
        rot_z: tilt,
        scale: 1.0,
    }
}

pub fn rest_tilt(rng: &mut impl Rng, settings: &DeckSettings) -> f64 {
    let spread = settings.tilt_spread;
    if spread <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-spread..spread)
}

pub fn entrance_delay(index: usize, settings: &DeckSettings) -> f64 {
    index as f64 * settings.entrance_stagger_ms
}

/// Distance a dismissed card travels along one axis.
pub fn exit_offset(extent: f64, direction: f64, settings: &DeckSettings) -> f64 {
    (settings.exit_margin + extent) * direction
}

/// Tilt around one axis from the drag movement on the other, plus a kick
/// when the card is flung away.
pub fn drag_tilt(movement: f64, direction: f64, velocity: f64, dismissed: bool) -> f64 {
    let kick = if dismissed {
        direction * FLICK_TILT_GAIN * velocity
    } else {
        0.0
    };
    movement / DRAG_TILT_DIVISOR + kick
}

pub fn spring_for(active: bool, dismissed: bool, settings: &DeckSettings) -> SpringConfig {
    let tension = if active {
        settings.tension_active
    } else if dismissed {
        settings.tension_dismissed
    } else {
        settings.tension_rest
    };
    SpringConfig {
        tension,
        friction: settings.friction,
    }
}

pub fn rest_spring(settings: &DeckSettings) -> SpringConfig {
    spring_for(false, false, settings)
}

pub fn card_offset_css(transform: &CardTransform) -> String {
    format!(
        "transform: translate3d({:.2}px, {:.2}px, 0px);",
        transform.x, transform.y
    )
}

pub fn card_transform_css(transform: &CardTransform) -> String {
    format!(
        "transform: perspective({}px) rotateX({:.3}deg) rotateY({:.3}deg) rotateZ({:.3}deg) scale({:.4});",
        PERSPECTIVE_PX,
        BASE_TILT_X_DEG + transform.rot_x,
        transform.rot_z / 10.0 + transform.rot_y,
        transform.rot_z,
        transform.scale
    )
}

use crate::deck::DeckState;
use crate::motion::{CardTransform, SpringConfig};

// react-spring units: mass 1, velocity in units per ms.
const STEP_MS: f64 = 1.0;
const MAX_FRAME_MS: f64 = 64.0;
const PRECISION: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub value: f64,
    pub velocity: f64,
    pub target: f64,
    pub config: SpringConfig,
}

impl Spring {
    pub fn at_rest(value: f64, config: SpringConfig) -> Self {
        Self {
            value,
            velocity: 0.0,
            target: value,
            config,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.velocity.abs() < PRECISION && (self.value - self.target).abs() < PRECISION
    }

    /// Advances by `dt_ms` in fixed substeps. Returns true while moving.
    pub fn step(&mut self, dt_ms: f64) -> bool {
        if self.is_settled() {
            self.value = self.target;
            self.velocity = 0.0;
            return false;
        }
        let mut remaining = dt_ms;
        while remaining > 0.0 {
            let step = remaining.min(STEP_MS);
            let spring_force = -self.config.tension * 0.000_001 * (self.value - self.target);
            let damping_force = -self.config.friction * 0.001 * self.velocity;
            self.velocity += (spring_force + damping_force) * step;
            self.value += self.velocity * step;
            remaining -= step;
        }
        if self.is_settled() {
            self.value = self.target;
            self.velocity = 0.0;
            return false;
        }
        true
    }
}

#[derive(Debug, Clone)]
struct CardSprings {
    channels: [Spring; 6],
    delay_ms: f64,
    revision: Option<u64>,
}

impl CardSprings {
    fn resting_at(transform: &CardTransform, config: SpringConfig) -> Self {
        Self {
            channels: channels(transform).map(|value| Spring::at_rest(value, config)),
            delay_ms: 0.0,
            revision: None,
        }
    }

    fn retarget(&mut self, transform: &CardTransform, config: SpringConfig, delay_ms: f64) {
        for (spring, target) in self.channels.iter_mut().zip(channels(transform)) {
            spring.target = target;
            spring.config = config;
        }
        self.delay_ms = delay_ms;
    }

    fn step(&mut self, dt_ms: f64) -> bool {
        let mut dt = dt_ms;
        if self.delay_ms > 0.0 {
            let waited = dt.min(self.delay_ms);
            self.delay_ms -= waited;
            dt -= waited;
            if self.delay_ms > 0.0 {
                return true;
            }
        }
        let mut moving = false;
        for spring in self.channels.iter_mut() {
            moving |= spring.step(dt);
        }
        moving
    }

    fn current(&self) -> CardTransform {
        let [x, y, rot_x, rot_y, rot_z, scale] = self.channels.map(|spring| spring.value);
        CardTransform {
            x,
            y,
            rot_x,
            rot_y,
            rot_z,
            scale,
        }
    }
}

fn channels(transform: &CardTransform) -> [f64; 6] {
    [
        transform.x,
        transform.y,
        transform.rot_x,
        transform.rot_y,
        transform.rot_z,
        transform.scale,
    ]
}

/// Per-card springs that chase the targets published by [`DeckState`].
#[derive(Debug, Default)]
pub struct DeckAnimator {
    cards: Vec<CardSprings>,
    epoch: Option<u64>,
}

impl DeckAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks up new targets. A new deck epoch snaps every card back to the
    /// entrance transform first.
    pub fn sync(&mut self, deck: &DeckState) {
        if self.epoch != Some(deck.epoch()) || self.cards.len() != deck.len() {
            let entrance = deck.entrance();
            self.cards = deck
                .targets()
                .iter()
                .map(|target| CardSprings::resting_at(&entrance, target.spring))
                .collect();
            self.epoch = Some(deck.epoch());
        }

        for (springs, target) in self.cards.iter_mut().zip(deck.targets()) {
            if springs.revision != Some(target.revision) {
                springs.retarget(&target.transform, target.spring, target.delay_ms);
                springs.revision = Some(target.revision);
            }
        }
    }

    /// Advances every card; returns true while any card is still moving.
    pub fn step(&mut self, dt_ms: f64) -> bool {
        let dt = if dt_ms.is_finite() {
            dt_ms.clamp(0.0, MAX_FRAME_MS)
        } else {
            0.0
        };
        let mut moving = false;
        for card in self.cards.iter_mut() {
            moving |= card.step(dt);
        }
        moving
    }

    pub fn current(&self, index: usize) -> Option<CardTransform> {
        self.cards.get(index).map(CardSprings::current)
    }
}

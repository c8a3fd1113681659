use std::collections::HashMap;

use log::debug;

/// Pointer travel (px) beyond which a press no longer counts as a tap.
pub const TAP_SLOP_PX: f64 = 4.0;
/// A release this long after the last movement carries no velocity.
pub const RELEASE_IDLE_MS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Active,
    Released,
}

/// One interpreted drag sample.
///
/// `movement` is the displacement from the press point, `direction` the
/// per-axis sign of the latest movement (-1, 0 or 1) and `velocity` the
/// per-axis speed in px/ms (always non-negative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSample {
    pub phase: GesturePhase,
    pub movement: [f64; 2],
    pub direction: [f64; 2],
    pub velocity: [f64; 2],
}

impl GestureSample {
    pub fn is_finite(&self) -> bool {
        self.movement
            .iter()
            .chain(self.direction.iter())
            .chain(self.velocity.iter())
            .all(|value| value.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub index: usize,
    pub sample: GestureSample,
    /// The pointer never left the tap slop, so this was a click.
    pub tap: bool,
}

#[derive(Debug, Clone)]
struct DragSession {
    index: usize,
    start: [f64; 2],
    last: [f64; 2],
    last_ms: f64,
    direction: [f64; 2],
    velocity: [f64; 2],
    moved: bool,
}

impl DragSession {
    fn new(index: usize, x: f64, y: f64, now_ms: f64) -> Self {
        Self {
            index,
            start: [x, y],
            last: [x, y],
            last_ms: now_ms,
            direction: [0.0, 0.0],
            velocity: [0.0, 0.0],
            moved: false,
        }
    }

    fn update(&mut self, x: f64, y: f64, now_ms: f64) {
        let delta = [x - self.last[0], y - self.last[1]];
        if delta == [0.0, 0.0] {
            return;
        }
        let dt = now_ms - self.last_ms;
        for axis in 0..2 {
            if delta[axis] != 0.0 {
                self.direction[axis] = delta[axis].signum();
            }
            if dt > 0.0 {
                self.velocity[axis] = delta[axis].abs() / dt;
            }
        }
        self.last = [x, y];
        self.last_ms = now_ms;

        if !self.moved {
            let dx = x - self.start[0];
            let dy = y - self.start[1];
            self.moved = dx * dx + dy * dy > TAP_SLOP_PX * TAP_SLOP_PX;
        }
    }

    fn sample(&self, phase: GesturePhase) -> GestureSample {
        GestureSample {
            phase,
            movement: [self.last[0] - self.start[0], self.last[1] - self.start[1]],
            direction: self.direction,
            velocity: self.velocity,
        }
    }
}

/// Tracks one drag session per pointer. Nothing is kept once a pointer is
/// released or cancelled.
#[derive(Debug, Default)]
pub struct GestureInterpreter {
    sessions: HashMap<i32, DragSession>,
}

impl GestureInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a drag on `index`. Returns `None` if the card is already held
    /// by another pointer or the input is not finite.
    pub fn press(
        &mut self,
        pointer_id: i32,
        index: usize,
        x: f64,
        y: f64,
        now_ms: f64,
    ) -> Option<GestureSample> {
        if !all_finite(x, y, now_ms) {
            debug!("Dropping non-finite press for pointer {}", pointer_id);
            return None;
        }
        if self.is_held(index) {
            return None;
        }
        let session = DragSession::new(index, x, y, now_ms);
        let sample = session.sample(GesturePhase::Active);
        self.sessions.insert(pointer_id, session);
        Some(sample)
    }

    pub fn motion(
        &mut self,
        pointer_id: i32,
        x: f64,
        y: f64,
        now_ms: f64,
    ) -> Option<(usize, GestureSample)> {
        if !all_finite(x, y, now_ms) {
            return None;
        }
        let session = self.sessions.get_mut(&pointer_id)?;
        session.update(x, y, now_ms);
        Some((session.index, session.sample(GesturePhase::Active)))
    }

    pub fn release(&mut self, pointer_id: i32, x: f64, y: f64, now_ms: f64) -> Option<Release> {
        let mut session = self.sessions.remove(&pointer_id)?;
        if all_finite(x, y, now_ms) {
            session.update(x, y, now_ms);
            if now_ms - session.last_ms > RELEASE_IDLE_MS {
                session.velocity = [0.0, 0.0];
            }
        }
        Some(Release {
            index: session.index,
            sample: session.sample(GesturePhase::Released),
            tap: !session.moved,
        })
    }

    /// Ends the session without a flick so the card settles back.
    pub fn cancel(&mut self, pointer_id: i32) -> Option<(usize, GestureSample)> {
        let mut session = self.sessions.remove(&pointer_id)?;
        session.velocity = [0.0, 0.0];
        Some((session.index, session.sample(GesturePhase::Released)))
    }

    pub fn is_held(&self, index: usize) -> bool {
        self.sessions.values().any(|session| session.index == index)
    }
}

fn all_finite(x: f64, y: f64, now_ms: f64) -> bool {
    x.is_finite() && y.is_finite() && now_ms.is_finite()
}

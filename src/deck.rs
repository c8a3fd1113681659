use std::collections::BTreeSet;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::DeckSettings;
use crate::gesture::{GesturePhase, GestureSample};
use crate::motion::{self, CardTransform, SpringConfig, Viewport};

/// Where a card's springs should head next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTarget {
    pub transform: CardTransform,
    pub spring: SpringConfig,
    pub delay_ms: f64,
    /// Bumped on every recompute so the animator can spot changes.
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResetTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReset {
    pub ticket: ResetTicket,
    pub delay_ms: u32,
}

#[derive(Debug)]
pub struct DeckState {
    settings: DeckSettings,
    viewport: Viewport,
    rng: StdRng,
    targets: Vec<CardTarget>,
    tilts: Vec<f64>,
    dismissed: BTreeSet<usize>,
    /// Cards currently under a pointer.
    held: BTreeSet<usize>,
    flipped: Vec<bool>,
    pending_reset: Option<PendingReset>,
    next_ticket: u64,
    epoch: u64,
}

impl DeckState {
    pub fn new(len: usize, settings: DeckSettings, seed: u64) -> Self {
        let mut deck = Self {
            settings,
            viewport: Viewport::default(),
            rng: StdRng::seed_from_u64(seed),
            targets: Vec::new(),
            tilts: Vec::new(),
            dismissed: BTreeSet::new(),
            held: BTreeSet::new(),
            flipped: Vec::new(),
            pending_reset: None,
            next_ticket: 0,
            epoch: 0,
        };
        deck.initialize(len);
        deck
    }

    /// Puts every card back at its entrance transform heading for rest, and
    /// clears dismissed and flipped state.
    pub fn initialize(&mut self, len: usize) {
        let settings = &self.settings;
        let rng = &mut self.rng;
        self.tilts = (0..len).map(|_| motion::rest_tilt(rng, settings)).collect();

        let previous = std::mem::take(&mut self.targets);
        self.targets = (0..len)
            .map(|index| CardTarget {
                transform: motion::resting(index, self.tilts[index], &self.settings),
                spring: motion::rest_spring(&self.settings),
                delay_ms: motion::entrance_delay(index, &self.settings),
                revision: previous.get(index).map_or(0, |t| t.revision + 1),
            })
            .collect();

        self.dismissed.clear();
        self.held.clear();
        self.flipped = vec![false; len];
        self.pending_reset = None;
        self.epoch += 1;
    }

    pub fn apply_gesture(&mut self, index: usize, sample: &GestureSample) {
        assert!(
            index < self.targets.len(),
            "card index {} out of range for deck of {}",
            index,
            self.targets.len()
        );

        if !sample.is_finite() {
            debug!("Ignoring malformed gesture sample for card {}: {:?}", index, sample);
            return;
        }

        if let Some(pending) = self.pending_reset.take() {
            debug!("Gesture on card {} cancels pending reset {:?}", index, pending.ticket);
        }

        let active = sample.phase == GesturePhase::Active;
        if active {
            self.held.insert(index);
        } else {
            self.held.remove(&index);
        }
        let threshold = self.settings.flick_threshold;
        let trigger_x = sample.velocity[0].abs() > threshold;
        let trigger_y = sample.velocity[1].abs() > threshold;

        if !active && (trigger_x || trigger_y) && self.dismissed.insert(index) {
            debug!("Card {} dismissed", index);
        }

        let dismissed = self.dismissed.contains(&index);
        let [mx, my] = sample.movement;
        let [x_dir, y_dir] = sample.direction;
        let [vx, vy] = sample.velocity;

        let (x, y) = if dismissed {
            (
                motion::exit_offset(self.viewport.width, x_dir, &self.settings),
                motion::exit_offset(self.viewport.height, y_dir, &self.settings),
            )
        } else if active {
            (mx, my)
        } else {
            (0.0, 0.0)
        };

        let target = &mut self.targets[index];
        target.transform = CardTransform {
            x,
            y,
            rot_x: motion::drag_tilt(my, y_dir, vy, dismissed),
            rot_y: motion::drag_tilt(mx, x_dir, vx, dismissed),
            rot_z: self.tilts[index],
            scale: if active { self.settings.drag_scale } else { 1.0 },
        };
        target.spring = motion::spring_for(active, dismissed, &self.settings);
        target.delay_ms = 0.0;
        target.revision += 1;

        // A card still under a pointer issues the ticket on its own release.
        if !active && self.held.is_empty() && self.dismissed.len() == self.targets.len() {
            let ticket = ResetTicket(self.next_ticket);
            self.next_ticket += 1;
            self.pending_reset = Some(PendingReset {
                ticket,
                delay_ms: self.settings.reset_delay_ms,
            });
            info!(
                "All {} cards dismissed, reset in {}ms",
                self.targets.len(),
                self.settings.reset_delay_ms
            );
        }
    }

    pub fn toggle_flip(&mut self, index: usize) {
        assert!(
            index < self.flipped.len(),
            "card index {} out of range for deck of {}",
            index,
            self.flipped.len()
        );
        self.flipped[index] = !self.flipped[index];
    }

    pub fn pending_reset(&self) -> Option<PendingReset> {
        self.pending_reset
    }

    /// Runs the scheduled reset if `ticket` is still the current one.
    pub fn fire_reset(&mut self, ticket: ResetTicket) -> bool {
        match self.pending_reset {
            Some(pending) if pending.ticket == ticket => {
                info!("Resetting deck of {}", self.targets.len());
                self.initialize(self.targets.len());
                true
            }
            _ => {
                debug!("Ignoring stale reset {:?}", ticket);
                false
            }
        }
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        match Viewport::new(width, height) {
            Some(viewport) => self.viewport = viewport,
            None => debug!("Ignoring invalid viewport {}x{}", width, height),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn target(&self, index: usize) -> &CardTarget {
        &self.targets[index]
    }

    pub fn targets(&self) -> &[CardTarget] {
        &self.targets
    }

    /// Transform every card jumps to when a new epoch starts.
    pub fn entrance(&self) -> CardTransform {
        motion::entrance(&self.settings)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_dismissed(&self, index: usize) -> bool {
        self.dismissed.contains(&index)
    }

    pub fn is_flipped(&self, index: usize) -> bool {
        self.flipped[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 0x5EED;

    impl DeckState {
        fn dismissed_count(&self) -> usize {
            self.dismissed.len()
        }

        fn flipped(&self) -> &[bool] {
            &self.flipped
        }
    }

    fn deck(len: usize) -> DeckState {
        let mut deck = DeckState::new(len, DeckSettings::default(), SEED);
        deck.set_viewport(800.0, 600.0);
        deck
    }

    fn sample(phase: GesturePhase, movement: [f64; 2], direction: [f64; 2], velocity: [f64; 2]) -> GestureSample {
        GestureSample {
            phase,
            movement,
            direction,
            velocity,
        }
    }

    fn flick(velocity: [f64; 2]) -> GestureSample {
        sample(GesturePhase::Released, [120.0, 10.0], [1.0, 1.0], velocity)
    }

    fn dismiss_all(deck: &mut DeckState) {
        for index in 0..deck.len() {
            deck.apply_gesture(index, &flick([0.5, 0.0]));
        }
    }

    #[test]
    fn initialize_clears_flags() {
        let deck = deck(4);
        assert_eq!(deck.dismissed_count(), 0);
        assert_eq!(deck.flipped(), &[false; 4]);
        assert!(deck.pending_reset().is_none());
        assert_eq!(deck.epoch(), 1);
        for (index, target) in deck.targets().iter().enumerate() {
            assert_eq!(target.transform.y, index as f64 * -4.0);
            assert_eq!(target.transform.scale, 1.0);
            assert_eq!(target.delay_ms, index as f64 * 100.0);
        }
    }

    #[test]
    fn toggle_flip_touches_one_card() {
        let mut deck = deck(4);
        deck.toggle_flip(2);
        assert_eq!(deck.flipped(), &[false, false, true, false]);
        deck.toggle_flip(2);
        assert_eq!(deck.flipped(), &[false; 4]);
    }

    #[test]
    #[should_panic]
    fn toggle_flip_out_of_range_panics() {
        deck(4).toggle_flip(4);
    }

    #[test]
    #[should_panic]
    fn gesture_out_of_range_panics() {
        deck(4).apply_gesture(9, &flick([0.5, 0.0]));
    }

    #[test]
    fn slow_release_never_dismisses() {
        let mut deck = deck(4);
        deck.apply_gesture(1, &flick([0.2, -0.2]));
        assert!(!deck.is_dismissed(1));
        let target = deck.target(1).transform;
        assert_eq!((target.x, target.y), (0.0, 0.0));
        assert_eq!(target.scale, 1.0);
    }

    #[test]
    fn fast_active_drag_does_not_dismiss() {
        let mut deck = deck(4);
        deck.apply_gesture(
            0,
            &sample(GesturePhase::Active, [40.0, -5.0], [1.0, -1.0], [3.0, 0.0]),
        );
        assert!(!deck.is_dismissed(0));
        let target = deck.target(0);
        assert_eq!((target.transform.x, target.transform.y), (40.0, -5.0));
        assert_eq!(target.transform.scale, 1.1);
        assert_eq!(target.spring.tension, 800.0);
    }

    #[test]
    fn flick_dismisses_toward_exit() {
        let mut deck = deck(4);
        deck.apply_gesture(0, &sample(GesturePhase::Released, [150.0, 0.0], [1.0, 0.0], [0.5, 0.0]));
        assert!(deck.is_dismissed(0));
        let target = deck.target(0);
        assert_eq!(target.transform.x, (200.0 + 800.0) * 1.0);
        assert_eq!(target.transform.y, 0.0);
        assert_eq!(target.transform.scale, 1.0);
        assert_eq!(target.transform.rot_y, 150.0 / 100.0 + 10.0 * 0.5);
        assert_eq!(target.spring.tension, 200.0);
    }

    #[test]
    fn vertical_flick_dismisses() {
        let mut deck = deck(4);
        deck.apply_gesture(3, &sample(GesturePhase::Released, [0.0, -90.0], [0.0, -1.0], [0.0, 0.3]));
        assert!(deck.is_dismissed(3));
        assert_eq!(deck.target(3).transform.y, -(200.0 + 600.0));
    }

    #[test]
    fn dismiss_is_idempotent_and_sticky() {
        let mut deck = deck(4);
        deck.apply_gesture(0, &flick([0.5, 0.0]));
        deck.apply_gesture(0, &flick([0.5, 0.0]));
        assert!(deck.is_dismissed(0));
        assert_eq!(deck.dismissed_count(), 1);

        deck.apply_gesture(0, &flick([0.0, 0.0]));
        assert!(deck.is_dismissed(0));
        assert_eq!(deck.target(0).transform.x, 1000.0);
    }

    #[test]
    fn gesture_only_moves_its_own_card() {
        let mut deck = deck(4);
        let before = deck.targets().to_vec();
        deck.apply_gesture(1, &sample(GesturePhase::Active, [30.0, 30.0], [1.0, 1.0], [0.1, 0.1]));
        deck.apply_gesture(1, &flick([0.9, 0.9]));
        for (index, target) in deck.targets().iter().enumerate() {
            if index == 1 {
                assert_ne!(*target, before[index]);
            } else {
                assert_eq!(*target, before[index]);
            }
        }
    }

    #[test]
    fn malformed_sample_is_ignored() {
        let mut deck = deck(4);
        let before = *deck.target(0);
        deck.apply_gesture(0, &flick([f64::NAN, 0.0]));
        deck.apply_gesture(0, &sample(GesturePhase::Released, [f64::INFINITY, 0.0], [1.0, 0.0], [0.9, 0.0]));
        assert_eq!(*deck.target(0), before);
        assert!(!deck.is_dismissed(0));
    }

    #[test]
    fn last_dismiss_schedules_reset() {
        let mut deck = deck(4);
        for index in 0..3 {
            deck.apply_gesture(index, &flick([0.5, 0.0]));
            assert!(deck.pending_reset().is_none());
        }
        deck.apply_gesture(3, &flick([0.5, 0.0]));
        let pending = deck.pending_reset().unwrap();
        assert_eq!(pending.delay_ms, 600);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut deck = deck(4);
        deck.toggle_flip(1);
        dismiss_all(&mut deck);
        let pending = deck.pending_reset().unwrap();

        assert!(deck.fire_reset(pending.ticket));
        assert_eq!(deck.dismissed_count(), 0);
        assert_eq!(deck.flipped(), &[false; 4]);
        assert!(deck.pending_reset().is_none());
        assert_eq!(deck.epoch(), 2);
        for (index, target) in deck.targets().iter().enumerate() {
            assert_eq!(target.transform.x, 0.0);
            assert_eq!(target.transform.y, index as f64 * -4.0);
            assert_eq!(target.transform.scale, 1.0);
            assert_eq!(target.delay_ms, index as f64 * 100.0);
            assert_eq!(target.spring.tension, 500.0);
        }
        assert_eq!(deck.entrance().y, -1000.0);
        assert_eq!(deck.entrance().scale, 1.5);
    }

    #[test]
    fn reset_bumps_revisions() {
        let mut deck = deck(2);
        let before: Vec<u64> = deck.targets().iter().map(|t| t.revision).collect();
        dismiss_all(&mut deck);
        let pending = deck.pending_reset().unwrap();
        deck.fire_reset(pending.ticket);
        for (target, old) in deck.targets().iter().zip(before) {
            assert!(target.revision > old);
        }
    }

    #[test]
    fn gesture_cancels_pending_reset() {
        let mut deck = deck(2);
        dismiss_all(&mut deck);
        let stale = deck.pending_reset().unwrap().ticket;

        deck.apply_gesture(0, &sample(GesturePhase::Active, [5.0, 0.0], [1.0, 0.0], [0.0, 0.0]));
        assert!(deck.pending_reset().is_none());
        assert!(!deck.fire_reset(stale));
        assert_eq!(deck.dismissed_count(), 2);

        deck.apply_gesture(0, &flick([0.0, 0.0]));
        let fresh = deck.pending_reset().unwrap().ticket;
        assert_ne!(fresh, stale);
        assert!(!deck.fire_reset(stale));
        assert!(deck.fire_reset(fresh));
        assert_eq!(deck.dismissed_count(), 0);
    }

    #[test]
    fn reset_ticket_fires_once() {
        let mut deck = deck(1);
        deck.apply_gesture(0, &flick([0.5, 0.0]));
        let ticket = deck.pending_reset().unwrap().ticket;
        assert!(deck.fire_reset(ticket));
        assert!(!deck.fire_reset(ticket));
    }

    #[test]
    fn flipped_survives_dismiss() {
        let mut deck = deck(3);
        deck.toggle_flip(0);
        deck.apply_gesture(0, &flick([0.5, 0.0]));
        assert!(deck.is_dismissed(0));
        assert!(deck.is_flipped(0));
    }

    #[test]
    fn same_seed_same_tilts() {
        let a = DeckState::new(5, DeckSettings::default(), SEED);
        let b = DeckState::new(5, DeckSettings::default(), SEED);
        assert_eq!(a.targets(), b.targets());
    }

    #[test]
    fn invalid_viewport_is_ignored() {
        let mut deck = deck(1);
        deck.set_viewport(f64::NAN, 100.0);
        assert_eq!(deck.viewport, Viewport::new(800.0, 600.0).unwrap());
    }

    #[test]
    fn held_card_delays_reset_until_released() {
        let mut deck = deck(2);
        deck.apply_gesture(0, &flick([0.5, 0.0]));
        deck.apply_gesture(0, &sample(GesturePhase::Active, [3.0, 0.0], [1.0, 0.0], [0.0, 0.0]));
        deck.apply_gesture(1, &flick([0.5, 0.0]));
        assert_eq!(deck.dismissed_count(), 2);
        assert!(deck.pending_reset().is_none());

        deck.apply_gesture(0, &sample(GesturePhase::Released, [3.0, 0.0], [1.0, 0.0], [0.0, 0.0]));
        let pending = deck.pending_reset().unwrap();
        assert!(deck.fire_reset(pending.ticket));
        assert_eq!(deck.dismissed_count(), 0);
    }

    #[test]
    fn malformed_sample_does_not_hold_card() {
        let mut deck = deck(1);
        deck.apply_gesture(0, &sample(GesturePhase::Active, [f64::NAN, 0.0], [1.0, 0.0], [0.0, 0.0]));
        deck.apply_gesture(0, &flick([0.5, 0.0]));
        assert!(deck.pending_reset().is_some());
    }
}

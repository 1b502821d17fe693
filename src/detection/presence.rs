use serde::{Deserialize, Serialize};

use crate::sampling::SmoothedEstimate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PresenceState {
    Absent,
    Present,
}

impl Default for PresenceState {
    fn default() -> Self {
        PresenceState::Absent
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Transition {
    EnteredPresence,
    ExitedPresence,
    NoChange,
}

/// Half-widths of the presence zone, in the sensor's distance unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZoneThresholds {
    pub x: f32,
    pub z: f32,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self { x: 0.3, z: 1.0 }
    }
}

impl ZoneThresholds {
    pub fn contains(&self, estimate: &SmoothedEstimate) -> bool {
        estimate.x.abs() <= self.x && estimate.z.abs() <= self.z
    }
}

/// Strict two-state machine over smoothed estimates. Side-effect debouncing
/// lives in the dispatcher, not here.
#[derive(Debug, Default)]
pub struct PresenceDetector {
    state: PresenceState,
    thresholds: ZoneThresholds,
}

impl PresenceDetector {
    pub fn new(thresholds: ZoneThresholds) -> Self {
        Self {
            state: PresenceState::Absent,
            thresholds,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn thresholds(&self) -> ZoneThresholds {
        self.thresholds
    }

    pub fn evaluate(&mut self, estimate: &SmoothedEstimate) -> Transition {
        let (next, transition) = next_state(self.state, estimate, &self.thresholds);
        self.state = next;
        transition
    }
}

pub fn next_state(
    state: PresenceState,
    estimate: &SmoothedEstimate,
    thresholds: &ZoneThresholds,
) -> (PresenceState, Transition) {
    let present = thresholds.contains(estimate);

    match (state, present) {
        (PresenceState::Absent, true) => (PresenceState::Present, Transition::EnteredPresence),
        (PresenceState::Present, true) => (PresenceState::Present, Transition::NoChange),
        (PresenceState::Present, false) => (PresenceState::Absent, Transition::ExitedPresence),
        (PresenceState::Absent, false) => (PresenceState::Absent, Transition::NoChange),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, z: f32) -> SmoothedEstimate {
        SmoothedEstimate { x, z }
    }

    #[test]
    fn absent_to_present() {
        let (next, transition) = next_state(
            PresenceState::Absent,
            &at(0.0, 0.5),
            &ZoneThresholds::default(),
        );

        assert_eq!(next, PresenceState::Present);
        assert_eq!(transition, Transition::EnteredPresence);
    }

    #[test]
    fn present_to_absent() {
        let (next, transition) = next_state(
            PresenceState::Present,
            &at(0.0, 1.5),
            &ZoneThresholds::default(),
        );

        assert_eq!(next, PresenceState::Absent);
        assert_eq!(transition, Transition::ExitedPresence);
    }

    #[test]
    fn zone_edges_are_inclusive() {
        let zone = ZoneThresholds::default();
        assert!(zone.contains(&at(0.3, 1.0)));
        assert!(zone.contains(&at(-0.3, -1.0)));
        assert!(!zone.contains(&at(0.31, 0.0)));
        assert!(!zone.contains(&at(0.0, 1.01)));
    }

    #[test]
    fn outside_x_threshold_stays_absent() {
        let mut detector = PresenceDetector::default();
        assert_eq!(detector.evaluate(&at(0.5, 0.5)), Transition::NoChange);
        assert_eq!(detector.state(), PresenceState::Absent);
    }

    #[test]
    fn entered_once_per_present_run() {
        let mut detector = PresenceDetector::default();
        let sequence = [
            at(0.0, 0.5),
            at(0.1, 0.4),
            at(0.2, 0.9),
            at(2.0, 3.0),
            at(0.0, 0.2),
            at(0.0, 0.2),
        ];

        let transitions: Vec<Transition> =
            sequence.iter().map(|e| detector.evaluate(e)).collect();

        assert_eq!(
            transitions,
            vec![
                Transition::EnteredPresence,
                Transition::NoChange,
                Transition::NoChange,
                Transition::ExitedPresence,
                Transition::EnteredPresence,
                Transition::NoChange,
            ]
        );
    }

    #[test]
    fn custom_thresholds_are_respected() {
        let mut detector = PresenceDetector::new(ZoneThresholds { x: 1.0, z: 3.0 });
        assert_eq!(detector.evaluate(&at(0.9, 2.5)), Transition::EnteredPresence);
    }
}

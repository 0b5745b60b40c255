//! Round Events
//!
//! Wire format for everything the engine broadcasts. Serialized as
//! internally-tagged JSON so a frame looks like
//! `{"type":"TICK","multiplier":1.42}`.

use serde::{Deserialize, Serialize};

use crate::core::fixed::cents_to_f64;
use crate::game::round::{Phase, RoundSnapshot};

/// Events published by the round engine, fanned out by the broadcast hub.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum RoundEvent {
    /// A new round opened its betting window.
    Waiting {
        /// Round number.
        round_id: u64,
    },

    /// Betting closed; the multiplier starts climbing from 1.00x.
    RoundStart {
        /// Round number.
        round_id: u64,
    },

    /// One multiplier update (two-decimal value).
    Tick {
        /// Current multiplier.
        multiplier: f64,
    },

    /// The round crashed; the crash point is now public.
    Crash {
        /// Crash point (two-decimal value).
        crash_at: f64,
    },

    /// Snapshot sent only to new subscribers so late joiners see consistent
    /// state without waiting for the next tick.
    State {
        /// Current phase.
        phase: Phase,
        /// Displayed multiplier.
        multiplier: f64,
        /// Round number.
        round_id: u64,
    },
}

impl RoundEvent {
    /// Build the snapshot event for a new subscriber.
    pub fn state(snapshot: &RoundSnapshot) -> Self {
        RoundEvent::State {
            phase: snapshot.phase,
            multiplier: snapshot.multiplier,
            round_id: snapshot.round_id,
        }
    }

    /// Tick event from a cents multiplier.
    pub fn tick(cents: u64) -> Self {
        RoundEvent::Tick {
            multiplier: cents_to_f64(cents),
        }
    }

    /// Crash event from a cents crash point.
    pub fn crash(cents: u64) -> Self {
        RoundEvent::Crash {
            crash_at: cents_to_f64(cents),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_matches_protocol() {
        let json = serde_json::to_string(&RoundEvent::RoundStart { round_id: 42 }).unwrap();
        assert_eq!(json, r#"{"type":"ROUND_START","roundId":42}"#);

        let json = serde_json::to_string(&RoundEvent::tick(142)).unwrap();
        assert_eq!(json, r#"{"type":"TICK","multiplier":1.42}"#);

        let json = serde_json::to_string(&RoundEvent::crash(250)).unwrap();
        assert_eq!(json, r#"{"type":"CRASH","crashAt":2.5}"#);
    }

    #[test]
    fn test_state_event_shape() {
        let snap = RoundSnapshot {
            phase: Phase::Waiting,
            multiplier: 1.0,
            round_id: 3,
            crash_at: None,
        };
        let json = serde_json::to_string(&RoundEvent::state(&snap)).unwrap();
        assert_eq!(
            json,
            r#"{"type":"STATE","phase":"waiting","multiplier":1.0,"roundId":3}"#
        );
    }

    #[test]
    fn test_round_trip() {
        let event = RoundEvent::Waiting { round_id: 7 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(serde_json::from_str::<RoundEvent>(&json).unwrap(), event);
    }
}

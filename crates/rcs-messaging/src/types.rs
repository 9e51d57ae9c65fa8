//! ---
//! rcs_section: "02-messaging-event-model"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Event schema and notification channel."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Classification of simulation events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// The periodic clock was started.
    SimulationStarted,
    /// The periodic clock was stopped; state is preserved.
    SimulationPaused,
    /// The world was reinitialised.
    SimulationReset,
    /// The speed multiplier changed.
    SpeedChanged,
    /// A train took a platform at a station.
    TrainArrived,
    /// A train reached a full station and was held.
    TrainDelayed,
    /// A train left a station after its dwell.
    TrainDeparted,
    /// A disruption was queued.
    DisruptionInjected,
    /// A queued disruption reached its start time and took effect.
    DisruptionActivated,
    /// A disruption was resolved, manually or by expiry.
    DisruptionResolved,
    /// A failed signal was returned to service.
    SignalRepaired,
}

/// Immutable record of something that happened in the simulated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier.
    pub id: Uuid,
    /// Simulated minute at which the event occurred.
    pub timestamp: u64,
    /// Wall-clock instant the event was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Event classification.
    pub kind: EventKind,
    /// Human-readable summary.
    pub description: String,
    /// Train concerned by the event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_id: Option<String>,
    /// Station concerned by the event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_id: Option<String>,
    /// Kind-specific details.
    #[serde(default)]
    pub payload: JsonValue,
}

impl Event {
    /// Construct an event stamped with a fresh id and the current wall clock.
    pub fn new(kind: EventKind, timestamp: u64, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            recorded_at: Utc::now(),
            kind,
            description: description.into(),
            train_id: None,
            station_id: None,
            payload: JsonValue::Null,
        }
    }

    /// Attach the train concerned by the event.
    pub fn with_train(mut self, train_id: impl Into<String>) -> Self {
        self.train_id = Some(train_id.into());
        self
    }

    /// Attach the station concerned by the event.
    pub fn with_station(mut self, station_id: impl Into<String>) -> Self {
        self.station_id = Some(station_id.into());
        self
    }

    /// Attach kind-specific details.
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn builders_populate_optional_fields() {
        let event = Event::new(EventKind::TrainArrived, 42, "E1 arrived at Station B")
            .with_train("E1")
            .with_station("B")
            .with_payload(serde_json::json!({ "delay": 3.0 }));
        assert_eq!(event.timestamp, 42);
        assert_eq!(event.train_id.as_deref(), Some("E1"));
        assert_eq!(event.station_id.as_deref(), Some("B"));
        assert_eq!(event.payload["delay"], 3.0);
    }

    #[test]
    fn kinds_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&EventKind::DisruptionActivated).expect("serialize");
        assert_eq!(json, "\"disruption_activated\"");
        assert_eq!(EventKind::TrainDelayed.to_string(), "train_delayed");
        assert_eq!(
            EventKind::from_str("signal_repaired").expect("parse"),
            EventKind::SignalRepaired
        );
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let event = Event::new(EventKind::SimulationStarted, 0, "started");
        let value = serde_json::to_value(&event).expect("serialize");
        assert!(value.get("train_id").is_none());
        assert!(value.get("station_id").is_none());
        let back: Event = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, event);
    }
}

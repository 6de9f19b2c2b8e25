//! Shared domain types for the pomodoro session store, reducer, and hook
//! dispatcher.
//!
//! This crate is used by the event store, the reducer, the session service,
//! and the hook dispatcher to prevent schema drift between them. It owns the
//! on-the-wire shapes (`Session`, `SessionEvent`, `DerivedState`, the hook
//! JSON payload) but no persistence or process logic of its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two kinds of timed interval a session can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Focus,
    Break,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Focus => "focus",
            SessionKind::Break => "break",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "focus" => Some(SessionKind::Focus),
            "break" => Some(SessionKind::Break),
            _ => None,
        }
    }

    pub fn other(&self) -> Self {
        match self {
            SessionKind::Focus => SessionKind::Break,
            SessionKind::Break => SessionKind::Focus,
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transition in a session's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Started,
    Paused,
    Resumed,
    Aborted,
    Completed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Started => "started",
            EventKind::Paused => "paused",
            EventKind::Resumed => "resumed",
            EventKind::Aborted => "aborted",
            EventKind::Completed => "completed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "started" => Some(EventKind::Started),
            "paused" => Some(EventKind::Paused),
            "resumed" => Some(EventKind::Resumed),
            "aborted" => Some(EventKind::Aborted),
            "completed" => Some(EventKind::Completed),
            _ => None,
        }
    }

    /// Terminal event kinds end a session's lifecycle (invariant 4).
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Aborted | EventKind::Completed)
    }

    /// The hook file this event kind should fire, per spec §4.G.
    pub fn hook_name(&self) -> &'static str {
        match self {
            EventKind::Started | EventKind::Resumed => "start",
            EventKind::Paused | EventKind::Aborted | EventKind::Completed => "stop",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timed interval, as persisted in the `session` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub kind: SessionKind,
    pub planned_secs: i64,
    #[serde(with = "rfc3339_seconds")]
    pub created_at: DateTime<Utc>,
}

/// A single durable record of one transition in a session's life, as
/// persisted in the `session_event` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: String,
    pub kind: EventKind,
    pub session_id: String,
    #[serde(with = "rfc3339_seconds")]
    pub created_at: DateTime<Utc>,
}

/// The non-persisted `kind` a derived view reports when there is no latest
/// session at all, in addition to the two real session kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedKind {
    Focus,
    Break,
    None,
}

impl DerivedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedKind::Focus => "focus",
            DerivedKind::Break => "break",
            DerivedKind::None => "none",
        }
    }
}

impl std::fmt::Display for DerivedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SessionKind> for DerivedKind {
    fn from(kind: SessionKind) -> Self {
        match kind {
            SessionKind::Focus => DerivedKind::Focus,
            SessionKind::Break => DerivedKind::Break,
        }
    }
}

/// The non-persisted `state` a derived view reports (spec §3, §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedStateTag {
    Running,
    Paused,
    Completed,
    Aborted,
    None,
}

impl DerivedStateTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedStateTag::Running => "running",
            DerivedStateTag::Paused => "paused",
            DerivedStateTag::Completed => "completed",
            DerivedStateTag::Aborted => "aborted",
            DerivedStateTag::None => "none",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DerivedStateTag::Completed | DerivedStateTag::Aborted)
    }
}

impl std::fmt::Display for DerivedStateTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The view the reducer produces and the renderer consumes. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedState {
    pub kind: DerivedKind,
    pub state: DerivedStateTag,
    pub planned_secs: i64,
    pub elapsed_secs: i64,
    pub remaining_secs: i64,
}

impl DerivedState {
    /// The view reported when there is no latest session at all.
    pub fn none() -> Self {
        DerivedState {
            kind: DerivedKind::None,
            state: DerivedStateTag::None,
            planned_secs: 0,
            elapsed_secs: 0,
            remaining_secs: 0,
        }
    }
}

/// The JSON payload written to a hook's standard input (spec §4.G).
#[derive(Debug, Clone, Serialize)]
pub struct HookPayload {
    pub session: HookSessionPayload,
    pub session_event: HookEventPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookSessionPayload {
    pub id: String,
    pub kind: SessionKind,
    pub planned_secs: i64,
    #[serde(with = "rfc3339_seconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookEventPayload {
    pub id: String,
    pub kind: EventKind,
    pub session_id: String,
    #[serde(with = "rfc3339_seconds")]
    pub created_at: DateTime<Utc>,
}

impl HookPayload {
    pub fn new(session: &Session, event: &SessionEvent) -> Self {
        HookPayload {
            session: HookSessionPayload {
                id: session.id.clone(),
                kind: session.kind,
                planned_secs: session.planned_secs,
                created_at: session.created_at,
            },
            session_event: HookEventPayload {
                id: event.id.clone(),
                kind: event.kind,
                session_id: event.session_id.clone(),
                created_at: event.created_at,
            },
        }
    }
}

/// Serializes `DateTime<Utc>` as ISO-8601 with a trailing `Z` at second
/// granularity, matching spec §4.G ("Instants serialize as ISO-8601 UTC with
/// trailing `Z`"). `chrono`'s own RFC3339 serde impl emits `+00:00` instead.
mod rfc3339_seconds {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%SZ")
                    .map(|naive| Utc.from_utc_datetime(&naive))
            })
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn session_kind_round_trips_through_str() {
        assert_eq!(SessionKind::from_str("focus"), Some(SessionKind::Focus));
        assert_eq!(SessionKind::from_str("break"), Some(SessionKind::Break));
        assert_eq!(SessionKind::from_str("bogus"), None);
        assert_eq!(SessionKind::Focus.other(), SessionKind::Break);
    }

    #[test]
    fn event_kind_hook_routing_matches_spec_table() {
        assert_eq!(EventKind::Started.hook_name(), "start");
        assert_eq!(EventKind::Resumed.hook_name(), "start");
        assert_eq!(EventKind::Paused.hook_name(), "stop");
        assert_eq!(EventKind::Aborted.hook_name(), "stop");
        assert_eq!(EventKind::Completed.hook_name(), "stop");
        assert!(EventKind::Aborted.is_terminal());
        assert!(!EventKind::Paused.is_terminal());
    }

    #[test]
    fn derived_state_none_is_well_formed() {
        let none = DerivedState::none();
        assert_eq!(none.kind, DerivedKind::None);
        assert_eq!(none.state, DerivedStateTag::None);
        assert_eq!(
            serde_json::to_string(&none).unwrap(),
            r#"{"kind":"none","state":"none","planned_secs":0,"elapsed_secs":0,"remaining_secs":0}"#
        );
    }

    #[test]
    fn timestamps_serialize_with_trailing_z() {
        let session = Session {
            id: "01H0000000000000000000000".to_string(),
            kind: SessionKind::Focus,
            planned_secs: 1500,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"created_at\":\"2024-01-01T10:00:00Z\""));
    }

    #[test]
    fn hook_payload_carries_both_ids() {
        let session = Session {
            id: "sess-1".to_string(),
            kind: SessionKind::Break,
            planned_secs: 300,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
        };
        let event = SessionEvent {
            id: "evt-1".to_string(),
            kind: EventKind::Started,
            session_id: "sess-1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
        };
        let payload = HookPayload::new(&session, &event);
        assert_eq!(payload.session.id, "sess-1");
        assert_eq!(payload.session_event.session_id, "sess-1");
    }
}

//! The session state machine: `start`, `stop`, and the `status` read path
//! (spec §4.E).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rusqlite::Transaction;

use pomodoro_protocol::{DerivedState, DerivedStateTag, EventKind, Session, SessionEvent, SessionKind};

use crate::clock::Clock;
use crate::config::PomodoroConfig;
use crate::duration::parse_human_secs;
use crate::error::PomodoroError;
use crate::hooks::HookDispatcher;
use crate::ids::IdGenerator;
use crate::reducer::{self, reduce};
use crate::store::EventStore;

/// The event a transition appended, carried out of the held transaction so
/// the hook it fires can be dispatched only after the write has committed.
type Fired = Option<(Session, SessionEvent)>;

pub struct SessionService<'a> {
    store: &'a EventStore,
    clock: &'a dyn Clock,
    ids: &'a dyn IdGenerator,
    hooks: &'a HookDispatcher,
    config: &'a PomodoroConfig,
}

impl<'a> SessionService<'a> {
    pub fn new(
        store: &'a EventStore,
        clock: &'a dyn Clock,
        ids: &'a dyn IdGenerator,
        hooks: &'a HookDispatcher,
        config: &'a PomodoroConfig,
    ) -> Self {
        SessionService {
            store,
            clock,
            ids,
            hooks,
            config,
        }
    }

    /// `start(kind?, duration?)` per spec §4.E. The read of the latest
    /// session, the reduce, the decision, and the append all run inside one
    /// held transaction (spec §5) so a racing `start` cannot also observe
    /// "no non-terminal session" and create a second one.
    pub fn start(
        &self,
        kind: Option<SessionKind>,
        duration: Option<&str>,
    ) -> Result<DerivedState, PomodoroError> {
        let requested_kind = kind.unwrap_or(SessionKind::Focus);
        let requested_secs = match duration {
            Some(raw) => parse_human_secs(raw)?,
            None => self.default_duration_secs(requested_kind),
        };
        let now = self.clock.now();

        let (derived, fired) = self.store.with_transaction(|tx| {
            let latest = EventStore::latest_session_tx(tx)?;

            let Some(session) = latest else {
                return Self::create_session_tx(tx, self.ids, requested_kind, requested_secs, now);
            };

            let events = EventStore::events_for_session_asc_tx(tx, &session.id)?;
            let derived = reduce(&session, &events, now);

            match derived.state {
                DerivedStateTag::None | DerivedStateTag::Completed | DerivedStateTag::Aborted => {
                    Self::create_session_tx(tx, self.ids, requested_kind, requested_secs, now)
                }
                DerivedStateTag::Paused => {
                    if session.kind == requested_kind {
                        Self::append_transition_tx(tx, self.ids, &session, EventKind::Resumed, now)
                    } else {
                        Err(PomodoroError::StateConflict(format!(
                            "cannot resume {}; a {} session is paused",
                            requested_kind, session.kind
                        )))
                    }
                }
                DerivedStateTag::Running => {
                    if session.kind == requested_kind {
                        Ok((derived, None))
                    } else {
                        Err(PomodoroError::StateConflict(format!(
                            "cannot start {}; a {} session is already in progress",
                            requested_kind, session.kind
                        )))
                    }
                }
            }
        })?;

        self.dispatch_if_fired(fired);
        Ok(derived)
    }

    /// `stop(reset?)` per spec §4.E. Same single-transaction shape as
    /// `start`.
    pub fn stop(&self, reset: bool) -> Result<DerivedState, PomodoroError> {
        let now = self.clock.now();

        let (derived, fired) = self.store.with_transaction(|tx| {
            let latest = EventStore::latest_session_tx(tx)?;

            let Some(session) = latest else {
                return Err(PomodoroError::NotFound);
            };

            let events = EventStore::events_for_session_asc_tx(tx, &session.id)?;
            let derived = reduce(&session, &events, now);

            match derived.state {
                DerivedStateTag::Running => {
                    let kind = if reset {
                        EventKind::Aborted
                    } else {
                        EventKind::Paused
                    };
                    Self::append_transition_tx(tx, self.ids, &session, kind, now)
                }
                DerivedStateTag::Paused => {
                    if reset {
                        Self::append_transition_tx(tx, self.ids, &session, EventKind::Aborted, now)
                    } else {
                        Ok((derived, None))
                    }
                }
                _ => Err(PomodoroError::NotFound),
            }
        })?;

        self.dispatch_if_fired(fired);
        Ok(derived)
    }

    /// The `status` read path: performs auto-completion if the latest
    /// session is running but expired, then returns the state to render.
    /// The read, the expiry check, and the synthesized append all run
    /// inside the same held transaction as `start`/`stop`, so a second
    /// concurrent `status` call on the same session observes it already
    /// terminal and does not attempt a second append.
    pub fn status(&self) -> Result<DerivedState, PomodoroError> {
        let now = self.clock.now();

        let (derived, fired) = self.store.with_transaction(|tx| {
            let latest = EventStore::latest_session_tx(tx)?;

            let Some(session) = latest else {
                return Ok((DerivedState::none(), None));
            };

            let events = EventStore::events_for_session_asc_tx(tx, &session.id)?;
            let derived = reduce(&session, &events, now);

            if reducer::is_expired_running(&derived) {
                Self::auto_complete_on_status_tx(tx, self.ids, &session, &events, now)
            } else {
                Ok((derived, None))
            }
        })?;

        self.dispatch_if_fired(fired);
        Ok(derived)
    }

    /// Appends one `completed` event timestamped at the session's computed
    /// expiry instant (`created_at + planned_secs`), per the open-question
    /// resolution in the design notes.
    fn auto_complete_on_status_tx(
        tx: &Transaction,
        ids: &dyn IdGenerator,
        session: &Session,
        events: &[SessionEvent],
        now: DateTime<Utc>,
    ) -> Result<(DerivedState, Fired), PomodoroError> {
        let started_at = events
            .iter()
            .find(|e| e.kind == EventKind::Started)
            .map(|e| e.created_at)
            .unwrap_or(session.created_at);
        let expiry = started_at + ChronoDuration::seconds(session.planned_secs);

        let event = SessionEvent {
            id: ids.next_id(expiry),
            kind: EventKind::Completed,
            session_id: session.id.clone(),
            created_at: expiry,
        };

        EventStore::insert_event_tx(tx, &event)?;
        tracing::info!(session = %session.id, "auto-completed expired session");

        let fresh_events = EventStore::events_for_session_asc_tx(tx, &session.id)?;
        let derived = reduce(session, &fresh_events, now);
        Ok((derived, Some((session.clone(), event))))
    }

    fn create_session_tx(
        tx: &Transaction,
        ids: &dyn IdGenerator,
        kind: SessionKind,
        planned_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<(DerivedState, Fired), PomodoroError> {
        let session_id = ids.next_id(now);
        let event_id = ids.next_id(now);

        let session = Session {
            id: session_id,
            kind,
            planned_secs,
            created_at: now,
        };
        let event = SessionEvent {
            id: event_id,
            kind: EventKind::Started,
            session_id: session.id.clone(),
            created_at: now,
        };

        EventStore::insert_session_tx(tx, &session, &event)?;

        let events = vec![event.clone()];
        let derived = reduce(&session, &events, now);
        Ok((derived, Some((session, event))))
    }

    fn append_transition_tx(
        tx: &Transaction,
        ids: &dyn IdGenerator,
        session: &Session,
        kind: EventKind,
        now: DateTime<Utc>,
    ) -> Result<(DerivedState, Fired), PomodoroError> {
        let event = SessionEvent {
            id: ids.next_id(now),
            kind,
            session_id: session.id.clone(),
            created_at: now,
        };
        EventStore::insert_event_tx(tx, &event)?;

        let events = EventStore::events_for_session_asc_tx(tx, &session.id)?;
        let derived = reduce(session, &events, now);
        Ok((derived, Some((session.clone(), event))))
    }

    /// Fires the hook for a transition only after its transaction has
    /// committed (spec §4.G: "transition → hook", and a hook must never run
    /// for a write that got rolled back).
    fn dispatch_if_fired(&self, fired: Fired) {
        if let Some((session, event)) = fired {
            self.hooks.dispatch(&session, &event);
        }
    }

    fn default_duration_secs(&self, kind: SessionKind) -> i64 {
        match kind {
            SessionKind::Focus => self.config.focus_duration_secs,
            SessionKind::Break => self.config.break_duration_secs,
        }
    }
}

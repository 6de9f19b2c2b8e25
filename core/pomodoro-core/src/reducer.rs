//! Pure fold from a session's event log to a `DerivedState` (spec §4.D).
//!
//! Total and infallible: every event log consistent with the store's
//! invariants produces a well-formed derived state. Never touches the store
//! or the clock directly; `now` and the event slice are passed in.

use chrono::{DateTime, Utc};

use pomodoro_protocol::{DerivedState, DerivedStateTag, EventKind, Session, SessionEvent};

/// Folds `events` (ascending by id, belonging to `session`) against `now`.
///
/// `events` must be non-empty and begin with `started` per store invariant
/// 2; callers that have no session at all should use
/// [`DerivedState::none`] directly instead of calling this function.
pub fn reduce(session: &Session, events: &[SessionEvent], now: DateTime<Utc>) -> DerivedState {
    let mut elapsed: i64 = 0;
    let mut run_start: Option<DateTime<Utc>> = None;
    let mut terminal: Option<DerivedStateTag> = None;

    for event in events {
        match event.kind {
            EventKind::Started | EventKind::Resumed => {
                run_start = Some(event.created_at);
            }
            EventKind::Paused => {
                if let Some(start) = run_start.take() {
                    elapsed += (event.created_at - start).num_seconds();
                }
            }
            EventKind::Aborted => {
                if let Some(start) = run_start.take() {
                    elapsed += (event.created_at - start).num_seconds();
                }
                terminal = Some(DerivedStateTag::Aborted);
            }
            EventKind::Completed => {
                if let Some(start) = run_start.take() {
                    elapsed += (event.created_at - start).num_seconds();
                }
                terminal = Some(DerivedStateTag::Completed);
            }
        }
    }

    let kind = session.kind.into();

    let (state, elapsed_secs) = if let Some(tag) = terminal {
        let clamped = if tag == DerivedStateTag::Completed {
            elapsed.min(session.planned_secs)
        } else {
            elapsed
        };
        (tag, clamped)
    } else if let Some(start) = run_start {
        let provisional = elapsed + (now - start).num_seconds().max(0);
        if provisional >= session.planned_secs {
            (DerivedStateTag::Running, session.planned_secs)
        } else {
            (DerivedStateTag::Running, provisional)
        }
    } else {
        (DerivedStateTag::Paused, elapsed)
    };

    let remaining_secs = (session.planned_secs - elapsed_secs.min(session.planned_secs)).max(0);

    DerivedState {
        kind,
        state,
        planned_secs: session.planned_secs,
        elapsed_secs,
        remaining_secs,
    }
}

/// Whether `reduce`'s running-but-expired condition holds: `elapsed_secs`
/// has already saturated at `planned_secs` while the state is still
/// `running`. The session service uses this to decide whether to append the
/// synthesized `completed` event on a `status` call.
pub fn is_expired_running(state: &DerivedState) -> bool {
    state.state == DerivedStateTag::Running && state.elapsed_secs >= state.planned_secs
}

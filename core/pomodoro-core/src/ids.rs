//! Sortable unique identifiers for sessions and events (spec §4.B).
//!
//! Ids are ULIDs: a 48-bit millisecond timestamp followed by 80 bits of
//! entropy, formatted so that lexicographic order matches creation order.
//! `ulid::Ulid::from_datetime` alone does not guarantee strictly increasing
//! output for two ids minted in the same millisecond, so the generator keeps
//! the last value it handed out and forces a monotonic bump when the clock
//! hasn't ticked forward.

use std::cell::Cell;

use chrono::{DateTime, Utc};
use ulid::Ulid;

pub trait IdGenerator: std::fmt::Debug {
    /// Mints a new id for an instant produced by the caller's clock. Calling
    /// this n times in sequence within one process yields n strictly
    /// increasing values, even if `at` does not itself advance.
    fn next_id(&self, at: DateTime<Utc>) -> String;
}

#[derive(Debug, Default)]
pub struct UlidGenerator {
    last: Cell<Option<Ulid>>,
}

impl UlidGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for UlidGenerator {
    fn next_id(&self, at: DateTime<Utc>) -> String {
        let candidate = Ulid::from_datetime(at.into());
        let next = match self.last.get() {
            Some(previous) if candidate <= previous => previous
                .increment()
                .expect("ULID entropy exhausted within a single millisecond"),
            _ => candidate,
        };
        self.last.set(Some(next));
        next.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ids_minted_in_sequence_strictly_increase() {
        let gen = UlidGenerator::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let a = gen.next_id(at);
        let b = gen.next_id(at);
        let c = gen.next_id(at);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn ids_increase_across_distinct_instants_too() {
        let gen = UlidGenerator::new();
        let a = gen.next_id(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        let b = gen.next_id(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 1).unwrap());
        assert!(a < b);
    }
}

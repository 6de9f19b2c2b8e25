//! Core library for the pomodoro CLI.
//!
//! Owns the event store, the pure state reducer, the session service state
//! machine, the status renderer, the hook dispatcher, and the ambient
//! plumbing (clock, id generator, config loading) that a CLI front end
//! wires together into one invocation.

pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod hooks;
pub mod ids;
pub mod reducer;
pub mod render;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::PomodoroConfig;
pub use error::{PomodoroError, Result};
pub use hooks::HookDispatcher;
pub use ids::{IdGenerator, UlidGenerator};
pub use service::SessionService;
pub use store::EventStore;

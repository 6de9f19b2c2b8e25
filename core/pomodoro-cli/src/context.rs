//! The `Context` the CLI assembles once per invocation and threads down to
//! the session service (spec §9, §10.1).

use std::path::PathBuf;

use pomodoro_core::{config, EventStore, HookDispatcher, PomodoroConfig, PomodoroError, SystemClock, UlidGenerator};

pub struct Context {
    pub store: EventStore,
    pub clock: SystemClock,
    pub ids: UlidGenerator,
    pub hooks: HookDispatcher,
    pub config: PomodoroConfig,
    pub config_dir: PathBuf,
}

impl Context {
    pub fn load() -> Result<Self, PomodoroError> {
        let config_dir = config::config_dir()?;
        let db_path = config::database_path()?;
        let parsed_config = config::load_config(&config_dir)?;

        tracing::debug!(
            config_dir = %config_dir.display(),
            db_path = %db_path.display(),
            "resolved pomodoro context"
        );

        Ok(Context {
            store: EventStore::open(&db_path)?,
            clock: SystemClock,
            ids: UlidGenerator::new(),
            hooks: HookDispatcher::new(config_dir.clone()),
            config: parsed_config,
            config_dir,
        })
    }
}

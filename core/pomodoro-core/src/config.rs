//! Configuration file loading and path resolution (spec §6, §10.1, §10.3).
//!
//! Mirrors the teacher's JSON-config loading shape (missing file → defaults,
//! malformed file → a surfaced error) with TOML as the on-disk format and a
//! plain XDG base-directory resolution rather than a single hardcoded
//! `~/.claude`.

use std::path::PathBuf;

use serde::Deserialize;

use crate::duration::parse_human_secs;
use crate::error::PomodoroError;

const DEFAULT_FOCUS_DURATION: &str = "25m";
const DEFAULT_BREAK_DURATION: &str = "5m";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroConfig {
    pub focus_duration_secs: i64,
    pub break_duration_secs: i64,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        PomodoroConfig {
            focus_duration_secs: parse_human_secs(DEFAULT_FOCUS_DURATION)
                .expect("default focus duration is well-formed"),
            break_duration_secs: parse_human_secs(DEFAULT_BREAK_DURATION)
                .expect("default break duration is well-formed"),
        }
    }
}

/// Mirrors the on-disk `config.toml` shape. Unknown keys are ignored by
/// serde's default `Deserialize` behavior (no `deny_unknown_fields`).
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    focus_duration: Option<String>,
    break_duration: Option<String>,
}

/// `${XDG_CONFIG_HOME:-$HOME/.config}/pomodoro`.
pub fn config_dir() -> Result<PathBuf, PomodoroError> {
    let base = dirs::config_dir()
        .ok_or_else(|| PomodoroError::StoreMessage("could not resolve a config directory".to_string()))?;
    Ok(base.join("pomodoro"))
}

/// `${XDG_DATA_HOME:-$HOME/.local/share}/pomodoro/pomodoro.db`.
pub fn database_path() -> Result<PathBuf, PomodoroError> {
    let base = dirs::data_dir()
        .ok_or_else(|| PomodoroError::StoreMessage("could not resolve a data directory".to_string()))?;
    Ok(base.join("pomodoro").join("pomodoro.db"))
}

/// Loads `config.toml` from `dir`. A missing file yields defaults; a
/// malformed file yields a `ConfigMalformed` error naming the path.
pub fn load_config(dir: &std::path::Path) -> Result<PomodoroConfig, PomodoroError> {
    let path = dir.join("config.toml");

    let raw = match fs_err::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(PomodoroConfig::default());
        }
        Err(err) => {
            return Err(PomodoroError::ConfigMalformed {
                path,
                details: err.to_string(),
            })
        }
    };

    let parsed: RawConfig = toml::from_str(&raw).map_err(|err| PomodoroError::ConfigMalformed {
        path: path.clone(),
        details: err.to_string(),
    })?;

    let focus_duration_secs = match parsed.focus_duration {
        Some(value) => parse_human_secs(&value)?,
        None => PomodoroConfig::default().focus_duration_secs,
    };
    let break_duration_secs = match parsed.break_duration {
        Some(value) => parse_human_secs(&value)?,
        None => PomodoroConfig::default().break_duration_secs,
    };

    Ok(PomodoroConfig {
        focus_duration_secs,
        break_duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config, PomodoroConfig::default());
    }

    #[test]
    fn recognized_keys_override_defaults() {
        let dir = tempdir().unwrap();
        fs_err::write(
            dir.path().join("config.toml"),
            "focus_duration = \"50m\"\nbreak_duration = \"10m\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.focus_duration_secs, 3000);
        assert_eq!(config.break_duration_secs, 600);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = tempdir().unwrap();
        fs_err::write(
            dir.path().join("config.toml"),
            "focus_duration = \"30m\"\nsome_future_key = 42\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.focus_duration_secs, 1800);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("config.toml"), "not valid toml [[[").unwrap();
        let result = load_config(dir.path());
        assert!(matches!(result, Err(PomodoroError::ConfigMalformed { .. })));
    }
}

//! Status rendering: text, JSON, and user templates (spec §4.F).

use minijinja::{Environment, Value};
use pomodoro_protocol::DerivedState;

use crate::duration::format_mmss;
use crate::error::PomodoroError;

const DEFAULT_TEXT_TEMPLATE: &str =
    "{{ kind }} | {{ state }} | elapsed {{ mmss(elapsed_secs) }} | remaining {{ mmss(remaining_secs) }}";

/// Renders `state` as the default plain-text line (spec §4.F.1).
pub fn render_text(state: &DerivedState) -> Result<String, PomodoroError> {
    render_template(state, DEFAULT_TEXT_TEMPLATE)
}

/// Renders `state` as JSON with the exact field set and ordering from the
/// spec's worked examples.
pub fn render_json(state: &DerivedState) -> Result<String, PomodoroError> {
    serde_json::to_string(state)
        .map_err(|err| PomodoroError::InvalidTemplate(format!("failed to serialize status: {}", err)))
}

/// Renders `state` through a user-supplied template string, in a sandboxed
/// expression language exposing `kind`, `state`, the three integer fields,
/// and an `mmss()` helper. Unknown variables and syntax errors are Parse
/// errors raised at compile time, before anything is printed.
pub fn render_template(state: &DerivedState, template: &str) -> Result<String, PomodoroError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
    env.add_function("mmss", |secs: i64| format_mmss(secs));

    env.add_template("status", template)
        .map_err(|err| PomodoroError::InvalidTemplate(err.to_string()))?;

    let tmpl = env
        .get_template("status")
        .map_err(|err| PomodoroError::InvalidTemplate(err.to_string()))?;

    let ctx = Value::from_serialize(state);
    tmpl.render(ctx)
        .map_err(|err| PomodoroError::InvalidTemplate(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomodoro_protocol::{DerivedKind, DerivedStateTag};

    fn running_state() -> DerivedState {
        DerivedState {
            kind: DerivedKind::Focus,
            state: DerivedStateTag::Running,
            planned_secs: 1500,
            elapsed_secs: 300,
            remaining_secs: 1200,
        }
    }

    #[test]
    fn text_render_matches_spec_template() {
        let rendered = render_text(&running_state()).unwrap();
        assert_eq!(rendered, "focus | running | elapsed 05:00 | remaining 20:00");
    }

    #[test]
    fn json_render_matches_field_order_and_names() {
        let rendered = render_json(&running_state()).unwrap();
        assert_eq!(
            rendered,
            r#"{"kind":"focus","state":"running","planned_secs":1500,"elapsed_secs":300,"remaining_secs":1200}"#
        );
    }

    #[test]
    fn none_state_renders_zeroed_text_and_json() {
        let none = DerivedState::none();
        assert_eq!(
            render_text(&none).unwrap(),
            "none | none | elapsed 00:00 | remaining 00:00"
        );
        assert_eq!(
            render_json(&none).unwrap(),
            r#"{"kind":"none","state":"none","planned_secs":0,"elapsed_secs":0,"remaining_secs":0}"#
        );
    }

    #[test]
    fn user_template_can_use_mmss_and_fields() {
        let rendered =
            render_template(&running_state(), "{{ kind }}/{{ state }}: {{ mmss(elapsed_secs) }}").unwrap();
        assert_eq!(rendered, "focus/running: 05:00");
    }

    #[test]
    fn unknown_variable_is_a_parse_error() {
        let result = render_template(&running_state(), "{{ nonexistent_field }}");
        assert!(result.is_err());
    }

    #[test]
    fn malformed_template_syntax_is_a_parse_error() {
        let result = render_template(&running_state(), "{{ kind");
        assert!(result.is_err());
    }
}

//! pomodoro: a local, single-user Pomodoro timer.
//!
//! Parses arguments, loads the `Context` (config, clock, id generator, store
//! handle, hook dispatcher), and wires them into the session service for one
//! of `start`, `stop`, or `status`.

mod context;
mod logging;

use clap::{Parser, Subcommand, ValueEnum};

use pomodoro_core::render;
use pomodoro_core::{PomodoroError, SessionService};
use pomodoro_protocol::SessionKind;

use context::Context;

#[derive(Parser)]
#[command(name = "pomodoro")]
#[command(about = "A local, single-user Pomodoro timer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session, or resume a paused one.
    Start {
        #[arg(long = "mode", value_enum)]
        mode: Option<ModeArg>,

        #[arg(long = "duration")]
        duration: Option<String>,
    },

    /// Pause the running session, or abort it with --reset.
    Stop {
        #[arg(long)]
        reset: bool,
    },

    /// Print the current session's status.
    Status {
        #[arg(long = "output", value_enum, default_value = "text")]
        output: OutputArg,

        #[arg(long = "format")]
        format: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Focus,
    Break,
}

impl From<ModeArg> for SessionKind {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Focus => SessionKind::Focus,
            ModeArg::Break => SessionKind::Break,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputArg {
    Text,
    Json,
}

fn main() {
    logging::init();

    let cli = Cli::parse();

    if let Commands::Status { output, format } = &cli.command {
        if format.is_some() && *output != OutputArg::Text {
            eprintln!("error: --format is only valid with --output text");
            std::process::exit(2);
        }
    }

    let context = match Context::load() {
        Ok(context) => context,
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize pomodoro context");
            eprintln!("error: {}", err);
            std::process::exit(exit_code_for(&err));
        }
    };

    let service = SessionService::new(
        &context.store,
        &context.clock,
        &context.ids,
        &context.hooks,
        &context.config,
    );

    let result = match cli.command {
        Commands::Start { mode, duration } => service
            .start(mode.map(SessionKind::from), duration.as_deref())
            .map(|state| render::render_text(&state)),
        Commands::Stop { reset } => service
            .stop(reset)
            .map(|state| render::render_text(&state)),
        Commands::Status { output, format } => service.status().map(|state| match (&output, &format) {
            (OutputArg::Json, _) => render::render_json(&state),
            (OutputArg::Text, Some(template)) => render::render_template(&state, template),
            (OutputArg::Text, None) => render::render_text(&state),
        }),
    };

    match result {
        Ok(Ok(rendered)) => println!("{}", rendered),
        Ok(Err(render_err)) => {
            tracing::error!(error = %render_err, "failed to render status");
            eprintln!("error: {}", render_err);
            std::process::exit(exit_code_for(&render_err));
        }
        Err(err) => {
            if err.is_not_found() {
                println!("no active session");
                std::process::exit(0);
            }
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {}", err);
            std::process::exit(exit_code_for(&err));
        }
    }
}

/// Maps the error taxonomy to the exit codes in spec §7: `StateConflict`
/// and `Store` are 1, `Parse` is 2, `NotFound` never reaches here (it is
/// handled as the no-op success path above).
fn exit_code_for(err: &PomodoroError) -> i32 {
    if err.is_parse() {
        2
    } else {
        1
    }
}

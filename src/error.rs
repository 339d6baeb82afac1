//! Rich diagnostic error types for the planner.
//!
//! Planner-level failure is never an error: a goal that cannot be achieved
//! ends in a FAILURE state and stays in the goal tree as data. The types here
//! cover the host side only: malformed propositions, unknown ids handed in by
//! callers, unreadable configuration and world files.

use miette::Diagnostic;
use thiserror::Error;

use crate::seeds::WorldError;

/// Top-level error type for the planner crate.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain through to the CLI.
#[derive(Debug, Error, Diagnostic)]
pub enum TtError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    World(#[from] WorldError),
}

// ---------------------------------------------------------------------------
// Proposition parsing errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unexpected end of input while parsing \"{input}\"")]
    #[diagnostic(
        code(tt::parse::eof),
        help("Every `[` must be closed by a matching `]`, and every `{{` by a `}}`.")
    )]
    UnexpectedEof { input: String },

    #[error("unexpected `{found}` at offset {offset} in \"{input}\"")]
    #[diagnostic(
        code(tt::parse::unexpected),
        help(
            "Propositions are written as `[head arg ...]`. Arguments are symbols, \
             numbers, `*` (wildcard), `?name` (variable), `na`, nested \
             propositions or time ranges `{{start stop}}`."
        )
    )]
    Unexpected {
        input: String,
        found: char,
        offset: usize,
    },

    #[error("proposition has no head: \"{input}\"")]
    #[diagnostic(
        code(tt::parse::empty),
        help("A proposition needs at least a head symbol, e.g. `[holding hand1 box1]`.")
    )]
    Empty { input: String },

    #[error("invalid time range \"{text}\"")]
    #[diagnostic(
        code(tt::parse::range),
        help("Write time ranges as `{{start stop}}` in seconds; use `na` for an open end.")
    )]
    BadRange { text: String },

    #[error("invalid story time \"{text}\"")]
    #[diagnostic(
        code(tt::parse::time),
        help("Write story times as `HH:MM`, `HH:MM:SS` or `dN+HH:MM:SS` (day N), or as plain seconds.")
    )]
    BadTime { text: String },
}

// ---------------------------------------------------------------------------
// Context / session lookup errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ContextError {
    #[error("context {id} not found")]
    #[diagnostic(
        code(tt::context::not_found),
        help("Context ids come from `Session::sprout` or `Session::alternatives`; pruned contexts are gone.")
    )]
    NotFound { id: u32 },

    #[error("subgoal {subgoal} not found in context {context}")]
    #[diagnostic(
        code(tt::context::subgoal_not_found),
        help("Subgoal ids are local to the context that created them. Copies made by sprouting get new ids.")
    )]
    SubgoalNotFound { context: u32, subgoal: u32 },

    #[error("actor \"{actor}\" not found in context {context}")]
    #[diagnostic(
        code(tt::context::actor_not_found),
        help("Actors are created the first time a goal is started for them.")
    )]
    ActorNotFound { context: u32, actor: String },

    #[error("context {id} was pruned")]
    #[diagnostic(
        code(tt::context::pruned),
        help("Only live alternatives can be run or sprouted.")
    )]
    Pruned { id: u32 },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read planner config: {path}")]
    #[diagnostic(
        code(tt::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse planner config: {path}: {message}")]
    #[diagnostic(
        code(tt::config::parse),
        help("Check the TOML syntax. Run `ttplan dump-config` to see every key with its default.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write planner config: {path}")]
    #[diagnostic(
        code(tt::config::write),
        help("Ensure you have write permission for the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid planner config value for `{key}`: {message}")]
    #[diagnostic(code(tt::config::invalid))]
    Invalid { key: String, message: String },
}

/// Convenience result alias for crate operations.
pub type TtResult<T> = std::result::Result<T, TtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_converts_to_top_level() {
        let err = ParseError::Empty {
            input: "[]".into(),
        };
        let top: TtError = err.into();
        assert!(matches!(top, TtError::Parse(ParseError::Empty { .. })));
        assert!(top.to_string().contains("no head"));
    }

    #[test]
    fn context_error_has_diagnostic_code() {
        let err = ContextError::NotFound { id: 7 };
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("tt::context::not_found"));
    }

    #[test]
    fn config_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ConfigError::Read {
            path: "planner.toml".into(),
            source: io,
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}

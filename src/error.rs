use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the simulation engine and its artifact codecs.
///
/// Each variant carries enough context to reproduce the failure: configuration
/// problems name the offending key or line, engine invariant violations name the
/// simulation time and the event that could not be resolved.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Malformed or missing configuration (setup record, geometry, initial state).
    #[error("configuration error: {0}")]
    Config(String),

    /// Numerical or geometric issue (e.g., coincident centers at contact).
    #[error("numerical error: {0}")]
    MathError(String),

    /// A popped event references a particle, wall or vertex that does not exist.
    #[error("unresolvable participant at t={time}: {event}")]
    UnknownParticipant { time: f64, event: String },

    /// A line of a persisted artifact could not be parsed.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::InvalidParam("radius must be > 0".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid parameter"));
        assert!(msg.contains("radius"));
    }

    #[test]
    fn unknown_participant_names_time_and_event() {
        let e = Error::UnknownParticipant {
            time: 1.5,
            event: "WALL 3 -> 12".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("t=1.5"));
        assert!(msg.contains("WALL 3 -> 12"));
    }

    #[test]
    fn parse_error_names_line() {
        let e = Error::Parse {
            line: 7,
            message: "expected 4 fields".into(),
        };
        assert!(e.to_string().contains("line 7"));
    }
}

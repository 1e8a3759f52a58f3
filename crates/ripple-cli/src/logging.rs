//! Logging initialisation
//!
//! Logs go to stderr so that command output on stdout stays machine-readable.

use tracing::Level;

use crate::error::{CliError, Result};

/// Pick the max log level from `--log-level`, `-v` and `-q`.
///
/// An explicit `--log-level` wins; otherwise `-q` means errors only and
/// `-v` means debug.
pub fn resolve_level(log_level: Option<&str>, verbose: bool, quiet: bool) -> Result<Level> {
    if let Some(label) = log_level {
        return match label.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => Err(CliError::invalid_argument(format!(
                "unknown log level '{}', expected trace, debug, info, warn or error",
                other
            ))),
        };
    }
    Ok(if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::WARN
    })
}

/// Install the global subscriber; a second call is a no-op
pub fn init_logging(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(level >= Level::DEBUG)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_level_wins() {
        assert_eq!(resolve_level(Some("TRACE"), false, true).unwrap(), Level::TRACE);
        assert_eq!(resolve_level(Some("info"), true, false).unwrap(), Level::INFO);
    }

    #[test]
    fn test_flags_pick_level() {
        assert_eq!(resolve_level(None, false, false).unwrap(), Level::WARN);
        assert_eq!(resolve_level(None, true, false).unwrap(), Level::DEBUG);
        assert_eq!(resolve_level(None, true, true).unwrap(), Level::ERROR);
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let err = resolve_level(Some("loud"), false, false).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
    }
}

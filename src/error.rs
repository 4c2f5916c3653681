use thiserror::Error;

use crate::board::BoardError;
use crate::config::ConfigError;

/// Errors raised by the session core.
///
/// Every variant is a caller bug: the offending call is rejected and the
/// session is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("{operation} is not allowed after the session has ended")]
    SessionEnded { operation: &'static str },

    #[error("{operation} is only allowed after the session has ended")]
    SessionRunning { operation: &'static str },

    #[error("cannot select a new cell among {num_cells} cells excluding index {current}")]
    Selection { num_cells: usize, current: usize },

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operation() {
        let err = GameError::SessionEnded {
            operation: "on_cell_tapped",
        };
        assert_eq!(
            err.to_string(),
            "on_cell_tapped is not allowed after the session has ended"
        );

        let err = GameError::SessionRunning { operation: "reset" };
        assert_eq!(
            err.to_string(),
            "reset is only allowed after the session has ended"
        );
    }

    #[test]
    fn config_errors_convert_transparently() {
        let err: GameError = ConfigError::TooFewCells(1).into();
        assert_eq!(err.to_string(), ConfigError::TooFewCells(1).to_string());
    }
}

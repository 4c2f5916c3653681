// Library surface for headless/integration tests and reuse.
// The session core (board, random, difficulty, session) has no terminal
// dependencies; app, runtime and ui are the terminal host.
pub mod app;
pub mod app_dirs;
pub mod board;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod high_score;
pub mod random;
pub mod runtime;
pub mod session;
pub mod timer;
pub mod ui;

pub use error::{GameError, Result};

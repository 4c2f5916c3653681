use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseEvent, MouseEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    /// Left-button press, in terminal cell coordinates
    Click { column: u16, row: u16 },
    Resize,
    Tick,
}

impl GameEvent {
    fn from_crossterm(event: CtEvent) -> Option<Self> {
        match event {
            CtEvent::Key(key) => Some(GameEvent::Key(key)),
            CtEvent::Mouse(MouseEvent {
                kind: MouseEventKind::Down(event::MouseButton::Left),
                column,
                row,
                ..
            }) => Some(GameEvent::Click { column, row }),
            CtEvent::Resize(_, _) => Some(GameEvent::Resize),
            _ => None,
        }
    }
}

/// Source of terminal events (keyboard, mouse, resize)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(ev) => {
                    if let Some(ev) = GameEvent::from_crossterm(ev) {
                        if tx.send(ev).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    log::warn!("terminal event reader stopped: {}", e);
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Serializes input and ticks into one stream, so the session sees one
/// event at a time
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> GameEvent {
        self.step_within(self.ticker.interval())
    }

    /// Like [`Runner::step`] but never waits longer than `limit`, so a timer
    /// deadline closer than the tick is not overshot.
    pub fn step_within(&self, limit: Duration) -> GameEvent {
        let timeout = limit.min(self.ticker.interval());
        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }
}

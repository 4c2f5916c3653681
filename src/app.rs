use std::cell::RefCell;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;

use crate::error::Result;
use crate::high_score::HighScoreStore;
use crate::random::RandomSource;
use crate::runtime::GameEvent;
use crate::session::{SessionController, SessionEvent, SessionPhase, SessionSnapshot};
use crate::timer::Timer;

/// Keys bound to cells, in cell order
pub const CELL_KEYS: &[u8] = b"123456789abcdefghijklmnopqrstuvwxyz";
pub const MAX_CELLS: usize = CELL_KEYS.len();

pub fn key_for_cell(id: usize) -> Option<char> {
    CELL_KEYS.get(id).map(|b| *b as char)
}

pub fn cell_for_key(c: char, num_cells: usize) -> Option<usize> {
    let c = c.to_ascii_lowercase();
    CELL_KEYS
        .iter()
        .take(num_cells)
        .position(|b| *b as char == c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

/// Terminal front end state: the controller plus what the screen needs
pub struct App<T: Timer, H: HighScoreStore, R: RandomSource> {
    pub controller: SessionController<T, H, R>,
    pub last_event: Option<SessionEvent>,
    /// Last drawn frame area, used to map clicks to cells
    pub area: Rect,
    feed: Rc<RefCell<Vec<SessionEvent>>>,
}

impl<T: Timer, H: HighScoreStore, R: RandomSource> App<T, H, R> {
    pub fn new(mut controller: SessionController<T, H, R>) -> Self {
        let feed: Rc<RefCell<Vec<SessionEvent>>> = Rc::default();
        let sink = Rc::clone(&feed);
        controller.subscribe(move |event: &SessionEvent, _: &SessionSnapshot| {
            sink.borrow_mut().push(event.clone());
        });

        Self {
            controller,
            last_event: None,
            area: Rect::default(),
            feed,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.controller.snapshot()
    }

    pub fn handle(&mut self, event: GameEvent) -> Result<AppAction> {
        let action = match event {
            GameEvent::Tick => {
                self.controller.poll_timer()?;
                AppAction::Continue
            }
            GameEvent::Resize => AppAction::Continue,
            GameEvent::Click { column, row } => {
                let num_cells = self.controller.config().num_cells;
                if let Some(id) = crate::ui::cell_at(self.area, num_cells, column, row) {
                    self.tap(id)?;
                }
                AppAction::Continue
            }
            GameEvent::Key(key) => self.on_key(key)?,
        };
        self.drain_feed();
        Ok(action)
    }

    fn on_key(&mut self, key: KeyEvent) -> Result<AppAction> {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Ok(AppAction::Quit);
        }

        match (self.controller.phase(), key.code) {
            (SessionPhase::Ended, KeyCode::Char('r') | KeyCode::Enter) => {
                self.controller.reset()?;
            }
            (SessionPhase::Running, KeyCode::Char(c)) => {
                let num_cells = self.controller.config().num_cells;
                if let Some(id) = cell_for_key(c, num_cells) {
                    self.tap(id)?;
                }
            }
            _ => {}
        }
        Ok(AppAction::Continue)
    }

    fn tap(&mut self, id: usize) -> Result<()> {
        // clicks land on the board after game over too; those are not taps
        if self.controller.phase() == SessionPhase::Running {
            self.controller.on_cell_tapped(id)?;
        }
        Ok(())
    }

    fn drain_feed(&mut self) {
        if let Some(event) = self.feed.borrow_mut().drain(..).last() {
            self.last_event = Some(event);
        }
    }

    /// Cancels pending timers before the app goes away.
    pub fn shutdown(&mut self) {
        self.controller.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Category;
    use crate::config::GameConfig;
    use crate::high_score::MemoryHighScoreStore;
    use crate::random::ScriptedSource;
    use crate::timer::ManualTimer;

    type TestApp = App<ManualTimer, MemoryHighScoreStore, ScriptedSource>;

    fn key(code: KeyCode) -> GameEvent {
        GameEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn test_app(max_misses: u32) -> TestApp {
        let config = GameConfig {
            max_misses,
            num_cells: 5,
            initial_delay_ms: 1000,
            min_delay_ms: 100,
            delay_step_ms: 50,
        };
        // first active cell is index 2 (key '3') and Purple
        let controller = SessionController::new(
            config,
            ManualTimer::new(),
            MemoryHighScoreStore::default(),
            ScriptedSource::new([2, 0, 0, 4, 0, 0]),
        )
        .unwrap();
        App::new(controller)
    }

    #[test]
    fn keys_map_to_cells() {
        assert_eq!(key_for_cell(0), Some('1'));
        assert_eq!(key_for_cell(9), Some('a'));
        assert_eq!(key_for_cell(MAX_CELLS), None);
        assert_eq!(cell_for_key('1', 9), Some(0));
        assert_eq!(cell_for_key('A', 12), Some(9));
        assert_eq!(cell_for_key('a', 9), None);
        assert_eq!(cell_for_key('!', 35), None);
    }

    #[test]
    fn pressing_the_active_key_scores() {
        let mut app = test_app(3);
        assert_eq!(app.handle(key(KeyCode::Char('3'))).unwrap(), AppAction::Continue);
        assert_eq!(app.snapshot().score, 10);
        assert!(matches!(
            app.last_event,
            Some(SessionEvent::Hit {
                category: Category::Purple,
                ..
            })
        ));
    }

    #[test]
    fn wrong_key_keeps_last_event() {
        let mut app = test_app(3);
        app.handle(key(KeyCode::Char('1'))).unwrap();
        assert_eq!(app.snapshot().score, 0);
        assert_eq!(app.last_event, None);
    }

    #[test]
    fn tick_routes_timer_expiry() {
        let mut app = test_app(1);
        app.handle(GameEvent::Tick).unwrap();
        assert!(!app.snapshot().ended);

        app.controller.timer_mut().advance_to_next();
        app.handle(GameEvent::Tick).unwrap();
        assert!(app.snapshot().ended);
        assert_eq!(
            app.last_event,
            Some(SessionEvent::GameOver { final_score: 0 })
        );
    }

    #[test]
    fn reset_only_after_game_over() {
        let mut app = test_app(1);
        app.handle(key(KeyCode::Char('r'))).unwrap();
        assert!(!app.snapshot().ended);

        app.controller.timer_mut().advance_to_next();
        app.handle(GameEvent::Tick).unwrap();
        // cell keys are ignored once the session is over
        app.handle(key(KeyCode::Char('3'))).unwrap();
        assert_eq!(app.snapshot().score, 0);

        app.handle(key(KeyCode::Enter)).unwrap();
        assert!(!app.snapshot().ended);
        assert_eq!(app.last_event, Some(SessionEvent::Reset));
    }

    #[test]
    fn quit_keys() {
        let mut app = test_app(3);
        assert_eq!(app.handle(key(KeyCode::Esc)).unwrap(), AppAction::Quit);
        let ctrl_c = GameEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(app.handle(ctrl_c).unwrap(), AppAction::Quit);
    }

    #[test]
    fn clicks_hit_the_cell_under_the_pointer() {
        let mut app = test_app(3);
        app.area = Rect::new(0, 0, 80, 24);
        let target = crate::ui::board_layout(crate::ui::board_area(app.area), 5)[2];

        app.handle(GameEvent::Click {
            column: target.x + target.width / 2,
            row: target.y + target.height / 2,
        })
        .unwrap();
        assert_eq!(app.snapshot().score, 10);

        // outside the board
        app.handle(GameEvent::Click { column: 0, row: 0 }).unwrap();
        assert_eq!(app.snapshot().score, 10);
    }

    #[test]
    fn shutdown_cancels_the_timer() {
        let mut app = test_app(3);
        app.shutdown();
        assert_eq!(app.controller.timer().pending_count(), 0);
    }
}

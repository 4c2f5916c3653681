use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::random::RandomSource;

/// Point-valued cell colour, re-rolled on every spawn
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Category {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Red,
        Category::Blue,
        Category::Green,
        Category::Yellow,
        Category::Purple,
    ];

    pub fn points(self) -> u32 {
        match self {
            Category::Red => 5,
            Category::Blue => 3,
            Category::Green => 2,
            Category::Yellow => 1,
            Category::Purple => 10,
        }
    }

    pub fn random<S: RandomSource + ?Sized>(rng: &mut S) -> Self {
        Self::ALL[rng.index_below(Self::ALL.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub id: usize,
    pub active: bool,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("a board needs at least one cell")]
    Empty,
    #[error("active index {active} is outside 0..{num_cells}")]
    ActiveOutOfRange { active: usize, num_cells: usize },
}

/// Immutable snapshot of the cells; rebuilt rather than edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: Vec<Cell>,
    active: usize,
}

impl Board {
    /// Builds `num_cells` cells with `active` lit and one category draw per
    /// cell, in id order.
    pub fn new<S: RandomSource + ?Sized>(
        num_cells: usize,
        active: usize,
        rng: &mut S,
    ) -> Result<Self, BoardError> {
        if num_cells == 0 {
            return Err(BoardError::Empty);
        }
        if active >= num_cells {
            return Err(BoardError::ActiveOutOfRange { active, num_cells });
        }

        let cells = (0..num_cells)
            .map(|id| Cell {
                id,
                active: id == active,
                category: Category::random(rng),
            })
            .collect();

        Ok(Self { cells, active })
    }

    pub fn active_id(&self) -> usize {
        self.active
    }

    pub fn active_cell(&self) -> &Cell {
        &self.cells[self.active]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedSource;
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn category_points() {
        let points: Vec<u32> = Category::ALL.iter().map(|c| c.points()).collect();
        assert_eq!(points, vec![5, 3, 2, 1, 10]);
        assert_eq!(Category::Purple.to_string(), "Purple");
    }

    #[test]
    fn exactly_the_requested_cell_is_active() {
        let mut rng = StdRng::seed_from_u64(1);
        let board = Board::new(9, 4, &mut rng).unwrap();

        assert_eq!(board.len(), 9);
        assert_eq!(board.active_id(), 4);
        assert_eq!(board.active_cell().id, 4);
        assert_eq!(board.cells().iter().filter(|c| c.active).count(), 1);
        for (i, cell) in board.cells().iter().enumerate() {
            assert_eq!(cell.id, i);
        }
    }

    #[test]
    fn categories_follow_draw_order() {
        let mut src = ScriptedSource::new([4, 0, 1, 2, 3]);
        let board = Board::new(5, 0, &mut src).unwrap();
        let cats: Vec<Category> = board.cells().iter().map(|c| c.category).collect();
        assert_eq!(
            cats,
            vec![
                Category::Purple,
                Category::Red,
                Category::Blue,
                Category::Green,
                Category::Yellow
            ]
        );
    }

    #[test]
    fn single_cell_board_is_allowed() {
        let mut src = ScriptedSource::default();
        let board = Board::new(1, 0, &mut src).unwrap();
        assert_eq!(board.active_cell().category, Category::Red);
        assert!(!board.is_empty());
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let mut src = ScriptedSource::default();
        assert_matches!(Board::new(0, 0, &mut src), Err(BoardError::Empty));
        assert_matches!(
            Board::new(3, 3, &mut src),
            Err(BoardError::ActiveOutOfRange {
                active: 3,
                num_cells: 3
            })
        );
    }
}

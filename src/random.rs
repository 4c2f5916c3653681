use rand::Rng;
use std::collections::VecDeque;

use crate::error::{GameError, Result};

/// Source of uniformly distributed indices.
///
/// Every `rand::Rng` is a source; tests can plug in [`ScriptedSource`].
pub trait RandomSource {
    /// Uniform draw from `0..n`. `n` must be non-zero.
    fn index_below(&mut self, n: usize) -> usize;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn index_below(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }
}

/// Replays a fixed sequence of draws, wrapping around when exhausted.
/// Each value is reduced modulo the requested bound.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    values: VecDeque<usize>,
}

impl ScriptedSource {
    pub fn new<I: IntoIterator<Item = usize>>(values: I) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl RandomSource for ScriptedSource {
    fn index_below(&mut self, n: usize) -> usize {
        match self.values.pop_front() {
            Some(v) => {
                self.values.push_back(v);
                v % n
            }
            None => 0,
        }
    }
}

/// Picks the next active cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSelector {
    num_cells: usize,
}

impl RandomSelector {
    pub fn new(num_cells: usize) -> Self {
        Self { num_cells }
    }

    /// Uniform over every index except `current`.
    ///
    /// Draws from the `num_cells - 1` remaining slots and shifts draws at or
    /// above `current` up by one.
    pub fn select_next<S: RandomSource + ?Sized>(&self, rng: &mut S, current: usize) -> Result<usize> {
        if self.num_cells < 2 || current >= self.num_cells {
            return Err(GameError::Selection {
                num_cells: self.num_cells,
                current,
            });
        }
        let r = rng.index_below(self.num_cells - 1);
        Ok(if r >= current { r + 1 } else { r })
    }

    /// Uniform over every index, used for fresh boards.
    pub fn select_any<S: RandomSource + ?Sized>(&self, rng: &mut S) -> Result<usize> {
        if self.num_cells == 0 {
            return Err(GameError::Selection {
                num_cells: 0,
                current: 0,
            });
        }
        Ok(rng.index_below(self.num_cells))
    }
}

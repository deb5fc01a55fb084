use rand::Rng;

use crate::proto::{Coord, FIELD_SIZE, Impact};

/// Decides where to shoot next.
pub trait FireSolution {
    /// `None` once every cell has been fired at.
    fn next_target(&mut self) -> Option<Coord>;

    /// Feedback for the last shot.
    fn record(&mut self, _target: Coord, _impact: Impact) {}
}

/// Uniformly random shots, never the same cell twice. Baseline for tournaments.
pub struct RandomFire<R> {
    rng: R,
    candidates: Vec<Coord>,
}

impl<R: Rng> RandomFire<R> {
    pub fn new(rng: R) -> Self {
        let candidates = (0..FIELD_SIZE as u8)
            .flat_map(|row| (0..FIELD_SIZE as u8).map(move |col| Coord::new(row, col)))
            .collect();
        Self { rng, candidates }
    }
}

impl<R: Rng> FireSolution for RandomFire<R> {
    fn next_target(&mut self) -> Option<Coord> {
        if self.candidates.is_empty() {
            return None;
        }
        let i = self.rng.random_range(0..self.candidates.len());
        Some(self.candidates.swap_remove(i))
    }
}

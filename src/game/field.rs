use std::fmt;

use rand::Rng;

use crate::proto::{Coord, FIELD_SIZE, Impact, RowCounts};

/// (ship length, number of such ships)
pub const FLEET: [(usize, usize); 4] = [(5, 1), (4, 2), (3, 3), (2, 4)];

/// Rejected placements tolerated before starting over with an empty field.
const MAX_RETRIES: usize = 1000;

pub fn fleet_cells() -> usize {
    FLEET.iter().map(|(len, count)| len * count).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Water,
    Ship(u8),
    Hit,
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    /// Along the row index.
    Vertical,
    /// Along the column index.
    Horizontal,
}

type Layout = [[u8; FIELD_SIZE]; FIELD_SIZE];

#[derive(Debug, Clone)]
pub struct Field {
    /// Ship lengths as placed, 0 for water. Never changes after generation.
    layout: Layout,
    cells: [[Cell; FIELD_SIZE]; FIELD_SIZE],
}

impl Field {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        loop {
            log::debug!("generating field");
            if let Some(layout) = try_place_fleet(rng) {
                return Self::from_layout(layout);
            }
        }
    }

    pub fn from_layout(layout: Layout) -> Self {
        let mut cells = [[Cell::Water; FIELD_SIZE]; FIELD_SIZE];
        for (row, cells_row) in layout.iter().zip(cells.iter_mut()) {
            for (&len, cell) in row.iter().zip(cells_row.iter_mut()) {
                if len != 0 {
                    *cell = Cell::Ship(len);
                }
            }
        }
        Self { layout, cells }
    }

    pub fn row_counts(&self) -> RowCounts {
        RowCounts::from_rows(&self.layout)
    }

    /// The original layout, one entry per row, as sent in `SF` records.
    pub fn reveal(&self) -> impl Iterator<Item = (u8, [u8; FIELD_SIZE])> + '_ {
        self.layout
            .iter()
            .enumerate()
            .map(|(row, cells)| (row as u8, *cells))
    }

    pub fn shot_at(&mut self, at: Coord) -> Impact {
        let cell = &mut self.cells[at.row as usize][at.col as usize];
        match *cell {
            Cell::Water | Cell::Miss => {
                *cell = Cell::Miss;
                Impact::Miss
            }
            Cell::Ship(_) | Cell::Hit => {
                *cell = Cell::Hit;
                Impact::Hit
            }
        }
    }

    pub fn ships_left(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| matches!(c, Cell::Ship(_)))
            .count()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            f.write_str("    ")?;
            for cell in row {
                match cell {
                    Cell::Water => f.write_str("0")?,
                    Cell::Ship(len) => write!(f, "{len}")?,
                    Cell::Hit => f.write_str("T")?,
                    Cell::Miss => f.write_str("W")?,
                }
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

/// One placement attempt; `None` when it got stuck.
fn try_place_fleet<R: Rng>(rng: &mut R) -> Option<Layout> {
    let mut layout = [[0u8; FIELD_SIZE]; FIELD_SIZE];
    let mut retries = 0;

    for &(len, count) in &FLEET {
        for _ in 0..count {
            loop {
                let orientation = if rng.random_bool(0.5) {
                    Orientation::Vertical
                } else {
                    Orientation::Horizontal
                };
                let (row, col) = match orientation {
                    Orientation::Vertical => (
                        rng.random_range(0..=FIELD_SIZE - len),
                        rng.random_range(0..FIELD_SIZE),
                    ),
                    Orientation::Horizontal => (
                        rng.random_range(0..FIELD_SIZE),
                        rng.random_range(0..=FIELD_SIZE - len),
                    ),
                };

                if surroundings_clear(&layout, row, col, orientation, len) {
                    for i in 0..len {
                        match orientation {
                            Orientation::Vertical => layout[row + i][col] = len as u8,
                            Orientation::Horizontal => layout[row][col + i] = len as u8,
                        }
                    }
                    break;
                }

                retries += 1;
                if retries >= MAX_RETRIES {
                    log::debug!("ship placement got stuck, starting over");
                    return None;
                }
            }
        }
    }
    Some(layout)
}

/// True if neither the ship nor its one-cell border touches another ship.
fn surroundings_clear(
    layout: &Layout,
    row: usize,
    col: usize,
    orientation: Orientation,
    len: usize,
) -> bool {
    let (rows, cols) = match orientation {
        Orientation::Vertical => (row.saturating_sub(1)..=row + len, col.saturating_sub(1)..=col + 1),
        Orientation::Horizontal => (row.saturating_sub(1)..=row + 1, col.saturating_sub(1)..=col + len),
    };
    rows.filter(|&r| r < FIELD_SIZE).all(|r| {
        cols.clone()
            .filter(|&c| c < FIELD_SIZE)
            .all(|c| layout[r][c] == 0)
    })
}

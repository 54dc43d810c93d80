use crate::grid::{Board, Cell, IdolId, COLS, ROWS};
use crate::size::Size;
use serde::{Deserialize, Serialize};

/// Edge length of one board cell in pixels.
pub const CELL_PX: f64 = 52.0;

/// A point in board pixel space, origin at the top-left corner of cell (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Centre of a cell, handy for callers that think in cells rather than pixels.
    pub fn center_of(cell: Cell) -> Self {
        Self {
            x: (f64::from(cell.col) + 0.5) * CELL_PX,
            y: (f64::from(cell.row) + 0.5) * CELL_PX,
        }
    }
}

fn cell_contains(cell: Cell, point: Point) -> bool {
    let x0 = f64::from(cell.col) * CELL_PX;
    let y0 = f64::from(cell.row) * CELL_PX;
    point.x >= x0 && point.x < x0 + CELL_PX && point.y >= y0 && point.y < y0 + CELL_PX
}

/// Picks where an idol of `size` lands when dropped at `point`.
///
/// Every legal top-left position is scored by how many of its cells contain the point; the first
/// best in row-major order wins. Scoring starts below zero, so a drop outside every legal footprint
/// still lands on the first legal position. `None` only when nothing on the board is legal.
pub fn best_placement(
    board: &Board,
    point: Point,
    size: Size,
    moving: Option<IdolId>,
) -> Option<Cell> {
    let mut best: Option<(i32, Cell)> = None;
    for row in 0..=ROWS - size.height() {
        for col in 0..=COLS - size.width() {
            let at = Cell::new(row, col);
            if !board.is_legal(at, size, moving) {
                continue;
            }
            let mut overlap = 0;
            for dr in 0..size.height() {
                for dc in 0..size.width() {
                    if cell_contains(Cell::new(row + dr, col + dc), point) {
                        overlap += 1;
                    }
                }
            }
            match best {
                Some((score, _)) if overlap <= score => {}
                _ => best = Some((overlap, at)),
            }
        }
    }
    best.map(|(_, at)| at)
}

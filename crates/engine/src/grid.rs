use crate::modifier::Modifier;
use crate::size::Size;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ROWS: u8 = 7;
pub const COLS: u8 = 6;

/// Cells that can never host an idol.
pub const BLOCKED_CELLS: [Cell; 10] = [
    Cell::new(0, 0),
    Cell::new(2, 1),
    Cell::new(3, 1),
    Cell::new(4, 1),
    Cell::new(3, 2),
    Cell::new(3, 3),
    Cell::new(3, 4),
    Cell::new(2, 4),
    Cell::new(4, 4),
    Cell::new(6, 5),
];

/// Number of modifier slots on an idol: two prefixes then two suffixes.
pub const SLOT_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: u8,
    pub col: u8,
}

impl Cell {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn is_blocked(self) -> bool {
        BLOCKED_CELLS.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdolId(pub u64);

impl fmt::Display for IdolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub type Slots = [Option<Modifier>; SLOT_COUNT];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idol {
    pub id: IdolId,
    pub size: Size,
    pub position: Option<Cell>,
    pub slots: Slots,
}

impl Idol {
    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    /// Cells covered by a placed idol; empty while unplaced.
    pub fn cells(&self) -> Vec<Cell> {
        match self.position {
            Some(at) => footprint(at, self.size).collect(),
            None => Vec::new(),
        }
    }

    fn covers(&self, cell: Cell) -> bool {
        let Some(at) = self.position else {
            return false;
        };
        cell.row >= at.row
            && cell.row < at.row + self.size.height()
            && cell.col >= at.col
            && cell.col < at.col + self.size.width()
    }

    /// Filled slots in slot order.
    pub fn modifiers(&self) -> impl Iterator<Item = &Modifier> {
        self.slots.iter().flatten()
    }
}

fn footprint(at: Cell, size: Size) -> impl Iterator<Item = Cell> {
    (0..size.height())
        .flat_map(move |dr| (0..size.width()).map(move |dc| Cell::new(at.row + dr, at.col + dc)))
}

/// The 7x6 board and every idol the user has created, placed or not.
///
/// Idols are kept in board order: creation order, except that a successful move sends the idol to
/// the back. Aggregation and encoding both walk this order.
#[derive(Debug, Clone, Default)]
pub struct Board {
    idols: Vec<Idol>,
    next_id: u64,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_legal(&self, at: Cell, size: Size, exclude: Option<IdolId>) -> bool {
        let (width, height) = (size.width(), size.height());
        if u16::from(at.row) + u16::from(height) > u16::from(ROWS)
            || u16::from(at.col) + u16::from(width) > u16::from(COLS)
        {
            return false;
        }
        // Idols never overlap, so a cell has at most one occupant.
        footprint(at, size).all(|cell| {
            !cell.is_blocked()
                && self
                    .occupant(cell)
                    .map_or(true, |occupant| Some(occupant) == exclude)
        })
    }

    pub fn add(&mut self, size: Size, slots: Slots) -> IdolId {
        self.next_id += 1;
        let id = IdolId(self.next_id);
        self.idols.push(Idol {
            id,
            size,
            position: None,
            slots,
        });
        id
    }

    /// Moves an idol to `at` if legal. The idol's current footprint does not block itself.
    pub fn place(&mut self, id: IdolId, at: Cell) -> bool {
        let Some(index) = self.idols.iter().position(|idol| idol.id == id) else {
            return false;
        };
        if !self.is_legal(at, self.idols[index].size, Some(id)) {
            return false;
        }
        let mut idol = self.idols.remove(index);
        idol.position = Some(at);
        self.idols.push(idol);
        true
    }

    pub fn remove(&mut self, id: IdolId) -> Option<Idol> {
        let index = self.idols.iter().position(|idol| idol.id == id)?;
        Some(self.idols.remove(index))
    }

    pub fn get(&self, id: IdolId) -> Option<&Idol> {
        self.idols.iter().find(|idol| idol.id == id)
    }

    pub fn idols(&self) -> &[Idol] {
        &self.idols
    }

    pub fn placed(&self) -> impl Iterator<Item = &Idol> {
        self.idols.iter().filter(|idol| idol.is_placed())
    }

    pub fn occupant(&self, cell: Cell) -> Option<IdolId> {
        self.idols
            .iter()
            .find(|idol| idol.covers(cell))
            .map(|idol| idol.id)
    }

    pub fn clear(&mut self) {
        self.idols.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn size(label: &str) -> Size {
        label.parse().unwrap()
    }

    #[test]
    fn bounds_and_blocked_cells_are_illegal() {
        let board = Board::new();
        assert!(board.is_legal(Cell::new(0, 1), size("1x1"), None));
        assert!(!board.is_legal(Cell::new(0, 0), size("1x1"), None));
        assert!(!board.is_legal(Cell::new(6, 5), size("1x1"), None));
        assert!(!board.is_legal(Cell::new(7, 0), size("1x1"), None));
        assert!(!board.is_legal(Cell::new(0, 6), size("1x1"), None));
        assert!(!board.is_legal(Cell::new(0, 4), size("3x1"), None));
        assert!(!board.is_legal(Cell::new(5, 0), size("1x3"), None));
        // 2x2 at (1,0) would cover (2,1).
        assert!(!board.is_legal(Cell::new(1, 0), size("2x2"), None));
        assert!(board.is_legal(Cell::new(0, 1), size("2x2"), None));
    }

    #[test]
    fn overlapping_placements_only_one_wins() {
        let mut board = Board::new();
        let empty = Slots::default();
        let a = board.add(size("2x2"), empty.clone());
        let b = board.add(size("2x1"), empty);
        assert!(board.place(a, Cell::new(0, 1)));
        assert!(!board.place(b, Cell::new(1, 2)));
        assert!(board.get(b).unwrap().position.is_none());
        assert!(board.place(b, Cell::new(0, 3)));
        assert_eq!(board.occupant(Cell::new(1, 2)), Some(a));
        assert_eq!(board.occupant(Cell::new(0, 4)), Some(b));
    }

    #[test]
    fn moving_ignores_own_footprint_and_reorders() {
        let mut board = Board::new();
        let a = board.add(size("2x1"), Slots::default());
        let b = board.add(size("1x1"), Slots::default());
        assert!(board.place(a, Cell::new(0, 1)));
        assert!(board.place(b, Cell::new(5, 0)));
        assert!(board.place(a, Cell::new(0, 2)));
        let order: Vec<IdolId> = board.idols().iter().map(|i| i.id).collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(board.get(a).unwrap().cells(), vec![Cell::new(0, 2), Cell::new(0, 3)]);
    }

    #[test]
    fn removed_idols_free_their_cells() {
        let mut board = Board::new();
        let a = board.add(size("1x1"), Slots::default());
        assert!(board.place(a, Cell::new(1, 1)));
        assert!(board.remove(a).is_some());
        assert!(board.remove(a).is_none());
        assert!(board.is_legal(Cell::new(1, 1), size("1x1"), None));
    }

    proptest! {
        #[test]
        fn prop_placed_idols_never_share_cells(
            moves in proptest::collection::vec((0usize..6, 0u8..8, 0u8..7), 1..40)
        ) {
            let mut board = Board::new();
            for (size_idx, row, col) in moves {
                let id = board.add(Size::ALL[size_idx], Slots::default());
                board.place(id, Cell::new(row, col));
            }
            let mut seen = std::collections::HashSet::new();
            for idol in board.placed() {
                let cells = idol.cells();
                prop_assert_eq!(
                    cells.len(),
                    usize::from(idol.size.width()) * usize::from(idol.size.height())
                );
                for cell in cells {
                    prop_assert!(cell.row < ROWS && cell.col < COLS);
                    prop_assert!(!cell.is_blocked());
                    prop_assert!(seen.insert(cell));
                }
            }
        }
    }
}

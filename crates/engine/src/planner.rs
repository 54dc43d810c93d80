use crate::aggregate::{board_totals, render, BonusGroup};
use crate::catalog::{Catalog, ModifierSource};
use crate::codec::{self, DecodedIdol};
use crate::grid::{Board, Cell, Idol, IdolId, Slots, SLOT_COUNT};
use crate::modifier::Modifier;
use crate::parser::ModifierLists;
use crate::placement::{best_placement, Point};
use crate::registry::Section;
use crate::size::Size;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerError {
    #[error("no idol with id {0}")]
    UnknownIdol(IdolId),
    #[error("no legal position for idol {id} ({size})")]
    PlacementRejected { id: IdolId, size: Size },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub placed: usize,
    pub dropped: usize,
}

fn slot_section(index: usize) -> Section {
    if index < SLOT_COUNT / 2 {
        Section::Prefix
    } else {
        Section::Suffix
    }
}

/// The board, its idols, and the modifier catalog behind them.
#[derive(Debug, Default)]
pub struct Planner {
    catalog: Catalog,
    board: Board,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn options(&mut self, size: Size, source: &dyn ModifierSource) -> ModifierLists {
        self.catalog.ensure_loaded(size, source)
    }

    /// Creates an unplaced idol. Slots 0 and 1 take prefixes and slots 2 and 3 take suffixes; text
    /// that is blank or not registered in that section leaves the slot empty.
    pub fn add_idol<S: AsRef<str>>(&mut self, size: Size, slot_texts: &[Option<S>]) -> IdolId {
        let registry = self.catalog.registry();
        let mut slots = Slots::default();
        for (index, (slot, text)) in slots.iter_mut().zip(slot_texts).enumerate() {
            let Some(text) = text.as_ref().map(|t| t.as_ref().trim()).filter(|t| !t.is_empty())
            else {
                continue;
            };
            let section = slot_section(index);
            if registry.id_in(section, text).is_some() {
                *slot = Some(Modifier::new(text));
            } else {
                log::debug!("ignoring unknown {section:?} text {text:?} for new {size} idol");
            }
        }
        let id = self.board.add(size, slots);
        log::debug!("created idol {id} ({size})");
        id
    }

    pub fn idol(&self, id: IdolId) -> Result<&Idol, PlannerError> {
        self.board.get(id).ok_or(PlannerError::UnknownIdol(id))
    }

    pub fn idols(&self) -> &[Idol] {
        self.board.idols()
    }

    /// Drops an idol at a board pixel point. On rejection the idol keeps its previous position.
    pub fn drop_idol(&mut self, id: IdolId, point: Point) -> Result<Cell, PlannerError> {
        let size = self.idol(id)?.size;
        let Some(at) = best_placement(&self.board, point, size, Some(id)) else {
            log::debug!("drop of idol {id} at ({}, {}) rejected", point.x, point.y);
            return Err(PlannerError::PlacementRejected { id, size });
        };
        self.place_idol(id, at)?;
        Ok(at)
    }

    pub fn place_idol(&mut self, id: IdolId, at: Cell) -> Result<(), PlannerError> {
        let size = self.idol(id)?.size;
        if self.board.place(id, at) {
            Ok(())
        } else {
            Err(PlannerError::PlacementRejected { id, size })
        }
    }

    pub fn remove_idol(&mut self, id: IdolId) -> Result<Idol, PlannerError> {
        self.board.remove(id).ok_or(PlannerError::UnknownIdol(id))
    }

    pub fn bonus_groups(&self) -> Vec<BonusGroup> {
        board_totals(&self.board)
    }

    pub fn totals(&self) -> Vec<String> {
        render(&self.bonus_groups())
    }

    pub fn encode(&self) -> String {
        codec::encode(&self.board, self.catalog.registry())
    }

    /// Replaces the board with an encoded one. Sources for the sizes it mentions must already be
    /// loaded for modifier IDs to resolve; see [`Planner::restore_with`].
    pub fn restore(&mut self, state: &str) -> RestoreReport {
        self.board.clear();
        let mut report = RestoreReport::default();
        for DecodedIdol { at, size, slots } in codec::decode(state, self.catalog.registry()) {
            let id = self.add_idol(size, &slots);
            match self.place_idol(id, at) {
                Ok(()) => report.placed += 1,
                Err(_) => {
                    log::debug!("dropping restored idol {size} at ({}, {})", at.row, at.col);
                    self.board.remove(id);
                    report.dropped += 1;
                }
            }
        }
        report
    }

    /// Loads the sources an encoded board refers to, in order of appearance, then restores it.
    pub fn restore_with(&mut self, state: &str, source: &dyn ModifierSource) -> RestoreReport {
        for size in codec::referenced_sizes(state) {
            self.catalog.ensure_loaded(size, source);
        }
        self.restore(state)
    }
}

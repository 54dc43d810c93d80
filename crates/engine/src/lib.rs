//! Core of Idolboard: a 7x6 idol board with blocked cells, modifier parsing and summation, and a
//! compact encoding for sharing boards.

pub mod aggregate;
pub mod catalog;
pub mod codec;
pub mod grid;
pub mod modifier;
pub mod parser;
pub mod placement;
pub mod planner;
pub mod registry;
pub mod size;
pub mod store;

pub use aggregate::BonusGroup;
pub use catalog::{Catalog, DirSource, ModifierSource, SourceFetchError, StaticSource};
pub use grid::{Board, Cell, Idol, IdolId, COLS, ROWS};
pub use modifier::{Modifier, ModifierRecord, ModifierShape};
pub use parser::ModifierLists;
pub use placement::Point;
pub use planner::{Planner, PlannerError, RestoreReport};
pub use registry::{ModifierId, Registry, Section};
pub use size::{Size, UnknownSize};
pub use store::{BoardStore, StoredBoard};

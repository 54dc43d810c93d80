//! Umbrella crate for Idolboard.
//!
//! Re-exports the engine and protocol crates so downstream code can depend on a single crate name
//! (`idolboard`).

pub use idolboard_engine as engine;
pub use idolboard_protocol as protocol;

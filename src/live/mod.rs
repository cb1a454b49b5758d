//! Live view of the board: one listener over the category collection plus
//! one task listener per category, merged into a single ordered snapshot.

pub mod aggregator;

pub use aggregator::{subscribe, AggregatorHandle, INITIAL_LOAD_GRACE};

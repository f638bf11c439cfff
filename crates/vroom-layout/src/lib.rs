//! VROOM Layout - Tile layout engine
//!
//! Packs `count` fixed-aspect tiles into a container, maximizing tile size.
//! [`compute_layout`] is a pure function; [`LayoutTracker`] recomputes it
//! only when the container size or tile count actually changes.

pub mod grid;
pub mod tracker;

pub use grid::*;
pub use tracker::*;

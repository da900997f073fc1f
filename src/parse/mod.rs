//! HTML extraction: single-cell lesson parsing and the full group-table walk.

pub mod cell;
pub mod group;

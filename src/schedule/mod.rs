//! Pure date/schedule logic over a loaded snapshot: week-parity resolution,
//! calendar-day projection, and the per-teacher aggregated view.

pub mod parity;
pub mod project;
pub mod teachers;

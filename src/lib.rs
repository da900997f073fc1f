//! Timetable acquisition and week-parity scheduling engine.
//!
//! The scrape half ([`scrape`], [`portal`], [`parse`]) authenticates against
//! the university portal, extracts every group's two-week lesson template
//! from irregular HTML, and writes one versioned JSON snapshot per batch
//! run. The query half ([`schedule`]) is pure date arithmetic over a loaded
//! snapshot: week-parity resolution, calendar-day projection, and the
//! per-teacher aggregated view.

pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod parse;
pub mod portal;
pub mod schedule;
pub mod scrape;
pub mod utils;

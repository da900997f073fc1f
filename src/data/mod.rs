//! Data layer: core models, the group catalog, and snapshot persistence.

pub mod catalog;
pub mod models;
pub mod snapshot;

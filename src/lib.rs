//! Personal plant-watering tracker.
//!
//! Users keep a list of plants with a watering interval. Next-watering dates
//! are derived on every read, and a periodic scan emails each user the
//! plants that are due.

pub mod accounts;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod notifier;
pub mod routes;
pub mod scanner;
pub mod schedule;
pub mod storage;
pub mod user_models;

pub use error::{PlantError, PlantResult};

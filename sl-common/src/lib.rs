//! # StreetLight Common Library
//!
//! Shared code for the StreetLight report services:
//! - Error and result types
//! - TOML bootstrap configuration and logging setup
//! - Geographic math (Haversine distance, service region bounds)
//! - Pipeline event types and the EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod logging;

pub use error::{Error, Result};
pub use geo::{Coordinates, RegionBounds};

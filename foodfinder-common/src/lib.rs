//! # FoodFinder Common Library
//!
//! Shared code for the FoodFinder client crates:
//! - Error type
//! - Configuration loading (TOML file, environment, compiled defaults)
//! - Scan event types and the EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};

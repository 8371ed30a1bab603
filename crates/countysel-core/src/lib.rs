//! countysel core - Domain models, configuration, and format readers
//!
//! This crate holds the types shared by the geometry, query, and CLI crates,
//! plus the loaders that turn files into reference layers, drawings, and
//! attribute tables.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;

pub use error::{Result, SelectorError};

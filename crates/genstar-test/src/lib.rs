//! Shared test fixtures for Genstar crates.
//!
//! This crate provides attribute dictionaries, small populations and
//! writers for on-disk survey and geometry files. It does NOT depend on
//! `genstar-generator`, so the generator can use it as a dev-dependency.
//!
//! - [`dictionary`] - Sex / Age dictionaries used across tests
//! - [`survey`] - CSV contingency tables and samples
//! - [`geometry`] - GeoJSON feature collections of rectangles
//! - [`population`] - In-memory sample populations
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! genstar-test = { workspace = true }
//! ```

pub mod dictionary;
pub mod geometry;
pub mod population;
pub mod survey;

pub use dictionary::{age, sex, sex_age};
pub use geometry::{write_rectangles, Rectangle};
pub use population::sex_age_sample;
pub use survey::{write_census_1000, write_csv, write_sample};

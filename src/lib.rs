//! Viewer for creature records served by the PokeAPI REST service.
//!
//! Data flows one way: an id goes in, [`fetch`] pulls the record, [`models`]
//! exposes typed views over it, [`blob`] turns it into the snapshot the
//! front-ends render, and [`pipeline`] wires those stages into reactive cells.
pub mod blob;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod ui;
pub mod utils;
pub mod web;

pub use error::{ApiError, Result};
pub use fetch::{PokemonApi, PokemonSource};
pub use models::{ImageView, Pokemon, StatName, StatSnapshot, StatView};

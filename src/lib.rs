//! Form student project teams and keep them consistent while students join,
//! leave and move between them.

pub mod algos;
pub mod checks;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod loaders;
pub mod model;
pub mod stats;

pub use crate::error::Error;

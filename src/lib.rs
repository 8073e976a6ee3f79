//! Single user time tracking from the terminal: a stopwatch with laps, plus clients and projects
//! kept in one local json document.
//!

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod query;
pub mod store;
pub mod tags;
pub mod timer;
pub mod utils;
pub mod validation;

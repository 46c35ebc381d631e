//! Converts transaction histories exported by crypto exchanges between tabular formats.
//!
//! A file is read by the `table` module into typed cells, turned into canonical records by one of
//! the parsers in `formats` (chosen explicitly or by the `dispatch` module), and written back out
//! by an exporter of the target format.

pub mod args;
pub mod commands;
mod config;
pub mod dispatch;
mod error;
pub mod formats;
pub mod model;
pub mod symbols;
pub mod table;
mod utils;


pub use config::Config;
pub use error::{Drift, Error, FormatError, FormatResult, Result};

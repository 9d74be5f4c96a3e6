#![forbid(unsafe_code)]

pub mod api;
pub mod cache;
mod error;
pub mod suite;
pub mod target;

pub use error::{Error, Result};

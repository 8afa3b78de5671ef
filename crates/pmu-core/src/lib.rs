pub mod branch;
pub mod config;
pub mod error;
pub mod gateway;
pub mod gh;
pub mod query;
pub mod resolver;
pub mod title;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PmuError, Result};

//! The `utils` module provides the error types and logging setup shared by
//! every other module of `livecast`.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;

//! Logging and shared test fixtures.

pub mod log;
#[cfg(test)]
pub mod test_utils;

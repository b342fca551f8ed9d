// src/lib.rs
pub mod config;
pub mod health;
pub mod metrics;
pub mod server;

#[cfg(test)]
pub(crate) mod test_utils;

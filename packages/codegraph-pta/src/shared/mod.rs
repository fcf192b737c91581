//! Shared models and ports used by every feature

#[macro_use]
pub mod macros;
pub mod models;
pub mod ports;

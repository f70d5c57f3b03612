//! Utilities shared by the clinic relay crates.

pub mod logger;
pub mod time;

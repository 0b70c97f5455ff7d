#![warn(clippy::unwrap_used)]

pub mod calldata;
pub mod consolidation;
pub mod constants;
pub mod errors;
pub mod files;
pub mod linking;
pub mod selectors;
pub mod withdrawal;

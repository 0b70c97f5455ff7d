pub mod batcher;
pub mod config;
pub mod errors;
pub mod output;
pub mod plan;
pub mod pods;
pub mod submarine;
pub mod targets;
pub mod validation;

#![warn(clippy::unwrap_used)]

pub mod balance;
pub mod constants;
pub mod credentials;
pub mod errors;
pub mod sweep;
pub mod validator;

//! Core business logic for rateit.

pub mod services;

pub use services::*;

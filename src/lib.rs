//! Shelf book review service
//!
//! Domain modules (users, books, reviews) and the bootstrap that wires them
//! onto the Shelf kernel, store and HTTP facade.

pub mod bootstrap;
pub mod modules;
pub mod utils;

pub use bootstrap::Application;

//! Project-specific utilities live here.

pub mod pagination;

pub use pagination::{PageMeta, Pagination};

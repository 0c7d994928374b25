//! Application services

pub mod index;

pub use index::IndexService;

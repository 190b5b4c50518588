//! Token counting

pub mod counter;

pub use counter::{TokenCounter, DEFAULT_ENCODING};

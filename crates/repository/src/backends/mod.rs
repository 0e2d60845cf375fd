//! Storage engine implementations.
//!
//! - [`memory`] - In-process reference engine

pub mod memory;

//! Entity keys: native key types, coercion and generation.

mod generator;
mod resolver;
mod value;

pub use generator::{KeyGenerator, RandomKeyGenerator, SequentialKeyGenerator};
pub use resolver::KeyResolver;
pub use value::{EntityKey, KeyValue};

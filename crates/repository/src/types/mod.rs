//! Backend-neutral query types: filters, sort rules and pages.

mod filter;
mod pagination;
mod sort;

pub use filter::{FieldRef, Filter, FilterVisitor, Predicate};
pub use pagination::{PageRequest, PageResult, compute_offset, compute_total_pages};
pub use sort::{SortDirection, SortRule};

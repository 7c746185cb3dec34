//! Read path: filter values → backend query → campaigns + total.

pub mod executor;
pub mod predicate;

pub use executor::{QueryError, QueryExecutor, QueryResult};
pub use predicate::{FilterSpec, build_predicate};

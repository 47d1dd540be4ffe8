pub mod mutation;
pub mod query;

pub use mutation::{Mutation, SessionWriteError};
pub use query::Query;

pub mod query;
pub mod resolver;

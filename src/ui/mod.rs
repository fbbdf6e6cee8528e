pub mod node;
pub mod snapshot;

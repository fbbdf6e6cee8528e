pub mod client;
pub mod keys;
pub mod model;
pub mod portal;
pub mod transport;
pub mod xml;

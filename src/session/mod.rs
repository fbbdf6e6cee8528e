pub mod capabilities;
pub mod lifecycle;

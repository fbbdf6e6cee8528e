//! Driver commands as free functions over an explicit [`DriverContext`].
//!
//! [`DriverContext`]: crate::driver::DriverContext

pub mod actions;
pub mod device;
pub mod element;
pub mod execute;
pub mod keyboard;
pub mod source;

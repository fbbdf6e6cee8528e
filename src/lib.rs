//! UI automation for Roku devices over the External Control Protocol.
//!
//! The device is only ever observed through periodic `app-ui` snapshots and
//! only ever driven through remote key presses. Element interaction is built
//! on top: resolve an XPath against a snapshot, walk focus to the match one
//! key at a time, then act on the focused node.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod driver;
pub mod ecp;
pub mod error;
pub mod focus;
pub mod locator;
pub mod session;
pub mod trace;
pub mod ui;

pub use driver::{AutomationDriver, DriverContext, RokuDriver};
pub use error::{DriverError, Result};

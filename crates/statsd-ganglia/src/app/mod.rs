//! Application module
//!
//! Wires the statsd listener, the flush loop and the management interface
//! together and manages their lifecycle.

pub mod builder;
pub mod core;
pub mod services;
pub mod tasks;

pub use builder::ApplicationBuilder;
pub use core::Application;
pub use services::ApplicationServices;

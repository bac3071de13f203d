//! CLI command implementations.

pub mod build;
pub mod watch;

pub use build::build_once;
pub use watch::watch;

//! # lumen-core
//!
//! Core library for the lumen incremental site generator.
//!
//! The heart of the crate is [`builder::SiteBuilder`]: it owns the in-memory
//! [`models::SiteIndex`] across build cycles and decides, per trigger, whether
//! to rebuild everything or just the one document that changed.

pub mod assets;
pub mod builder;
pub mod config;
pub mod hooks;
pub mod markdown;
pub mod models;

pub use builder::{BuildError, BuildMode, BuildReport, SiteBuilder};
pub use config::{Config, ConfigError, Layout};
pub use markdown::MarkdownRenderer;
pub use models::{Page, SiteIndex, Trigger};

//! # lumen-render
//!
//! Template rendering library for lumen.
//!
//! This crate holds the askama template definitions for both page layouts.
//! It deliberately has no dependency on `lumen-core`: templates receive
//! plain strings and entry lists, so the core crate decides what goes in.

pub mod templates;

pub use templates::{
    FramesetTemplate, MenuEntry, MenuTemplate, PageTemplate, ShellNavTemplate, ShellPageTemplate,
};

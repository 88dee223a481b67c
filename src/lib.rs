//! Storefront gallery with lazy, responsive product images.
//!
//! The interesting part lives in [`responsive`]: an image component that waits
//! for the viewport, negotiates width and format variants, and falls back to
//! the bare reference once when a variant fails.

pub mod catalog;
pub mod config;
pub mod error;
pub mod responsive;
pub mod store;
pub mod ui;

//! Widgets shared by the gallery views

pub mod boundary;
pub mod grid;
pub mod picture;

pub use boundary::{guard, Guarded};
pub use grid::{grid_bounds, reconcile, resize_viewport, Slot};
pub use picture::{Fade, Placeholder, FADE_DURATION};

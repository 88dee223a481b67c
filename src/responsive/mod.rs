//! Responsive, lazily loaded images
//!
//! This module handles:
//! - Deriving width and format variants from a canonical reference
//! - Deferring fetches until an image nears the viewport
//! - Negotiating which variant to fetch
//! - Falling back to the bare reference when a variant fails

pub mod candidates;
pub mod component;
pub mod loader;
pub mod observer;
pub mod picture;
pub mod sizes;

pub use candidates::{derive_candidates, CandidateSet, DisplayHints, ImageRequest};
pub use component::{AdaptiveImage, Attempt, Callbacks, FetchPlan, InstanceId, LoadState};
pub use loader::{AssetSource, DirectorySource, LoadedAsset};
pub use observer::{ObserverId, ProximityDetector, ProximityObserver};
pub use picture::{Picture, RenderEnv, Source};
pub use sizes::SizesDescriptor;

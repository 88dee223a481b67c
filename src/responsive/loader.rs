//! Asset loading
//!
//! Resolves a fetch plan to one URL, reads it from an [`AssetSource`] and
//! decodes it. Reading and decoding run on the blocking pool; the UI thread
//! only ever sees the finished handle or an [`AssetError`].

use iced::widget::image::Handle;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::task;

use super::picture::{RenderEnv, Source};
use crate::error::AssetError;

/// Where image bytes come from
pub trait AssetSource: Send + Sync + 'static {
    /// Read the bytes behind `url`. Blocking.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError>;
}

/// Serves URL paths from a directory: `/img/apple.jpg` → `{root}/img/apple.jpg`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL onto the root, refusing anything that escapes it
    pub fn resolve(&self, url: &str) -> Result<PathBuf, AssetError> {
        let path_end = url.find(['?', '#']).unwrap_or(url.len());
        let relative = Path::new(url[..path_end].trim_start_matches('/'));

        if url.contains("://") || relative.as_os_str().is_empty() {
            return Err(AssetError::InvalidUrl(url.to_string()));
        }

        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(AssetError::InvalidUrl(url.to_string())),
            }
        }

        Ok(resolved)
    }
}

impl AssetSource for DirectorySource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(url)?;

        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(url.to_string()),
            _ => AssetError::Io {
                url: url.to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// A decoded image ready for display
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    /// The URL that was actually fetched
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub handle: Handle,
}

impl LoadedAsset {
    pub fn from_rgba(url: String, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            url,
            width,
            height,
            handle: Handle::from_rgba(width, height, pixels),
        }
    }
}

/// Load the asset described by `source`
///
/// # Arguments
/// * `assets` - Where bytes are read from
/// * `source` - Picture to negotiate, or the bare reference
/// * `env` - Viewport and capabilities used for negotiation
pub async fn load(
    assets: Arc<dyn AssetSource>,
    source: Source,
    env: RenderEnv,
) -> Result<LoadedAsset, AssetError> {
    // Spawn blocking because reading and decoding are not async-friendly
    task::spawn_blocking(move || load_blocking(assets.as_ref(), &source, &env))
        .await
        .map_err(|e| AssetError::Join(e.to_string()))?
}

/// Blocking implementation of asset loading
fn load_blocking(
    assets: &dyn AssetSource,
    source: &Source,
    env: &RenderEnv,
) -> Result<LoadedAsset, AssetError> {
    let url = source.resolve(env).to_string();
    let bytes = assets.fetch(&url)?;

    let decoded = image::load_from_memory(&bytes).map_err(|e| AssetError::Decode {
        url: url.clone(),
        message: e.to_string(),
    })?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    tracing::debug!("🖼️  Loaded {url} ({width}x{height}, {}KB)", bytes.len() / 1024);

    Ok(LoadedAsset::from_rgba(url, width, height, rgba.into_raw()))
}

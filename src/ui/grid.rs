//! Product grid layout
//!
//! Tiles sit on a fixed grid so their bounds are known without a layout pass,
//! which is what the proximity observer needs. Filtering keeps the tiles that
//! survive instead of rebuilding them.

use iced::{Rectangle, Size};

/// Bounds of a tile placed on a grid
pub fn grid_bounds(index: usize, columns: usize, tile: Size, spacing: f32) -> Rectangle {
    let columns = columns.max(1);
    let (row, column) = (index / columns, index % columns);

    Rectangle {
        x: column as f32 * (tile.width + spacing),
        y: row as f32 * (tile.height + spacing),
        width: tile.width,
        height: tile.height,
    }
}

/// Grid viewport after the window changed from `old` to `new`.
///
/// Only the grid stretches with the window; the surrounding chrome keeps its
/// size, so the viewport moves by the same delta.
pub fn resize_viewport(viewport: Rectangle, old: Size, new: Size) -> Rectangle {
    Rectangle {
        width: (viewport.width + new.width - old.width).max(0.0),
        height: (viewport.height + new.height - old.height).max(0.0),
        ..viewport
    }
}

/// One position of the grid after a filter change
#[derive(Debug, PartialEq)]
pub enum Slot<T> {
    /// An existing tile for the same product, moved to this position
    Kept(T),
    /// No tile yet for this product index
    New(usize),
}

/// Match `tiles` against the products that should now be shown.
///
/// `wanted` lists product indices in display order. Tiles whose product is no
/// longer wanted are handed to `removed`; the rest keep their identity.
pub fn reconcile<T>(
    tiles: Vec<T>,
    product_of: impl Fn(&T) -> usize,
    wanted: &[usize],
    mut removed: impl FnMut(T),
) -> Vec<Slot<T>> {
    let mut existing: Vec<Option<T>> = Vec::with_capacity(tiles.len());
    let mut products = Vec::with_capacity(tiles.len());

    for tile in tiles {
        if wanted.contains(&product_of(&tile)) {
            products.push(product_of(&tile));
            existing.push(Some(tile));
        } else {
            removed(tile);
        }
    }

    wanted
        .iter()
        .map(|&product| {
            products
                .iter()
                .position(|&p| p == product)
                .and_then(|i| existing[i].take())
                .map_or(Slot::New(product), Slot::Kept)
        })
        .collect()
}

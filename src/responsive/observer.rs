//! Proximity observer
//!
//! Reports, once, when a target rectangle comes within a margin of the
//! viewport. Fired targets are forgotten immediately, so leaving and
//! re-entering the viewport never triggers again.

use iced::Rectangle;
use std::collections::HashMap;

/// Distance from the viewport at which loading starts
pub const DEFAULT_MARGIN: f32 = 200.0;

/// Handle for one registered target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Platform primitive the image component registers with
pub trait ProximityDetector {
    /// Start watching `target`; it fires once within `margin` of the viewport
    fn observe(&mut self, target: Rectangle, margin: f32) -> ObserverId;

    /// Stop watching. Unknown or already fired ids are ignored.
    fn unobserve(&mut self, id: ObserverId);
}

#[derive(Debug, Clone, Copy)]
struct Target {
    bounds: Rectangle,
    margin: f32,
}

/// Viewport-driven detector used by the gallery
#[derive(Debug, Default)]
pub struct ProximityObserver {
    next_id: u64,
    targets: HashMap<ObserverId, Target>,
}

impl ProximityObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a pending target, e.g. after a relayout
    pub fn reposition(&mut self, id: ObserverId, bounds: Rectangle) {
        if let Some(target) = self.targets.get_mut(&id) {
            target.bounds = bounds;
        }
    }

    /// Targets near `viewport`, in ascending id order. They are removed.
    pub fn check(&mut self, viewport: Rectangle) -> Vec<ObserverId> {
        let mut fired: Vec<ObserverId> = self
            .targets
            .iter()
            .filter(|(_, target)| near(viewport, target.bounds, target.margin))
            .map(|(id, _)| *id)
            .collect();
        fired.sort_unstable();

        for id in &fired {
            self.targets.remove(id);
        }

        if !fired.is_empty() {
            tracing::debug!("👀 {} image(s) entered the viewport", fired.len());
        }

        fired
    }

    pub fn is_observing(&self, id: ObserverId) -> bool {
        self.targets.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl ProximityDetector for ProximityObserver {
    fn observe(&mut self, target: Rectangle, margin: f32) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.targets.insert(
            id,
            Target {
                bounds: target,
                margin: margin.max(0.0),
            },
        );
        id
    }

    fn unobserve(&mut self, id: ObserverId) {
        self.targets.remove(&id);
    }
}

/// Whether `target` overlaps `viewport` grown by `margin` on every side
fn near(viewport: Rectangle, target: Rectangle, margin: f32) -> bool {
    let left = viewport.x - margin;
    let top = viewport.y - margin;
    let right = viewport.x + viewport.width + margin;
    let bottom = viewport.y + viewport.height + margin;

    target.x <= right
        && target.x + target.width >= left
        && target.y <= bottom
        && target.y + target.height >= top
}

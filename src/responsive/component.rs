//! AdaptiveImage
//!
//! Lifecycle of one rendered image:
//!
//! ```text
//! Placeholder ──(near viewport)──▶ VisiblePending ──ok──▶ Loaded
//!                                      │  ▲
//!                    negotiated fails  │  │ one retry with the bare reference
//!                                      ▼  │
//!                                   (bare attempt) ──fails──▶ Failed
//! ```
//!
//! The component never fetches anything itself. It hands out [`FetchPlan`]s
//! and is told about the outcome, so every transition happens on one discrete
//! event and nothing arrives after [`AdaptiveImage::unmount`].

use iced::Rectangle;
use std::sync::atomic::{AtomicU64, Ordering};

use super::candidates::{derive_candidates, CandidateSet, ImageRequest};
use super::loader::LoadedAsset;
use super::observer::{ObserverId, ProximityDetector};
use super::picture::{Picture, Source};
use crate::error::AssetError;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Identity of one mounted component. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Waiting for the viewport
    Placeholder,
    /// A fetch is in flight
    VisiblePending,
    /// Terminal
    Loaded,
    /// Terminal, after the fallback also failed
    Failed,
}

impl LoadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Loaded | LoadState::Failed)
    }
}

/// Which source an attempt used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Responsive set / alternate format
    Negotiated,
    /// The reference with every hint stripped
    Bare,
}

/// A fetch the host must perform and report back
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub instance: InstanceId,
    pub attempt: Attempt,
    pub source: Source,
}

pub type LoadedCallback = Box<dyn Fn(&ImageRequest, &LoadedAsset) + Send + Sync>;
pub type FailedCallback = Box<dyn Fn(&ImageRequest, &AssetError) + Send + Sync>;

/// Optional notifications. They observe the state machine, never drive it.
#[derive(Default)]
pub struct Callbacks {
    pub on_loaded: Option<LoadedCallback>,
    pub on_failed: Option<FailedCallback>,
}

impl Callbacks {
    pub fn on_loaded(mut self, callback: impl Fn(&ImageRequest, &LoadedAsset) + Send + Sync + 'static) -> Self {
        self.on_loaded = Some(Box::new(callback));
        self
    }

    pub fn on_failed(mut self, callback: impl Fn(&ImageRequest, &AssetError) + Send + Sync + 'static) -> Self {
        self.on_failed = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_loaded", &self.on_loaded.is_some())
            .field("on_failed", &self.on_failed.is_some())
            .finish()
    }
}

/// One lazily loaded, responsive image
#[derive(Debug)]
pub struct AdaptiveImage {
    instance: InstanceId,
    request: ImageRequest,
    candidates: CandidateSet,
    state: LoadState,
    in_flight: Option<Attempt>,
    observer: Option<ObserverId>,
    asset: Option<LoadedAsset>,
    last_error: Option<AssetError>,
    callbacks: Callbacks,
    mounted: bool,
}

impl AdaptiveImage {
    /// Mount a component for `request` at `bounds`.
    ///
    /// With deferral the component registers with `detector` and returns no
    /// plan; without it the negotiated fetch starts right away. An empty
    /// reference stays a placeholder and never fetches.
    pub fn mount(
        request: ImageRequest,
        alternate_format: &str,
        callbacks: Callbacks,
        detector: &mut impl ProximityDetector,
        bounds: Rectangle,
        margin: f32,
    ) -> (Self, Option<FetchPlan>) {
        let candidates = if request.has_reference() {
            derive_candidates(&request.reference, &request.hints.breakpoints, alternate_format)
        } else {
            CandidateSet::default()
        };

        let mut image = Self {
            instance: InstanceId::next(),
            request,
            candidates,
            state: LoadState::Placeholder,
            in_flight: None,
            observer: None,
            asset: None,
            last_error: None,
            callbacks,
            mounted: true,
        };

        if !image.request.has_reference() {
            return (image, None);
        }

        if image.request.hints.defer_loading {
            image.observer = Some(detector.observe(bounds, margin));
            (image, None)
        } else {
            let plan = image.begin(Attempt::Negotiated);
            (image, Some(plan))
        }
    }

    /// The proximity observer fired for this component.
    pub fn on_visible(&mut self, detector: &mut impl ProximityDetector) -> Option<FetchPlan> {
        if !self.mounted || self.state != LoadState::Placeholder || self.observer.is_none() {
            return None;
        }

        if let Some(id) = self.observer.take() {
            detector.unobserve(id);
        }

        Some(self.begin(Attempt::Negotiated))
    }

    /// Report the outcome of a fetch.
    ///
    /// Stale results (other instance, superseded attempt, unmounted or
    /// terminal component) are dropped. Returns the fallback plan when the
    /// negotiated attempt failed.
    pub fn on_load_result(
        &mut self,
        instance: InstanceId,
        attempt: Attempt,
        result: Result<LoadedAsset, AssetError>,
    ) -> Option<FetchPlan> {
        if !self.mounted
            || instance != self.instance
            || self.state != LoadState::VisiblePending
            || self.in_flight != Some(attempt)
        {
            tracing::trace!("Ignoring stale load result for {:?}", self.request.reference);
            return None;
        }

        self.in_flight = None;

        match (result, attempt) {
            (Ok(asset), _) => {
                self.state = LoadState::Loaded;
                if let Some(on_loaded) = &self.callbacks.on_loaded {
                    on_loaded(&self.request, &asset);
                }
                self.asset = Some(asset);
                None
            }
            (Err(error), Attempt::Negotiated) => {
                tracing::warn!(
                    "⚠️  Negotiated image failed for {}: {error}; retrying bare reference",
                    self.request.reference
                );
                self.candidates = CandidateSet::default();
                self.last_error = Some(error);
                Some(self.begin(Attempt::Bare))
            }
            (Err(error), Attempt::Bare) => {
                tracing::warn!("❌ Image failed for {}: {error}", self.request.reference);
                self.state = LoadState::Failed;
                if let Some(on_failed) = &self.callbacks.on_failed {
                    on_failed(&self.request, &error);
                }
                self.last_error = Some(error);
                None
            }
        }
    }

    /// Tear down. Releases a pending observer; later events are ignored.
    pub fn unmount(&mut self, detector: &mut impl ProximityDetector) {
        if let Some(id) = self.observer.take() {
            detector.unobserve(id);
        }
        self.mounted = false;
        self.in_flight = None;
    }

    fn begin(&mut self, attempt: Attempt) -> FetchPlan {
        self.state = LoadState::VisiblePending;
        self.in_flight = Some(attempt);

        let source = match attempt {
            Attempt::Negotiated => Source::Picture(Picture::new(
                &self.request.reference,
                &self.candidates,
                &self.request.hints.sizes,
            )),
            Attempt::Bare => Source::Bare(self.request.reference.clone()),
        };

        FetchPlan {
            instance: self.instance,
            attempt,
            source,
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn request(&self) -> &ImageRequest {
        &self.request
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    pub fn asset(&self) -> Option<&LoadedAsset> {
        self.asset.as_ref()
    }

    pub fn last_error(&self) -> Option<&AssetError> {
        self.last_error.as_ref()
    }

    pub fn observer(&self) -> Option<ObserverId> {
        self.observer
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responsive::observer::ProximityObserver;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    const VIEWPORT: Rectangle = Rectangle {
        x: 0.0,
        y: 0.0,
        width: 1000.0,
        height: 800.0,
    };

    fn bounds(y: f32) -> Rectangle {
        Rectangle {
            x: 0.0,
            y,
            width: 240.0,
            height: 240.0,
        }
    }

    fn asset(url: &str) -> LoadedAsset {
        LoadedAsset::from_rgba(url.to_string(), 1, 1, vec![0, 0, 0, 255])
    }

    fn failure() -> AssetError {
        AssetError::NotFound("/img/apple-640w.webp".into())
    }

    #[derive(Default, Clone)]
    struct Counters {
        loaded: Arc<AtomicUsize>,
        failed: Arc<AtomicUsize>,
    }

    impl Counters {
        fn callbacks(&self) -> Callbacks {
            let loaded = Arc::clone(&self.loaded);
            let failed = Arc::clone(&self.failed);
            Callbacks::default()
                .on_loaded(move |_, _| {
                    loaded.fetch_add(1, Ordering::SeqCst);
                })
                .on_failed(move |_, _| {
                    failed.fetch_add(1, Ordering::SeqCst);
                })
        }

        fn loaded(&self) -> usize {
            self.loaded.load(Ordering::SeqCst)
        }

        fn failed(&self) -> usize {
            self.failed.load(Ordering::SeqCst)
        }
    }

    fn mount(
        request: ImageRequest,
        observer: &mut ProximityObserver,
        counters: &Counters,
        y: f32,
    ) -> (AdaptiveImage, Option<FetchPlan>) {
        AdaptiveImage::mount(request, "webp", counters.callbacks(), observer, bounds(y), 0.0)
    }

    #[test]
    fn test_deferred_waits_for_viewport() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let (mut image, plan) = mount(ImageRequest::new("/img/apple.jpg"), &mut observer, &counters, 2000.0);

        assert!(plan.is_none());
        assert_eq!(image.state(), LoadState::Placeholder);
        assert_eq!(observer.len(), 1);

        // Still far away: nothing fires, nothing fetches
        assert!(observer.check(VIEWPORT).is_empty());

        let viewport = Rectangle { y: 1500.0, ..VIEWPORT };
        let fired = observer.check(viewport);
        assert_eq!(fired, image.observer().into_iter().collect::<Vec<_>>());

        let plan = image.on_visible(&mut observer).expect("fetch after visibility");
        assert_eq!(plan.attempt, Attempt::Negotiated);
        assert!(matches!(plan.source, Source::Picture(_)));
        assert_eq!(image.state(), LoadState::VisiblePending);
        assert!(image.observer().is_none());
    }

    #[test]
    fn test_eager_fetches_on_mount() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let request = ImageRequest::new("/img/apple.jpg").defer_loading(false);
        let (image, plan) = mount(request, &mut observer, &counters, 5000.0);

        let plan = plan.expect("eager fetch");
        assert_eq!(plan.instance, image.instance());
        assert_eq!(image.state(), LoadState::VisiblePending);
        assert!(observer.is_empty());
    }

    #[test]
    fn test_visibility_only_triggers_once() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let (mut image, _) = mount(ImageRequest::new("/img/apple.jpg"), &mut observer, &counters, 0.0);

        assert!(image.on_visible(&mut observer).is_some());
        assert!(image.on_visible(&mut observer).is_none());
    }

    #[test]
    fn test_success_loads_and_notifies() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let request = ImageRequest::new("/img/apple.jpg").defer_loading(false);
        let (mut image, plan) = mount(request, &mut observer, &counters, 0.0);
        let plan = plan.unwrap();

        let next = image.on_load_result(plan.instance, plan.attempt, Ok(asset("/img/apple-640w.webp")));
        assert!(next.is_none());
        assert_eq!(image.state(), LoadState::Loaded);
        assert_eq!(image.asset().map(|a| a.url.as_str()), Some("/img/apple-640w.webp"));
        assert_eq!(counters.loaded(), 1);
        assert_eq!(counters.failed(), 0);
    }

    #[test]
    fn test_negotiated_failure_retries_bare_once() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let request = ImageRequest::new("/img/apple.jpg").defer_loading(false);
        let (mut image, plan) = mount(request, &mut observer, &counters, 0.0);
        let plan = plan.unwrap();

        let retry = image
            .on_load_result(plan.instance, plan.attempt, Err(failure()))
            .expect("one fallback attempt");
        assert_eq!(retry.attempt, Attempt::Bare);
        assert_eq!(retry.source, Source::Bare("/img/apple.jpg".into()));
        assert!(image.candidates().is_empty());
        assert_eq!(image.state(), LoadState::VisiblePending);
        assert_eq!(counters.failed(), 0);

        // A duplicate report of the first failure changes nothing
        assert!(image.on_load_result(plan.instance, plan.attempt, Err(failure())).is_none());

        let done = image.on_load_result(retry.instance, retry.attempt, Ok(asset("/img/apple.jpg")));
        assert!(done.is_none());
        assert_eq!(image.state(), LoadState::Loaded);
        assert_eq!(counters.loaded(), 1);
        assert_eq!(counters.failed(), 0);
    }

    #[test]
    fn test_fallback_failure_is_terminal() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let request = ImageRequest::new("/img/apple.jpg").defer_loading(false);
        let (mut image, plan) = mount(request, &mut observer, &counters, 0.0);
        let plan = plan.unwrap();

        let retry = image.on_load_result(plan.instance, plan.attempt, Err(failure())).unwrap();
        let after = image.on_load_result(retry.instance, retry.attempt, Err(failure()));

        assert!(after.is_none());
        assert_eq!(image.state(), LoadState::Failed);
        assert_eq!(counters.failed(), 1);

        // No further automatic retry, whatever arrives later
        assert!(image.on_load_result(retry.instance, Attempt::Bare, Err(failure())).is_none());
        assert!(image.on_visible(&mut observer).is_none());
        assert_eq!(counters.failed(), 1);
    }

    #[test]
    fn test_unmount_before_visibility_leaves_no_observer() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let (mut image, _) = mount(ImageRequest::new("/img/apple.jpg"), &mut observer, &counters, 0.0);
        assert_eq!(observer.len(), 1);

        image.unmount(&mut observer);

        assert!(observer.is_empty());
        assert!(observer.check(VIEWPORT).is_empty());
        assert!(image.on_visible(&mut observer).is_none());
        assert_eq!(image.state(), LoadState::Placeholder);
    }

    #[test]
    fn test_results_after_unmount_are_ignored() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let request = ImageRequest::new("/img/apple.jpg").defer_loading(false);
        let (mut image, plan) = mount(request, &mut observer, &counters, 0.0);
        let plan = plan.unwrap();

        image.unmount(&mut observer);
        assert!(image.on_load_result(plan.instance, plan.attempt, Ok(asset("x"))).is_none());
        assert_eq!(image.state(), LoadState::VisiblePending);
        assert_eq!(counters.loaded(), 0);
    }

    #[test]
    fn test_results_for_other_instances_are_ignored() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let request = ImageRequest::new("/img/apple.jpg").defer_loading(false);
        let (mut first, first_plan) = mount(request.clone(), &mut observer, &counters, 0.0);
        let (second, _) = mount(request, &mut observer, &counters, 0.0);

        assert_ne!(first.instance(), second.instance());
        let stale = first.on_load_result(second.instance(), first_plan.unwrap().attempt, Ok(asset("x")));
        assert!(stale.is_none());
        assert_eq!(first.state(), LoadState::VisiblePending);
    }

    #[test]
    fn test_empty_reference_never_fetches() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();

        for defer in [true, false] {
            let request = ImageRequest::new("").defer_loading(defer);
            let (mut image, plan) = mount(request, &mut observer, &counters, 0.0);
            assert!(plan.is_none());
            assert!(image.candidates().is_empty());
            assert!(image.on_visible(&mut observer).is_none());
            assert_eq!(image.state(), LoadState::Placeholder);
        }
        assert!(observer.is_empty());
    }

    #[test]
    fn test_parameterized_reference_uses_bare_picture() {
        let mut observer = ProximityObserver::new();
        let counters = Counters::default();
        let request = ImageRequest::new("https://cdn.test/apple.jpg?w=640").defer_loading(false);
        let (image, plan) = mount(request, &mut observer, &counters, 0.0);

        assert!(image.candidates().is_empty());
        let Some(FetchPlan { source: Source::Picture(picture), .. }) = plan else {
            panic!("expected a picture source");
        };
        assert_eq!(
            picture.select(&crate::responsive::picture::RenderEnv::default()),
            "https://cdn.test/apple.jpg?w=640"
        );
    }
}

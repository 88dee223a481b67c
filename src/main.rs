use iced::widget::{button, column, container, row, scrollable, text, text_input, toggler, Column, Row};
use iced::{time, window, Alignment, Element, Length, Rectangle, Size, Subscription, Task, Theme};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use adaptive_gallery::catalog::Catalog;
use adaptive_gallery::config::Config;
use adaptive_gallery::error::AssetError;
use adaptive_gallery::responsive::loader;
use adaptive_gallery::responsive::{
    AdaptiveImage, AssetSource, Attempt, Callbacks, DirectorySource, FetchPlan, ImageRequest,
    InstanceId, LoadedAsset, ProximityObserver, RenderEnv,
};
use adaptive_gallery::store::{KeyValueStore, MemoryStore, Settings, SqliteStore, ThemeChoice};
use adaptive_gallery::ui::{self, grid_bounds, guard, reconcile, resize_viewport, Fade, Guarded, Slot};

/// Room under each image for the name and price
const CAPTION_HEIGHT: f32 = 44.0;

/// Initial window size
const WINDOW_SIZE: Size = Size {
    width: 1280.0,
    height: 800.0,
};

/// Window area taken by padding, header and status line around the grid
const CHROME: Size = Size {
    width: 48.0,
    height: 148.0,
};

/// Counters fed by the image callbacks
#[derive(Debug, Default)]
struct Stats {
    loaded: AtomicUsize,
    failed: AtomicUsize,
}

/// One product tile currently on the grid
struct Tile {
    /// Index into the catalog
    product: usize,
    image: AdaptiveImage,
    fade: Option<Fade>,
}

/// Main application state
struct Gallery {
    config: Config,
    catalog: Catalog,
    assets: Arc<dyn AssetSource>,
    store: Box<dyn KeyValueStore>,
    settings: Settings,
    observer: ProximityObserver,
    tiles: Vec<Tile>,
    query: String,
    /// Visible part of the grid, in grid coordinates
    viewport: Rectangle,
    window: Size,
    now: Instant,
    stats: Arc<Stats>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// The grid was scrolled
    Scrolled(scrollable::Viewport),
    WindowResized(Size),
    /// A fetch finished, successfully or not
    ImageLoaded {
        instance: InstanceId,
        attempt: Attempt,
        result: Result<LoadedAsset, AssetError>,
    },
    QueryChanged(String),
    ToggleTheme,
    DeferToggled(bool),
    /// Animation frame while a fade is running
    Tick(Instant),
}

impl Gallery {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = Config::load().unwrap_or_else(|e| {
            tracing::error!("❌ {e}; falling back to default config");
            Config::default()
        });

        let catalog = match &config.catalog {
            Some(path) => Catalog::from_file(path),
            None => Catalog::scan(&config.asset_root),
        }
        .unwrap_or_else(|e| {
            tracing::error!("❌ {e}; starting with an empty catalog");
            Catalog::default()
        });

        // Preferences are best effort: without a database they live for this run only
        let store: Box<dyn KeyValueStore> = match SqliteStore::open_default() {
            Ok(store) => Box::new(store),
            Err(e) => {
                tracing::warn!("⚠️  Settings will not persist: {e}");
                Box::new(MemoryStore::new())
            }
        };

        let defaults = Settings {
            defer_loading: config.defer_loading,
            ..Settings::default()
        };
        let settings = Settings::load(store.as_ref(), defaults).unwrap_or_else(|e| {
            tracing::warn!("⚠️  Ignoring stored settings: {e}");
            defaults
        });

        tracing::info!("🎨 Gallery initialized with {} products", catalog.len());

        let mut gallery = Gallery {
            assets: Arc::new(DirectorySource::new(config.asset_root.clone())),
            config,
            catalog,
            store,
            settings,
            observer: ProximityObserver::new(),
            tiles: Vec::new(),
            query: String::new(),
            // Estimate until the scrollable reports its real bounds
            viewport: Rectangle::new(
                iced::Point::ORIGIN,
                Size::new(WINDOW_SIZE.width - CHROME.width, WINDOW_SIZE.height - CHROME.height),
            ),
            window: WINDOW_SIZE,
            now: Instant::now(),
            stats: Arc::new(Stats::default()),
        };

        let task = gallery.layout_tiles(true);
        (gallery, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Scrolled(viewport) => {
                let offset = viewport.absolute_offset();
                let bounds = viewport.bounds();
                self.viewport = Rectangle {
                    x: offset.x,
                    y: offset.y,
                    width: bounds.width,
                    height: bounds.height,
                };
                self.check_visibility()
            }
            Message::WindowResized(size) => {
                self.viewport = resize_viewport(self.viewport, self.window, size);
                self.window = size;
                self.check_visibility()
            }
            Message::ImageLoaded {
                instance,
                attempt,
                result,
            } => {
                let Some(tile) = self.tiles.iter_mut().find(|tile| tile.image.instance() == instance) else {
                    // The tile was unmounted while the fetch was running
                    tracing::trace!("Dropping result for unmounted image");
                    return Task::none();
                };

                let retry = tile.image.on_load_result(instance, attempt, result);
                if tile.image.asset().is_some() && tile.fade.is_none() {
                    self.now = Instant::now();
                    tile.fade = Some(Fade::start(self.now));
                }

                match retry {
                    Some(plan) => self.fetch(plan),
                    None => Task::none(),
                }
            }
            Message::QueryChanged(query) => {
                self.query = query;
                self.layout_tiles(false)
            }
            Message::ToggleTheme => {
                self.settings.theme = self.settings.theme.toggled();
                self.persist_settings();
                Task::none()
            }
            Message::DeferToggled(defer) => {
                self.settings.defer_loading = defer;
                self.persist_settings();
                self.layout_tiles(true)
            }
            Message::Tick(now) => {
                self.now = now;
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let theme_label = match self.settings.theme {
            ThemeChoice::Light => "Dark mode",
            ThemeChoice::Dark => "Light mode",
        };

        let header = row![
            text("Storefront").size(32),
            text_input("Search products", &self.query)
                .on_input(Message::QueryChanged)
                .width(Length::Fixed(280.0)),
            toggler(self.settings.defer_loading)
                .label("Lazy loading")
                .on_toggle(Message::DeferToggled),
            button(text(theme_label)).on_press(Message::ToggleTheme),
        ]
        .spacing(20)
        .align_y(Alignment::Center);

        let columns = self.config.columns.max(1);
        let mut unavailable = 0;
        let mut grid = Column::new().spacing(self.config.spacing);
        for chunk in self.tiles.chunks(columns) {
            let mut row = Row::new().spacing(self.config.spacing);
            for tile in chunk {
                let body = self.tile_body(tile);
                if body.is_failed() {
                    unavailable += 1;
                }
                row = row.push(self.tile_frame(body));
            }
            grid = grid.push(row);
        }

        let status = format!(
            "{} products shown · {} unavailable · {} loaded · {} failed",
            self.tiles.len(),
            unavailable,
            self.stats.loaded.load(Ordering::Relaxed),
            self.stats.failed.load(Ordering::Relaxed),
        );

        let content = column![
            header,
            scrollable(grid)
                .on_scroll(Message::Scrolled)
                .width(Length::Fill)
                .height(Length::Fill),
            text(status).size(14),
        ]
        .spacing(16)
        .padding(24);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn tile_body<'a>(&'a self, tile: &'a Tile) -> Guarded<'a, Message> {
        let size = self.config.tile_size;
        let product = &self.catalog.products()[tile.product];

        guard(|| {
            product.validate()?;
            Ok(column![
                ui::picture::view(&tile.image, tile.fade, self.now, size),
                text(&product.name).size(14),
                text(product.price_label()).size(12),
            ]
            .spacing(4)
            .into())
        })
    }

    fn tile_frame<'a>(&self, body: Guarded<'a, Message>) -> Element<'a, Message> {
        let size = self.config.tile_size;

        let body = body.render(|error| {
            container(text(format!("Unavailable: {error}")).size(12))
                .center(Length::Fixed(size))
                .into()
        });

        container(body)
            .width(Length::Fixed(size))
            .height(Length::Fixed(size + CAPTION_HEIGHT))
            .into()
    }

    /// Animation ticks only while something is fading in
    fn subscription(&self) -> Subscription<Message> {
        let resize = window::resize_events().map(|(_id, size)| Message::WindowResized(size));

        let fading = self
            .tiles
            .iter()
            .any(|tile| tile.fade.is_some_and(|fade| fade.is_running(self.now)));

        if fading {
            Subscription::batch([resize, time::every(Duration::from_millis(16)).map(Message::Tick)])
        } else {
            resize
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        match self.settings.theme {
            ThemeChoice::Light => Theme::Light,
            ThemeChoice::Dark => Theme::Dark,
        }
    }

    /// Bring the grid in line with the current filter.
    ///
    /// Tiles whose product is still shown keep their component (and any
    /// loaded image) and only move; with `remount` every tile starts over.
    fn layout_tiles(&mut self, remount: bool) -> Task<Message> {
        if remount {
            for tile in &mut self.tiles {
                tile.image.unmount(&mut self.observer);
            }
            self.tiles.clear();
        }

        let wanted: Vec<usize> = self
            .catalog
            .products()
            .iter()
            .enumerate()
            .filter(|(_, product)| product.matches(&self.query))
            .map(|(index, _)| index)
            .collect();

        let slots = reconcile(
            std::mem::take(&mut self.tiles),
            |tile| tile.product,
            &wanted,
            |mut tile| tile.image.unmount(&mut self.observer),
        );

        let tile_size = Size::new(self.config.tile_size, self.config.tile_size + CAPTION_HEIGHT);
        let hints = self.config.hints(self.settings.defer_loading);
        let mut plans = Vec::new();
        let mut kept = 0;

        for (position, slot) in slots.into_iter().enumerate() {
            let bounds = grid_bounds(position, self.config.columns, tile_size, self.config.spacing);

            match slot {
                Slot::Kept(tile) => {
                    if let Some(id) = tile.image.observer() {
                        self.observer.reposition(id, bounds);
                    }
                    kept += 1;
                    self.tiles.push(tile);
                }
                Slot::New(index) => {
                    let product = &self.catalog.products()[index];
                    let request = ImageRequest::new(product.image.clone())
                        .alt(product.name.clone())
                        .hints(hints.clone());

                    let callbacks = self.callbacks();
                    let (image, plan) = AdaptiveImage::mount(
                        request,
                        &self.config.alternate_format,
                        callbacks,
                        &mut self.observer,
                        bounds,
                        self.config.proximity_margin,
                    );

                    plans.extend(plan);
                    self.tiles.push(Tile {
                        product: index,
                        image,
                        fade: None,
                    });
                }
            }
        }

        tracing::debug!(
            "🧱 {} tiles ({} kept, {} eager fetches)",
            self.tiles.len(),
            kept,
            plans.len()
        );

        let visible = self.check_visibility();
        let mut tasks: Vec<Task<Message>> = plans.into_iter().map(|plan| self.fetch(plan)).collect();
        tasks.push(visible);
        Task::batch(tasks)
    }

    /// Let the observer fire for everything near the viewport
    fn check_visibility(&mut self) -> Task<Message> {
        let fired = self.observer.check(self.viewport);
        let mut plans = Vec::new();

        for id in fired {
            if let Some(tile) = self.tiles.iter_mut().find(|tile| tile.image.observer() == Some(id)) {
                plans.extend(tile.image.on_visible(&mut self.observer));
            }
        }

        Task::batch(plans.into_iter().map(|plan| self.fetch(plan)).collect::<Vec<_>>())
    }

    /// Launch an async fetch for a plan
    fn fetch(&self, plan: FetchPlan) -> Task<Message> {
        let FetchPlan {
            instance,
            attempt,
            source,
        } = plan;

        let env = RenderEnv {
            viewport_width: self.window.width,
            density: self.config.density,
            supports_alternate: self.config.supports_alternate,
        };

        Task::perform(
            loader::load(Arc::clone(&self.assets), source, env),
            move |result| Message::ImageLoaded {
                instance,
                attempt,
                result,
            },
        )
    }

    fn callbacks(&self) -> Callbacks {
        let on_loaded = Arc::clone(&self.stats);
        let on_failed = Arc::clone(&self.stats);

        Callbacks::default()
            .on_loaded(move |request, asset| {
                on_loaded.loaded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("📸 {} → {}", request.reference, asset.url);
            })
            .on_failed(move |request, error| {
                on_failed.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("❌ Giving up on {}: {error}", request.reference);
            })
    }

    fn persist_settings(&self) {
        if let Err(e) = self.settings.save(self.store.as_ref()) {
            tracing::warn!("⚠️  Failed to save settings: {e}");
        }
    }
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    iced::application("Storefront Gallery", Gallery::update, Gallery::view)
        .subscription(Gallery::subscription)
        .theme(Gallery::theme)
        .window_size(WINDOW_SIZE)
        .centered()
        .run_with(Gallery::new)
}

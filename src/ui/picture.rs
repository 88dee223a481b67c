//! Rendering of an [`AdaptiveImage`]
//!
//! The placeholder is always drawn. Once the image is loaded its handle is
//! stacked on top and faded in.

use iced::widget::canvas::{self, Path};
use iced::widget::{container, image, stack, text, Canvas};
use iced::{mouse, Color, ContentFit, Element, Length, Point, Rectangle, Renderer, Theme};
use std::time::{Duration, Instant};

use crate::responsive::{AdaptiveImage, LoadState};

/// Length of the placeholder → image cross-fade
pub const FADE_DURATION: Duration = Duration::from_millis(250);

/// Fade-in progress for one loaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fade {
    started: Instant,
}

impl Fade {
    pub fn start(now: Instant) -> Self {
        Self { started: now }
    }

    /// 0.0 at start, 1.0 once finished
    pub fn opacity(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / FADE_DURATION.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn is_running(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) < FADE_DURATION
    }
}

/// Low-cost stand-in drawn before the real asset arrives
#[derive(Debug, Clone, Copy)]
pub struct Placeholder {
    /// Failed images get a muted cross instead of the picture glyph
    pub failed: bool,
}

impl<Message> canvas::Program<Message> for Placeholder {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let palette = theme.extended_palette();

        frame.fill_rectangle(Point::ORIGIN, bounds.size(), palette.background.weak.color);

        let glyph = Color {
            a: 0.35,
            ..palette.background.strong.color
        };
        let (w, h) = (bounds.width, bounds.height);
        let unit = w.min(h) / 8.0;

        if self.failed {
            let cross = Path::new(|p| {
                p.move_to(Point::new(w / 2.0 - unit, h / 2.0 - unit));
                p.line_to(Point::new(w / 2.0 + unit, h / 2.0 + unit));
                p.move_to(Point::new(w / 2.0 + unit, h / 2.0 - unit));
                p.line_to(Point::new(w / 2.0 - unit, h / 2.0 + unit));
            });
            frame.stroke(&cross, canvas::Stroke::default().with_color(glyph).with_width(unit / 3.0));
        } else {
            // A sun over a hill
            frame.fill(&Path::circle(Point::new(w * 0.65, h * 0.35), unit), glyph);
            let hill = Path::new(|p| {
                p.move_to(Point::new(0.0, h));
                p.line_to(Point::new(w * 0.35, h * 0.55));
                p.line_to(Point::new(w * 0.6, h * 0.75));
                p.line_to(Point::new(w * 0.8, h * 0.6));
                p.line_to(Point::new(w, h));
                p.close();
            });
            frame.fill(&hill, glyph);
        }

        vec![frame.into_geometry()]
    }
}

/// Build the element for `image` at a square `size`
pub fn view<'a, Message: 'a>(
    adaptive: &'a AdaptiveImage,
    fade: Option<Fade>,
    now: Instant,
    size: f32,
) -> Element<'a, Message> {
    let placeholder = Canvas::new(Placeholder {
        failed: adaptive.state() == LoadState::Failed,
    })
    .width(Length::Fixed(size))
    .height(Length::Fixed(size));

    let alt = &adaptive.request().alt_text;

    match (adaptive.state(), adaptive.asset()) {
        (LoadState::Loaded, Some(asset)) => {
            let opacity = fade.map_or(1.0, |fade| fade.opacity(now));
            stack![
                placeholder,
                image(asset.handle.clone())
                    .width(Length::Fixed(size))
                    .height(Length::Fixed(size))
                    .content_fit(ContentFit::Cover)
                    .opacity(opacity),
            ]
            .into()
        }
        (LoadState::VisiblePending, _) if !alt.is_empty() => stack![
            placeholder,
            container(text(alt.as_str()).size(12))
                .center(Length::Fixed(size))
        ]
        .into(),
        _ => container(placeholder)
            .width(Length::Fixed(size))
            .height(Length::Fixed(size))
            .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_progress() {
        let start = Instant::now();
        let fade = Fade::start(start);

        assert_eq!(fade.opacity(start), 0.0);
        assert!(fade.is_running(start));

        let halfway = fade.opacity(start + FADE_DURATION / 2);
        assert!((halfway - 0.5).abs() < 0.01);

        assert_eq!(fade.opacity(start + FADE_DURATION * 2), 1.0);
        assert!(!fade.is_running(start + FADE_DURATION));
    }
}

//! Error boundary for views
//!
//! A fallible view builder is run once; its result is kept as either the
//! finished element or the error, and rendering picks the element or a
//! fallback. A bad product never takes the whole grid down.

use iced::Element;

use crate::error::ViewError;

pub enum Guarded<'a, Message> {
    Ok(Element<'a, Message>),
    Failed(ViewError),
}

/// Run `build` and capture its outcome
pub fn guard<'a, Message>(build: impl FnOnce() -> Result<Element<'a, Message>, ViewError>) -> Guarded<'a, Message> {
    match build() {
        Ok(element) => Guarded::Ok(element),
        Err(error) => {
            tracing::warn!("⚠️  View failed: {error}");
            Guarded::Failed(error)
        }
    }
}

impl<'a, Message> Guarded<'a, Message> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Guarded::Failed(_))
    }

    /// The built element, or `fallback` for the captured error
    pub fn render(self, fallback: impl FnOnce(&ViewError) -> Element<'a, Message>) -> Element<'a, Message> {
        match self {
            Guarded::Ok(element) => element,
            Guarded::Failed(error) => fallback(&error),
        }
    }
}

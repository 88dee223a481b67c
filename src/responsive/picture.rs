//! Picture element
//!
//! Stands in for the platform's native `<picture>`/`srcset` handling. The
//! component only builds a [`Picture`]; which file actually gets fetched is
//! decided here, from the render environment.

use super::candidates::{AlternateFormat, Candidate, CandidateSet};
use super::sizes::SizesDescriptor;

/// What the platform knows about where the image is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEnv {
    /// Logical viewport width in pixels
    pub viewport_width: f32,
    /// Device pixels per logical pixel
    pub density: f32,
    /// Whether the alternate encoding can be decoded
    pub supports_alternate: bool,
}

impl Default for RenderEnv {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            density: 1.0,
            supports_alternate: true,
        }
    }
}

/// A format/resolution-negotiated image
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub base: Vec<Candidate>,
    pub alternate: Option<AlternateFormat>,
    pub sizes: SizesDescriptor,
    /// The plain `src`, used when no candidate applies
    pub fallback: String,
}

impl Picture {
    pub fn new(reference: &str, candidates: &CandidateSet, sizes: &SizesDescriptor) -> Self {
        Self {
            base: candidates.base.clone(),
            alternate: candidates.alternate.clone(),
            sizes: sizes.clone(),
            fallback: reference.to_string(),
        }
    }

    /// The single URL the platform would fetch in `env`
    pub fn select(&self, env: &RenderEnv) -> &str {
        let slot = self.sizes.evaluate(env.viewport_width) * env.density.max(0.0);

        if env.supports_alternate {
            match &self.alternate {
                Some(AlternateFormat::Set(candidates)) => {
                    if let Some(candidate) = pick_width(candidates, slot) {
                        return &candidate.url;
                    }
                }
                Some(AlternateFormat::Single(url)) => return url,
                None => {}
            }
        }

        pick_width(&self.base, slot).map_or(self.fallback.as_str(), |candidate| &candidate.url)
    }
}

/// Where a load attempt reads from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Let the picture element negotiate
    Picture(Picture),
    /// The reference verbatim, no hints
    Bare(String),
}

impl Source {
    pub fn resolve(&self, env: &RenderEnv) -> &str {
        match self {
            Source::Picture(picture) => picture.select(env),
            Source::Bare(reference) => reference,
        }
    }
}

/// Smallest candidate covering `slot` pixels, else the widest one
fn pick_width(candidates: &[Candidate], slot: f32) -> Option<&Candidate> {
    candidates
        .iter()
        .filter(|candidate| candidate.width as f32 >= slot)
        .min_by_key(|candidate| candidate.width)
        .or_else(|| candidates.iter().max_by_key(|candidate| candidate.width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responsive::candidates::{derive_candidates, DEFAULT_BREAKPOINTS};

    fn picture(reference: &str) -> Picture {
        let candidates = derive_candidates(reference, &DEFAULT_BREAKPOINTS, "webp");
        Picture::new(reference, &candidates, &SizesDescriptor::default())
    }

    #[test]
    fn test_prefers_alternate_when_supported() {
        let env = RenderEnv {
            viewport_width: 1200.0,
            density: 1.0,
            supports_alternate: true,
        };
        // half of 1200 = 600 → 640
        assert_eq!(picture("/img/apple.jpg").select(&env), "/img/apple-640w.webp");
    }

    #[test]
    fn test_base_set_without_alternate_support() {
        let env = RenderEnv {
            viewport_width: 375.0,
            density: 2.0,
            supports_alternate: false,
        };
        // full 375 at 2x = 750 → 768
        assert_eq!(picture("/img/apple.jpg").select(&env), "/img/apple-768w.jpg");
    }

    #[test]
    fn test_widest_when_slot_exceeds_all() {
        let env = RenderEnv {
            viewport_width: 4000.0,
            density: 1.0,
            supports_alternate: false,
        };
        assert_eq!(picture("/img/apple.jpg").select(&env), "/img/apple-1280w.jpg");
    }

    #[test]
    fn test_empty_candidates_fall_back_to_reference() {
        let reference = "/img/apple.jpg?w=300";
        assert_eq!(picture(reference).select(&RenderEnv::default()), reference);
    }

    #[test]
    fn test_bare_source_ignores_env() {
        let source = Source::Bare("/img/apple.jpg".into());
        assert_eq!(source.resolve(&RenderEnv::default()), "/img/apple.jpg");
    }
}

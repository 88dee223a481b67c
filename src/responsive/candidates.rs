//! Candidate derivation
//!
//! Turns one canonical image reference into the resolution-scaled variants
//! and the alternate-format variants offered to the picture element.
//! Derivation is purely syntactic: `/img/apple.jpg` at 640px becomes
//! `/img/apple-640w.jpg`. Whether those files exist is the loader's problem.

use regex::Regex;
use std::sync::LazyLock;

use super::sizes::SizesDescriptor;

/// Widths offered when the caller gives no breakpoints
pub const DEFAULT_BREAKPOINTS: [u32; 6] = [320, 480, 640, 768, 1024, 1280];

/// The modern encoding offered alongside the original
pub const DEFAULT_ALTERNATE_FORMAT: &str = "webp";

/// A reference that already asks for a pixel width is trusted as-is
static WIDTH_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&](?:w|width)=\d+").expect("valid width pattern"));

/// Display hints supplied by the calling page
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayHints {
    pub sizes: SizesDescriptor,
    /// Candidate widths, used in ascending order
    pub breakpoints: Vec<u32>,
    /// Wait for the viewport before fetching anything
    pub defer_loading: bool,
}

impl Default for DisplayHints {
    fn default() -> Self {
        Self {
            sizes: SizesDescriptor::default(),
            breakpoints: DEFAULT_BREAKPOINTS.to_vec(),
            defer_loading: true,
        }
    }
}

/// Everything one rendered image needs. A new reference means a new request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageRequest {
    pub reference: String,
    pub alt_text: String,
    pub hints: DisplayHints,
}

impl ImageRequest {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }

    pub fn alt(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = alt_text.into();
        self
    }

    pub fn hints(mut self, hints: DisplayHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn defer_loading(mut self, defer: bool) -> Self {
        self.hints.defer_loading = defer;
        self
    }

    pub fn has_reference(&self) -> bool {
        !self.reference.trim().is_empty()
    }
}

/// One resolution-specific variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub width: u32,
    pub url: String,
}

impl Candidate {
    /// Width descriptor as written in a srcset, e.g. `640w`
    pub fn descriptor(&self) -> String {
        format!("{}w", self.width)
    }
}

/// Alternate-format offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlternateFormat {
    /// One image, used when there are no width variants
    Single(String),
    /// The same widths as the base set, in the alternate encoding
    Set(Vec<Candidate>),
}

/// Derived variants for one reference.
///
/// Empty means "do not rewrite, use the reference verbatim".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateSet {
    pub base: Vec<Candidate>,
    pub alternate: Option<AlternateFormat>,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.alternate.is_none()
    }

    /// Base candidates as a srcset string, ascending by width
    pub fn srcset(&self) -> String {
        srcset(&self.base)
    }

    /// Alternate candidates as a srcset string, if any
    pub fn alternate_srcset(&self) -> Option<String> {
        match &self.alternate {
            Some(AlternateFormat::Set(candidates)) => Some(srcset(candidates)),
            Some(AlternateFormat::Single(url)) => Some(url.clone()),
            None => None,
        }
    }
}

/// Join candidates as `url 320w, url 480w, ...`
pub fn srcset(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .map(|candidate| format!("{} {}", candidate.url, candidate.descriptor()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Derive the candidate set for `reference`.
///
/// Returns an empty set when the reference is empty, already carries a width
/// parameter, or has no extension on its last path segment.
pub fn derive_candidates(reference: &str, breakpoints: &[u32], alternate_format: &str) -> CandidateSet {
    if reference.trim().is_empty() || WIDTH_PARAM.is_match(reference) {
        return CandidateSet::default();
    }

    let Some(parts) = split_reference(reference) else {
        return CandidateSet::default();
    };

    let mut widths = breakpoints.to_vec();
    widths.sort_unstable();
    widths.dedup();

    let base: Vec<Candidate> = widths
        .iter()
        .map(|&width| parts.variant(width, parts.extension))
        .collect();

    let alternate_format = alternate_format.trim_start_matches('.');
    let alternate = if alternate_format.is_empty() || parts.extension.eq_ignore_ascii_case(alternate_format) {
        None
    } else if base.is_empty() {
        Some(AlternateFormat::Single(format!(
            "{}.{}{}",
            parts.stem, alternate_format, parts.suffix
        )))
    } else {
        Some(AlternateFormat::Set(
            widths
                .iter()
                .map(|&width| parts.variant(width, alternate_format))
                .collect(),
        ))
    };

    CandidateSet { base, alternate }
}

/// A reference split around its extension
#[derive(Debug, PartialEq)]
struct ReferenceParts<'a> {
    /// Everything before the final `.` of the last path segment
    stem: &'a str,
    /// Extension without the dot
    extension: &'a str,
    /// Query string and fragment, re-appended verbatim
    suffix: &'a str,
}

impl ReferenceParts<'_> {
    fn variant(&self, width: u32, extension: &str) -> Candidate {
        Candidate {
            width,
            url: format!("{}-{}w.{}{}", self.stem, width, extension, self.suffix),
        }
    }
}

fn split_reference(reference: &str) -> Option<ReferenceParts<'_>> {
    let path_end = reference.find(['?', '#']).unwrap_or(reference.len());
    let (path, suffix) = reference.split_at(path_end);

    // "https://cdn.example.com" has a host but no path to rewrite
    let path_start = match path.find("://") {
        Some(scheme) => scheme + 3 + path[scheme + 3..].find('/')?,
        None => 0,
    };
    let segment_start = path[path_start..]
        .rfind('/')
        .map_or(path_start, |slash| path_start + slash + 1);
    let dot = segment_start + path[segment_start..].rfind('.')?;
    let extension = &path[dot + 1..];

    // "/img/.hidden" and "/img/apple." have nothing usable on one side
    if dot == segment_start || extension.is_empty() {
        return None;
    }

    Some(ReferenceParts {
        stem: &path[..dot],
        extension,
        suffix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(reference: &str) -> CandidateSet {
        derive_candidates(reference, &DEFAULT_BREAKPOINTS, DEFAULT_ALTERNATE_FORMAT)
    }

    #[test]
    fn test_default_breakpoints_srcset() {
        let set = derive("/img/apple.jpg");
        assert_eq!(
            set.srcset(),
            "/img/apple-320w.jpg 320w, /img/apple-480w.jpg 480w, /img/apple-640w.jpg 640w, \
             /img/apple-768w.jpg 768w, /img/apple-1024w.jpg 1024w, /img/apple-1280w.jpg 1280w"
        );
    }

    #[test]
    fn test_width_parameter_skips_derivation() {
        for reference in [
            "/img/apple.jpg?w=123",
            "https://cdn.example.com/apple.jpg?fit=crop&w=640",
            "/img/apple.png?width=900&q=80",
        ] {
            assert!(derive(reference).is_empty(), "{reference}");
        }
    }

    #[test]
    fn test_other_query_parameters_are_kept() {
        let set = derive("/img/apple.jpg?v=3");
        assert_eq!(set.base[0].url, "/img/apple-320w.jpg?v=3");
    }

    #[test]
    fn test_missing_extension_skips_derivation() {
        assert!(derive("/img/apple").is_empty());
        assert!(derive("/img.v2/apple").is_empty());
        assert!(derive("/img/.hidden").is_empty());
        assert!(derive("/img/apple.").is_empty());
        assert!(derive("").is_empty());
    }

    #[test]
    fn test_host_only_url_skips_derivation() {
        assert!(derive("https://cdn.example.com").is_empty());
        assert!(derive("https://cdn.example.com/").is_empty());
        assert!(derive("https://cdn.example.com?v=1").is_empty());

        let set = derive("https://cdn.example.com/img/apple.jpg");
        assert_eq!(set.base[0].url, "https://cdn.example.com/img/apple-320w.jpg");
    }

    #[test]
    fn test_modern_format_has_no_alternate() {
        let set = derive("/img/apple.webp");
        assert!(set.alternate.is_none());
        assert_eq!(set.base.len(), 6);

        assert!(derive("/img/apple.WEBP").alternate.is_none());
    }

    #[test]
    fn test_alternate_set_matches_base_widths() {
        let set = derive("/img/jpg-photos/apple.jpg");
        let Some(AlternateFormat::Set(alternate)) = &set.alternate else {
            panic!("expected an alternate set, got {:?}", set.alternate);
        };

        assert_eq!(alternate.len(), set.base.len());
        for (alt, base) in alternate.iter().zip(&set.base) {
            assert_eq!(alt.width, base.width);
        }
        // The directory name containing "jpg" must survive untouched
        assert_eq!(alternate[0].url, "/img/jpg-photos/apple-320w.webp");
    }

    #[test]
    fn test_no_breakpoints_gives_single_alternate() {
        let set = derive_candidates("/img/apple.png", &[], "webp");
        assert!(set.base.is_empty());
        assert_eq!(
            set.alternate,
            Some(AlternateFormat::Single("/img/apple.webp".to_string()))
        );
    }

    #[test]
    fn test_breakpoints_are_sorted() {
        let set = derive_candidates("/a.jpg", &[640, 320, 640], "webp");
        let widths: Vec<u32> = set.base.iter().map(|c| c.width).collect();
        assert_eq!(widths, vec![320, 640]);
    }
}

//! `sizes` descriptors
//!
//! Parses strings like `(max-width: 768px) 100vw, 50vw` and evaluates them
//! against a viewport width, the way a browser computes the slot size of a
//! responsive image.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor used when the caller gives none: full width on mobile, half above
pub const DEFAULT_SIZES: &str = "(max-width: 768px) 100vw, 50vw";

/// Media condition guarding one entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    MaxWidth(f32),
    MinWidth(f32),
}

impl Condition {
    fn matches(self, viewport_width: f32) -> bool {
        match self {
            Condition::MaxWidth(px) => viewport_width <= px,
            Condition::MinWidth(px) => viewport_width >= px,
        }
    }
}

/// Slot length of one entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotLength {
    /// Percentage of the viewport width
    Vw(f32),
    /// Absolute pixels
    Px(f32),
}

impl SlotLength {
    fn resolve(self, viewport_width: f32) -> f32 {
        match self {
            SlotLength::Vw(vw) => viewport_width * vw / 100.0,
            SlotLength::Px(px) => px,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    condition: Option<Condition>,
    length: SlotLength,
}

/// A parsed `sizes` attribute
///
/// Keeps the source text so it can be serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SizesDescriptor {
    source: String,
    entries: Vec<Entry>,
}

impl SizesDescriptor {
    /// Parse a descriptor. Malformed entries are skipped.
    pub fn parse(source: &str) -> Self {
        let entries = source
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let parsed = parse_entry(entry);
                if parsed.is_none() {
                    tracing::warn!("⚠️  Ignoring malformed sizes entry: {entry:?}");
                }
                parsed
            })
            .collect();

        Self {
            source: source.to_string(),
            entries,
        }
    }

    /// Slot width in CSS pixels for the given viewport width.
    ///
    /// The first entry whose condition matches wins; an entry without a
    /// condition always matches. With no match the slot is the full viewport.
    pub fn evaluate(&self, viewport_width: f32) -> f32 {
        self.entries
            .iter()
            .find(|entry| {
                entry
                    .condition
                    .map_or(true, |condition| condition.matches(viewport_width))
            })
            .map_or(viewport_width, |entry| entry.length.resolve(viewport_width))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for SizesDescriptor {
    fn default() -> Self {
        Self::parse(DEFAULT_SIZES)
    }
}

impl From<String> for SizesDescriptor {
    fn from(source: String) -> Self {
        Self::parse(&source)
    }
}

impl From<SizesDescriptor> for String {
    fn from(sizes: SizesDescriptor) -> Self {
        sizes.source
    }
}

impl fmt::Display for SizesDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_entry(entry: &str) -> Option<Entry> {
    if let Some(rest) = entry.strip_prefix('(') {
        let (condition, length) = rest.split_once(')')?;
        Some(Entry {
            condition: Some(parse_condition(condition)?),
            length: parse_length(length.trim())?,
        })
    } else {
        Some(Entry {
            condition: None,
            length: parse_length(entry)?,
        })
    }
}

fn parse_condition(condition: &str) -> Option<Condition> {
    let (feature, value) = condition.split_once(':')?;
    let px = parse_px(value.trim())?;

    match feature.trim() {
        "max-width" => Some(Condition::MaxWidth(px)),
        "min-width" => Some(Condition::MinWidth(px)),
        _ => None,
    }
}

fn parse_length(length: &str) -> Option<SlotLength> {
    if let Some(vw) = length.strip_suffix("vw") {
        vw.trim().parse().ok().map(SlotLength::Vw)
    } else {
        parse_px(length).map(SlotLength::Px)
    }
}

fn parse_px(value: &str) -> Option<f32> {
    value.strip_suffix("px")?.trim().parse().ok()
}

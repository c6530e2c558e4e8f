//! Annotation text parsing: authenticity labels and error points.
//!
//! An annotation is free text produced either by a human annotator or by a
//! vision-language model. Inside it we care about two things:
//!
//! 1. A binary authenticity verdict carried in the first `\boxed{...}` marker.
//! 2. A sequence of discrete "error points", each wrapped in
//!    `<begin_of_point>` / `<end_of_point>` markers, optionally scoped to a
//!    `<begin_of_high_level_errors>` / `<end_of_high_level_errors>` region.
//!
//! Parsing is deliberately forgiving: a missing boxed marker defaults the
//! label to [`Label::Real`] (fail-open), and missing region markers fall back
//! to parsing the entire text. The one thing that is *not* forgiven is a boxed
//! value outside the two recognized labels, which is a contract violation and
//! surfaces as [`Error::InvalidLabel`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Marker opening one error point.
pub const POINT_BEGIN: &str = "<begin_of_point>";
/// Marker closing one error point.
pub const POINT_END: &str = "<end_of_point>";
/// Marker opening the high-level errors region.
pub const HIGH_LEVEL_BEGIN: &str = "<begin_of_high_level_errors>";
/// Marker closing the high-level errors region.
pub const HIGH_LEVEL_END: &str = "<end_of_high_level_errors>";

static BOXED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\boxed\{(.*?)\}").unwrap()
});

static HIGH_LEVEL_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<begin_of_high_level_errors>(.*?)<end_of_high_level_errors>").unwrap()
});

/// The binary authenticity verdict asserted by an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// The image is a genuine photograph.
    #[serde(rename = "real")]
    Real,
    /// The image was synthesized by a generative model.
    #[serde(rename = "ai-generated")]
    AiGenerated,
}

impl Label {
    /// Canonical lowercase form of the label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "real",
            Label::AiGenerated => "ai-generated",
        }
    }

    /// Parse a label value case-insensitively.
    ///
    /// Anything other than `"real"` or `"ai-generated"` (after trimming and
    /// case folding) is a contract violation, not a recoverable condition.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "real" => Ok(Label::Real),
            "ai-generated" => Ok(Label::AiGenerated),
            _ => Err(Error::invalid_label(value)),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed annotation: label plus ordered error points.
///
/// `preamble` (text before the first point marker) and `conclusion` (text
/// after the last closed point) are carried for inspection but ignored by
/// scoring. Points keep document order and are never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Authenticity verdict extracted from the first boxed marker.
    pub label: Label,
    /// Error points in document order.
    pub points: Vec<String>,
    /// Text preceding the first point marker, if any.
    pub preamble: Option<String>,
    /// Text following the last closed point, if any.
    pub conclusion: Option<String>,
}

impl Annotation {
    /// Number of error points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the annotation carries no error points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Content of the first `\boxed{...}` occurrence in `text`, if any.
#[must_use]
pub fn first_boxed(text: &str) -> Option<&str> {
    BOXED
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Parse a raw annotation text into a label and its error points.
///
/// The label is searched in the *full* text; points are parsed from the
/// high-level errors region when both region markers are present, otherwise
/// from the whole text.
///
/// # Errors
///
/// Returns [`Error::InvalidLabel`] if a boxed marker is present but its
/// content is not one of the two recognized labels. A missing or empty boxed
/// marker is not an error: the label defaults to [`Label::Real`].
pub fn parse_annotation(text: &str) -> Result<Annotation> {
    let label = extract_label(text)?;
    let region = high_level_region(text).unwrap_or(text);
    let (preamble, points, conclusion) = split_points(region);
    Ok(Annotation {
        label,
        points,
        preamble,
        conclusion,
    })
}

/// Extract the label from the first boxed marker, defaulting to `Real`.
fn extract_label(text: &str) -> Result<Label> {
    match first_boxed(text) {
        // Empty boxed content behaves like a missing marker.
        Some(content) if !content.trim().is_empty() => Label::parse(content),
        _ => Ok(Label::Real),
    }
}

/// The high-level errors region, trimmed, if both markers are present.
fn high_level_region(text: &str) -> Option<&str> {
    HIGH_LEVEL_REGION
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|r| !r.is_empty())
}

/// Split a region into (preamble, points, conclusion) on the point markers.
///
/// Each `<begin_of_point>` opens a point that runs until the next
/// `<end_of_point>`; a point with no end marker runs to the end of its
/// fragment. The conclusion is whatever follows the last closed point.
fn split_points(region: &str) -> (Option<String>, Vec<String>, Option<String>) {
    let region = region.trim();
    let mut fragments = region.split(POINT_BEGIN);

    let preamble = fragments
        .next()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    let mut points = Vec::new();
    let mut conclusion = None;
    for fragment in fragments {
        match fragment.split_once(POINT_END) {
            Some((point, rest)) => {
                points.push(point.trim().to_string());
                let rest = rest.trim();
                conclusion = (!rest.is_empty()).then(|| rest.to_string());
            }
            None => points.push(fragment.trim().to_string()),
        }
    }

    (preamble, points, conclusion)
}

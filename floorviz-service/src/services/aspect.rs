//! Aspect-ratio validation for the generation hint.

use std::fmt;

/// Ratio strings the image model accepts as a generation hint.
pub const SUPPORTED_ASPECT_RATIOS: [&str; 10] = [
    "1:1", "16:9", "9:16", "4:3", "3:4", "3:2", "2:3", "5:4", "4:5", "21:9",
];

pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// A ratio drawn from [`SUPPORTED_ASPECT_RATIOS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectRatio(&'static str);

impl AspectRatio {
    /// Check an arbitrary input string against the allow-list.
    ///
    /// Unsupported values are replaced by the default rather than rejected.
    /// The second element reports whether a correction happened so callers
    /// can log it.
    pub fn normalize(input: &str) -> (Self, bool) {
        match SUPPORTED_ASPECT_RATIOS.iter().find(|ratio| **ratio == input) {
            Some(ratio) => (AspectRatio(ratio), false),
            None => (AspectRatio::default(), true),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio(DEFAULT_ASPECT_RATIO)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

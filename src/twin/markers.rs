//! Block delimiters.
//!
//! A block opens on a line that starts with the start marker and closes on
//! the next line that starts with the end marker. Anything after the marker
//! text on the same line is ignored for detection. Matching is on raw bytes,
//! so lines in other encodings never get in the way.

use crate::twin::error::TwinError;

/// Opens a list of reflections in a CrystFEL stream.
pub const REFLECTION_START_MARKER: &str = "Reflections measured after indexing";

/// Closes the list opened by [`REFLECTION_START_MARKER`].
pub const REFLECTION_END_MARKER: &str = "End of reflections";

/// The pair of prefixes that delimit a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    start: String,
    end: String,
}

impl Markers {
    /// Build a marker pair. Empty prefixes would match every line, so they
    /// are rejected.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self, TwinError> {
        let start = start.into();
        let end = end.into();
        if start.is_empty() {
            return Err(TwinError::EmptyMarker { which: "start" });
        }
        if end.is_empty() {
            return Err(TwinError::EmptyMarker { which: "end" });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// True when `line` opens a block.
    pub fn opens_block(&self, line: &[u8]) -> bool {
        line.starts_with(self.start.as_bytes())
    }

    /// True when `line` closes a block.
    pub fn closes_block(&self, line: &[u8]) -> bool {
        line.starts_with(self.end.as_bytes())
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            start: REFLECTION_START_MARKER.to_string(),
            end: REFLECTION_END_MARKER.to_string(),
        }
    }
}

//! Source location utilities.
//!
//! Every [`crate::Node`] carries a [`Position`]: either the place in the source
//! text it was parsed from, or the marker that a hook built it.

use std::fmt;

use saphyr_parser::Span as ParserSpan;

/// Type alias for span offset and length fields.
///
/// By default, this is `u32`, which limits offsets/lengths to 4 GiB but keeps [`Span`] compact.
/// With the `huge_documents` feature this becomes `u64`.
#[cfg(not(feature = "huge_documents"))]
pub(crate) type SpanIndex = u32;

#[cfg(feature = "huge_documents")]
pub(crate) type SpanIndex = u64;

/// A character-based span within the source YAML document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Character offset within the source YAML document.
    pub(crate) offset: SpanIndex,
    /// Character length within the source YAML document.
    pub(crate) len: SpanIndex,
}

impl Span {
    /// Sentinel span meaning "unknown".
    pub const UNKNOWN: Self = Self { offset: 0, len: 0 };

    /// Returns the character offset within the source YAML document.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset as u64
    }

    /// Returns the character length within the source YAML document.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Row/column location within the source YAML document (1-indexed, character-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    /// 1-indexed row number in the input stream.
    pub(crate) line: u32,
    /// 1-indexed column number in the input stream.
    pub(crate) column: u32,
    /// Character-based span of the node within the document.
    pub(crate) span: Span,
}

impl Location {
    /// Sentinel value meaning "location unknown".
    pub const UNKNOWN: Self = Self {
        line: 0,
        column: 0,
        span: Span::UNKNOWN,
    };

    /// Create a new location record.
    ///
    /// Arguments:
    /// - `line`: 1-indexed line.
    /// - `column`: 1-indexed column.
    pub const fn new(line: usize, column: usize) -> Self {
        Self {
            line: line as u32,
            column: column as u32,
            span: Span::UNKNOWN,
        }
    }

    pub(crate) const fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// 1-indexed line.
    #[inline]
    pub fn line(&self) -> u64 {
        self.line as u64
    }

    /// 1-indexed column.
    #[inline]
    pub fn column(&self) -> u64 {
        self.column as u64
    }

    /// Character-based span within the source document.
    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Where a node came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Position {
    /// Read from the source text at this location.
    Parsed(Location),
    /// Built by a hook or by the representer; has no place in any source.
    #[default]
    Generated,
}

impl Position {
    /// The source location, if this position was parsed.
    #[inline]
    pub fn location(&self) -> Option<Location> {
        match self {
            Position::Parsed(location) => Some(*location),
            Position::Generated => None,
        }
    }

    /// The location, or [`Location::UNKNOWN`] for generated nodes.
    #[inline]
    pub(crate) fn or_unknown(&self) -> Location {
        self.location().unwrap_or(Location::UNKNOWN)
    }

    #[inline]
    pub fn is_generated(&self) -> bool {
        matches!(self, Position::Generated)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Parsed(location) => write!(f, "{location}"),
            Position::Generated => f.write_str("generated node"),
        }
    }
}

/// Convert a `saphyr_parser::Span` to a 1-indexed [`Location`].
///
/// Called by:
/// - The node builder for each raw parser event.
pub(crate) fn location_from_span(span: &ParserSpan) -> Location {
    let start = &span.start;
    Location::new(start.line(), start.col() + 1).with_span(Span {
        offset: start.index() as SpanIndex,
        len: span.len() as SpanIndex,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_position_has_no_location() {
        assert_eq!(Position::Generated.location(), None);
        assert_eq!(Position::Generated.or_unknown(), Location::UNKNOWN);
        assert_eq!(Position::Generated.to_string(), "generated node");
    }

    #[test]
    fn parsed_position_renders_line_and_column() {
        let pos = Position::Parsed(Location::new(3, 7));
        assert_eq!(pos.to_string(), "line 3, column 7");
        assert!(!pos.is_generated());
    }
}

//! Defines the error type and its location.
use std::fmt;

use saphyr_parser::ScanError;
use serde::{de, ser};

use crate::location::Location;
use crate::snippet::render_snippet;

/// A hook or node helper rejected its input.
///
/// Returned by recognize/desugar/resugar hooks and by the [`crate::Node`]
/// helper methods they call. The pipeline turns it into [`Error::Hook`]
/// (or into a recognition failure, for recognize hooks) with the node's
/// position attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookError {
    msg: String,
}

impl HookError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for HookError {}

/// Error returned by loading and dumping.
#[derive(Debug)]
pub enum Error {
    /// The text is not well-formed YAML.
    Parse { msg: String, location: Location },
    /// The document does not match the declared schema. `msg` is the rendered failure tree.
    Recognition { msg: String, location: Location },
    /// A desugar or resugar hook rejected the node it was given.
    Hook { msg: String, location: Location },
    /// The registered schema is inconsistent. This is a programming error.
    Configuration { msg: String },
    /// The node was recognized but building the value from it failed.
    Construction { msg: String, location: Location },
    /// The value could not be turned into a node.
    Representation { msg: String },
    /// A single document was requested but the input holds none.
    NoDocument,
    /// A single document was requested but the input holds more.
    MultipleDocuments { location: Location },
    /// Options failed their consistency check.
    InvalidOptions(String),
    /// Writing the output failed.
    Emit { msg: String },
    /// Unexpected I/O error while reading or writing.
    Io { cause: std::io::Error },
    /// Another error, displayed with a pre-rendered snippet of the offending input.
    WithSnippet { text: String, error: Box<Error> },
}

impl Error {
    pub(crate) fn parse<S: Into<String>>(s: S) -> Self {
        Error::Parse {
            msg: s.into(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn configuration<S: Into<String>>(s: S) -> Self {
        Error::Configuration { msg: s.into() }
    }

    pub(crate) fn construction<S: Into<String>>(s: S) -> Self {
        Error::Construction {
            msg: s.into(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn representation<S: Into<String>>(s: S) -> Self {
        Error::Representation { msg: s.into() }
    }

    pub(crate) fn recognition<S: Into<String>>(s: S, location: Location) -> Self {
        Error::Recognition {
            msg: s.into(),
            location,
        }
    }

    /// Wrap a hook rejection with the position of the node it was rejecting.
    pub(crate) fn hook(err: HookError, location: Location) -> Self {
        Error::Hook {
            msg: err.msg,
            location,
        }
    }

    /// Wrap this error so that its `Display` shows the input around its location.
    ///
    /// Errors without a known location are returned unchanged. The snippet is
    /// rendered now; the input text itself is not kept.
    pub fn with_snippet(self, text: &str, crop_radius: usize) -> Self {
        let inner = match self {
            Error::WithSnippet { error, .. } => *error,
            other => other,
        };
        match inner.render_snippet(text, crop_radius) {
            Some(rendered) => Error::WithSnippet {
                text: rendered,
                error: Box::new(inner),
            },
            None => inner,
        }
    }

    /// Render this error with the lines of `source` around its location.
    ///
    /// Falls back to the plain `Display` text when the location is unknown.
    pub fn render(&self, source: &str) -> String {
        self.render_snippet(source, 0)
            .unwrap_or_else(|| self.to_string())
    }

    fn render_snippet(&self, source: &str, crop_radius: usize) -> Option<String> {
        if let Error::WithSnippet { error, .. } = self {
            return error.render_snippet(source, crop_radius);
        }
        let location = self.location()?;
        render_snippet(source, "<input>", &location, &self.message(), crop_radius)
    }

    /// Attach/override a concrete location to this error and return it.
    ///
    /// Arguments:
    /// - `set_location`: location to store in the error.
    ///
    /// Returns:
    /// - The same `Error` with location updated.
    ///
    /// Called by:
    /// - The node deserializer, once the failing node is known.
    pub(crate) fn with_location(mut self, set_location: Location) -> Self {
        match &mut self {
            Error::Parse { location, .. }
            | Error::Recognition { location, .. }
            | Error::Hook { location, .. }
            | Error::Construction { location, .. }
            | Error::MultipleDocuments { location } => {
                *location = set_location;
            }
            Error::WithSnippet { error, .. } => {
                let inner = std::mem::replace(error.as_mut(), Error::NoDocument);
                **error = inner.with_location(set_location);
            }
            Error::Configuration { .. }
            | Error::Representation { .. }
            | Error::NoDocument
            | Error::InvalidOptions(_)
            | Error::Emit { .. }
            | Error::Io { .. } => {}
        }
        self
    }

    /// Like [`Error::with_location`], but keeps a location that is already known.
    pub(crate) fn or_location(self, fallback: Location) -> Self {
        if self.location().is_some() {
            self
        } else {
            self.with_location(fallback)
        }
    }

    /// If the error has a known location, return it.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Parse { location, .. }
            | Error::Recognition { location, .. }
            | Error::Hook { location, .. }
            | Error::Construction { location, .. }
            | Error::MultipleDocuments { location } => {
                if location != &Location::UNKNOWN {
                    Some(*location)
                } else {
                    None
                }
            }
            Error::WithSnippet { error, .. } => error.location(),
            _ => None,
        }
    }

    /// The message without any location suffix.
    pub fn message(&self) -> String {
        match self {
            Error::Parse { msg, .. }
            | Error::Recognition { msg, .. }
            | Error::Hook { msg, .. }
            | Error::Configuration { msg }
            | Error::Construction { msg, .. }
            | Error::Representation { msg }
            | Error::Emit { msg } => msg.clone(),
            Error::NoDocument => "the input contains no YAML document".to_string(),
            Error::MultipleDocuments { .. } => {
                "expected a single YAML document, found more".to_string()
            }
            Error::InvalidOptions(msg) => format!("invalid options: {msg}"),
            Error::Io { cause } => format!("IO error: {cause}"),
            Error::WithSnippet { error, .. } => error.message(),
        }
    }

    /// Map a `saphyr_parser::ScanError` into our error type with location.
    ///
    /// Called by:
    /// - The node builder when the underlying parser fails.
    pub(crate) fn from_scan_error(err: ScanError) -> Self {
        let mark = err.marker();
        let location = Location::new(mark.line(), mark.col() + 1);
        Error::Parse {
            msg: err.info().to_owned(),
            location,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Failure trees carry their own per-leaf positions.
            Error::Recognition { msg, .. } => f.write_str(msg),
            Error::Parse { msg, location }
            | Error::Hook { msg, location }
            | Error::Construction { msg, location } => fmt_with_location(f, msg, location),
            Error::MultipleDocuments { location } => fmt_with_location(f, &self.message(), location),
            Error::WithSnippet { text, .. } => f.write_str(text),
            _ => f.write_str(&self.message()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { cause } => Some(cause),
            Error::WithSnippet { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::construction(msg.to_string())
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::representation(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(cause: std::io::Error) -> Self {
        Error::Io { cause }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::Emit {
            msg: "formatter error".to_string(),
        }
    }
}

/// Print a message optionally suffixed with "at line X, column Y".
fn fmt_with_location(f: &mut fmt::Formatter<'_>, msg: &str, location: &Location) -> fmt::Result {
    if location != &Location::UNKNOWN {
        write!(
            f,
            "{msg} at line {}, column {}",
            location.line, location.column
        )
    } else {
        write!(f, "{msg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_suffix_only_when_known() {
        let err = Error::construction("boom");
        assert_eq!(err.to_string(), "boom");
        let err = err.with_location(Location::new(2, 5));
        assert_eq!(err.to_string(), "boom at line 2, column 5");
    }

    #[test]
    fn or_location_keeps_the_first_location() {
        let err = Error::construction("x")
            .with_location(Location::new(1, 1))
            .or_location(Location::new(9, 9));
        assert_eq!(err.location(), Some(Location::new(1, 1)));
    }

    #[test]
    fn snippets_show_the_offending_line() {
        let source = "name: x\nage: many\n";
        let err = Error::construction("invalid type").with_location(Location::new(2, 6));
        let rendered = err.render(source);
        assert!(rendered.contains("age: many"), "{rendered}");
        let wrapped = err.with_snippet(source, 40);
        assert!(matches!(wrapped, Error::WithSnippet { .. }));
        assert_eq!(wrapped.location(), Some(Location::new(2, 6)));
        assert!(wrapped.to_string().contains("line 2 column 6: invalid type"));
    }

    #[test]
    fn hook_errors_take_the_node_position() {
        let err = Error::hook(HookError::new("bad value"), Location::new(4, 2));
        assert_eq!(err.to_string(), "bad value at line 4, column 2");
    }
}

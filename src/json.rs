//! JSON output of canonical node trees.
//!
//! Mapping keys are written as strings (`1: x` becomes `"1": "x"`); complex
//! keys and non-finite floats have no JSON form and are rejected.

use std::io;

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use serde_json::{Map, Number, Value};

use crate::error::Error;
use crate::node::{Node, NodeData, ScalarKind};
use crate::parse_scalars::{parse_float, parse_int, parse_yaml11_bool};

/// JSON output options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonOptions {
    /// Spaces per level. `None` writes everything on one line.
    pub indent: Option<usize>,
    /// Escape every non-ASCII character as `\uXXXX`.
    pub ensure_ascii: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            indent: None,
            ensure_ascii: false,
        }
    }
}

/// Write `node` as JSON.
///
/// Called by:
/// - `Dumper::dump_json` after representation.
pub(crate) fn write_json<W: io::Write>(writer: W, node: &Node, options: JsonOptions) -> Result<(), Error> {
    let value = to_value(node)?;
    let result = match options.indent {
        Some(width) => {
            let indent = vec![b' '; width];
            let formatter = AsciiFormatter {
                inner: PrettyFormatter::with_indent(&indent),
                ensure_ascii: options.ensure_ascii,
            };
            value.serialize(&mut serde_json::Serializer::with_formatter(writer, formatter))
        }
        None => {
            let formatter = AsciiFormatter {
                inner: CompactFormatter,
                ensure_ascii: options.ensure_ascii,
            };
            value.serialize(&mut serde_json::Serializer::with_formatter(writer, formatter))
        }
    };
    result.map_err(|err| Error::Emit {
        msg: format!("JSON output failed: {err}"),
    })
}

fn to_value(node: &Node) -> Result<Value, Error> {
    match node.data() {
        NodeData::Scalar { kind, literal } => scalar_value(*kind, literal),
        NodeData::Sequence(items) => Ok(Value::Array(
            items.iter().map(to_value).collect::<Result<_, _>>()?,
        )),
        NodeData::Mapping(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key.data() {
                    NodeData::Scalar {
                        kind: ScalarKind::Null,
                        ..
                    } => "null".to_string(),
                    NodeData::Scalar { literal, .. } => literal.clone(),
                    _ => {
                        return Err(Error::Emit {
                            msg: format!("JSON object keys must be scalars, found a {}", key.shape_name()),
                        });
                    }
                };
                map.insert(key, to_value(value)?);
            }
            Ok(Value::Object(map))
        }
    }
}

fn scalar_value(kind: ScalarKind, literal: &str) -> Result<Value, Error> {
    let invalid = || Error::Emit {
        msg: format!("\"{literal}\" is not a valid {kind} for JSON output"),
    };
    Ok(match kind {
        ScalarKind::Str | ScalarKind::Timestamp => Value::String(literal.to_string()),
        ScalarKind::Null => Value::Null,
        ScalarKind::Bool => Value::Bool(parse_yaml11_bool(literal).ok_or_else(invalid)?),
        ScalarKind::Int => {
            let i = parse_int(literal).ok_or_else(invalid)?;
            if let Ok(i) = i64::try_from(i) {
                Value::Number(i.into())
            } else {
                Value::Number(u64::try_from(i).map_err(|_| invalid())?.into())
            }
        }
        ScalarKind::Float => {
            let f = parse_float(literal).ok_or_else(invalid)?;
            Value::Number(Number::from_f64(f).ok_or_else(invalid)?)
        }
    })
}

/// Wraps a serde_json formatter and escapes non-ASCII text when asked to.
struct AsciiFormatter<F> {
    inner: F,
    ensure_ascii: bool,
}

impl<F: Formatter> Formatter for AsciiFormatter<F> {
    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        if !self.ensure_ascii || fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

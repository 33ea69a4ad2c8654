//! Writes node trees as YAML text.
//!
//! Block style by default, flow style on request. Indentation is tracked in
//! columns rather than levels, so mappings that start on a `- ` line stay
//! aligned whatever the indent step. No tags are written.

use std::fmt::Write;

use crate::emitter_options::EmitterOptions;
use crate::error::Error;
use crate::node::{Node, NodeData, ScalarKind};
use crate::parse_scalars::parse_yaml11_bool;
use crate::ser_quoting::{ScalarContext, is_plain_safe, needs_double_quotes};

type Result<T> = std::result::Result<T, Error>;

/// Where the cursor is when a value starts.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Start of a document.
    Document,
    /// Right after `key:`.
    MapValue,
    /// Right after `- `.
    SeqItem,
}

pub(crate) struct Emitter<'o, W: Write> {
    out: &'o mut W,
    options: EmitterOptions,
    documents: usize,
}

impl<'o, W: Write> Emitter<'o, W> {
    pub(crate) fn new(out: &'o mut W, options: EmitterOptions) -> Result<Self> {
        options.consistent()?;
        Ok(Self {
            out,
            options,
            documents: 0,
        })
    }

    /// Write one document. Documents after the first are separated by `---`.
    pub(crate) fn emit_document(&mut self, node: &Node) -> Result<()> {
        let explicit = self.options.explicit_start || self.documents > 0;
        self.documents += 1;
        if explicit {
            self.out.write_str("---")?;
            if self.is_inline(node) {
                self.out.write_char(' ')?;
            } else {
                self.newline()?;
            }
        }
        self.emit_value(node, 0, Slot::Document)?;
        if self.options.explicit_end {
            self.out.write_str("...")?;
            self.newline()?;
        }
        Ok(())
    }

    /// Whether `node` is written on the current line.
    fn is_inline(&self, node: &Node) -> bool {
        match node.data() {
            NodeData::Scalar { .. } => true,
            NodeData::Sequence(items) => self.options.flow || items.is_empty(),
            NodeData::Mapping(entries) => self.options.flow || entries.is_empty(),
        }
    }

    fn is_empty_collection(&self, node: &Node) -> bool {
        match node.data() {
            NodeData::Scalar { .. } => false,
            NodeData::Sequence(items) => items.is_empty(),
            NodeData::Mapping(entries) => entries.is_empty(),
        }
    }

    fn emit_value(&mut self, node: &Node, column: usize, slot: Slot) -> Result<()> {
        if self.is_inline(node) {
            if self.is_empty_collection(node) && !self.options.empty_as_braces && !self.options.flow {
                // Written as an empty value, which reads back as null.
                return self.newline();
            }
            if slot == Slot::MapValue {
                self.out.write_char(' ')?;
            }
            self.write_flow(node, node.is_scalar())?;
            return self.newline();
        }
        let step = self.options.indent_step;
        match (node.data(), slot) {
            (NodeData::Mapping(entries), Slot::Document) => self.write_entries(entries, 0, false),
            (NodeData::Mapping(entries), Slot::MapValue) => {
                self.newline()?;
                self.write_entries(entries, column + step, false)
            }
            (NodeData::Mapping(entries), Slot::SeqItem) => {
                self.write_entries(entries, column + 2, true)
            }
            (NodeData::Sequence(items), Slot::Document) => self.write_items(items, 0, false),
            (NodeData::Sequence(items), Slot::MapValue) => {
                self.newline()?;
                self.write_items(items, column + step, false)
            }
            (NodeData::Sequence(items), Slot::SeqItem) => self.write_items(items, column + 2, true),
            (NodeData::Scalar { .. }, _) => Ok(()),
        }
    }

    fn write_entries(&mut self, entries: &[(Node, Node)], column: usize, first_inline: bool) -> Result<()> {
        for (i, (key, value)) in entries.iter().enumerate() {
            if !(first_inline && i == 0) {
                self.write_indent(column)?;
            }
            if key.is_scalar() {
                self.write_scalar(key, ScalarContext::BlockKey)?;
                self.out.write_char(':')?;
            } else {
                // Complex keys use the explicit `? key` form.
                self.out.write_str("? ")?;
                self.write_flow(key, false)?;
                self.newline()?;
                self.write_indent(column)?;
                self.out.write_char(':')?;
            }
            self.emit_value(value, column, Slot::MapValue)?;
        }
        Ok(())
    }

    fn write_items(&mut self, items: &[Node], column: usize, first_inline: bool) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            if !(first_inline && i == 0) {
                self.write_indent(column)?;
            }
            self.out.write_str("- ")?;
            self.emit_value(item, column, Slot::SeqItem)?;
        }
        Ok(())
    }

    /// Write `node` on the current line. `top` is true for a lone block scalar.
    fn write_flow(&mut self, node: &Node, top: bool) -> Result<()> {
        match node.data() {
            NodeData::Scalar { .. } => {
                let context = if top {
                    ScalarContext::BlockValue
                } else {
                    ScalarContext::Flow
                };
                self.write_scalar(node, context)
            }
            NodeData::Sequence(items) => {
                self.out.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.write_str(", ")?;
                    }
                    self.write_flow(item, false)?;
                }
                self.out.write_char(']')?;
                Ok(())
            }
            NodeData::Mapping(entries) => {
                self.out.write_char('{')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.write_str(", ")?;
                    }
                    if key.is_scalar() {
                        self.write_flow(key, false)?;
                    } else {
                        self.out.write_str("? ")?;
                        self.write_flow(key, false)?;
                    }
                    self.out.write_str(": ")?;
                    self.write_flow(value, false)?;
                }
                self.out.write_char('}')?;
                Ok(())
            }
        }
    }

    fn write_scalar(&mut self, node: &Node, context: ScalarContext) -> Result<()> {
        let NodeData::Scalar { kind, literal } = node.data() else {
            return Ok(());
        };
        match kind {
            ScalarKind::Str => self.write_string(literal, context),
            ScalarKind::Null => Ok(self.out.write_str("null")?),
            ScalarKind::Bool => {
                let value = parse_yaml11_bool(literal).ok_or_else(|| Error::Emit {
                    msg: format!("\"{literal}\" is not a boolean"),
                })?;
                Ok(self.out.write_str(if value { "true" } else { "false" })?)
            }
            ScalarKind::Int | ScalarKind::Float | ScalarKind::Timestamp => {
                Ok(self.out.write_str(literal)?)
            }
        }
    }

    /// Write a string plain when it reads back unchanged, otherwise quoted.
    fn write_string(&mut self, s: &str, context: ScalarContext) -> Result<()> {
        if self.options.quote_all {
            if needs_double_quotes(s) {
                self.write_quoted(s)
            } else {
                self.write_single_quoted(s)
            }
        } else if is_plain_safe(s, context) {
            Ok(self.out.write_str(s)?)
        } else {
            self.write_quoted(s)
        }
    }

    /// Write a single-quoted string. Single quotes inside are escaped by doubling them.
    fn write_single_quoted(&mut self, s: &str) -> Result<()> {
        self.out.write_char('\'')?;
        for ch in s.chars() {
            if ch == '\'' {
                self.out.write_str("''")?;
            } else {
                self.out.write_char(ch)?;
            }
        }
        self.out.write_char('\'')?;
        Ok(())
    }

    /// Write a double-quoted string with necessary escapes.
    fn write_quoted(&mut self, s: &str) -> Result<()> {
        self.out.write_char('"')?;
        for ch in s.chars() {
            match ch {
                '\\' => self.out.write_str("\\\\")?,
                '"' => self.out.write_str("\\\"")?,
                '\0' => self.out.write_str("\\0")?,
                '\u{7}' => self.out.write_str("\\a")?,
                '\u{8}' => self.out.write_str("\\b")?,
                '\t' => self.out.write_str("\\t")?,
                '\n' => self.out.write_str("\\n")?,
                '\u{b}' => self.out.write_str("\\v")?,
                '\u{c}' => self.out.write_str("\\f")?,
                '\r' => self.out.write_str("\\r")?,
                '\u{1b}' => self.out.write_str("\\e")?,
                '\u{FEFF}' => self.out.write_str("\\uFEFF")?,
                '\u{0085}' => self.out.write_str("\\N")?,
                '\u{2028}' => self.out.write_str("\\L")?,
                '\u{2029}' => self.out.write_str("\\P")?,
                c if (c as u32) <= 0xFF && c.is_control() => {
                    write!(self.out, "\\x{:02X}", c as u32)?
                }
                c if c.is_control() => write!(self.out, "\\u{:04X}", c as u32)?,
                c => self.out.write_char(c)?,
            }
        }
        self.out.write_char('"')?;
        Ok(())
    }

    fn write_indent(&mut self, column: usize) -> Result<()> {
        for _ in 0..column {
            self.out.write_char(' ')?;
        }
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        Ok(self.out.write_char('\n')?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(node: &Node, options: EmitterOptions) -> String {
        let mut out = String::new();
        Emitter::new(&mut out, options)
            .unwrap()
            .emit_document(node)
            .unwrap();
        out
    }

    fn sample() -> Node {
        Node::mapping_from([
            ("name", Node::string("disk")),
            (
                "sizes",
                Node::sequence(vec![
                    Node::int(1),
                    Node::mapping_from([("a", Node::string("x")), ("b", Node::bool(true))]),
                ]),
            ),
            ("empty", Node::mapping(vec![])),
            ("version", Node::string("1.0")),
        ])
    }

    #[test]
    fn block_style() {
        let yaml = emit(&sample(), EmitterOptions::default());
        assert_eq!(
            yaml,
            "name: disk\nsizes:\n  - 1\n  - a: x\n    b: true\nempty: {}\nversion: \"1.0\"\n"
        );
    }

    #[test]
    fn wide_indent_keeps_item_mappings_aligned() {
        let options = crate::emitter_options! { indent_step: 4 };
        let yaml = emit(&sample(), options);
        assert!(yaml.contains("sizes:\n    - 1\n    - a: x\n      b: true\n"), "{yaml}");
    }

    #[test]
    fn flow_style_and_markers() {
        let options = crate::emitter_options! {
            flow: true,
            explicit_start: true,
            explicit_end: true,
        };
        let yaml = emit(&sample(), options);
        assert_eq!(
            yaml,
            "--- {name: disk, sizes: [1, {a: x, b: true}], empty: {}, version: \"1.0\"}\n...\n"
        );
    }

    #[test]
    fn complex_keys_use_explicit_form() {
        let node = Node::mapping(vec![(
            Node::sequence(vec![Node::int(1), Node::int(2)]),
            Node::string("pair"),
        )]);
        assert_eq!(emit(&node, EmitterOptions::default()), "? [1, 2]\n: pair\n");
    }

    #[test]
    fn quote_all_prefers_single_quotes() {
        let options = crate::emitter_options! { quote_all: true };
        let node = Node::sequence(vec![Node::string("it's"), Node::string("plain")]);
        assert_eq!(emit(&node, options), "- \"it's\"\n- 'plain'\n");
    }

    #[test]
    fn empty_collections_without_braces() {
        let options = crate::emitter_options! { empty_as_braces: false };
        let node = Node::mapping_from([("a", Node::sequence(vec![])), ("b", Node::int(1))]);
        assert_eq!(emit(&node, options), "a:\nb: 1\n");
    }

    #[test]
    fn zero_indent_is_rejected() {
        let mut out = String::new();
        let options = crate::emitter_options! { indent_step: 0 };
        assert!(matches!(
            Emitter::new(&mut out, options),
            Err(Error::InvalidOptions(_))
        ));
    }
}

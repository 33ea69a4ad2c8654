//! Builds [`Node`] trees from the saphyr event stream, one per document.
//!
//! Anchored nodes are recorded per document and aliases are replaced by a
//! copy of the anchored subtree. Copies count against
//! [`LoaderOptions::max_alias_expansions`].

use std::collections::HashMap;

use nohash_hasher::BuildNoHashHasher;
use saphyr_parser::{Event, Parser, ScalarStyle};
use tracing::trace;

use crate::error::Error;
use crate::location::{Location, location_from_span};
use crate::node::{Node, NodeData, ScalarKind, Tag};
use crate::options::LoaderOptions;
use crate::parse_scalars::{
    is_float_literal, is_int_literal, is_null_literal, is_timestamp_literal, parse_yaml11_bool,
    parse_yaml12_bool, resolve_plain,
};
use crate::tags::{NON_SPECIFIC, is_core_tag, scalar_kind_for_tag};

/// A container under construction.
enum Frame {
    Sequence {
        items: Vec<Node>,
        tag: Tag,
        anchor: usize,
        location: Location,
    },
    Mapping {
        entries: Vec<(Node, Node)>,
        key: Option<Node>,
        tag: Tag,
        anchor: usize,
        location: Location,
    },
}

struct NodeBuilder<'o> {
    options: &'o LoaderOptions,
    anchors: HashMap<usize, Node, BuildNoHashHasher<usize>>,
    stack: Vec<Frame>,
    root: Option<Node>,
    expanded: usize,
}

/// Parse every document in `input`.
///
/// Called by:
/// - The loader, before recognition.
pub(crate) fn parse_documents(input: &str, options: &LoaderOptions) -> Result<Vec<Node>, Error> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    let mut builder = NodeBuilder {
        options,
        anchors: HashMap::default(),
        stack: Vec::new(),
        root: None,
        expanded: 0,
    };
    let mut documents = Vec::new();

    for item in Parser::new_from_str(input) {
        let (event, span) = item.map_err(Error::from_scan_error)?;
        let location = location_from_span(&span);
        match event {
            Event::StreamStart | Event::StreamEnd | Event::Nothing => {}
            Event::DocumentStart(_) => {
                builder.anchors.clear();
                builder.expanded = 0;
            }
            Event::DocumentEnd => {
                if let Some(root) = builder.root.take() {
                    trace!(document = documents.len(), "parsed document");
                    documents.push(root);
                }
            }
            Event::Scalar(value, style, anchor, tag) => {
                let tag = tag.map(|t| t.to_string());
                let node = scalar_node(&value, style, tag, options.yaml11_booleans, location)?;
                builder.record(anchor, &node);
                builder.push(node)?;
            }
            Event::SequenceStart(anchor, tag) => {
                builder.check_depth(location)?;
                builder.stack.push(Frame::Sequence {
                    items: Vec::new(),
                    tag: container_tag(tag.map(|t| t.to_string())),
                    anchor,
                    location,
                });
            }
            Event::MappingStart(anchor, tag) => {
                builder.check_depth(location)?;
                builder.stack.push(Frame::Mapping {
                    entries: Vec::new(),
                    key: None,
                    tag: container_tag(tag.map(|t| t.to_string())),
                    anchor,
                    location,
                });
            }
            Event::SequenceEnd | Event::MappingEnd => builder.close()?,
            Event::Alias(anchor) => {
                let node = builder.expand(anchor, location)?;
                builder.push(node)?;
            }
        }
    }
    Ok(documents)
}

impl NodeBuilder<'_> {
    fn check_depth(&self, location: Location) -> Result<(), Error> {
        if self.stack.len() >= self.options.max_depth {
            return Err(Error::parse(format!(
                "nesting is deeper than the allowed {} levels",
                self.options.max_depth
            ))
            .with_location(location));
        }
        Ok(())
    }

    fn record(&mut self, anchor: usize, node: &Node) {
        if anchor != 0 {
            self.anchors.insert(anchor, node.clone());
        }
    }

    /// Hand a finished node to the enclosing container, or make it the document root.
    fn push(&mut self, node: Node) -> Result<(), Error> {
        match self.stack.last_mut() {
            None => self.root = Some(node),
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping { entries, key, .. }) => match key.take() {
                None => *key = Some(node),
                Some(k) => entries.push((k, node)),
            },
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        let Some(frame) = self.stack.pop() else {
            return Err(Error::parse("unbalanced end of collection"));
        };
        let (data, tag, anchor, location) = match frame {
            Frame::Sequence {
                items,
                tag,
                anchor,
                location,
            } => (NodeData::Sequence(items), tag, anchor, location),
            Frame::Mapping {
                entries,
                key,
                tag,
                anchor,
                location,
            } => {
                if key.is_some() {
                    return Err(Error::parse("mapping key without a value").with_location(location));
                }
                (NodeData::Mapping(entries), tag, anchor, location)
            }
        };
        let node = Node::parsed(data, tag, location);
        self.record(anchor, &node);
        self.push(node)
    }

    fn expand(&mut self, anchor: usize, location: Location) -> Result<Node, Error> {
        let node = self
            .anchors
            .get(&anchor)
            .cloned()
            .ok_or_else(|| Error::parse("alias refers to an unknown anchor").with_location(location))?;
        self.expanded = self.expanded.saturating_add(count_nodes(&node));
        if self.expanded > self.options.max_alias_expansions {
            return Err(Error::parse(format!(
                "alias expansion limit exceeded: more than {} nodes copied from aliases",
                self.options.max_alias_expansions
            ))
            .with_location(location));
        }
        Ok(node)
    }
}

fn count_nodes(node: &Node) -> usize {
    match node.data() {
        NodeData::Scalar { .. } => 1,
        NodeData::Sequence(items) => 1 + items.iter().map(count_nodes).sum::<usize>(),
        NodeData::Mapping(entries) => {
            1 + entries
                .iter()
                .map(|(k, v)| count_nodes(k) + count_nodes(v))
                .sum::<usize>()
        }
    }
}

/// Core tags on collections (`!!map`, `!!seq`) say nothing beyond the shape.
fn container_tag(tag: Option<String>) -> Tag {
    match tag {
        Some(t) if !is_core_tag(&t) && t != NON_SPECIFIC => Tag::Explicit(t),
        _ => Tag::Unknown,
    }
}

fn scalar_node(
    value: &str,
    style: ScalarStyle,
    tag: Option<String>,
    yaml11_booleans: bool,
    location: Location,
) -> Result<Node, Error> {
    let plain = matches!(style, ScalarStyle::Plain);
    let (kind, tag) = match tag {
        Some(t) if t == NON_SPECIFIC => (ScalarKind::Str, Tag::Unknown),
        Some(t) if is_core_tag(&t) => {
            let kind = scalar_kind_for_tag(&t).ok_or_else(|| {
                Error::parse(format!("the tag {t} is not supported on a scalar"))
                    .with_location(location)
            })?;
            if !literal_fits(value, kind) {
                return Err(Error::parse(format!("\"{value}\" is not a valid {kind}"))
                    .with_location(location));
            }
            (kind, Tag::Unknown)
        }
        Some(t) => {
            let kind = if plain {
                resolve_plain(value, yaml11_booleans)
            } else {
                ScalarKind::Str
            };
            (kind, Tag::Explicit(t))
        }
        None if plain => (resolve_plain(value, yaml11_booleans), Tag::Unknown),
        None => (ScalarKind::Str, Tag::Unknown),
    };
    Ok(Node::parsed(
        NodeData::Scalar {
            kind,
            literal: value.to_string(),
        },
        tag,
        location,
    ))
}

/// Whether a literal under an explicit core tag can be read as that kind.
fn literal_fits(value: &str, kind: ScalarKind) -> bool {
    match kind {
        ScalarKind::Str => true,
        ScalarKind::Int => is_int_literal(value),
        ScalarKind::Float => is_float_literal(value) || is_int_literal(value),
        ScalarKind::Bool => parse_yaml12_bool(value).or_else(|| parse_yaml11_bool(value)).is_some(),
        ScalarKind::Null => is_null_literal(value),
        ScalarKind::Timestamp => is_timestamp_literal(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(input: &str) -> Vec<Node> {
        parse_documents(input, &LoaderOptions::default()).unwrap()
    }

    #[test]
    fn kinds_follow_the_core_schema() {
        let docs = parse(indoc! {r#"
            s: hello
            q: "12"
            i: 12
            f: 1.5
            b: true
            n: ~
            t: 2001-12-14
            y: yes
            forced: !!str 3
        "#});
        let root = &docs[0];
        let kind = |k: &str| root.get(k).and_then(Node::scalar_kind);
        assert_eq!(kind("s"), Some(ScalarKind::Str));
        assert_eq!(kind("q"), Some(ScalarKind::Str));
        assert_eq!(kind("i"), Some(ScalarKind::Int));
        assert_eq!(kind("f"), Some(ScalarKind::Float));
        assert_eq!(kind("b"), Some(ScalarKind::Bool));
        assert_eq!(kind("n"), Some(ScalarKind::Null));
        assert_eq!(kind("t"), Some(ScalarKind::Timestamp));
        assert_eq!(kind("y"), Some(ScalarKind::Str));
        assert_eq!(kind("forced"), Some(ScalarKind::Str));
    }

    #[test]
    fn local_tags_and_positions_are_kept() {
        let docs = parse("shape: !Circle\n  radius: 2\n");
        let shape = docs[0].get("shape").unwrap();
        assert_eq!(shape.tag(), &Tag::Explicit("!Circle".into()));
        assert_eq!(shape.location().line(), 2);
        let key = &docs[0].entries().unwrap()[0].0;
        assert_eq!((key.location().line(), key.location().column()), (1, 1));
    }

    #[test]
    fn aliases_are_expanded() {
        let docs = parse("a: &x [1, 2]\nb: *x\n");
        assert_eq!(docs[0].get("a"), docs[0].get("b"));
    }

    #[test]
    fn alias_bombs_are_stopped() {
        let options = crate::loader_options! { max_alias_expansions: 10 };
        let input = indoc! {"
            a: &a [x, x, x, x]
            b: &b [*a, *a, *a]
            c: [*b, *b]
        "};
        let err = parse_documents(input, &options).unwrap_err();
        assert!(err.to_string().contains("alias expansion limit"), "{err}");
    }

    #[test]
    fn several_documents() {
        let docs = parse("--- 1\n--- two\n");
        assert_eq!(docs, vec![Node::int(1), Node::string("two")]);
        assert!(parse("").is_empty());
    }

    #[test]
    fn syntax_errors_carry_a_location() {
        let err = parse_documents("a: [1, 2\n", &LoaderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.location().is_some());
    }

    #[test]
    fn bad_core_tagged_values_are_rejected() {
        let err = parse_documents("!!int abc", &LoaderOptions::default()).unwrap_err();
        assert!(err.to_string().contains("is not a valid int"), "{err}");
    }
}

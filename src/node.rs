//! The in-memory node tree.
//!
//! A [`Node`] is a scalar, a sequence or a mapping. Every node carries a
//! [`Position`] and a [`Tag`] slot that records what the node is currently
//! believed to be. Subtrees are owned by their parent; hooks rewrite them in
//! place or replace them with freshly built (generated) nodes.

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::location::{Location, Position};
use crate::parse_scalars::{parse_float, parse_int, parse_yaml11_bool};
use crate::zmij_format::float_literal;

/// The intrinsic kind of a scalar literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
    Null,
    Timestamp,
}

impl ScalarKind {
    /// Short lowercase name, as used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Str => "str",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::Null => "null",
            ScalarKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a node is currently believed to be.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tag {
    /// Nothing known beyond the node's own shape.
    #[default]
    Unknown,
    /// An author-supplied local tag such as `!Circle`, kept verbatim.
    Explicit(String),
    /// Recognized as an instance of the named registered class.
    Class(String),
}

impl Tag {
    /// Class name claimed by an explicit `!Name` tag.
    pub fn explicit_class(&self) -> Option<&str> {
        match self {
            Tag::Explicit(tag) => crate::tags::class_name_of(tag),
            _ => None,
        }
    }

    /// The recognized class, if any.
    pub fn class(&self) -> Option<&str> {
        match self {
            Tag::Class(name) => Some(name),
            _ => None,
        }
    }
}

/// The shape and content of a node.
#[derive(Clone, Debug)]
pub enum NodeData {
    Scalar { kind: ScalarKind, literal: String },
    Sequence(Vec<Node>),
    Mapping(Vec<(Node, Node)>),
}

/// A scalar value as seen by hooks.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    Timestamp(String),
}

impl ScalarValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::Str(_) => ScalarKind::Str,
            ScalarValue::Int(_) => ScalarKind::Int,
            ScalarValue::Float(_) => ScalarKind::Float,
            ScalarValue::Bool(_) => ScalarKind::Bool,
            ScalarValue::Null => ScalarKind::Null,
            ScalarValue::Timestamp(_) => ScalarKind::Timestamp,
        }
    }

    /// The canonical literal for this value.
    pub(crate) fn to_literal(&self) -> String {
        match self {
            ScalarValue::Str(s) | ScalarValue::Timestamp(s) => s.clone(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Float(f) => float_literal(*f),
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Null => "null".to_string(),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Str(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Str(s)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Int(i)
    }
}

impl From<i32> for ScalarValue {
    fn from(i: i32) -> Self {
        ScalarValue::Int(i64::from(i))
    }
}

impl From<f64> for ScalarValue {
    fn from(f: f64) -> Self {
        ScalarValue::Float(f)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl From<()> for ScalarValue {
    fn from(_: ()) -> Self {
        ScalarValue::Null
    }
}

/// One node of a document tree.
///
/// Equality compares shape and content only; positions and tags are ignored.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) data: NodeData,
    pub(crate) tag: Tag,
    pub(crate) position: Position,
}

impl Node {
    /// Build a generated scalar node.
    pub fn scalar(kind: ScalarKind, literal: impl Into<String>) -> Self {
        Self::from_data(NodeData::Scalar {
            kind,
            literal: literal.into(),
        })
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::scalar(ScalarKind::Str, s)
    }

    pub fn int(i: i64) -> Self {
        Self::scalar(ScalarKind::Int, i.to_string())
    }

    pub fn float(f: f64) -> Self {
        Self::scalar(ScalarKind::Float, float_literal(f))
    }

    pub fn bool(b: bool) -> Self {
        Self::scalar(ScalarKind::Bool, b.to_string())
    }

    pub fn null() -> Self {
        Self::scalar(ScalarKind::Null, "null")
    }

    pub fn sequence(items: Vec<Node>) -> Self {
        Self::from_data(NodeData::Sequence(items))
    }

    pub fn mapping(entries: Vec<(Node, Node)>) -> Self {
        Self::from_data(NodeData::Mapping(entries))
    }

    /// Build a generated mapping with string keys.
    pub fn mapping_from<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Self::mapping(
            entries
                .into_iter()
                .map(|(k, v)| (Node::string(k), v))
                .collect(),
        )
    }

    pub(crate) fn from_data(data: NodeData) -> Self {
        Self {
            data,
            tag: Tag::Unknown,
            position: Position::Generated,
        }
    }

    pub(crate) fn parsed(data: NodeData, tag: Tag, location: Location) -> Self {
        Self {
            data,
            tag,
            position: Position::Parsed(location),
        }
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    #[inline]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    #[inline]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    #[inline]
    pub fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Source location, or [`Location::UNKNOWN`] for generated nodes.
    #[inline]
    pub fn location(&self) -> Location {
        self.position.or_unknown()
    }

    /// "scalar", "sequence" or "mapping".
    pub fn shape_name(&self) -> &'static str {
        match self.data {
            NodeData::Scalar { .. } => "scalar",
            NodeData::Sequence(_) => "sequence",
            NodeData::Mapping(_) => "mapping",
        }
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(self.data, NodeData::Scalar { .. })
    }

    /// Whether this is a scalar of exactly the given kind.
    #[inline]
    pub fn is_scalar_of(&self, kind: ScalarKind) -> bool {
        self.scalar_kind() == Some(kind)
    }

    #[inline]
    pub fn is_mapping(&self) -> bool {
        matches!(self.data, NodeData::Mapping(_))
    }

    #[inline]
    pub fn is_sequence(&self) -> bool {
        matches!(self.data, NodeData::Sequence(_))
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match &self.data {
            NodeData::Scalar { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Literal text of a scalar node.
    pub fn literal(&self) -> Option<&str> {
        match &self.data {
            NodeData::Scalar { literal, .. } => Some(literal),
            _ => None,
        }
    }

    /// Text of a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            NodeData::Scalar {
                kind: ScalarKind::Str,
                literal,
            } => Some(literal),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[Node]> {
        match &self.data {
            NodeData::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.data {
            NodeData::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&[(Node, Node)]> {
        match &self.data {
            NodeData::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut Vec<(Node, Node)>> {
        match &mut self.data {
            NodeData::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Value of the first mapping entry whose scalar key reads `key`.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries()?
            .iter()
            .find(|(k, _)| k.literal() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries_mut()?
            .iter_mut()
            .find(|(k, _)| k.literal() == Some(key))
            .map(|(_, v)| v)
    }

    /// Scalar keys of a mapping, in order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries()
            .map(|entries| entries.iter().filter_map(|(k, _)| k.literal()).collect())
            .unwrap_or_default()
    }

    /// Reset the tag of this node and of every node below it.
    pub fn strip_tags(&mut self) {
        self.tag = Tag::Unknown;
        match &mut self.data {
            NodeData::Scalar { .. } => {}
            NodeData::Sequence(items) => items.iter_mut().for_each(Node::strip_tags),
            NodeData::Mapping(entries) => {
                for (k, v) in entries {
                    k.strip_tags();
                    v.strip_tags();
                }
            }
        }
    }

    /// Decode a scalar into a [`ScalarValue`].
    ///
    /// Returns `None` for containers and for integers outside the `i64` range.
    pub fn scalar_value(&self) -> Option<ScalarValue> {
        let NodeData::Scalar { kind, literal } = &self.data else {
            return None;
        };
        Some(match kind {
            ScalarKind::Str => ScalarValue::Str(literal.clone()),
            ScalarKind::Int => ScalarValue::Int(parse_int(literal)?.try_into().ok()?),
            ScalarKind::Float => ScalarValue::Float(parse_float(literal)?),
            ScalarKind::Bool => ScalarValue::Bool(parse_yaml11_bool(literal)?),
            ScalarKind::Null => ScalarValue::Null,
            ScalarKind::Timestamp => ScalarValue::Timestamp(literal.clone()),
        })
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (&self.data, &other.data) {
            (
                NodeData::Scalar { kind: k1, literal: l1 },
                NodeData::Scalar { kind: k2, literal: l2 },
            ) => k1 == k2 && (l1 == l2 || self.scalar_value() == other.scalar_value()),
            (NodeData::Sequence(a), NodeData::Sequence(b)) => a == b,
            (NodeData::Mapping(a), NodeData::Mapping(b)) => a == b,
            _ => false,
        }
    }
}

impl From<ScalarValue> for Node {
    fn from(value: ScalarValue) -> Self {
        Node::scalar(value.kind(), value.to_literal())
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::string(s)
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::string(s)
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::int(i)
    }
}

impl From<i32> for Node {
    fn from(i: i32) -> Self {
        Node::int(i64::from(i))
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self {
        Node::float(f)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::bool(b)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match &self.data {
            NodeData::Scalar { kind, literal } => match kind {
                ScalarKind::Str | ScalarKind::Timestamp => s.serialize_str(literal),
                ScalarKind::Null => s.serialize_unit(),
                ScalarKind::Bool => match parse_yaml11_bool(literal) {
                    Some(b) => s.serialize_bool(b),
                    None => s.serialize_str(literal),
                },
                ScalarKind::Int => match parse_int(literal) {
                    Some(i) => match i64::try_from(i) {
                        Ok(i) => s.serialize_i64(i),
                        Err(_) => s.serialize_i128(i),
                    },
                    None => s.serialize_str(literal),
                },
                ScalarKind::Float => match parse_float(literal) {
                    Some(f) => s.serialize_f64(f),
                    None => s.serialize_str(literal),
                },
            },
            NodeData::Sequence(items) => {
                let mut seq = s.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            NodeData::Mapping(entries) => {
                let mut map = s.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::int(v))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Node, E> {
        Ok(Node::scalar(ScalarKind::Int, v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::scalar(ScalarKind::Int, v.to_string()))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Node, E> {
        Ok(Node::scalar(ScalarKind::Int, v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::string(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::string(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::null())
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::null())
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Node, D::Error> {
        Node::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry()? {
            entries.push((k, v));
        }
        Ok(Node::mapping(entries))
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(NodeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_position_and_tag() {
        let a = Node::int(42).with_position(Position::Parsed(Location::new(1, 1)));
        let b = Node::int(42).with_tag(Tag::Class("X".into()));
        assert_eq!(a, b);
        assert_ne!(Node::int(42), Node::string("42"));
    }

    #[test]
    fn equal_values_with_different_spellings() {
        assert_eq!(Node::scalar(ScalarKind::Int, "0x10"), Node::int(16));
        assert_eq!(Node::scalar(ScalarKind::Float, "1.50"), Node::float(1.5));
    }

    #[test]
    fn strip_tags_reaches_keys_and_values() {
        let mut node = Node::mapping(vec![(
            Node::string("a").with_tag(Tag::Explicit("!X".into())),
            Node::sequence(vec![Node::int(1).with_tag(Tag::Class("Y".into()))]),
        )])
        .with_tag(Tag::Class("Z".into()));
        node.strip_tags();
        assert_eq!(node.tag(), &Tag::Unknown);
        let (k, v) = &node.entries().unwrap()[0];
        assert_eq!(k.tag(), &Tag::Unknown);
        assert_eq!(v.items().unwrap()[0].tag(), &Tag::Unknown);
    }

    #[test]
    fn small_integers_convert_losslessly() {
        assert_eq!(Node::from(i32::MIN), Node::int(-2_147_483_648));
        assert_eq!(ScalarValue::from(-3i32), ScalarValue::Int(-3));
    }

    #[test]
    fn scalar_values_decode_by_kind() {
        assert_eq!(Node::scalar(ScalarKind::Int, "0x1F").scalar_value(), Some(ScalarValue::Int(31)));
        assert_eq!(Node::scalar(ScalarKind::Bool, "True").scalar_value(), Some(ScalarValue::Bool(true)));
        assert_eq!(Node::null().scalar_value(), Some(ScalarValue::Null));
        assert_eq!(Node::sequence(vec![]).scalar_value(), None);
    }
}

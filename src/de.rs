//! Serde `Deserializer` over a processed [`Node`] tree.
//!
//! By the time a tree reaches this module it has been recognized, desugared
//! and validated, so this layer only converts: scalars are decoded according
//! to their kind, mappings feed structs and maps, and sequences feed
//! sequences and tuples. Errors carry the location of the innermost node
//! that was being read.

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeSeed, Unexpected, Visitor};

use crate::error::Error;
use crate::location::Location;
use crate::node::{Node, NodeData, ScalarKind};
use crate::parse_scalars::{parse_float, parse_int, parse_yaml11_bool};

/// Deserializer reading from a borrowed node.
pub(crate) struct NodeDeserializer<'de> {
    node: &'de Node,
}

impl<'de> NodeDeserializer<'de> {
    pub(crate) fn new(node: &'de Node) -> Self {
        Self { node }
    }

    fn location(&self) -> Location {
        self.node.location()
    }

    /// How the node looks to serde's type-mismatch messages.
    fn unexpected(&self) -> Unexpected<'de> {
        let node: &'de Node = self.node;
        match &node.data {
            NodeData::Scalar { kind, literal } => match kind {
                ScalarKind::Str | ScalarKind::Timestamp => Unexpected::Str(literal),
                ScalarKind::Null => Unexpected::Unit,
                ScalarKind::Bool => match parse_yaml11_bool(literal) {
                    Some(b) => Unexpected::Bool(b),
                    None => Unexpected::Str(literal),
                },
                ScalarKind::Int => match parse_int(literal).map(i64::try_from) {
                    Some(Ok(i)) => Unexpected::Signed(i),
                    _ => Unexpected::Other("integer"),
                },
                ScalarKind::Float => match parse_float(literal) {
                    Some(f) => Unexpected::Float(f),
                    None => Unexpected::Other("float"),
                },
            },
            NodeData::Sequence(_) => Unexpected::Seq,
            NodeData::Mapping(_) => Unexpected::Map,
        }
    }

    fn invalid_type(&self, expected: &dyn de::Expected) -> Error {
        <Error as de::Error>::invalid_type(self.unexpected(), expected).with_location(self.location())
    }

    fn scalar(&self, kind: ScalarKind) -> Option<&'de str> {
        let node: &'de Node = self.node;
        match &node.data {
            NodeData::Scalar { kind: k, literal } if *k == kind => Some(literal),
            _ => None,
        }
    }

    fn text(&self) -> Option<&'de str> {
        let node: &'de Node = self.node;
        match &node.data {
            NodeData::Scalar {
                kind: ScalarKind::Str | ScalarKind::Timestamp,
                literal,
            } => Some(literal),
            _ => None,
        }
    }

    fn deserialize_integer<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let Some(literal) = self.scalar(ScalarKind::Int) else {
            return Err(self.invalid_type(&visitor));
        };
        let Some(value) = parse_int(literal) else {
            return Err(Error::construction(format!(
                "the integer {literal} is out of range"
            ))
            .with_location(self.location()));
        };
        let location = self.location();
        let result = if let Ok(i) = i64::try_from(value) {
            visitor.visit_i64(i)
        } else if let Ok(u) = u64::try_from(value) {
            visitor.visit_u64(u)
        } else {
            visitor.visit_i128(value)
        };
        result.map_err(|e: Error| e.or_location(location))
    }

    fn deserialize_float<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.node.scalar_kind() {
            Some(ScalarKind::Float) | Some(ScalarKind::Int) => {}
            _ => return Err(self.invalid_type(&visitor)),
        }
        let Some(value) = self.node.literal().and_then(|l| {
            parse_float(l).or_else(|| parse_int(l).map(|i| i as f64))
        }) else {
            return Err(self.invalid_type(&visitor));
        };
        visitor
            .visit_f64(value)
            .map_err(|e: Error| e.or_location(self.location()))
    }

    fn visit_sequence<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let Some(items) = self.node.items() else {
            return Err(self.invalid_type(&visitor));
        };
        let mut access = SeqAccess {
            iter: items.iter(),
        };
        let value = visitor
            .visit_seq(&mut access)
            .map_err(|e: Error| e.or_location(self.location()))?;
        if access.iter.len() > 0 {
            return Err(<Error as de::Error>::invalid_length(items.len(), &"fewer elements")
                .with_location(self.location()));
        }
        Ok(value)
    }

    fn visit_mapping<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let Some(entries) = self.node.entries() else {
            return Err(self.invalid_type(&visitor));
        };
        visitor
            .visit_map(MapAccess {
                iter: entries.iter(),
                value: None,
            })
            .map_err(|e: Error| e.or_location(self.location()))
    }
}

impl<'de> de::Deserializer<'de> for NodeDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let location = self.location();
        let node: &'de Node = self.node;
        let result = match &node.data {
            NodeData::Scalar { kind, literal } => match kind {
                ScalarKind::Str | ScalarKind::Timestamp => visitor.visit_borrowed_str(literal),
                ScalarKind::Null => visitor.visit_unit(),
                ScalarKind::Bool => match parse_yaml11_bool(literal) {
                    Some(b) => visitor.visit_bool(b),
                    None => visitor.visit_borrowed_str(literal),
                },
                ScalarKind::Int => return self.deserialize_integer(visitor),
                ScalarKind::Float => return self.deserialize_float(visitor),
            },
            NodeData::Sequence(_) => return self.visit_sequence(visitor),
            NodeData::Mapping(_) => return self.visit_mapping(visitor),
        };
        result.map_err(|e: Error| e.or_location(location))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.scalar(ScalarKind::Bool).and_then(parse_yaml11_bool) {
            Some(b) => visitor.visit_bool(b).map_err(|e: Error| e.or_location(self.location())),
            None => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_float(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_float(visitor)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let Some(text) = self.text() else {
            return Err(self.invalid_type(&visitor));
        };
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c).map_err(|e: Error| e.or_location(self.location())),
            _ => Err(<Error as de::Error>::invalid_value(Unexpected::Str(text), &visitor)
                .with_location(self.location())),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.text() {
            Some(text) => visitor
                .visit_borrowed_str(text)
                .map_err(|e: Error| e.or_location(self.location())),
            None => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.text() {
            Some(text) => visitor
                .visit_borrowed_bytes(text.as_bytes())
                .map_err(|e: Error| e.or_location(self.location())),
            None => self.visit_sequence(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if self.node.is_scalar_of(ScalarKind::Null) {
            visitor.visit_none()
        } else {
            let location = self.location();
            visitor.visit_some(self).map_err(|e: Error| e.or_location(location))
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if self.node.is_scalar_of(ScalarKind::Null) {
            visitor.visit_unit()
        } else {
            Err(self.invalid_type(&visitor))
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        let location = self.location();
        visitor
            .visit_newtype_struct(self)
            .map_err(|e: Error| e.or_location(location))
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.visit_sequence(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.visit_sequence(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.visit_sequence(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.visit_mapping(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.visit_mapping(visitor)
    }

    /// Read an enum.
    ///
    /// A node recognized as a class whose name is one of the variants selects
    /// that variant, with the node itself as its content; this is how
    /// polymorphic attributes reach their Rust enum. Otherwise a string is a
    /// unit variant and a single-entry mapping is `{variant: content}`.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let location = self.location();
        let node: &'de Node = self.node;
        let access = if let Some(class) = node.tag().class()
            && variants.iter().any(|v| *v == class)
        {
            EnumAccess {
                variant: class,
                content: Some(node),
                location,
            }
        } else if let Some(text) = self.text() {
            EnumAccess {
                variant: text,
                content: None,
                location,
            }
        } else if let Some([(key, value)]) = node.entries()
            && let Some(variant) = key.literal()
        {
            EnumAccess {
                variant,
                content: Some(value),
                location: key.location(),
            }
        } else {
            return Err(Error::construction(format!(
                "expected a variant name or a single-entry mapping for enum {name}, found a {}",
                node.shape_name()
            ))
            .with_location(location));
        };
        visitor.visit_enum(access).map_err(|e: Error| e.or_location(location))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let node: &'de Node = self.node;
        match node.literal() {
            Some(text) => visitor
                .visit_borrowed_str(text)
                .map_err(|e: Error| e.or_location(self.location())),
            None => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }
}

struct SeqAccess<'de> {
    iter: std::slice::Iter<'de, Node>,
}

impl<'de> de::SeqAccess<'de> for SeqAccess<'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Error> {
        match self.iter.next() {
            Some(item) => seed.deserialize(NodeDeserializer::new(item)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapAccess<'de> {
    iter: std::slice::Iter<'de, (Node, Node)>,
    value: Option<&'de Node>,
}

impl<'de> de::MapAccess<'de> for MapAccess<'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(NodeDeserializer::new(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        match self.value.take() {
            Some(value) => seed.deserialize(NodeDeserializer::new(value)),
            None => Err(Error::construction("map value requested before its key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumAccess<'de> {
    variant: &'de str,
    content: Option<&'de Node>,
    location: Location,
}

impl<'de> de::EnumAccess<'de> for EnumAccess<'de> {
    type Error = Error;
    type Variant = VariantAccess<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant), Error> {
        let variant = seed
            .deserialize(BorrowedStrDeserializer::<Error>::new(self.variant))
            .map_err(|e: Error| e.or_location(self.location))?;
        Ok((
            variant,
            VariantAccess {
                content: self.content,
                location: self.location,
            },
        ))
    }
}

struct VariantAccess<'de> {
    content: Option<&'de Node>,
    location: Location,
}

impl<'de> VariantAccess<'de> {
    fn content(&self) -> Result<&'de Node, Error> {
        self.content.ok_or_else(|| {
            Error::construction("expected a value for this enum variant, found only its name")
                .with_location(self.location)
        })
    }
}

impl<'de> de::VariantAccess<'de> for VariantAccess<'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        match self.content {
            Some(node) if !node.is_scalar() => Err(Error::construction(format!(
                "unexpected {} for a unit variant",
                node.shape_name()
            ))
            .with_location(node.location())),
            _ => Ok(()),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, Error> {
        seed.deserialize(NodeDeserializer::new(self.content()?))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        NodeDeserializer::new(self.content()?).visit_sequence(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        NodeDeserializer::new(self.content()?).visit_mapping(visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;
    use crate::node::Tag;
    use serde::Deserialize;

    fn from_node<'de, T: Deserialize<'de>>(node: &'de Node) -> Result<T, Error> {
        T::deserialize(NodeDeserializer::new(node))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i32,
        y: f64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    enum Color {
        #[serde(rename = "red")]
        Red,
        #[serde(rename = "blue")]
        Blue,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Circle {
        radius: f64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    enum Shape {
        Circle(Circle),
        Point(Point),
    }

    #[test]
    fn structs_from_mappings() {
        let node = Node::mapping_from([("x", Node::int(1)), ("y", Node::float(2.5))]);
        assert_eq!(from_node::<Point>(&node).unwrap(), Point { x: 1, y: 2.5 });
    }

    #[test]
    fn enums_from_strings_and_class_tags() {
        assert_eq!(from_node::<Color>(&Node::string("blue")).unwrap(), Color::Blue);

        let circle = Node::mapping_from([("radius", Node::float(1.0))])
            .with_tag(Tag::Class("Circle".into()));
        assert_eq!(
            from_node::<Shape>(&circle).unwrap(),
            Shape::Circle(Circle { radius: 1.0 })
        );

        let tagged = Node::mapping_from([(
            "Point",
            Node::mapping_from([("x", Node::int(0)), ("y", Node::float(0.5))]),
        )]);
        assert_eq!(
            from_node::<Shape>(&tagged).unwrap(),
            Shape::Point(Point { x: 0, y: 0.5 })
        );
    }

    #[test]
    fn errors_point_at_the_inner_node() {
        let node = Node::mapping_from([
            ("x", Node::int(300).with_position(Position::Parsed(Location::new(2, 4)))),
            ("y", Node::float(1.0)),
        ])
        .with_position(Position::Parsed(Location::new(1, 1)));

        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Small {
            x: u8,
            y: f64,
        }
        let err = from_node::<Small>(&node).unwrap_err();
        assert_eq!(err.location(), Some(Location::new(2, 4)));
    }

    #[test]
    fn options_and_big_integers() {
        assert_eq!(from_node::<Option<i64>>(&Node::null()).unwrap(), None);
        assert_eq!(from_node::<Option<i64>>(&Node::int(4)).unwrap(), Some(4));
        let big = Node::scalar(ScalarKind::Int, "18446744073709551615");
        assert_eq!(from_node::<u64>(&big).unwrap(), u64::MAX);
        assert!(from_node::<String>(&Node::int(1)).is_err());

        let huge = Node::scalar(ScalarKind::Int, "9".repeat(40));
        let err = from_node::<i64>(&huge).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }
}

//! Serde `Serializer` that builds a [`Node`] tree.
//!
//! Structs whose serde name is a registered class become mappings tagged
//! with that class; enum and string-like classes become tagged strings.
//! Newtype enum variants that wrap a class instance are transparent, so a
//! polymorphic attribute serializes as the instance it holds.

use serde::ser::{self, Serialize};

use crate::error::Error;
use crate::node::{Node, ScalarKind, Tag};
use crate::registry::Registry;
use crate::zmij_format::float_literal;

type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy)]
pub(crate) struct NodeSerializer<'r> {
    registry: &'r Registry,
}

impl<'r> NodeSerializer<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    fn class_tag(&self, name: &str) -> Tag {
        if self.registry.contains(name) {
            Tag::Class(name.to_string())
        } else {
            Tag::Unknown
        }
    }
}

impl<'r> ser::Serializer for NodeSerializer<'r> {
    type Ok = Node;
    type Error = Error;

    type SerializeSeq = SeqBuilder<'r>;
    type SerializeTuple = SeqBuilder<'r>;
    type SerializeTupleStruct = SeqBuilder<'r>;
    type SerializeTupleVariant = VariantBuilder<SeqBuilder<'r>>;
    type SerializeMap = MapBuilder<'r>;
    type SerializeStruct = StructBuilder<'r>;
    type SerializeStructVariant = VariantBuilder<StructBuilder<'r>>;

    fn serialize_bool(self, v: bool) -> Result<Node> {
        Ok(Node::bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Node> {
        Ok(Node::int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Node> {
        Ok(Node::int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Node> {
        Ok(Node::int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Node> {
        Ok(Node::int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Node> {
        Ok(Node::scalar(ScalarKind::Int, v.to_string()))
    }

    fn serialize_u8(self, v: u8) -> Result<Node> {
        Ok(Node::int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Node> {
        Ok(Node::int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Node> {
        Ok(Node::int(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Node> {
        Ok(Node::scalar(ScalarKind::Int, v.to_string()))
    }

    fn serialize_u128(self, v: u128) -> Result<Node> {
        Ok(Node::scalar(ScalarKind::Int, v.to_string()))
    }

    fn serialize_f32(self, v: f32) -> Result<Node> {
        Ok(Node::scalar(ScalarKind::Float, float_literal(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Node> {
        Ok(Node::float(v))
    }

    fn serialize_char(self, v: char) -> Result<Node> {
        Ok(Node::string(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Node> {
        Ok(Node::string(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Node> {
        Ok(Node::sequence(v.iter().map(|b| Node::int((*b).into())).collect()))
    }

    fn serialize_none(self) -> Result<Node> {
        Ok(Node::null())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Node> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Node> {
        Ok(Node::null())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Node> {
        Ok(Node::null())
    }

    /// Enum-like classes are unit variants; they are written as the variant name.
    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Node> {
        Ok(Node::string(variant).with_tag(self.class_tag(name)))
    }

    /// String-like classes are newtypes around their string.
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Node> {
        let node = value.serialize(self)?;
        if node.tag().class().is_some() {
            return Ok(node);
        }
        Ok(node.with_tag(self.class_tag(name)))
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Node> {
        let inner = value.serialize(self)?;
        if inner.tag().class().is_some() {
            Ok(inner)
        } else {
            Ok(Node::mapping_from([(variant, inner)]))
        }
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder<'r>> {
        Ok(SeqBuilder {
            ser: self,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder<'r>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqBuilder<'r>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Ok(VariantBuilder {
            variant,
            inner: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder<'r>> {
        Ok(MapBuilder {
            ser: self,
            entries: Vec::with_capacity(len.unwrap_or(0)),
            key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<StructBuilder<'r>> {
        if !self.registry.contains(name) {
            return Err(Error::configuration(format!(
                "cannot represent struct {name}: it is not a registered class"
            )));
        }
        Ok(StructBuilder {
            ser: self,
            name,
            entries: Vec::with_capacity(len),
        })
    }

    /// A struct variant named after a registered class is that class; any
    /// other struct variant is written as `{variant: {fields}}`.
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Ok(VariantBuilder {
            variant,
            inner: StructBuilder {
                ser: self,
                name: variant,
                entries: Vec::with_capacity(len),
            },
        })
    }
}

pub(crate) struct SeqBuilder<'r> {
    ser: NodeSerializer<'r>,
    items: Vec<Node>,
}

impl ser::SerializeSeq for SeqBuilder<'_> {
    type Ok = Node;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.items.push(value.serialize(self.ser)?);
        Ok(())
    }

    fn end(self) -> Result<Node> {
        Ok(Node::sequence(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder<'_> {
    type Ok = Node;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Node> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqBuilder<'_> {
    type Ok = Node;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Node> {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct MapBuilder<'r> {
    ser: NodeSerializer<'r>,
    entries: Vec<(Node, Node)>,
    key: Option<Node>,
}

impl ser::SerializeMap for MapBuilder<'_> {
    type Ok = Node;
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.key = Some(key.serialize(self.ser)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .key
            .take()
            .ok_or_else(|| Error::representation("map value serialized before its key"))?;
        self.entries.push((key, value.serialize(self.ser)?));
        Ok(())
    }

    fn end(self) -> Result<Node> {
        Ok(Node::mapping(self.entries))
    }
}

pub(crate) struct StructBuilder<'r> {
    ser: NodeSerializer<'r>,
    name: &'static str,
    entries: Vec<(Node, Node)>,
}

impl ser::SerializeStruct for StructBuilder<'_> {
    type Ok = Node;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.entries.push((Node::string(key), value.serialize(self.ser)?));
        Ok(())
    }

    fn end(self) -> Result<Node> {
        Ok(Node::mapping(self.entries).with_tag(self.ser.class_tag(self.name)))
    }
}

pub(crate) struct VariantBuilder<B> {
    variant: &'static str,
    inner: B,
}

impl ser::SerializeTupleVariant for VariantBuilder<SeqBuilder<'_>> {
    type Ok = Node;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(&mut self.inner, value)
    }

    fn end(self) -> Result<Node> {
        let inner = ser::SerializeSeq::end(self.inner)?;
        Ok(Node::mapping_from([(self.variant, inner)]))
    }
}

impl ser::SerializeStructVariant for VariantBuilder<StructBuilder<'_>> {
    type Ok = Node;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        ser::SerializeStruct::serialize_field(&mut self.inner, key, value)
    }

    fn end(self) -> Result<Node> {
        let inner = ser::SerializeStruct::end(self.inner)?;
        if inner.tag().class().is_some() {
            Ok(inner)
        } else {
            Ok(Node::mapping_from([(self.variant, inner)]))
        }
    }
}

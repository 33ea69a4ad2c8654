//! Final checks on a processed tree, and construction of the value.
//!
//! Recognition looked at each class instance from the outside. Here every
//! node tagged with a class is checked once more against the class's
//! declaration: required attributes present, declared attributes of the
//! declared type, no undeclared keys unless the class has an extra slot (in
//! which case they are moved into it). Then serde builds the value.

use std::borrow::Cow;

use ahash::AHashSet;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::de::NodeDeserializer;
use crate::descriptor::Type;
use crate::diagnostics::{Failure, cjoin, diagnose_extraneous_key, diagnose_missing_key};
use crate::error::Error;
use crate::node::{Node, NodeData, ScalarKind};
use crate::parse_scalars::parse_int;
use crate::registry::{ClassEntry, ClassKind, Registry};

pub(crate) struct Constructor<'r> {
    registry: &'r Registry,
}

impl<'r> Constructor<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Validate the processed tree and deserialize it into `T`.
    pub(crate) fn construct<T: DeserializeOwned>(&self, mut node: Node) -> Result<T, Error> {
        self.validate(&mut node)?;
        T::deserialize(NodeDeserializer::new(&node))
    }

    /// Check every class instance in the tree, collecting extra keys into slots.
    pub(crate) fn validate(&self, node: &mut Node) -> Result<(), Error> {
        check_unique_keys(node)?;
        if let Some(name) = node.tag().class().map(str::to_owned) {
            let entry = self.registry.entry(&name)?;
            trace!(class = %name, "validating");
            match entry.kind() {
                ClassKind::Object => self.validate_object(node, entry)?,
                ClassKind::Enum(variants) => validate_enum(node, &name, variants)?,
                ClassKind::StringLike => {}
            }
        }
        match &mut node.data {
            NodeData::Scalar { .. } => {}
            NodeData::Sequence(items) => {
                for item in items {
                    self.validate(item)?;
                }
            }
            NodeData::Mapping(entries) => {
                for (key, value) in entries {
                    self.validate(key)?;
                    self.validate(value)?;
                }
            }
        }
        Ok(())
    }

    fn validate_object(&self, node: &mut Node, entry: &ClassEntry) -> Result<(), Error> {
        let name = entry.name();
        let location = node.location();
        let Some(entries) = node.entries() else {
            return Err(Error::construction(format!(
                "a(n) {name} must be a mapping, but a {} was found; this is probably \
                 something wrong with the class's desugar hook",
                node.shape_name()
            ))
            .with_location(location));
        };

        let got = node.keys();
        for attribute in &entry.attributes {
            let value = entries
                .iter()
                .find(|(k, _)| k.literal() == Some(attribute.name.as_str()))
                .map(|(_, v)| v);
            match value {
                None if attribute.required => {
                    let failure = Failure::at(
                        node.position(),
                        diagnose_missing_key(&attribute.name, &got, &entry.attributes),
                    );
                    return Err(Error::recognition(failure.render(), location));
                }
                None => {}
                Some(value) => {
                    if !self.conforms(value, &attribute.ty) {
                        let failure = Failure::at(
                            value.position(),
                            format!(
                                "Attribute \"{}\" is {}, expected {}",
                                attribute.name,
                                describe_node(value),
                                attribute.ty.describe()
                            ),
                        );
                        return Err(Error::recognition(failure.render(), value.location()));
                    }
                }
            }
        }

        let is_extra = |key: &Node| {
            key.literal()
                .is_none_or(|k| entry.attribute(k).is_none())
        };
        let Some(slot) = entry.spec.extra.as_deref() else {
            if let Some((key, _)) = entries.iter().find(|(k, _)| is_extra(k)) {
                let failure = Failure::at(
                    key.position(),
                    diagnose_extraneous_key(
                        key.literal().unwrap_or_default(),
                        &got,
                        &entry.attributes,
                    ),
                );
                return Err(Error::recognition(failure.render(), key.location()));
            }
            return Ok(());
        };

        let slot = slot.to_string();
        let Some(entries) = node.entries_mut() else {
            return Ok(());
        };
        let (mut extras, declared): (Vec<_>, Vec<_>) =
            std::mem::take(entries).into_iter().partition(|(k, _)| is_extra(k));
        for (key, value) in &mut extras {
            key.strip_tags();
            value.strip_tags();
        }
        *entries = declared;
        entries.push((Node::string(slot), Node::mapping(extras)));
        Ok(())
    }

    /// Whether a processed node fits `ty`.
    fn conforms(&self, node: &Node, ty: &Type) -> bool {
        match ty {
            Type::Scalar(kind) => node.is_scalar_of(*kind),
            Type::BoolFix => node.is_scalar_of(ScalarKind::Bool),
            Type::Union(alternatives) => alternatives.iter().any(|t| self.conforms(node, t)),
            Type::Seq(item) => node
                .items()
                .is_some_and(|items| items.iter().all(|i| self.conforms(i, item))),
            Type::Map(key, value) => node.entries().is_some_and(|entries| {
                entries
                    .iter()
                    .all(|(k, v)| self.conforms(k, key) && self.conforms(v, value))
            }),
            Type::Class(name) => node
                .tag()
                .class()
                .is_some_and(|class| self.registry.is_subclass(class, name)),
            Type::Any | Type::Untyped => true,
        }
    }
}

/// Scalar keys of a mapping must be distinct, whatever the mapping feeds.
fn check_unique_keys(node: &Node) -> Result<(), Error> {
    let Some(entries) = node.entries() else {
        return Ok(());
    };
    let mut seen = AHashSet::with_capacity(entries.len());
    for (key, _) in entries {
        let (Some(kind), Some(literal)) = (key.scalar_kind(), key.literal()) else {
            continue;
        };
        let value: Cow<'_, str> = match kind {
            ScalarKind::Null => Cow::Borrowed(""),
            ScalarKind::Int => parse_int(literal).map_or(Cow::Borrowed(literal), |i| i.to_string().into()),
            _ => Cow::Borrowed(literal),
        };
        if !seen.insert((kind, value)) {
            let failure = Failure::at(
                key.position(),
                format!("Found the key \"{literal}\" more than once"),
            );
            return Err(Error::recognition(failure.render(), key.location()));
        }
    }
    Ok(())
}

fn validate_enum(node: &Node, name: &str, variants: &[String]) -> Result<(), Error> {
    let value = node.as_str().unwrap_or_default();
    if variants.iter().any(|v| v == value) {
        return Ok(());
    }
    let allowed: Vec<String> = variants.iter().map(|v| format!("\"{v}\"")).collect();
    Err(Error::construction(format!(
        "\"{value}\" is not a valid {name}, expected one of {}",
        cjoin("or", &allowed)
    ))
    .with_location(node.location()))
}

fn describe_node(node: &Node) -> String {
    match node.scalar_kind() {
        Some(kind) => format!("a(n) {kind}"),
        None => format!("a {}", node.shape_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Tag;
    use crate::registry::ClassSpec;

    fn tagged(node: Node, class: &str) -> Node {
        node.with_tag(Tag::Class(class.to_string()))
    }

    #[test]
    fn extras_move_into_the_slot_in_order() {
        let specs = [ClassSpec::object("Ext").required::<i64>("a").extra("extra")];
        let registry = Registry::build(&specs, &[]).unwrap();
        let mut node = tagged(
            Node::mapping_from([
                ("z", Node::int(1)),
                ("a", Node::int(2)),
                ("b", Node::int(3).with_tag(Tag::Explicit("!x".into()))),
            ]),
            "Ext",
        );
        Constructor::new(&registry).validate(&mut node).unwrap();
        assert_eq!(node.keys(), ["a", "extra"]);
        let extra = node.get("extra").unwrap();
        assert_eq!(extra.keys(), ["z", "b"]);
        assert_eq!(extra.get("b").unwrap().tag(), &Tag::Unknown);
    }

    #[test]
    fn undeclared_keys_are_rejected_without_a_slot() {
        let specs = [ClassSpec::object("A").required::<i64>("x").optional::<String>("color")];
        let registry = Registry::build(&specs, &[]).unwrap();
        let mut node = tagged(
            Node::mapping_from([("x", Node::int(1)), ("colr", Node::string("red"))]),
            "A",
        );
        let err = Constructor::new(&registry).validate(&mut node).unwrap_err();
        assert!(
            err.to_string().contains("Maybe \"colr\" was intended to be \"color\"?"),
            "{err}"
        );
    }

    #[test]
    fn attribute_types_are_rechecked() {
        let specs = [ClassSpec::object("A").required::<i64>("x")];
        let registry = Registry::build(&specs, &[]).unwrap();
        let mut node = tagged(Node::mapping_from([("x", Node::string("one"))]), "A");
        let err = Constructor::new(&registry).validate(&mut node).unwrap_err();
        assert!(
            err.to_string().contains("Attribute \"x\" is a(n) str, expected an int"),
            "{err}"
        );
    }

    #[test]
    fn enum_values_must_name_a_variant() {
        let specs = [ClassSpec::enumeration("Color", ["red", "green"])];
        let registry = Registry::build(&specs, &[]).unwrap();
        let mut node = tagged(Node::string("purple"), "Color");
        let err = Constructor::new(&registry).validate(&mut node).unwrap_err();
        assert_eq!(
            err.message(),
            "\"purple\" is not a valid Color, expected one of \"red\" or \"green\""
        );
    }

    #[test]
    fn duplicate_attributes_are_rejected() {
        let specs = [ClassSpec::object("A").required::<i64>("x")];
        let registry = Registry::build(&specs, &[]).unwrap();
        let mut node = tagged(
            Node::mapping_from([("x", Node::int(1)), ("x", Node::int(2))]),
            "A",
        );
        let err = Constructor::new(&registry).validate(&mut node).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");
    }

    #[test]
    fn duplicate_keys_in_plain_mappings_are_rejected() {
        let registry = Registry::build(&[], &[]).unwrap();
        let mut node = Node::mapping_from([
            ("a", Node::int(1)),
            ("b", Node::int(2)),
            ("a", Node::int(3)),
        ]);
        let err = Constructor::new(&registry).validate(&mut node).unwrap_err();
        assert!(
            err.to_string().contains("Found the key \"a\" more than once"),
            "{err}"
        );

        let mut hex = Node::mapping(vec![
            (Node::scalar(ScalarKind::Int, "0x10"), Node::int(1)),
            (Node::int(16), Node::int(2)),
        ]);
        let err = Constructor::new(&registry).validate(&mut hex).unwrap_err();
        assert!(err.to_string().contains("Found the key \"16\" more than once"), "{err}");

        let mut distinct = Node::mapping_from([("1", Node::int(1))]);
        if let Some(entries) = distinct.entries_mut() {
            entries.push((Node::int(1), Node::int(2)));
        }
        Constructor::new(&registry).validate(&mut distinct).unwrap();
    }
}

//! Node helpers for desugar and resugar hooks.
//!
//! These methods rewrite a mapping in place: rename keys, add and drop
//! attributes, and convert between the common shorthand layouts for
//! collections of named objects. Nodes created here have a generated
//! position.

use crate::error::HookError;
use crate::location::Position;
use crate::node::{Node, NodeData, ScalarKind, ScalarValue, Tag};

/// Coarse node shape, for [`Node::has_attribute_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Scalar(ScalarKind),
    Sequence,
    Mapping,
}

impl Node {
    /// Value of a scalar node. Integers outside the `i64` range read as `None`.
    pub fn get_value(&self) -> Option<ScalarValue> {
        self.scalar_value()
    }

    /// Turn this node into a scalar holding `value`.
    ///
    /// A class tag survives, so the node is still constructed as that class.
    pub fn set_value(&mut self, value: impl Into<ScalarValue>) {
        let value = value.into();
        self.data = NodeData::Scalar {
            kind: value.kind(),
            literal: value.to_literal(),
        };
        if !matches!(self.tag, Tag::Class(_)) {
            self.tag = Tag::Unknown;
        }
    }

    /// Replace this node with an empty mapping.
    pub fn make_mapping(&mut self) {
        self.data = NodeData::Mapping(Vec::new());
        self.position = Position::Generated;
    }

    /// Whether a sequence or mapping has no items. Scalars are never empty.
    pub fn is_empty(&self) -> bool {
        match &self.data {
            NodeData::Scalar { .. } => false,
            NodeData::Sequence(items) => items.is_empty(),
            NodeData::Mapping(entries) => entries.is_empty(),
        }
    }

    /// Items of a sequence; empty for anything else.
    pub fn seq_items(&self) -> &[Node] {
        self.items().unwrap_or_default()
    }

    fn attribute_index(&self, attribute: &str) -> Option<usize> {
        self.entries()?
            .iter()
            .position(|(k, _)| k.literal() == Some(attribute))
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attribute_index(attribute).is_some()
    }

    /// Whether the attribute exists and has the given shape.
    pub fn has_attribute_type(&self, attribute: &str, ty: NodeType) -> bool {
        let Ok(value) = self.get_attribute(attribute) else {
            return false;
        };
        match ty {
            NodeType::Scalar(kind) => value.is_scalar_of(kind),
            NodeType::Sequence => value.is_sequence(),
            NodeType::Mapping => value.is_mapping(),
        }
    }

    /// The value of an attribute that occurs exactly once.
    pub fn get_attribute(&self, attribute: &str) -> Result<&Node, HookError> {
        let mut matches = self
            .entries()
            .unwrap_or_default()
            .iter()
            .filter(|(k, _)| k.literal() == Some(attribute));
        match (matches.next(), matches.next()) {
            (Some((_, value)), None) => Ok(value),
            _ => Err(not_found(attribute)),
        }
    }

    pub fn get_attribute_mut(&mut self, attribute: &str) -> Result<&mut Node, HookError> {
        let count = self
            .entries()
            .unwrap_or_default()
            .iter()
            .filter(|(k, _)| k.literal() == Some(attribute))
            .count();
        if count != 1 {
            return Err(not_found(attribute));
        }
        self.get_mut(attribute).ok_or_else(|| not_found(attribute))
    }

    /// Set an attribute, replacing its value or appending it at the end.
    pub fn set_attribute(&mut self, attribute: &str, value: impl Into<Node>) -> Result<(), HookError> {
        let value = value.into();
        let index = self.attribute_index(attribute);
        let Some(entries) = self.entries_mut() else {
            return Err(HookError::new(format!(
                "Cannot set attribute \"{attribute}\" on a node that is not a mapping"
            )));
        };
        match index {
            Some(i) => entries[i].1 = value,
            None => entries.push((Node::string(attribute), value)),
        }
        Ok(())
    }

    /// Remove an attribute, returning its value. Missing attributes are ignored.
    pub fn remove_attribute(&mut self, attribute: &str) -> Option<Node> {
        let index = self.attribute_index(attribute)?;
        let entries = self.entries_mut()?;
        Some(entries.remove(index).1)
    }

    /// Rename the first key reading `attribute`. Does nothing if there is none.
    pub fn rename_attribute(&mut self, attribute: &str, new_name: &str) {
        let Some(index) = self.attribute_index(attribute) else {
            return;
        };
        if let Some(entries) = self.entries_mut()
            && let NodeData::Scalar { literal, .. } = &mut entries[index].0.data
        {
            *literal = new_name.to_string();
        }
    }

    /// Drop attributes whose scalar value equals the given default.
    pub fn remove_attributes_with_default_values(&mut self, defaults: &[(&str, ScalarValue)]) {
        for (attribute, default) in defaults {
            let is_default = self.get_attribute(attribute).is_ok_and(|value| {
                value.is_scalar_of(default.kind()) && value.scalar_value().as_ref() == Some(default)
            });
            if is_default {
                self.remove_attribute(attribute);
            }
        }
    }

    pub fn unders_to_dashes_in_keys(&mut self) {
        self.rewrite_keys(|k| k.replace('_', "-"));
    }

    pub fn dashes_to_unders_in_keys(&mut self) {
        self.rewrite_keys(|k| k.replace('-', "_"));
    }

    fn rewrite_keys(&mut self, f: impl Fn(&str) -> String) {
        for (key, _) in self.entries_mut().into_iter().flatten() {
            if let NodeData::Scalar {
                kind: ScalarKind::Str,
                literal,
            } = &mut key.data
            {
                *literal = f(literal);
            }
        }
    }

    /// Turn a sequence of mappings into a mapping keyed by `key_attribute`.
    ///
    /// ```yaml
    /// items:                        items:
    /// - id: a                         a:
    ///   price: 1          =>            price: 1
    /// ```
    ///
    /// With `value_attribute`, items reduced to only that attribute are
    /// replaced by its value. Does nothing if the attribute is missing or not
    /// a sequence. Duplicate keys are an error if `strict`, and otherwise
    /// leave the node unchanged.
    pub fn seq_attribute_to_map(
        &mut self,
        attribute: &str,
        key_attribute: &str,
        value_attribute: Option<&str>,
        strict: bool,
    ) -> Result<(), HookError> {
        let Ok(attr_node) = self.get_attribute(attribute) else {
            return Ok(());
        };
        let Some(items) = attr_node.items() else {
            return Ok(());
        };

        let mut seen: Vec<&str> = Vec::with_capacity(items.len());
        for item in items {
            let key = item.get_attribute(key_attribute)?;
            let Some(key) = key.as_str() else {
                return Err(HookError::new("Expected a string here"));
            };
            if seen.contains(&key) {
                if strict {
                    return Err(HookError::new(format!(
                        "Found a duplicate key \"{key_attribute}\": {key} when converting from \
                         sequence to mapping"
                    )));
                }
                return Ok(());
            }
            seen.push(key);
        }

        let position = attr_node.position();
        let items = match self.remove_attribute_in_place(attribute) {
            Some(NodeData::Sequence(items)) => items,
            _ => return Ok(()),
        };
        let mut entries = Vec::with_capacity(items.len());
        for mut item in items {
            let Some(key) = item.remove_attribute(key_attribute) else {
                continue;
            };
            let short_value = value_attribute
                .filter(|v| item.entries().is_some_and(|e| e.len() == 1) && item.has_attribute(v))
                .and_then(|v| item.remove_attribute(v));
            entries.push((key, short_value.unwrap_or(item)));
        }
        self.set_attribute(
            attribute,
            Node::mapping(entries).with_position(position),
        )
    }

    /// Turn a mapping into a sequence of mappings, adding each key as `key_attribute`.
    ///
    /// Values that are not mappings are wrapped as `{value_attribute: value}`;
    /// without `value_attribute` such a value leaves the node unchanged.
    pub fn map_attribute_to_seq(&mut self, attribute: &str, key_attribute: &str, value_attribute: Option<&str>) {
        let Ok(attr_node) = self.get_attribute(attribute) else {
            return;
        };
        let Some(entries) = attr_node.entries() else {
            return;
        };
        if value_attribute.is_none() && entries.iter().any(|(_, v)| !v.is_mapping()) {
            return;
        }
        let position = attr_node.position();
        let entries = match self.remove_attribute_in_place(attribute) {
            Some(NodeData::Mapping(entries)) => entries,
            _ => return,
        };

        let mut items = Vec::with_capacity(entries.len());
        for (key, mut value) in entries {
            if !value.is_mapping()
                && let Some(value_attribute) = value_attribute
            {
                value = Node::mapping(vec![(Node::string(value_attribute), value)]);
            }
            let key = Node::string(key.literal().unwrap_or_default());
            if let Some(fields) = value.entries_mut() {
                match fields.iter().position(|(k, _)| k.literal() == Some(key_attribute)) {
                    Some(i) => fields[i].1 = key,
                    None => fields.push((Node::string(key_attribute), key)),
                }
            }
            items.push(value);
        }
        // The attribute was emptied above, so it is known to be present.
        let _ = self.set_attribute(attribute, Node::sequence(items).with_position(position));
    }

    /// Drop the redundant `key_attribute` from each value of an index.
    ///
    /// An index is a mapping of mappings whose outer keys repeat an
    /// attribute of the inner mappings. If only `value_attribute` remains in
    /// an inner mapping, that mapping is replaced by its value.
    pub fn index_attribute_to_map(
        &mut self,
        attribute: &str,
        key_attribute: &str,
        value_attribute: Option<&str>,
    ) -> Result<(), HookError> {
        let Ok(attr_node) = self.get_attribute_mut(attribute) else {
            return Ok(());
        };
        let Some(entries) = attr_node.entries_mut() else {
            return Ok(());
        };
        if entries.iter().any(|(_, v)| !v.is_mapping()) {
            return Err(HookError::new(format!(
                "Values must be mappings for key \"{attribute}\""
            )));
        }
        for (_, value) in entries.iter_mut() {
            let Some(fields) = value.entries_mut() else {
                continue;
            };
            fields.retain(|(k, _)| k.literal() != Some(key_attribute));
            if fields.len() == 1 && value_attribute.is_some() && fields[0].0.literal() == value_attribute {
                if let Some((_, inner)) = fields.pop() {
                    *value = inner;
                }
            }
        }
        Ok(())
    }

    /// Expand an index written in shorthand: add each outer key to its value as
    /// `key_attribute`, wrapping non-mapping values as `{value_attribute: value}`.
    pub fn map_attribute_to_index(
        &mut self,
        attribute: &str,
        key_attribute: &str,
        value_attribute: Option<&str>,
    ) {
        let Ok(attr_node) = self.get_attribute_mut(attribute) else {
            return;
        };
        let Some(entries) = attr_node.entries_mut() else {
            return;
        };
        for (key, value) in entries.iter_mut() {
            if !value.is_mapping()
                && let Some(value_attribute) = value_attribute
            {
                let position = value.position();
                let inner = std::mem::replace(value, Node::null());
                *value = Node::mapping(vec![(
                    Node::string(value_attribute).with_position(position),
                    inner,
                )])
                .with_position(position);
            }
            if let Some(fields) = value.entries_mut() {
                let key_key = Node::string(key_attribute).with_position(key.position());
                fields.push((key_key, key.clone().with_tag(Tag::Unknown)));
            }
        }
    }

    /// Take the data out of an attribute's value, leaving it an empty mapping.
    fn remove_attribute_in_place(&mut self, attribute: &str) -> Option<NodeData> {
        let value = self.get_mut(attribute)?;
        Some(std::mem::replace(&mut value.data, NodeData::Mapping(Vec::new())))
    }
}

fn not_found(attribute: &str) -> HookError {
    HookError::new(format!("Key not found, or found multiple times: {attribute}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(pairs: &[(&str, &str, f64)]) -> Node {
        Node::sequence(
            pairs
                .iter()
                .map(|(id, desc, price)| {
                    Node::mapping_from([
                        ("item_id", Node::string(*id)),
                        ("description", Node::string(*desc)),
                        ("price", Node::float(*price)),
                    ])
                })
                .collect(),
        )
    }

    #[test]
    fn set_value_keeps_class_tags_only() {
        let mut node = Node::string("x").with_tag(Tag::Class("Postcode".into()));
        node.set_value(3);
        assert_eq!(node, Node::int(3));
        assert_eq!(node.tag(), &Tag::Class("Postcode".into()));

        let mut node = Node::string("x").with_tag(Tag::Explicit("!Foo".into()));
        node.set_value(true);
        assert_eq!(node.tag(), &Tag::Unknown);
        assert_eq!(node.get_value(), Some(ScalarValue::Bool(true)));
    }

    #[test]
    fn attributes_are_set_renamed_and_removed() {
        let mut node = Node::mapping_from([("a", Node::int(1)), ("b", Node::int(2))]);
        node.set_attribute("a", 10).unwrap();
        node.set_attribute("c", "x").unwrap();
        assert_eq!(node.keys(), ["a", "b", "c"]);
        assert_eq!(node.get_attribute("a").unwrap(), &Node::int(10));
        assert!(node.get_attribute("c").unwrap().position().is_generated());

        node.rename_attribute("b", "bee");
        assert!(node.has_attribute("bee"));
        assert!(node.has_attribute_type("bee", NodeType::Scalar(ScalarKind::Int)));
        assert!(!node.has_attribute_type("bee", NodeType::Mapping));

        assert_eq!(node.remove_attribute("bee"), Some(Node::int(2)));
        assert_eq!(node.remove_attribute("bee"), None);

        let err = Node::int(1).set_attribute("a", 1).unwrap_err();
        assert!(err.message().contains("not a mapping"));
    }

    #[test]
    fn duplicated_attributes_are_not_found() {
        let node = Node::mapping_from([("a", Node::int(1)), ("a", Node::int(2))]);
        assert_eq!(
            node.get_attribute("a").unwrap_err().message(),
            "Key not found, or found multiple times: a"
        );
    }

    #[test]
    fn defaults_are_dropped() {
        let mut node = Node::mapping_from([
            ("a", Node::null()),
            ("b", Node::int(40)),
            ("c", Node::int(41)),
        ]);
        node.remove_attributes_with_default_values(&[
            ("a", ScalarValue::Null),
            ("b", ScalarValue::Int(40)),
            ("c", ScalarValue::Int(40)),
        ]);
        assert_eq!(node.keys(), ["c"]);
    }

    #[test]
    fn key_style_conversion() {
        let mut node = Node::mapping_from([("max_size", Node::int(1)), ("x-y", Node::int(2))]);
        node.unders_to_dashes_in_keys();
        assert_eq!(node.keys(), ["max-size", "x-y"]);
        node.dashes_to_unders_in_keys();
        assert_eq!(node.keys(), ["max_size", "x_y"]);
    }

    #[test]
    fn sequence_to_map_and_back() {
        let mut node = Node::mapping_from([(
            "items",
            items(&[("item1", "Basic widget", 100.0), ("item2", "Premium", 200.0)]),
        )]);
        node.seq_attribute_to_map("items", "item_id", None, true).unwrap();
        let map = node.get_attribute("items").unwrap();
        assert_eq!(map.keys(), ["item1", "item2"]);
        assert_eq!(
            map.get("item1").unwrap().keys(),
            ["description", "price"]
        );

        node.map_attribute_to_seq("items", "item_id", None);
        let seq = node.get_attribute("items").unwrap().seq_items();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].keys(), ["description", "price", "item_id"]);
        assert_eq!(seq[1].get("item_id"), Some(&Node::string("item2")));
    }

    #[test]
    fn sequence_to_map_short_form() {
        let mut node = Node::mapping_from([(
            "items",
            Node::sequence(vec![
                Node::mapping_from([("id", Node::string("a")), ("desc", Node::string("A"))]),
                Node::mapping_from([
                    ("id", Node::string("b")),
                    ("desc", Node::string("B")),
                    ("price", Node::int(2)),
                ]),
            ]),
        )]);
        node.seq_attribute_to_map("items", "id", Some("desc"), true).unwrap();
        let map = node.get_attribute("items").unwrap();
        assert_eq!(map.get("a"), Some(&Node::string("A")));
        assert!(map.get("b").unwrap().is_mapping());
    }

    #[test]
    fn sequence_to_map_duplicate_keys() {
        let dup = items(&[("x", "1", 1.0), ("x", "2", 2.0)]);
        let mut strict = Node::mapping_from([("items", dup.clone())]);
        let err = strict.seq_attribute_to_map("items", "item_id", None, true).unwrap_err();
        assert_eq!(
            err.message(),
            "Found a duplicate key \"item_id\": x when converting from sequence to mapping"
        );

        let mut lenient = Node::mapping_from([("items", dup.clone())]);
        lenient.seq_attribute_to_map("items", "item_id", None, false).unwrap();
        assert_eq!(lenient.get_attribute("items").unwrap(), &dup);
    }

    #[test]
    fn map_to_seq_wraps_plain_values() {
        let mut node = Node::mapping_from([(
            "items",
            Node::mapping_from([
                ("item1", Node::string("Basic widget")),
                ("item2", Node::mapping_from([("description", Node::string("Premium"))])),
            ]),
        )]);
        let before = node.clone();
        node.map_attribute_to_seq("items", "item_id", None);
        assert_eq!(node, before);

        node.map_attribute_to_seq("items", "item_id", Some("description"));
        let seq = node.get_attribute("items").unwrap().seq_items();
        assert_eq!(seq[0].keys(), ["description", "item_id"]);
        assert_eq!(seq[0].get("description"), Some(&Node::string("Basic widget")));
    }

    #[test]
    fn index_round_trip() {
        let mut node = Node::mapping_from([(
            "employees",
            Node::mapping_from([
                ("Mary", Node::string("Director")),
                (
                    "Vishnu",
                    Node::mapping_from([("role", Node::string("Sales")), ("hours", Node::int(20))]),
                ),
            ]),
        )]);
        node.map_attribute_to_index("employees", "name", Some("role"));
        let employees = node.get_attribute("employees").unwrap();
        assert_eq!(employees.get("Mary").unwrap().keys(), ["role", "name"]);
        assert_eq!(
            employees.get("Vishnu").unwrap().get("name"),
            Some(&Node::string("Vishnu"))
        );

        node.index_attribute_to_map("employees", "name", Some("role")).unwrap();
        let employees = node.get_attribute("employees").unwrap();
        assert_eq!(employees.get("Mary"), Some(&Node::string("Director")));
        assert_eq!(employees.get("Vishnu").unwrap().keys(), ["role", "hours"]);
    }

    #[test]
    fn index_values_must_be_mappings() {
        let mut node = Node::mapping_from([("idx", Node::mapping_from([("a", Node::int(1))]))]);
        let err = node.index_attribute_to_map("idx", "name", None).unwrap_err();
        assert_eq!(err.message(), "Values must be mappings for key \"idx\"");
    }
}

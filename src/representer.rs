//! Turning serialized values into canonical, then resugared, node trees.
//!
//! The node serializer gives us one mapping per class instance holding
//! every serde field. Here those mappings are cut down to the declared
//! attributes, the overflow slot is spread back into top-level keys, and
//! the resugar hooks of each class run from the most basic class down.

use tracing::debug;

use crate::error::Error;
use crate::node::{Node, NodeData, ScalarKind, Tag};
use crate::registry::{ClassEntry, ClassKind, Registry};

pub(crate) struct Representer<'r> {
    registry: &'r Registry,
}

impl<'r> Representer<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Represent a serialized tree, children before their parents.
    pub(crate) fn represent(&self, node: &mut Node) -> Result<(), Error> {
        match &mut node.data {
            NodeData::Scalar { .. } => {}
            NodeData::Sequence(items) => {
                for item in items {
                    self.represent(item)?;
                }
            }
            NodeData::Mapping(entries) => {
                for (key, value) in entries {
                    self.represent(key)?;
                    self.represent(value)?;
                }
            }
        }

        let Some(name) = node.tag().class().map(str::to_owned) else {
            return Ok(());
        };
        let entry = self.registry.entry(&name)?;
        match entry.kind() {
            ClassKind::Object => filter_attributes(node, entry)?,
            ClassKind::Enum(_) | ClassKind::StringLike => {
                if !node.is_scalar_of(ScalarKind::Str) {
                    return Err(Error::configuration(format!(
                        "{name} must serialize to a string, but it gave a {}",
                        node.shape_name()
                    )));
                }
            }
        }
        self.resugar(node, entry)
    }

    fn resugar(&self, node: &mut Node, entry: &ClassEntry) -> Result<(), Error> {
        for class in &entry.lineage {
            let Some(hook) = self.registry.entry(class)?.spec.hooks.resugar else {
                continue;
            };
            debug!(class = %class, "running resugar hook");
            hook(node).map_err(|err| Error::hook(err, node.location()))?;
            check_representable(node, class)?;
        }
        Ok(())
    }
}

/// Keep the declared attributes in field order and spread the overflow slot after them.
fn filter_attributes(node: &mut Node, entry: &ClassEntry) -> Result<(), Error> {
    let name = entry.name();
    let slot = entry.spec.extra.as_deref();
    let Some(entries) = node.entries_mut() else {
        return Err(Error::configuration(format!(
            "{name} must serialize to a mapping of its attributes"
        )));
    };

    let mut extras = None;
    let mut kept = Vec::with_capacity(entries.len());
    for (key, value) in std::mem::take(entries) {
        match key.literal() {
            Some(k) if Some(k) == slot => extras = Some(value),
            Some(k) if entry.attribute(k).is_some() => kept.push((key, value)),
            _ => debug!(class = %name, key = ?key.literal(), "dropping undeclared field"),
        }
    }

    if let Some(slot) = slot {
        let Some(extras) = extras else {
            return Err(Error::configuration(format!(
                "{name} declares the overflow slot \"{slot}\", but it has no such field"
            )));
        };
        let shape = extras.shape_name();
        match extras.data {
            NodeData::Mapping(extra_entries) => kept.extend(extra_entries),
            NodeData::Scalar {
                kind: ScalarKind::Null,
                ..
            } => {}
            _ => {
                return Err(Error::configuration(format!(
                    "the overflow slot \"{slot}\" of {name} must hold a mapping, but it is a {shape}"
                )));
            }
        }
    }
    *entries = kept;
    Ok(())
}

fn check_representable(node: &Node, class: &str) -> Result<(), Error> {
    let Some(entries) = node.entries() else {
        return Ok(());
    };
    if let Some((key, _)) = entries.iter().find(|(k, _)| !k.is_scalar()) {
        return Err(Error::Hook {
            msg: format!(
                "the resugar hook of {class} produced a mapping key that is a {}, keys must be scalars",
                key.shape_name()
            ),
            location: node.location(),
        });
    }
    Ok(())
}

/// Drop class tags before emitting; the output format carries none.
pub(crate) fn untag(node: &mut Node) {
    if matches!(node.tag(), Tag::Class(_)) {
        node.set_tag(Tag::Unknown);
    }
    match &mut node.data {
        NodeData::Scalar { .. } => {}
        NodeData::Sequence(items) => items.iter_mut().for_each(untag),
        NodeData::Mapping(entries) => {
            for (key, value) in entries {
                untag(key);
                untag(value);
            }
        }
    }
}

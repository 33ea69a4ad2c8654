//! Recognize-then-desugar pass over a parsed document.
//!
//! Each node is recognized against its expected type, rewritten by the
//! desugar hooks of the recognized class (most basic class first), and then
//! its attributes are processed against their declared types. Afterwards
//! every class instance carries a [`Tag::Class`] naming its concrete class.

use tracing::{debug, trace};

use crate::descriptor::Type;
use crate::error::Error;
use crate::node::{Node, ScalarKind, Tag};
use crate::recognizer::Recognizer;
use crate::registry::{ClassKind, Registry};

pub(crate) struct Processor<'r> {
    registry: &'r Registry,
    recognizer: Recognizer<'r>,
}

impl<'r> Processor<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            recognizer: Recognizer::new(registry),
        }
    }

    /// Recognize `node` as `expected` and bring it into canonical form.
    pub(crate) fn process(&self, node: &mut Node, expected: &Type) -> Result<(), Error> {
        let recognition = self.recognizer.recognize(node, expected)?;
        let Some(concrete) = recognition.unique().cloned() else {
            let location = recognition
                .failure
                .first_location()
                .unwrap_or_else(|| node.location());
            return Err(Error::recognition(recognition.failure.render(), location));
        };
        trace!(%expected, %concrete, "recognized");

        match &concrete {
            Type::Class(name) => self.process_class(node, name),
            Type::Seq(item_type) => {
                for item in node.items_mut().into_iter().flatten() {
                    self.process(item, item_type)?;
                }
                node.set_tag(Tag::Unknown);
                Ok(())
            }
            Type::Map(key_type, value_type) => {
                for (key, value) in node.entries_mut().into_iter().flatten() {
                    self.process(key, key_type)?;
                    self.process(value, value_type)?;
                }
                node.set_tag(Tag::Unknown);
                Ok(())
            }
            Type::Any | Type::Untyped => {
                node.strip_tags();
                Ok(())
            }
            Type::Scalar(_) | Type::BoolFix | Type::Union(_) => {
                node.set_tag(Tag::Unknown);
                Ok(())
            }
        }
    }

    fn process_class(&self, node: &mut Node, name: &str) -> Result<(), Error> {
        let entry = self.registry.entry(name)?;
        let location = node.location();

        for class in &entry.lineage {
            let Some(hook) = self.registry.entry(class)?.spec.hooks.desugar else {
                continue;
            };
            debug!(class = %class, %location, "running desugar hook");
            hook(node).map_err(|err| Error::hook(err, location))?;
        }

        match entry.kind() {
            ClassKind::Object => {
                let Some(entries) = node.entries_mut() else {
                    return Err(Error::Hook {
                        msg: format!(
                            "after desugaring, a(n) {name} must be a mapping, but it is a {}",
                            node.shape_name()
                        ),
                        location,
                    });
                };
                for attribute in &entry.attributes {
                    let dashed = attribute.name.replace('_', "-");
                    if dashed == attribute.name
                        || entries.iter().any(|(k, _)| k.literal() == Some(attribute.name.as_str()))
                    {
                        continue;
                    }
                    if let Some((key, _)) = entries.iter_mut().find(|(k, _)| k.literal() == Some(dashed.as_str())) {
                        *key = Node::string(&attribute.name).with_position(key.position());
                    }
                }
                for (key, value) in entries.iter_mut() {
                    let Some(attribute) = key.literal().and_then(|k| entry.attribute(k)) else {
                        continue;
                    };
                    self.process(value, &attribute.ty)?;
                }
            }
            ClassKind::Enum(_) | ClassKind::StringLike => {
                if !node.is_scalar_of(ScalarKind::Str) {
                    return Err(Error::Hook {
                        msg: format!(
                            "after desugaring, a(n) {name} must be a string, but it is a {}",
                            node.shape_name()
                        ),
                        location,
                    });
                }
            }
        }

        node.set_tag(Tag::Class(name.to_string()));
        Ok(())
    }
}

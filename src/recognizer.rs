//! Type-directed recognition.
//!
//! Given a node and the type it is expected to have, the recognizer works out
//! which concrete types the node could be. Exactly one answer means the node
//! is usable; none or several come with a [`Failure`] tree explaining why.
//! Recognition only reads the tree; it never rewrites it.

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::descriptor::Type;
use crate::diagnostics::{Failure, cjoin, diagnose_missing_key};
use crate::error::Error;
use crate::node::{Node, ScalarKind, Tag};
use crate::probe::Probe;
use crate::registry::{ClassEntry, ClassKind, Registry};
use crate::tags::{class_name_of, is_core_tag};

/// Result of recognizing one node.
#[derive(Clone, Debug)]
pub struct Recognition {
    /// Candidate types, in the order they were found.
    pub types: IndexSet<Type>,
    /// Why nothing (or more than one thing) matched. Empty on a unique match.
    pub failure: Failure,
}

impl Recognition {
    fn matched(ty: Type) -> Self {
        let mut types = IndexSet::with_capacity(1);
        types.insert(ty);
        Self {
            types,
            failure: Failure::default(),
        }
    }

    fn failed(failure: Failure) -> Self {
        Self {
            types: IndexSet::new(),
            failure,
        }
    }

    /// The single type recognized, if recognition was unambiguous.
    pub fn unique(&self) -> Option<&Type> {
        match self.types.len() {
            1 => self.types.first(),
            _ => None,
        }
    }
}

pub(crate) struct Recognizer<'r> {
    registry: &'r Registry,
}

impl<'r> Recognizer<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Work out which types `node` could be, given that it should be `expected`.
    ///
    /// Fails only on schema errors; a node that does not fit is an `Ok` with
    /// no candidates.
    pub(crate) fn recognize(&self, node: &Node, expected: &Type) -> Result<Recognition, Error> {
        trace!(%expected, shape = node.shape_name(), "recognizing");
        match expected {
            Type::Scalar(kind) => Ok(self.recognize_scalar(node, *kind, expected)),
            Type::BoolFix => Ok(self.recognize_scalar(node, ScalarKind::Bool, expected)),
            Type::Any | Type::Untyped => Ok(Recognition::matched(expected.clone())),
            Type::Union(alternatives) => self.recognize_union(node, alternatives),
            Type::Seq(item) => self.recognize_seq(node, expected, item),
            Type::Map(key, value) => self.recognize_map(node, expected, key, value),
            Type::Class(name) => {
                if !self.registry.contains(name) {
                    return Err(Error::configuration(format!(
                        "could not recognize for type {name}, is it registered?"
                    )));
                }
                self.recognize_user_classes(node, name, true)
            }
        }
    }

    fn recognize_scalar(&self, node: &Node, kind: ScalarKind, expected: &Type) -> Recognition {
        if let Tag::Explicit(tag) = node.tag() {
            return Recognition::failed(Failure::at(
                node.position(),
                format!("Expected {}, but found a node tagged {tag}", expected.describe()),
            ));
        }
        if node.is_scalar_of(kind) {
            Recognition::matched(expected.clone())
        } else {
            Recognition::failed(Failure::at(
                node.position(),
                format!("Expected {}", expected.describe()),
            ))
        }
    }

    fn recognize_union(&self, node: &Node, alternatives: &[Type]) -> Result<Recognition, Error> {
        let mut types = IndexSet::new();
        let mut causes = Vec::new();
        for alternative in alternatives {
            let recognition = self.recognize(node, alternative)?;
            if recognition.types.is_empty() {
                causes.push(recognition.failure);
            } else {
                types.extend(recognition.types);
            }
        }

        if types.contains(&Type::BOOL) && types.contains(&Type::BoolFix) {
            types.shift_remove(&Type::BoolFix);
        }

        match types.len() {
            0 => Ok(Recognition::failed(
                Failure::at(
                    node.position(),
                    "Expected one of the following types, but failed to match all of them:",
                )
                .with_causes(causes),
            )),
            1 => Ok(Recognition {
                types,
                failure: Failure::default(),
            }),
            _ => {
                let failure = ambiguity(node, &types);
                Ok(Recognition { types, failure })
            }
        }
    }

    fn recognize_seq(&self, node: &Node, expected: &Type, item_type: &Type) -> Result<Recognition, Error> {
        let Some(items) = node.items() else {
            return Ok(Recognition::failed(Failure::at(
                node.position(),
                format!("Expected {}", expected.describe()),
            )));
        };
        for item in items {
            let recognition = self.recognize(item, item_type)?;
            match recognition.types.len() {
                0 => {
                    return Ok(Recognition::failed(
                        Failure::at(item.position(), format!("Expected {}", expected.describe()))
                            .with_cause(recognition.failure),
                    ));
                }
                1 => {}
                _ => {
                    return Ok(Recognition {
                        types: recognition.types.into_iter().map(Type::seq).collect(),
                        failure: recognition.failure,
                    });
                }
            }
        }
        Ok(Recognition::matched(expected.clone()))
    }

    fn recognize_map(
        &self,
        node: &Node,
        expected: &Type,
        key_type: &Type,
        value_type: &Type,
    ) -> Result<Recognition, Error> {
        if !self.registry.is_string_like(key_type) {
            return Err(Error::configuration(format!(
                "mapping keys must be strings, but {key_type} was given"
            )));
        }
        let Some(entries) = node.entries() else {
            return Ok(Recognition::failed(Failure::at(
                node.position(),
                "Expected a dict/mapping here",
            )));
        };
        for (key, value) in entries {
            let recognition = self.recognize(key, key_type)?;
            match recognition.types.len() {
                0 => {
                    return Ok(Recognition::failed(
                        Failure::at(key.position(), format!("Expected {}", expected.describe()))
                            .with_cause(recognition.failure),
                    ));
                }
                1 => {}
                _ => {
                    return Ok(Recognition {
                        types: recognition
                            .types
                            .into_iter()
                            .map(|t| Type::map(t, value_type.clone()))
                            .collect(),
                        failure: recognition.failure,
                    });
                }
            }

            let recognition = self.recognize(value, value_type)?;
            match recognition.types.len() {
                0 => {
                    return Ok(Recognition::failed(
                        Failure::at(value.position(), format!("Expected {}", expected.describe()))
                            .with_cause(recognition.failure),
                    ));
                }
                1 => {}
                _ => {
                    return Ok(Recognition {
                        types: recognition
                            .types
                            .into_iter()
                            .map(|t| Type::map(key_type.clone(), t))
                            .collect(),
                        failure: recognition.failure,
                    });
                }
            }
        }
        Ok(Recognition::matched(expected.clone()))
    }

    /// Recognize `name` or any registered subclass of it.
    ///
    /// Subclasses are tried first; the class itself only gets a chance when
    /// none of them matched and it is not abstract.
    fn recognize_user_classes(&self, node: &Node, name: &str, top: bool) -> Result<Recognition, Error> {
        let entry = self.registry.entry(name)?;
        let mut types = IndexSet::new();
        let mut causes = Vec::new();

        for subclass in &entry.subclasses {
            let recognition = self.recognize_user_classes(node, subclass, false)?;
            if recognition.types.is_empty() {
                causes.push(recognition.failure);
            } else {
                types.extend(recognition.types);
            }
        }

        if types.is_empty() {
            if entry.spec.is_abstract {
                debug!(class = name, "not considering abstract class");
            } else {
                let recognition = self.recognize_class(node, entry)?;
                if recognition.types.is_empty() {
                    causes.push(recognition.failure);
                } else {
                    types.extend(recognition.types);
                }
            }
        }

        if types.is_empty() {
            let message = format!("Failed to recognize a(n) {name}");
            let failure = if top {
                Failure::at(node.position(), message)
            } else {
                Failure::new(message)
            };
            return Ok(Recognition::failed(failure.with_causes(causes)));
        }

        if types.len() > 1 {
            if let Some(claimed) = node.tag().explicit_class() {
                let claimed = Type::class(claimed);
                if types.contains(&claimed) {
                    return Ok(Recognition::matched(claimed));
                }
            }
            let failure = ambiguity(node, &types);
            return Ok(Recognition { types, failure });
        }

        if let Tag::Explicit(tag) = node.tag()
            && !is_core_tag(tag)
        {
            let found = &types[0];
            let claimed = class_name_of(tag).filter(|c| self.registry.contains(c));
            match claimed {
                Some(claimed) if !types.contains(&Type::class(claimed)) => {
                    return Ok(Recognition::failed(Failure::at(
                        node.position(),
                        format!(
                            "Expected {} and found it, but there's a tag here claiming this \
                             is a(n) {claimed}. That makes no sense.",
                            found.describe()
                        ),
                    )));
                }
                Some(_) => {}
                None => {
                    return Ok(Recognition::failed(Failure::at(
                        node.position(),
                        format!(
                            "Expected {} and found it, but there's a tag here claiming this \
                             is a(n) {tag}, which type I don't know.",
                            found.describe()
                        ),
                    )));
                }
            }
        }

        Ok(Recognition { types, failure: Failure::default() })
    }

    /// Recognize exactly the class `entry`, ignoring its subclasses.
    fn recognize_class(&self, node: &Node, entry: &ClassEntry) -> Result<Recognition, Error> {
        let name = entry.name();
        if let Some(hook) = entry.spec.hooks.recognize {
            let probe = Probe::new(self, node);
            let outcome = hook(&probe);
            if let Some(err) = probe.take_config_error() {
                return Err(err);
            }
            return Ok(match outcome {
                Ok(()) => Recognition::matched(Type::class(name)),
                Err(err) => {
                    debug!(class = name, reason = err.message(), "recognize hook declined");
                    Recognition::failed(Failure::at(node.position(), err.message()))
                }
            });
        }

        match entry.kind() {
            ClassKind::Enum(_) | ClassKind::StringLike => {
                if node.is_scalar_of(ScalarKind::Str) {
                    Ok(Recognition::matched(Type::class(name)))
                } else {
                    Ok(Recognition::failed(Failure::at(
                        node.position(),
                        format!("Expected a string matching a(n) {name}"),
                    )))
                }
            }
            ClassKind::Object => self.recognize_attributes(node, entry),
        }
    }

    fn recognize_attributes(&self, node: &Node, entry: &ClassEntry) -> Result<Recognition, Error> {
        let Some(entries) = node.entries() else {
            let required: Vec<String> = entry
                .attributes
                .iter()
                .filter(|a| a.required)
                .map(|a| format!("\"{}\"", a.name))
                .collect();
            let message = if required.is_empty() {
                "Expected a dict/mapping here".to_string()
            } else {
                format!("Expected a dict/mapping here with keys {}", cjoin("and", &required))
            };
            return Ok(Recognition::failed(Failure::at(node.position(), message)));
        };

        let got = node.keys();
        for attribute in &entry.attributes {
            let dashed = attribute.name.replace('_', "-");
            let found = entries.iter().find(|(k, _)| {
                k.literal()
                    .is_some_and(|k| k == attribute.name || k == dashed)
            });
            match found {
                Some((key, value)) => {
                    let recognition = self.recognize(value, &attribute.ty)?;
                    // Ambiguous attributes pass here; processing the attribute reports them.
                    if recognition.types.is_empty() {
                        return Ok(Recognition::failed(
                            Failure::at(
                                key.position(),
                                format!(
                                    "Error in attribute \"{}\"",
                                    key.literal().unwrap_or_default()
                                ),
                            )
                            .with_cause(recognition.failure),
                        ));
                    }
                }
                None if attribute.required => {
                    return Ok(Recognition::failed(Failure::at(
                        node.position(),
                        diagnose_missing_key(&attribute.name, &got, &entry.attributes),
                    )));
                }
                None => {}
            }
        }
        Ok(Recognition::matched(Type::class(entry.name())))
    }
}

fn ambiguity(node: &Node, types: &IndexSet<Type>) -> Failure {
    Failure::at(
        node.position(),
        format!(
            "Could not determine which of the following types this is: {}",
            cjoin("or", types.iter().map(Type::describe))
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{Location, Position};
    use crate::registry::ClassSpec;

    fn registry(specs: &[ClassSpec]) -> Registry {
        Registry::build(specs, &[]).unwrap()
    }

    fn types(r: &Recognition) -> Vec<Type> {
        r.types.iter().cloned().collect()
    }

    #[test]
    fn scalars_are_exact() {
        let registry = Registry::default();
        let recognizer = Recognizer::new(&registry);
        let r = recognizer.recognize(&Node::int(1), &Type::FLOAT).unwrap();
        assert!(r.types.is_empty());
        assert_eq!(r.failure.message, "Expected a float");
        let r = recognizer.recognize(&Node::float(1.0), &Type::FLOAT).unwrap();
        assert_eq!(types(&r), [Type::FLOAT]);
    }

    #[test]
    fn bool_fix_loses_to_bool() {
        let registry = Registry::default();
        let recognizer = Recognizer::new(&registry);
        let ty = Type::union([Type::INT, Type::BoolFix, Type::BOOL]);
        let r = recognizer.recognize(&Node::bool(true), &ty).unwrap();
        assert_eq!(types(&r), [Type::BOOL]);
        let ty = Type::union([Type::INT, Type::BoolFix]);
        let r = recognizer.recognize(&Node::bool(false), &ty).unwrap();
        assert_eq!(types(&r), [Type::BoolFix]);
    }

    #[test]
    fn ambiguous_sequence_items_propagate() {
        let registry = registry(&[
            ClassSpec::object("A").optional::<i64>("x"),
            ClassSpec::object("B").optional::<i64>("y"),
        ]);
        let recognizer = Recognizer::new(&registry);
        let node = Node::sequence(vec![Node::mapping(vec![])]);
        let ty = Type::seq(Type::union([Type::class("A"), Type::class("B")]));
        let r = recognizer.recognize(&node, &ty).unwrap();
        assert_eq!(
            types(&r),
            [Type::seq(Type::class("A")), Type::seq(Type::class("B"))]
        );
        assert!(r.failure.message.contains("Could not determine"));
    }

    #[test]
    fn subclasses_win_over_their_base() {
        let registry = registry(&[
            ClassSpec::object("Shape").required::<String>("center"),
            ClassSpec::object("Circle").base("Shape").required::<f64>("radius"),
        ]);
        let recognizer = Recognizer::new(&registry);
        let circle = Node::mapping_from([
            ("center", Node::string("c")),
            ("radius", Node::float(2.0)),
        ]);
        let r = recognizer.recognize(&circle, &Type::class("Shape")).unwrap();
        assert_eq!(types(&r), [Type::class("Circle")]);

        let shape = Node::mapping_from([("center", Node::string("c"))]);
        let r = recognizer.recognize(&shape, &Type::class("Shape")).unwrap();
        assert_eq!(types(&r), [Type::class("Shape")]);
    }

    #[test]
    fn tags_settle_sibling_ambiguity() {
        let registry = registry(&[
            ClassSpec::object("Base").abstract_class(),
            ClassSpec::object("A").base("Base"),
            ClassSpec::object("B").base("Base"),
        ]);
        let recognizer = Recognizer::new(&registry);
        let untagged = Node::mapping(vec![]);
        let r = recognizer.recognize(&untagged, &Type::class("Base")).unwrap();
        assert_eq!(r.types.len(), 2);

        let tagged = Node::mapping(vec![]).with_tag(Tag::Explicit("!B".into()));
        let r = recognizer.recognize(&tagged, &Type::class("Base")).unwrap();
        assert_eq!(types(&r), [Type::class("B")]);
    }

    #[test]
    fn contradicting_tags_are_rejected() {
        let registry = registry(&[
            ClassSpec::object("A").required::<i64>("a"),
            ClassSpec::object("B").required::<i64>("b"),
        ]);
        let recognizer = Recognizer::new(&registry);
        let node = Node::mapping_from([("a", Node::int(1))]).with_tag(Tag::Explicit("!B".into()));
        let r = recognizer.recognize(&node, &Type::class("A")).unwrap();
        assert!(r.failure.render().contains("That makes no sense"));

        let node = Node::mapping_from([("a", Node::int(1))]).with_tag(Tag::Explicit("!Zork".into()));
        let r = recognizer.recognize(&node, &Type::class("A")).unwrap();
        assert!(r.failure.render().contains("which type I don't know"));
    }

    #[test]
    fn missing_attributes_are_diagnosed_with_position() {
        let registry = registry(&[ClassSpec::object("Person")
            .required::<String>("name")
            .required::<i64>("age")]);
        let recognizer = Recognizer::new(&registry);
        let node = Node::mapping_from([("nmae", Node::string("x")), ("age", Node::int(3))])
            .with_position(Position::Parsed(Location::new(1, 1)));
        let r = recognizer.recognize(&node, &Type::class("Person")).unwrap();
        assert!(r.types.is_empty());
        let rendered = r.failure.render();
        assert!(rendered.contains("line 1, column 1"), "{rendered}");
        assert!(rendered.contains("Maybe \"nmae\" was intended to be \"name\"?"), "{rendered}");
    }

    #[test]
    fn dashed_keys_are_accepted() {
        let registry = registry(&[ClassSpec::object("C").required::<i64>("max_size")]);
        let recognizer = Recognizer::new(&registry);
        let node = Node::mapping_from([("max-size", Node::int(3))]);
        let r = recognizer.recognize(&node, &Type::class("C")).unwrap();
        assert_eq!(types(&r), [Type::class("C")]);
    }

    #[test]
    fn unregistered_classes_are_configuration_errors() {
        let registry = Registry::default();
        let recognizer = Recognizer::new(&registry);
        let err = recognizer.recognize(&Node::null(), &Type::class("Nope")).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}

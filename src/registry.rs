//! Class registration.
//!
//! A class is described once with a [`ClassSpec`] and handed to a loader or
//! dumper. Before first use the specs are resolved into a [`Registry`]:
//! inherited attributes are merged in, the inheritance graph is checked and
//! every type descriptor is checked for classes nobody registered.

use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::descriptor::{Type, Typed};
use crate::error::{Error, HookError};
use crate::node::Node;
use crate::probe::Probe;

/// Checks whether a node looks like an instance of the class.
pub type RecognizeHook = fn(&Probe<'_>) -> Result<(), HookError>;

/// Rewrites a node in place, from its written form to the canonical one or back.
pub type SugarHook = fn(&mut Node) -> Result<(), HookError>;

/// A named, typed parameter of a class.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub ty: Type,
    pub required: bool,
}

/// How instances of a class are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassKind {
    /// A mapping of attributes.
    Object,
    /// A string naming one of the listed variants.
    Enum(Vec<String>),
    /// A string wrapped in a class of its own.
    StringLike,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Hooks {
    pub(crate) recognize: Option<RecognizeHook>,
    pub(crate) desugar: Option<SugarHook>,
    pub(crate) resugar: Option<SugarHook>,
}

/// Description of one class: its name, attributes, bases and hooks.
///
/// ```
/// use serde_saphyr_schema::ClassSpec;
///
/// let spec = ClassSpec::object("Circle")
///     .base("Shape")
///     .required::<f64>("radius");
/// assert_eq!(spec.name(), "Circle");
/// ```
#[derive(Clone, Debug)]
pub struct ClassSpec {
    pub(crate) name: String,
    pub(crate) kind: ClassKind,
    pub(crate) bases: SmallVec<[String; 2]>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) extra: Option<String>,
    pub(crate) is_abstract: bool,
    pub(crate) hooks: Hooks,
}

impl ClassSpec {
    fn with_kind(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            bases: SmallVec::new(),
            attributes: Vec::new(),
            extra: None,
            is_abstract: false,
            hooks: Hooks::default(),
        }
    }

    /// A class written as a mapping of attributes.
    pub fn object(name: impl Into<String>) -> Self {
        Self::with_kind(name, ClassKind::Object)
    }

    /// An enumeration written as the name of one of its variants.
    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        variants: impl IntoIterator<Item = S>,
    ) -> Self {
        let variants = variants.into_iter().map(Into::into).collect();
        Self::with_kind(name, ClassKind::Enum(variants))
    }

    /// A class written as a plain string.
    pub fn string_like(name: impl Into<String>) -> Self {
        Self::with_kind(name, ClassKind::StringLike)
    }

    /// Declare a base class. Its attributes are inherited.
    pub fn base(mut self, name: impl Into<String>) -> Self {
        self.bases.push(name.into());
        self
    }

    /// Never recognize this class itself, only its subclasses.
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn required<T: Typed>(self, name: impl Into<String>) -> Self {
        self.required_type(name, T::yaml_type())
    }

    pub fn optional<T: Typed>(self, name: impl Into<String>) -> Self {
        self.optional_type(name, T::yaml_type())
    }

    pub fn required_type(self, name: impl Into<String>, ty: Type) -> Self {
        self.attribute(name.into(), ty, true)
    }

    pub fn optional_type(self, name: impl Into<String>, ty: Type) -> Self {
        self.attribute(name.into(), ty, false)
    }

    fn attribute(mut self, name: String, ty: Type, required: bool) -> Self {
        let attribute = Attribute { name, ty, required };
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
        self
    }

    /// Collect undeclared keys into the field `slot` instead of rejecting them.
    ///
    /// The field receives a string-keyed mapping of the extra entries, in
    /// document order, with their tags removed.
    pub fn extra(mut self, slot: impl Into<String>) -> Self {
        self.extra = Some(slot.into());
        self
    }

    pub fn recognize(mut self, hook: RecognizeHook) -> Self {
        self.hooks.recognize = Some(hook);
        self
    }

    /// Run `hook` on recognized instances before they are constructed.
    pub fn desugar(mut self, hook: SugarHook) -> Self {
        self.hooks.desugar = Some(hook);
        self
    }

    /// Run `hook` on represented instances before they are emitted.
    pub fn resugar(mut self, hook: SugarHook) -> Self {
        self.hooks.resugar = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ClassKind {
        &self.kind
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Attributes declared on this spec, without inherited ones.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn extra_slot(&self) -> Option<&str> {
        self.extra.as_deref()
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// A class with everything it inherits resolved.
#[derive(Debug)]
pub(crate) struct ClassEntry {
    pub(crate) spec: ClassSpec,
    /// Own and inherited attributes, inherited first.
    pub(crate) attributes: Vec<Attribute>,
    /// The class and all its ancestors, most basic first.
    pub(crate) lineage: Vec<String>,
    /// Registered classes naming this one as a direct base, in registration order.
    pub(crate) subclasses: Vec<String>,
}

impl ClassEntry {
    pub(crate) fn name(&self) -> &str {
        &self.spec.name
    }

    pub(crate) fn kind(&self) -> &ClassKind {
        &self.spec.kind
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Validated set of classes.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    classes: AHashMap<String, ClassEntry>,
}

impl Registry {
    /// Resolve and validate `specs`. `roots` are descriptors used from outside
    /// any class, such as the document type.
    pub(crate) fn build(specs: &[ClassSpec], roots: &[&Type]) -> Result<Self, Error> {
        let mut by_name: AHashMap<&str, &ClassSpec> = AHashMap::with_capacity(specs.len());
        for spec in specs {
            if by_name.insert(spec.name.as_str(), spec).is_some() {
                return Err(Error::configuration(format!(
                    "class {} is registered more than once",
                    spec.name
                )));
            }
        }

        for spec in specs {
            for base in &spec.bases {
                if !by_name.contains_key(base.as_str()) {
                    return Err(Error::configuration(format!(
                        "class {} declares base {base}, which is not registered",
                        spec.name
                    )));
                }
            }
            if let ClassKind::Enum(variants) = &spec.kind
                && variants.is_empty()
            {
                return Err(Error::configuration(format!(
                    "enumeration {} has no variants",
                    spec.name
                )));
            }
        }

        let mut classes = AHashMap::with_capacity(specs.len());
        for spec in specs {
            let lineage = lineage(spec, &by_name)?;
            let mut attributes: Vec<Attribute> = Vec::new();
            for ancestor in &lineage {
                for attribute in &by_name[ancestor.as_str()].attributes {
                    match attributes.iter_mut().find(|a| a.name == attribute.name) {
                        Some(existing) => *existing = attribute.clone(),
                        None => attributes.push(attribute.clone()),
                    }
                }
            }
            if let Some(slot) = &spec.extra
                && attributes.iter().any(|a| &a.name == slot)
            {
                return Err(Error::configuration(format!(
                    "extra slot \"{slot}\" of class {} is also declared as an attribute",
                    spec.name
                )));
            }
            let subclasses = specs
                .iter()
                .filter(|other| other.bases.contains(&spec.name))
                .map(|other| other.name.clone())
                .collect();
            classes.insert(
                spec.name.clone(),
                ClassEntry {
                    spec: spec.clone(),
                    attributes,
                    lineage,
                    subclasses,
                },
            );
        }

        let registry = Registry { classes };
        for entry in registry.classes.values() {
            for attribute in &entry.attributes {
                registry
                    .check_type(&attribute.ty)
                    .map_err(|msg| {
                        Error::configuration(format!(
                            "attribute \"{}\" of class {}: {msg}",
                            attribute.name,
                            entry.name()
                        ))
                    })?;
            }
        }
        for root in roots {
            registry.check_type(root).map_err(Error::configuration)?;
        }
        debug!(classes = registry.classes.len(), "class registry built");
        Ok(registry)
    }

    /// Every class mentioned in `ty` is registered and every mapping key type is string-like.
    pub(crate) fn check_type(&self, ty: &Type) -> Result<(), String> {
        match ty {
            Type::Class(name) if !self.contains(name) => Err(format!(
                "type {name} is not a registered class"
            )),
            Type::Map(key, _) if !self.is_string_like(key) => Err(format!(
                "mapping keys must be strings, but {key} was given"
            )),
            Type::Map(key, value) => {
                self.check_type(key)?;
                self.check_type(value)
            }
            Type::Union(alternatives) => alternatives.iter().try_for_each(|t| self.check_type(t)),
            Type::Seq(item) => self.check_type(item),
            _ => Ok(()),
        }
    }

    /// Whether values of `ty` are written as plain strings.
    pub(crate) fn is_string_like(&self, ty: &Type) -> bool {
        match ty {
            Type::Scalar(crate::node::ScalarKind::Str) => true,
            Type::Class(name) => self
                .get(name)
                .is_some_and(|entry| entry.spec.kind == ClassKind::StringLike),
            _ => false,
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Whether `name` is `ancestor` or inherits from it.
    pub(crate) fn is_subclass(&self, name: &str, ancestor: &str) -> bool {
        self.get(name)
            .is_some_and(|entry| entry.lineage.iter().any(|c| c == ancestor))
    }

    /// Entry for `name`, or a configuration error.
    pub(crate) fn entry(&self, name: &str) -> Result<&ClassEntry, Error> {
        self.get(name).ok_or_else(|| {
            Error::configuration(format!("type {name} is not a registered class"))
        })
    }
}

/// The class and its ancestors, most basic first.
///
/// Bases are walked depth first, left to right; a class reachable along
/// several paths is placed after every class that inherits from it.
fn lineage(spec: &ClassSpec, by_name: &AHashMap<&str, &ClassSpec>) -> Result<Vec<String>, Error> {
    fn walk<'a>(
        spec: &'a ClassSpec,
        by_name: &AHashMap<&str, &'a ClassSpec>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<&'a str>,
    ) -> Result<(), Error> {
        if path.contains(&spec.name.as_str()) {
            return Err(Error::configuration(format!(
                "class {} inherits from itself",
                spec.name
            )));
        }
        order.retain(|c| *c != spec.name);
        order.push(&spec.name);
        path.push(&spec.name);
        for base in &spec.bases {
            walk(by_name[base.as_str()], by_name, path, order)?;
        }
        path.pop();
        Ok(())
    }

    let mut order = Vec::new();
    walk(spec, by_name, &mut Vec::new(), &mut order)?;
    Ok(order.into_iter().rev().map(str::to_owned).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[String]) -> Vec<&str> {
        v.iter().map(String::as_str).collect()
    }

    #[test]
    fn attributes_are_inherited_base_first() {
        let specs = [
            ClassSpec::object("Shape").required::<String>("center"),
            ClassSpec::object("Circle").base("Shape").required::<f64>("radius"),
        ];
        let registry = Registry::build(&specs, &[]).unwrap();
        let circle = registry.get("Circle").unwrap();
        let attrs: Vec<&str> = circle.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attrs, ["center", "radius"]);
        assert_eq!(names(&circle.lineage), ["Shape", "Circle"]);
        assert_eq!(names(&registry.get("Shape").unwrap().subclasses), ["Circle"]);
        assert!(registry.is_subclass("Circle", "Shape"));
        assert!(!registry.is_subclass("Shape", "Circle"));
    }

    #[test]
    fn diamond_puts_the_shared_base_first() {
        let specs = [
            ClassSpec::object("A"),
            ClassSpec::object("B").base("A"),
            ClassSpec::object("C").base("A"),
            ClassSpec::object("D").base("B").base("C"),
        ];
        let registry = Registry::build(&specs, &[]).unwrap();
        assert_eq!(names(&registry.get("D").unwrap().lineage), ["A", "C", "B", "D"]);
    }

    #[test]
    fn inconsistent_schemas_are_rejected() {
        let dup = [ClassSpec::object("A"), ClassSpec::object("A")];
        assert!(matches!(Registry::build(&dup, &[]), Err(Error::Configuration { .. })));

        let unknown_base = [ClassSpec::object("A").base("Nope")];
        assert!(Registry::build(&unknown_base, &[]).is_err());

        let cycle = [ClassSpec::object("A").base("B"), ClassSpec::object("B").base("A")];
        let err = Registry::build(&cycle, &[]).unwrap_err();
        assert!(err.to_string().contains("inherits from itself"), "{err}");

        let unknown_attr = [ClassSpec::object("A").required_type("x", Type::class("Missing"))];
        assert!(Registry::build(&unknown_attr, &[]).is_err());

        let int_keys = [ClassSpec::object("A").required_type("x", Type::map(Type::INT, Type::INT))];
        let err = Registry::build(&int_keys, &[]).unwrap_err();
        assert!(err.to_string().contains("mapping keys must be strings"), "{err}");

        let clash = [ClassSpec::object("A").required::<i32>("x").extra("x")];
        assert!(Registry::build(&clash, &[]).is_err());

        let empty = [ClassSpec::enumeration("E", Vec::<String>::new())];
        assert!(Registry::build(&empty, &[]).is_err());

        assert!(Registry::build(&[], &[&Type::class("Doc")]).is_err());
    }

    #[test]
    fn string_like_classes_may_key_mappings() {
        let specs = [
            ClassSpec::string_like("Name"),
            ClassSpec::object("A").required_type("x", Type::map(Type::class("Name"), Type::INT)),
        ];
        assert!(Registry::build(&specs, &[]).is_ok());
    }
}

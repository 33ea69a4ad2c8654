//! Dumping typed values as YAML (or JSON) text.

use std::fmt;
use std::io;
use std::sync::OnceLock;

use serde::Serialize;
use tracing::debug;

use crate::emitter::Emitter;
use crate::emitter_options::EmitterOptions;
use crate::error::Error;
#[cfg(feature = "json")]
use crate::json::{JsonOptions, write_json};
use crate::node::Node;
use crate::registry::{ClassSpec, Registry};
use crate::representer::{Representer, untag};
use crate::ser::NodeSerializer;

/// Dumps values of registered classes.
///
/// ```rust
/// use serde::Serialize;
/// use serde_saphyr_schema::{ClassSpec, Dumper};
///
/// #[derive(Serialize)]
/// struct Server {
///     host: String,
///     port: i64,
/// }
///
/// let dumper = Dumper::new().register(
///     ClassSpec::object("Server")
///         .required::<String>("host")
///         .required::<i64>("port"),
/// );
/// let yaml = dumper
///     .dump(&Server { host: "example.org".into(), port: 8080 })
///     .unwrap();
/// assert_eq!(yaml, "host: example.org\nport: 8080\n");
/// ```
pub struct Dumper {
    classes: Vec<ClassSpec>,
    options: EmitterOptions,
    registry: OnceLock<Result<Registry, String>>,
}

impl Default for Dumper {
    fn default() -> Self {
        Self::new()
    }
}

impl Dumper {
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            options: EmitterOptions::default(),
            registry: OnceLock::new(),
        }
    }

    /// Add a class to the schema.
    pub fn register(mut self, class: ClassSpec) -> Self {
        self.classes.push(class);
        self.registry = OnceLock::new();
        self
    }

    pub fn with_options(mut self, options: EmitterOptions) -> Self {
        self.options = options;
        self
    }

    /// Turn `value` into the resugared node tree that would be written.
    pub fn represent<T: Serialize + ?Sized>(&self, value: &T) -> Result<Node, Error> {
        let registry = self.registry()?;
        let mut node = value.serialize(NodeSerializer::new(registry))?;
        Representer::new(registry).represent(&mut node)?;
        untag(&mut node);
        debug!(shape = node.shape_name(), "represented value");
        Ok(node)
    }

    pub fn dump<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Error> {
        let mut out = String::new();
        self.dump_fmt(value, &mut out)?;
        Ok(out)
    }

    pub fn dump_fmt<T: Serialize + ?Sized, W: fmt::Write>(&self, value: &T, out: &mut W) -> Result<(), Error> {
        let node = self.represent(value)?;
        Emitter::new(out, self.options)?.emit_document(&node)
    }

    pub fn dump_to_writer<T: Serialize + ?Sized, W: io::Write>(&self, value: &T, mut out: W) -> Result<(), Error> {
        let text = self.dump(value)?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Dump several values as a multi-document stream.
    pub fn dump_all<T: Serialize>(&self, values: &[T]) -> Result<String, Error> {
        let mut out = String::new();
        let mut emitter = Emitter::new(&mut out, self.options)?;
        for value in values {
            emitter.emit_document(&self.represent(value)?)?;
        }
        Ok(out)
    }

    /// Dump `value` as JSON instead of YAML.
    #[cfg(feature = "json")]
    pub fn dump_json<T: Serialize + ?Sized>(&self, value: &T, options: JsonOptions) -> Result<String, Error> {
        let node = self.represent(value)?;
        let mut out = Vec::new();
        write_json(&mut out, &node, options)?;
        String::from_utf8(out).map_err(|err| Error::Emit {
            msg: format!("JSON output is not UTF-8: {err}"),
        })
    }

    fn registry(&self) -> Result<&Registry, Error> {
        self.registry
            .get_or_init(|| Registry::build(&self.classes, &[]).map_err(|err| err.message()))
            .as_ref()
            .map_err(|msg| Error::configuration(msg.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Point {
        x: i64,
        y: i64,
    }

    fn dumper() -> Dumper {
        Dumper::new().register(
            ClassSpec::object("Point")
                .required::<i64>("x")
                .required::<i64>("y"),
        )
    }

    #[test]
    fn multi_document_output() {
        let yaml = dumper()
            .dump_all(&[Point { x: 1, y: 2 }, Point { x: 3, y: 4 }])
            .unwrap();
        assert_eq!(yaml, "x: 1\ny: 2\n---\nx: 3\ny: 4\n");
    }

    #[test]
    fn writer_and_options() {
        let mut out = Vec::new();
        dumper()
            .with_options(crate::emitter_options! { flow: true })
            .dump_to_writer(&vec![Point { x: 1, y: 2 }], &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[{x: 1, y: 2}]\n");
    }

    #[test]
    fn unregistered_classes_are_refused() {
        let err = Dumper::new().dump(&Point { x: 1, y: 2 }).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}

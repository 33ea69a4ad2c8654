//! Loading YAML text into typed values.

use std::io::Read;
use std::sync::OnceLock;

use encoding_rs_io::DecodeReaderBytesBuilder;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::constructor::Constructor;
use crate::descriptor::Type;
use crate::error::Error;
use crate::node::Node;
use crate::options::LoaderOptions;
use crate::parser::parse_documents;
use crate::processor::Processor;
use crate::recognizer::{Recognition, Recognizer};
use crate::registry::{ClassSpec, Registry};

/// Loads documents of one declared type.
///
/// Classes are registered up front; the registrations are checked for
/// consistency the first time something is loaded.
///
/// ```rust
/// use serde::Deserialize;
/// use serde_saphyr_schema::{ClassSpec, Loader, Type};
///
/// #[derive(Deserialize, Debug, PartialEq)]
/// struct Server {
///     host: String,
///     port: i64,
/// }
///
/// let loader = Loader::new(Type::class("Server")).register(
///     ClassSpec::object("Server")
///         .required::<String>("host")
///         .required::<i64>("port"),
/// );
/// let server: Server = loader.load("host: example.org\nport: 8080\n").unwrap();
/// assert_eq!(server.port, 8080);
/// ```
pub struct Loader {
    document_type: Type,
    classes: Vec<ClassSpec>,
    options: LoaderOptions,
    registry: OnceLock<Result<Registry, String>>,
}

impl Loader {
    pub fn new(document_type: Type) -> Self {
        Self {
            document_type,
            classes: Vec::new(),
            options: LoaderOptions::default(),
            registry: OnceLock::new(),
        }
    }

    /// Add a class to the schema.
    pub fn register(mut self, class: ClassSpec) -> Self {
        self.classes.push(class);
        self.registry = OnceLock::new();
        self
    }

    /// Change the type that documents are expected to have.
    pub fn set_document_type(&mut self, document_type: Type) {
        self.document_type = document_type;
        self.registry = OnceLock::new();
    }

    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn document_type(&self) -> &Type {
        &self.document_type
    }

    /// Load a single document.
    pub fn load<T: DeserializeOwned>(&self, input: &str) -> Result<T, Error> {
        self.load_inner(input).map_err(|err| self.decorate(err, input))
    }

    /// Load every document in the input.
    pub fn load_all<T: DeserializeOwned>(&self, input: &str) -> Result<Vec<T>, Error> {
        self.load_all_inner(input).map_err(|err| self.decorate(err, input))
    }

    /// Load a single document from a byte stream, detecting UTF-8/UTF-16 from the BOM.
    pub fn load_reader<T: DeserializeOwned, R: Read>(&self, reader: R) -> Result<T, Error> {
        let mut decoder = DecodeReaderBytesBuilder::new().encoding(None).build(reader);
        let mut input = String::new();
        decoder.read_to_string(&mut input)?;
        self.load(&input)
    }

    /// Recognize and desugar a single document without constructing a value.
    ///
    /// The returned node is in canonical form: attribute names as declared,
    /// overflow keys gathered into their slot, and every class instance
    /// tagged with its concrete class.
    pub fn load_node(&self, input: &str) -> Result<Node, Error> {
        let run = || -> Result<Node, Error> {
            let registry = self.registry()?;
            let mut node = self.single_document(input)?;
            self.process(registry, &mut node)?;
            Constructor::new(registry).validate(&mut node)?;
            Ok(node)
        };
        run().map_err(|err| self.decorate(err, input))
    }

    /// Recognize `node` against the document type, without changing it.
    ///
    /// Returns every type the node could be. More than one means the
    /// document is ambiguous; none means it does not fit, and
    /// [`Recognition::failure`] says why.
    pub fn recognize(&self, node: &Node) -> Result<Recognition, Error> {
        let registry = self.registry()?;
        Recognizer::new(registry).recognize(node, &self.document_type)
    }

    fn load_inner<T: DeserializeOwned>(&self, input: &str) -> Result<T, Error> {
        let registry = self.registry()?;
        let mut node = self.single_document(input)?;
        self.process(registry, &mut node)?;
        Constructor::new(registry).construct(node)
    }

    fn load_all_inner<T: DeserializeOwned>(&self, input: &str) -> Result<Vec<T>, Error> {
        let registry = self.registry()?;
        self.options.consistent()?;
        parse_documents(input, &self.options)?
            .into_iter()
            .map(|mut node| {
                self.process(registry, &mut node)?;
                Constructor::new(registry).construct(node)
            })
            .collect()
    }

    fn single_document(&self, input: &str) -> Result<Node, Error> {
        self.options.consistent()?;
        let mut documents = parse_documents(input, &self.options)?.into_iter();
        let first = documents.next().ok_or(Error::NoDocument)?;
        if let Some(second) = documents.next() {
            return Err(Error::MultipleDocuments {
                location: second.location(),
            });
        }
        Ok(first)
    }

    fn process(&self, registry: &Registry, node: &mut Node) -> Result<(), Error> {
        debug!(document_type = %self.document_type, "processing document");
        Processor::new(registry).process(node, &self.document_type)
    }

    fn registry(&self) -> Result<&Registry, Error> {
        self.registry
            .get_or_init(|| {
                Registry::build(&self.classes, &[&self.document_type]).map_err(|err| err.message())
            })
            .as_ref()
            .map_err(|msg| Error::configuration(msg.clone()))
    }

    fn decorate(&self, err: Error, input: &str) -> Error {
        if self.options.with_snippet {
            err.with_snippet(input, self.options.crop_radius)
        } else {
            err
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_count_is_checked() {
        let loader = Loader::new(Type::INT);
        assert!(matches!(loader.load::<i64>(""), Err(Error::NoDocument)));
        let err = loader.load::<i64>("1\n---\n2\n").unwrap_err();
        assert!(matches!(err, Error::MultipleDocuments { .. }));
        assert_eq!(loader.load_all::<i64>("1\n---\n2\n").unwrap(), vec![1, 2]);
    }

    #[test]
    fn schema_errors_surface_on_first_use() {
        let loader = Loader::new(Type::class("Missing"));
        let err = loader.load::<i64>("1").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn utf16_input_is_decoded() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "42".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let loader = Loader::new(Type::INT);
        assert_eq!(loader.load_reader::<i64, _>(bytes.as_slice()).unwrap(), 42);
    }

    #[test]
    fn recognition_without_loading() {
        let loader = Loader::new(Type::union([Type::INT, Type::STR]));
        let recognition = loader.recognize(&Node::int(3)).unwrap();
        assert_eq!(recognition.unique(), Some(&Type::INT));
        let recognition = loader.recognize(&Node::bool(true)).unwrap();
        assert!(recognition.types.is_empty());
        assert!(!recognition.failure.leaves().is_empty());
    }

    #[test]
    fn snippets_are_opt_in() {
        let loader = Loader::new(Type::INT);
        let plain = loader.load::<i64>("x").unwrap_err();
        assert!(!matches!(plain, Error::WithSnippet { .. }));
        let loader = loader.with_options(crate::loader_options! { with_snippet: true });
        let decorated = loader.load::<i64>("x").unwrap_err();
        assert!(matches!(decorated, Error::WithSnippet { .. }), "{decorated:?}");
    }
}

//! Type-directed YAML loading and dumping on top of serde and saphyr.
//!
//! A schema is a set of registered classes ([`ClassSpec`]) plus the type of
//! the document ([`Type`]). Loading parses the text into a [`Node`] tree,
//! recognizes every node against its expected type (walking class
//! hierarchies and unions), runs desugar hooks that rewrite syntactic
//! variants into the canonical shape, checks the result and finally lets
//! serde build the value. Dumping runs the same steps backwards.
//!
//! When a document does not fit, the error explains why, per alternative,
//! with line and column and with suggestions for misspelled keys.
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_saphyr_schema::{ClassSpec, Dumper, Loader, Type};
//!
//! #[derive(Deserialize, Serialize, Debug, PartialEq)]
//! struct Circle {
//!     radius: f64,
//! }
//!
//! #[derive(Deserialize, Serialize, Debug, PartialEq)]
//! struct Square {
//!     side: f64,
//! }
//!
//! #[derive(Deserialize, Serialize, Debug, PartialEq)]
//! enum Shape {
//!     Circle(Circle),
//!     Square(Square),
//! }
//!
//! let classes = || {
//!     [
//!         ClassSpec::object("Shape").abstract_class(),
//!         ClassSpec::object("Circle").base("Shape").required::<f64>("radius"),
//!         ClassSpec::object("Square").base("Shape").required::<f64>("side"),
//!     ]
//! };
//!
//! let loader = classes()
//!     .into_iter()
//!     .fold(Loader::new(Type::seq(Type::class("Shape"))), Loader::register);
//! let shapes: Vec<Shape> = loader.load("- radius: 1.5\n- side: 2.0\n").unwrap();
//! assert_eq!(shapes[0], Shape::Circle(Circle { radius: 1.5 }));
//!
//! let dumper = classes().into_iter().fold(Dumper::new(), Dumper::register);
//! assert_eq!(dumper.dump(&shapes).unwrap(), "- radius: 1.5\n- side: 2.0\n");
//! ```

mod constructor;
mod de;
mod descriptor;
mod diagnostics;
mod dumper;
mod emitter;
mod emitter_options;
mod error;
#[cfg(feature = "json")]
mod json;
mod loader;
mod location;
mod macros;
mod node;
mod options;
mod parse_scalars;
mod parser;
mod probe;
mod processor;
mod recognizer;
mod registry;
mod representer;
mod ser;
mod ser_quoting;
mod snippet;
mod sugar;
mod tags;
mod zmij_format;

pub use crate::descriptor::{Type, Typed};
pub use crate::diagnostics::Failure;
pub use crate::dumper::Dumper;
pub use crate::emitter_options::EmitterOptions;
pub use crate::error::{Error, HookError};
#[cfg(feature = "json")]
pub use crate::json::JsonOptions;
pub use crate::loader::Loader;
pub use crate::location::{Location, Position, Span};
pub use crate::node::{Node, NodeData, ScalarKind, ScalarValue, Tag};
pub use crate::options::LoaderOptions;
pub use crate::probe::Probe;
pub use crate::recognizer::Recognition;
pub use crate::registry::{Attribute, ClassKind, ClassSpec, RecognizeHook, SugarHook};
pub use crate::sugar::NodeType;

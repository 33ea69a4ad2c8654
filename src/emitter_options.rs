//! Emitter options for YAML output.
//!
//! ```rust
//! let options = serde_saphyr_schema::emitter_options! {
//!     indent_step: 4,
//!     explicit_start: true,
//! };
//! assert_eq!(options.indent_step, 4);
//! ```

use crate::error::Error;

/// Emitter options for YAML output.
///
/// Construct `EmitterOptions` with the [`emitter_options!`](crate::emitter_options!)
/// macro to stay compatible with future fields.
#[derive(Clone, Copy, Debug)]
pub struct EmitterOptions {
    /// Number of spaces per nesting level in block style (2 by default).
    /// 0 is rejected, as block collections need indentation.
    pub indent_step: usize,
    /// Write the whole document in flow style (`{a: 1, b: [x, y]}`).
    pub flow: bool,
    /// Start every document with `---`.
    pub explicit_start: bool,
    /// End every document with `...`.
    pub explicit_end: bool,
    /// Emit empty mappings as `{}` and empty sequences as `[]` (the default).
    pub empty_as_braces: bool,
    /// Quote every string scalar. Single quotes unless the string needs escapes.
    pub quote_all: bool,
}

impl EmitterOptions {
    pub(crate) fn consistent(&self) -> Result<(), Error> {
        if self.indent_step == 0 {
            return Err(Error::InvalidOptions(
                "Invalid indent step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            indent_step: 2,
            flow: false,
            explicit_start: false,
            explicit_end: false,
            empty_as_braces: true,
            quote_all: false,
        }
    }
}

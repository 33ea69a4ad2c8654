use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Column radius kept around the error when snippet lines are cropped.
pub(crate) const DEFAULT_CROP_RADIUS: usize = 64;

/// Loader configuration.
///
/// Build it with the [`loader_options!`](crate::loader_options!) macro so
/// that adding fields later is not a breaking change.
///
/// ```rust
/// use serde_saphyr_schema::{Loader, Type};
///
/// let options = serde_saphyr_schema::loader_options! {
///     yaml11_booleans: true,
///     with_snippet: true,
/// };
/// let loader = Loader::new(Type::BOOL).with_options(options);
/// assert!(loader.load::<bool>("yes").unwrap());
/// ```
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LoaderOptions {
    /// Maximum number of nodes that alias expansion may copy into a single
    /// document. Guards against "billion laughs" inputs.
    pub max_alias_expansions: usize,
    /// Maximum nesting depth of sequences and mappings.
    pub max_depth: usize,
    /// Also read the YAML 1.1 spellings `yes`/`no`/`on`/`off`/`y`/`n`
    /// as booleans. Off by default: YAML 1.2 reads them as strings.
    pub yaml11_booleans: bool,
    /// Render a snippet of the input under error messages that carry a location.
    pub with_snippet: bool,
    /// Long snippet lines are cropped to this many columns on each side of the error.
    /// 0 keeps whole lines.
    pub crop_radius: usize,
}

impl LoaderOptions {
    pub(crate) fn consistent(&self) -> Result<(), Error> {
        if self.max_depth == 0 {
            return Err(Error::InvalidOptions(
                "Invalid max depth must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_alias_expansions: 100_000,
            max_depth: 500,
            yaml11_booleans: false,
            with_snippet: false,
            crop_radius: DEFAULT_CROP_RADIUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_overrides_defaults() {
        let options = crate::loader_options! {
            yaml11_booleans: true,
        };
        assert!(options.yaml11_booleans);
        assert_eq!(options.max_depth, LoaderOptions::default().max_depth);
        assert!(options.consistent().is_ok());
    }

    #[test]
    fn zero_depth_is_rejected() {
        let options = crate::loader_options! { max_depth: 0 };
        assert!(matches!(options.consistent(), Err(Error::InvalidOptions(_))));
    }
}

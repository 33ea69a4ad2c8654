//! Public macros for constructing option structs without struct literal syntax.
//!
//! Call sites stay valid when fields are added to the option structs.

/// Construct [`crate::LoaderOptions`] from `Default` and a list of field assignments.
///
/// ```rust
/// let options = serde_saphyr_schema::loader_options! {
///     max_alias_expansions: 1000,
///     with_snippet: true,
/// };
/// assert!(options.with_snippet);
/// ```
#[macro_export]
macro_rules! loader_options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::LoaderOptions::default();
        $(
            #[allow(deprecated)]
            {
                opt.$field = $value;
            }
        )*
        opt
    }};
}

/// Construct [`crate::EmitterOptions`] from `Default` and a list of field assignments.
///
/// ```rust
/// let options = serde_saphyr_schema::emitter_options! {
///     indent_step: 4,
///     quote_all: true,
/// };
/// assert!(options.quote_all);
/// ```
#[macro_export]
macro_rules! emitter_options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::EmitterOptions::default();
        $(
            #[allow(deprecated)]
            {
                opt.$field = $value;
            }
        )*
        opt
    }};
}

//! YAML tag spellings and their meaning for node construction.

use crate::node::ScalarKind;

pub(crate) const CORE_PREFIX: &str = "tag:yaml.org,2002:";
pub(crate) const CORE_SHORTHAND: &str = "!!";

/// The non-specific tag `!`: a scalar carrying it is a plain string.
pub(crate) const NON_SPECIFIC: &str = "!";

pub(crate) const TAG_STR: &str = "!!str";
pub(crate) const TAG_STR_CANONICAL: &str = "tag:yaml.org,2002:str";

pub(crate) const TAG_INT: &str = "!!int";
pub(crate) const TAG_INT_CANONICAL: &str = "tag:yaml.org,2002:int";

pub(crate) const TAG_FLOAT: &str = "!!float";
pub(crate) const TAG_FLOAT_CANONICAL: &str = "tag:yaml.org,2002:float";

pub(crate) const TAG_BOOL: &str = "!!bool";
pub(crate) const TAG_BOOL_CANONICAL: &str = "tag:yaml.org,2002:bool";

pub(crate) const TAG_NULL: &str = "!!null";
pub(crate) const TAG_NULL_CANONICAL: &str = "tag:yaml.org,2002:null";

pub(crate) const TAG_TIMESTAMP: &str = "!!timestamp";
pub(crate) const TAG_TIMESTAMP_CANONICAL: &str = "tag:yaml.org,2002:timestamp";

/// Whether `tag` belongs to the YAML core tag family (`!!x` or `tag:yaml.org,2002:x`).
pub(crate) fn is_core_tag(tag: &str) -> bool {
    tag.starts_with(CORE_PREFIX) || tag.starts_with(CORE_SHORTHAND)
}

/// Scalar kind forced by an explicit core tag, if any.
///
/// Called by:
/// - The node builder when a scalar carries an explicit tag.
pub(crate) fn scalar_kind_for_tag(tag: &str) -> Option<ScalarKind> {
    match tag {
        TAG_STR | TAG_STR_CANONICAL => Some(ScalarKind::Str),
        TAG_INT | TAG_INT_CANONICAL => Some(ScalarKind::Int),
        TAG_FLOAT | TAG_FLOAT_CANONICAL => Some(ScalarKind::Float),
        TAG_BOOL | TAG_BOOL_CANONICAL => Some(ScalarKind::Bool),
        TAG_NULL | TAG_NULL_CANONICAL => Some(ScalarKind::Null),
        TAG_TIMESTAMP | TAG_TIMESTAMP_CANONICAL => Some(ScalarKind::Timestamp),
        _ => None,
    }
}

/// Class name claimed by a local tag such as `!Circle`.
///
/// Returns `None` for core tags and for anything that is not a primary-handle tag.
pub(crate) fn class_name_of(tag: &str) -> Option<&str> {
    if is_core_tag(tag) {
        return None;
    }
    tag.strip_prefix('!').filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_tags_force_scalar_kinds() {
        assert_eq!(scalar_kind_for_tag("!!str"), Some(ScalarKind::Str));
        assert_eq!(
            scalar_kind_for_tag("tag:yaml.org,2002:int"),
            Some(ScalarKind::Int)
        );
        assert_eq!(scalar_kind_for_tag("!Circle"), None);
    }

    #[test]
    fn local_tags_name_classes() {
        assert_eq!(class_name_of("!Circle"), Some("Circle"));
        assert_eq!(class_name_of("!!map"), None);
        assert_eq!(class_name_of("tag:yaml.org,2002:str"), None);
        assert_eq!(class_name_of("!"), None);
    }
}

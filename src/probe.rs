//! Read-only view of a node handed to recognize hooks.

use std::cell::RefCell;

use crate::descriptor::Type;
use crate::diagnostics::cjoin;
use crate::error::{Error, HookError};
use crate::node::{Node, ScalarKind, ScalarValue};
use crate::recognizer::Recognizer;

/// What a recognize hook gets to look at.
///
/// Every `require_*` method returns `Ok(())` when the node satisfies the
/// requirement and a [`HookError`] describing the mismatch otherwise, so a
/// hook is usually a short chain of `?`s.
pub struct Probe<'a> {
    recognizer: &'a Recognizer<'a>,
    node: &'a Node,
    config_error: RefCell<Option<Error>>,
}

impl<'a> Probe<'a> {
    pub(crate) fn new(recognizer: &'a Recognizer<'a>, node: &'a Node) -> Self {
        Self {
            recognizer,
            node,
            config_error: RefCell::new(None),
        }
    }

    /// The node under inspection.
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Schema errors hit while the hook ran; they outrank whatever the hook returned.
    pub(crate) fn take_config_error(&self) -> Option<Error> {
        self.config_error.borrow_mut().take()
    }

    /// Require a scalar, of one of `kinds` if any are given.
    pub fn require_scalar(&self, kinds: &[ScalarKind]) -> Result<(), HookError> {
        let Some(kind) = self.node.scalar_kind() else {
            return Err(self.scalar_required(kinds));
        };
        if kinds.is_empty() || kinds.contains(&kind) {
            Ok(())
        } else {
            Err(self.scalar_required(kinds))
        }
    }

    fn scalar_required(&self, kinds: &[ScalarKind]) -> HookError {
        if kinds.is_empty() {
            HookError::new("A scalar is required")
        } else {
            HookError::new(format!(
                "A scalar of type {} is required",
                cjoin("or", kinds.iter().map(ScalarKind::name))
            ))
        }
    }

    pub fn require_mapping(&self) -> Result<(), HookError> {
        if self.node.is_mapping() {
            Ok(())
        } else {
            Err(HookError::new("A mapping is required here"))
        }
    }

    pub fn require_sequence(&self) -> Result<(), HookError> {
        if self.node.is_sequence() {
            Ok(())
        } else {
            Err(HookError::new("A sequence is required here"))
        }
    }

    /// Require the mapping to have the attribute, recognizable as `ty` if given.
    pub fn require_attribute(&self, attribute: &str, ty: Option<Type>) -> Result<(), HookError> {
        self.require_mapping()?;
        let Some(value) = self.node.get(attribute) else {
            return Err(HookError::new(format!(
                "Missing required attribute \"{attribute}\""
            )));
        };
        let Some(ty) = ty else {
            return Ok(());
        };
        match self.recognizer.recognize(value, &ty) {
            Ok(recognition) if recognition.types.len() == 1 => Ok(()),
            Ok(recognition) => Err(HookError::new(recognition.failure.render())),
            Err(err) => {
                let msg = err.to_string();
                *self.config_error.borrow_mut() = Some(err);
                Err(HookError::new(msg))
            }
        }
    }

    /// Require the attribute to be a scalar equal to `value`.
    pub fn require_attribute_value(
        &self,
        attribute: &str,
        value: impl Into<ScalarValue>,
    ) -> Result<(), HookError> {
        let value = value.into();
        self.require_mapping()?;
        let Some(found) = self.node.get(attribute) else {
            return Err(HookError::new(format!("Required key \"{attribute}\" not found")));
        };
        if !found.is_scalar_of(value.kind()) {
            return Err(HookError::new(format!(
                "Incorrect attribute type where value {value} of type {} was required",
                value.kind()
            )));
        }
        if found.scalar_value().as_ref() != Some(&value) {
            return Err(HookError::new(format!(
                "Incorrect attribute value {} where {value} was required",
                found.literal().unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Reject the attribute if it is a scalar equal to `value`. Anything else passes.
    pub fn require_attribute_value_not(
        &self,
        attribute: &str,
        value: impl Into<ScalarValue>,
    ) -> Result<(), HookError> {
        let value = value.into();
        self.require_mapping()?;
        let Some(found) = self.node.get(attribute) else {
            return Err(HookError::new(format!("Required key \"{attribute}\" not found")));
        };
        if found.is_scalar_of(value.kind()) && found.scalar_value().as_ref() == Some(&value) {
            return Err(HookError::new(format!(
                "Incorrect attribute value {} where {value} was not allowed",
                found.literal().unwrap_or_default()
            )));
        }
        Ok(())
    }
}

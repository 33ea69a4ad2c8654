//! Failure trees and the messages rendered from them.
//!
//! Recognition never stops at the first problem: every alternative it tries
//! leaves a [`Failure`] behind, nested under the alternative that tried it.
//! [`Failure::render`] flattens such a tree into something a human can act
//! on, and the `diagnose_*` helpers produce the near-miss suggestions for
//! missing and unexpected mapping keys.

use std::fmt;

use crate::location::{Location, Position};
use crate::registry::Attribute;

/// Classes with fewer declared attributes than this get their full key list in messages.
const DESCRIBE_KEYS_BELOW: usize = 8;

/// Minimal similarity for a key to be suggested as a typo of another.
const SIMILARITY_CUTOFF: f64 = 0.6;

/// Number of suggestions offered at most.
const MAX_SUGGESTIONS: usize = 3;

/// A failure message with the failures that caused it.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Failure {
    pub message: String,
    pub causes: Vec<Failure>,
    /// Where the failing node was read from, if it was read at all.
    pub location: Option<Location>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
            location: None,
        }
    }

    /// A failure whose message is prefixed with the position it refers to.
    pub fn at(position: Position, message: impl fmt::Display) -> Self {
        match position {
            Position::Parsed(location) => Self {
                location: Some(location),
                ..Self::new(format!("{location}: {message}"))
            },
            Position::Generated => Self::new(message.to_string()),
        }
    }

    pub fn with_causes(mut self, causes: Vec<Failure>) -> Self {
        self.causes = causes;
        self
    }

    pub fn with_cause(mut self, cause: Failure) -> Self {
        self.causes.push(cause);
        self
    }

    /// Messages of the failures that have no causes of their own, deduplicated, in order.
    pub fn leaves(&self) -> Vec<&str> {
        fn walk<'a>(failure: &'a Failure, out: &mut Vec<&'a str>) {
            if failure.causes.is_empty() {
                if !out.contains(&failure.message.as_str()) {
                    out.push(&failure.message);
                }
            } else {
                for cause in &failure.causes {
                    walk(cause, out);
                }
            }
        }
        let mut leaves = Vec::new();
        walk(self, &mut leaves);
        leaves
    }

    /// Location of the first leaf that has one, falling back to this failure's own.
    pub fn first_location(&self) -> Option<Location> {
        self.causes
            .iter()
            .find_map(Failure::first_location)
            .or(self.location)
    }

    /// Render the tree for the user.
    ///
    /// A single distinct leaf is shown as is. Several leaves mean several
    /// alternatives were tried; all of them are listed and the user is told
    /// that one of them applies.
    pub fn render(&self) -> String {
        let leaves = self.leaves();
        if leaves.len() == 1 {
            format!("An error occurred:\n{}", leaves[0])
        } else {
            format!(
                "Multiple things are allowed here, but none of them were recognised correctly. \
                 At least one of these errors should apply to what you want to do; please solve \
                 that one and ignore the others.\n\n{}",
                leaves.join("\n\n")
            )
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Join words into an enumeration: `cjoin("and", ["x", "y", "z"])` is `"x, y and z"`.
pub fn cjoin<S: AsRef<str>>(conjunction: &str, words: impl IntoIterator<Item = S>) -> String {
    let words: Vec<S> = words.into_iter().collect();
    let mut result = String::new();
    let last = words.len().saturating_sub(1);
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            if i < last {
                result.push_str(", ");
            } else {
                result.push(' ');
                result.push_str(conjunction);
                result.push(' ');
            }
        }
        result.push_str(word.as_ref());
    }
    result
}

/// Up to three of `possibilities` that look like a misspelling of `word`, best first.
pub fn close_matches<'a>(word: &str, possibilities: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut scored: Vec<(f64, &str)> = possibilities
        .into_iter()
        .map(|candidate| (strsim::normalized_damerau_levenshtein(word, candidate), candidate))
        .filter(|(score, _)| *score >= SIMILARITY_CUTOFF)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, candidate)| candidate)
        .collect()
}

fn quoted<'a>(words: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    words.into_iter().map(|w| format!("\"{w}\"")).collect()
}

/// Summarize the required and optional keys of a class against the keys that were given.
fn describe_allowed_present_keys(got: &[&str], attributes: &[Attribute], missing: bool) -> String {
    let required = quoted(attributes.iter().filter(|a| a.required).map(|a| a.name.as_str()));
    let optional = quoted(attributes.iter().filter(|a| !a.required).map(|a| a.name.as_str()));

    let mut class_desc = Vec::new();
    if !required.is_empty() {
        let plural = required.len() > 1;
        class_desc.push(format!(
            "{} {} {} required here",
            if plural { "Keys" } else { "Key" },
            cjoin("and", &required),
            if plural { "are" } else { "is" },
        ));
    }
    if !optional.is_empty() {
        class_desc.push(format!(
            "{} {} optional",
            cjoin("and", &optional),
            if optional.len() > 1 { "are" } else { "is" },
        ));
    }
    if !missing {
        class_desc.push("no other keys are allowed".to_string());
    }

    let mut msg = if class_desc.is_empty() {
        "No keys are allowed here".to_string()
    } else {
        cjoin("and", &class_desc)
    };

    msg.push_str(", but");
    if got.is_empty() {
        msg.push_str(" no keys were given.");
        return msg;
    }
    if missing && got.iter().all(|g| attributes.iter().any(|a| a.name == *g)) {
        msg.push_str(" only");
    }
    msg.push(' ');
    msg.push_str(&cjoin("and", quoted(got.iter().copied())));
    msg.push_str(if got.len() > 1 { " were given." } else { " was given." });
    msg
}

/// Explain that the required key `name` is missing from a mapping with keys `got`.
///
/// Keys that were given but are not declared, and that look like `name`, are
/// suggested as typos. Without such a suggestion, small classes get a summary
/// of their allowed keys.
pub fn diagnose_missing_key(name: &str, got: &[&str], attributes: &[Attribute]) -> String {
    let mut a = format!("\"{name}\"");
    if name.contains('_') {
        a.push_str(&format!(" or maybe \"{}\"", name.replace('_', "-")));
    }
    let expected_msg = format!("Expected a key {a} but it was not found.");

    let similar: Vec<&str> = close_matches(name, got.iter().copied())
        .into_iter()
        .filter(|s| !attributes.iter().any(|attr| attr.name == *s))
        .collect();

    let suggestion = if !similar.is_empty() {
        format!(
            "Maybe {} was intended to be {a}?",
            cjoin("or", quoted(similar))
        )
    } else if attributes.len() < DESCRIBE_KEYS_BELOW {
        return describe_allowed_present_keys(got, attributes, true);
    } else {
        "Maybe it was forgotten or indented incorrectly?".to_string()
    };
    format!("{expected_msg} {suggestion}")
}

/// Explain that the key `name` is not declared on a class.
///
/// Optional keys that were not given and look like `name` are suggested.
pub fn diagnose_extraneous_key(name: &str, got: &[&str], attributes: &[Attribute]) -> String {
    let expected_msg = format!("Found a key \"{name}\", which is not allowed here.");

    let optional = attributes.iter().filter(|a| !a.required).map(|a| a.name.as_str());
    let similar: Vec<&str> = close_matches(name, optional)
        .into_iter()
        .filter(|s| !got.contains(s))
        .collect();

    let suggestion = if !similar.is_empty() {
        format!(
            "Maybe \"{name}\" was intended to be {}?",
            cjoin("or", quoted(similar))
        )
    } else if attributes.len() < DESCRIBE_KEYS_BELOW {
        // the key summary already says the key is not allowed
        return describe_allowed_present_keys(got, attributes, false);
    } else {
        "No similar allowed keys were found either. Maybe it was indented incorrectly?".to_string()
    };
    format!("{expected_msg} {suggestion}")
}

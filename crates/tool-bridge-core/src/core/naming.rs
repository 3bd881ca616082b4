// crates/tool-bridge-core/src/core/naming.rs
// ============================================================================
// Module: Name Canonicalizer
// Description: Deterministic mapping from declared identifiers to tool names.
// Purpose: Derive stable external names and payload field names.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Declared identifiers are mixed-case compounds such as `GetAllAsync` or
//! `HTTPRequest`. Canonicalization strips a trailing `Async` marker when
//! something remains, splits the identifier into words (acronym runs stay
//! together), and joins the lowercase words with the convention separator.
//!
//! ## Invariants
//! - Canonicalization is pure and deterministic.
//! - Applying the convention to an already-converted name is a no-op.
//! - Field renaming never drops a value; colliding keys are an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix marking asynchronous operations in declared identifiers.
const ASYNC_SUFFIX: &str = "Async";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Output naming convention for tool names and payload fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// `lower_snake_case`.
    #[default]
    SnakeCase,
    /// `lower-kebab-case`.
    KebabCase,
}

impl NamingConvention {
    /// Returns the word separator for this convention.
    #[must_use]
    pub const fn separator(self) -> char {
        match self {
            Self::SnakeCase => '_',
            Self::KebabCase => '-',
        }
    }

    /// Converts a compound identifier without stripping any suffix.
    #[must_use]
    pub fn apply(self, identifier: &str) -> String {
        let separator = self.separator().to_string();
        split_words(identifier)
            .into_iter()
            .map(|word| word.to_lowercase())
            .collect::<Vec<_>>()
            .join(&separator)
    }
}

/// Two keys of one payload object map to the same converted name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("payload fields collide after renaming: {field}")]
pub struct FieldCollision {
    /// Converted key shared by more than one field.
    pub field: String,
}

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Maps a declared operation identifier to its external tool name.
///
/// # Examples
///
/// ```
/// use tool_bridge_core::NamingConvention;
/// use tool_bridge_core::canonicalize;
///
/// assert_eq!(canonicalize("GetAllAsync", NamingConvention::SnakeCase), "get_all");
/// assert_eq!(canonicalize("Async", NamingConvention::SnakeCase), "async");
/// assert_eq!(canonicalize("HTTPRequest", NamingConvention::SnakeCase), "http_request");
/// ```
#[must_use]
pub fn canonicalize(identifier: &str, convention: NamingConvention) -> String {
    let stem = match identifier.strip_suffix(ASYNC_SUFFIX) {
        Some(rest) if !rest.is_empty() => rest,
        _ => identifier,
    };
    convention.apply(stem)
}

/// Splits a compound identifier into words.
///
/// Case boundaries start a new word, runs of uppercase letters form one
/// word (the last capital of a run begins the next word when a lowercase
/// letter follows it), digits stay with the preceding word, and `_`, `-`,
/// `.` and whitespace separate words.
#[must_use]
pub fn split_words(identifier: &str) -> Vec<String> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (index, &ch) in chars.iter().enumerate() {
        if is_separator(ch) {
            flush(&mut current, &mut words);
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(|next| next.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                flush(&mut current, &mut words);
            }
        }
        current.push(ch);
    }
    flush(&mut current, &mut words);
    words
}

/// Renames every object key in `value` using `convention`, recursively.
///
/// # Errors
///
/// Returns [`FieldCollision`] when two keys of one object convert to the
/// same name.
pub fn rename_fields(value: Value, convention: NamingConvention) -> Result<Value, FieldCollision> {
    match value {
        Value::Object(map) => {
            let mut renamed = Map::with_capacity(map.len());
            for (key, inner) in map {
                let field = convention.apply(&key);
                if renamed.contains_key(&field) {
                    return Err(FieldCollision {
                        field,
                    });
                }
                renamed.insert(field, rename_fields(inner, convention)?);
            }
            Ok(Value::Object(renamed))
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| rename_fields(item, convention))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true for characters that separate words.
fn is_separator(ch: char) -> bool {
    matches!(ch, '_' | '-' | '.') || ch.is_whitespace()
}

/// Moves a non-empty word buffer into the output list.
fn flush(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

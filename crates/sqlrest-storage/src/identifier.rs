// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table and column names that are safe to embed in SQL text.
//!
//! Values are always bound as parameters. Identifiers cannot be, so every
//! identifier that reaches a statement goes through [`Ident::parse`] and is
//! emitted with [`Ident::quoted`]. Nothing else in the crate formats a
//! caller-supplied name into SQL.

use std::fmt;

use sqlrest_core::SqlRestError;

/// Longest accepted identifier, in bytes.
pub const MAX_IDENT_LEN: usize = 64;

/// A validated SQL identifier: ASCII letters, digits and `_`, not purely
/// numeric, 1 to [`MAX_IDENT_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn parse(name: &str) -> Result<Self, SqlRestError> {
        let reject = |reason: String| SqlRestError::InvalidIdentifier {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(reject("identifier is empty".to_string()));
        }
        if name.len() > MAX_IDENT_LEN {
            return Err(reject(format!("longer than {MAX_IDENT_LEN} characters")));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(reject(format!("character {c:?} is not allowed")));
        }
        if name.bytes().all(|b| b.is_ascii_digit()) {
            return Err(reject("identifier is purely numeric".to_string()));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL text.
    pub fn quoted(&self) -> String {
        // The grammar admits no `"`, so no escaping is needed.
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

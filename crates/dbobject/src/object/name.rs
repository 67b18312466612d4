// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identifier folding and qualified names.

use crate::config::{QUOTE, SCHEMA_SEPARATOR};
use std::borrow::Cow;

/// Fold an identifier the way the engine does: uppercase unless it contains
/// a quote character, in which case it is case-sensitive and kept as is.
pub fn normalize(name: &str) -> Cow<'_, str> {
    if name.contains(QUOTE) || !name.chars().any(char::is_lowercase) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(name.to_uppercase())
    }
}

/// `SCHEMA.NAME`, or `NAME` when the schema is empty.
pub fn full_name(schema: &str, name: &str) -> String {
    if schema.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", schema, SCHEMA_SEPARATOR, name)
    }
}

/// Strip one pair of surrounding quotes, if present.
pub fn unquote(name: &str) -> &str {
    name.strip_prefix(QUOTE)
        .and_then(|rest| rest.strip_suffix(QUOTE))
        .unwrap_or(name)
}

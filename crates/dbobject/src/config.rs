// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Constants shared by the object type system and the in-memory engine.
//!
//! Identifier rules encode the engine's: names are folded to uppercase
//! unless they contain a quote character, which marks them case-sensitive.
//! Callers depend on this folding for compatibility, do not change it.

/// Quote character marking a case-sensitive identifier.
pub const QUOTE: char = '"';

/// Maximum width in bytes of the decimal text encoding of a NUMBER.
///
/// Reading a NUMBER attribute as bytes requires the caller to supply a
/// buffer of this size up front.
pub const DECIMAL_BUFFER_WIDTH: usize = 39;

/// Schema used by the in-memory engine for unqualified catalog names.
pub const DEFAULT_SCHEMA: &str = "PUBLIC";

/// Separator between schema and type name in fully-qualified names.
pub const SCHEMA_SEPARATOR: char = '.';

/// Upper bound on attributes per type (the engine counts them in a `u16`).
pub const MAX_ATTRIBUTES: usize = u16::MAX as usize;

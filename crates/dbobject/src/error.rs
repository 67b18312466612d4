// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for object type, instance and collection operations.

use crate::bridge::{Bridge, BridgeError, Status};
use thiserror::Error;

/// Errors returned by dbobject operations.
///
/// Every failure reported by the [`Bridge`] is converted into
/// [`Error::Bridge`] at the call site, labelled with the operation that
/// failed. There is no local retry: a bridge failure ends the current call.
///
/// # Example
///
/// ```rust,ignore
/// match address.get("COUNTRY") {
///     Err(Error::NoSuchAttribute { attribute, .. }) => println!("no {}", attribute),
///     Err(e) => println!("other error: {}", e),
///     Ok(datum) => println!("{:?}", datum),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Attribute name lookup missed on a structured type.
    #[error("{type_name}: no such attribute {attribute}")]
    NoSuchAttribute { type_name: String, attribute: String },

    /// Collection operation requested on a type that is not a collection.
    #[error("{0} is not a collection type")]
    NotCollection(String),

    /// Index or iteration miss. `None` when the collection has no element at all.
    #[error("{}", describe_missing(.0))]
    NotExist(Option<i32>),

    /// Operation on a closed or never bound type/instance.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Failure reported by the engine bridge.
    #[error("at {at}: {source}")]
    Bridge {
        at: String,
        #[source]
        source: BridgeError,
    },

    /// Payload cannot be converted to the requested application type.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid in-memory catalog definition.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// IO error while reading a catalog file.
    #[cfg(feature = "catalog-loaders")]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML catalog could not be parsed.
    #[cfg(feature = "catalog-loaders")]
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create an InvalidState error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState(message.into())
    }

    /// True for the iteration/lookup miss that terminates collection loops.
    pub fn is_not_exist(&self) -> bool {
        matches!(self, Error::NotExist(_))
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

fn describe_missing(index: &Option<i32>) -> String {
    match index {
        Some(i) => format!("element {} does not exist", i),
        None => "no such element".to_string(),
    }
}

/// Result type alias for dbobject operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error together with the results produced before it occurred.
///
/// Returned by operations with partial effects, such as
/// [`CollectionInstance::to_vec`](crate::CollectionInstance::to_vec).
#[derive(Error, Debug)]
#[error("{source}")]
pub struct Partial<T> {
    /// Results materialized before the failure.
    pub partial: T,
    /// The first error encountered.
    #[source]
    pub source: Error,
}

impl<T> Partial<T> {
    /// Discard the partial results.
    pub fn into_error(self) -> Error {
        self.source
    }
}

/// Conversion of a raw bridge [`Status`] into a labelled [`Result`].
pub(crate) trait StatusExt<T> {
    /// On failure, fetch the structured error from `bridge` immediately and
    /// label it with the operation built by `at`.
    fn at<F>(self, bridge: &dyn Bridge, at: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> StatusExt<T> for Status<T> {
    fn at<F>(self, bridge: &dyn Bridge, at: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|_| Error::Bridge {
            at: at(),
            source: bridge.last_error(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_exist_display() {
        assert_eq!(
            Error::NotExist(Some(3)).to_string(),
            "element 3 does not exist"
        );
        assert_eq!(Error::NotExist(None).to_string(), "no such element");
        assert!(Error::NotExist(None).is_not_exist());
        assert!(!Error::NotCollection("HR.ADDRESS".into()).is_not_exist());
    }

    #[test]
    fn test_bridge_error_chain() {
        let err = Error::Bridge {
            at: "append".into(),
            source: BridgeError::new(1014, "conversion not implemented"),
        };
        let detailed = err.format_detailed();
        assert!(detailed.contains("at append"));
        assert!(detailed.contains("Caused by"));
        assert!(detailed.contains("1014"));
    }
}

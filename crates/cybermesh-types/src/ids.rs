//! Identifier newtypes.
//!
//! Payload ids are supplied by whoever injects a payload (test harness,
//! stimulus injector, operator API). The mesh never invents or rewrites
//! them; they exist so every pass event can be traced back to its origin.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Caller-supplied token identifying one delta payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct PayloadId(pub String);

impl PayloadId {
    /// Create a payload id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the inner [`String`].
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for PayloadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PayloadId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PayloadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

//! Strongly typed identifiers for stream content, sessions and pagination.
//!
//! A [`ContentId`] is the opaque string the rest of the system keys on. Servers
//! address content with a structured [`WireContentId`]; the two forms convert
//! into each other losslessly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FeedError;

/// Separator between the namespace and the numeric id in the string form.
pub const CONTENT_ID_SEPARATOR: &str = "::";

/// Structured content identifier as carried in server responses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WireContentId {
    /// Namespace (content domain) the id lives in.
    pub namespace: String,
    /// Numeric id within the namespace; zero when absent on the wire.
    #[serde(default)]
    pub id: u64,
}

impl WireContentId {
    /// Create a new wire id.
    pub fn new(namespace: impl Into<String>, id: u64) -> Self {
        Self {
            namespace: namespace.into(),
            id,
        }
    }

    /// Render the stream (string) form of this id.
    pub fn to_content_id(&self) -> ContentId {
        ContentId(format!(
            "{}{}{}",
            self.namespace, CONTENT_ID_SEPARATOR, self.id
        ))
    }

    /// Parse the stream form back into a wire id.
    ///
    /// The numeric part follows the last separator and must be a canonical
    /// decimal, so every string accepted here is produced by exactly one
    /// wire id.
    pub fn parse(value: &str) -> Result<Self, FeedError> {
        let (namespace, digits) = value.rsplit_once(CONTENT_ID_SEPARATOR).ok_or_else(|| {
            FeedError::parse(format!("content id `{value}` has no namespace separator"))
        })?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FeedError::parse(format!(
                "content id `{value}` has a non-numeric id part"
            )));
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(FeedError::parse(format!(
                "content id `{value}` has a non-canonical id part"
            )));
        }

        let id = digits
            .parse::<u64>()
            .map_err(|e| FeedError::parse(format!("content id `{value}`: {e}")))?;

        Ok(Self::new(namespace, id))
    }
}

/// Opaque identifier for one unit of stream content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap a string as a content id.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id, returning the underlying string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the id is empty (never valid in an operation).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Namespace portion when the id is in wire-derived form.
    pub fn namespace(&self) -> Option<&str> {
        self.0
            .rsplit_once(CONTENT_ID_SEPARATOR)
            .map(|(namespace, _)| namespace)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&WireContentId> for ContentId {
    fn from(value: &WireContentId) -> Self {
        value.to_content_id()
    }
}

/// Identifier of a client-visible session; doubles as its re-attach token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Allocate a fresh random session id.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Return the raw UUID.
    pub const fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| FeedError::invalid(format!("session token `{s}`: {e}")))
    }
}

/// Opaque cursor marking where the next page of content begins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wrap an opaque server token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContinuationToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

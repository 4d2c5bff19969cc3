//! Feed wire schema and codec.
//!
//! Server responses are decoded into [`Response`] values by a [`WireCodec`].
//! The shipped codec speaks JSON; hosts with another encoding implement the
//! trait themselves.

use serde::{Deserialize, Serialize};

use crate::identifiers::WireContentId;

/// Schema version written by [`Response::new`] and accepted by the JSON codec.
pub const WIRE_SCHEMA_VERSION: u16 = 1;

fn default_schema_version() -> u16 {
    WIRE_SCHEMA_VERSION
}

/// Operation type as sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireOperationType {
    /// Write or overwrite content
    UpdateOrAppend,
    /// Remove content
    Remove,
    /// Clear a namespace or everything
    ClearAll,
    /// Any value this client does not understand
    #[serde(other)]
    Unknown,
}

/// Payload attached to an update operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WirePayload {
    /// Renderable feature bytes
    Feature {
        /// Opaque feature body
        data: Vec<u8>,
    },
    /// Shared-state bytes
    SharedState {
        /// Opaque shared-state body
        data: Vec<u8>,
    },
    /// Next-page cursor
    Token {
        /// Opaque token value
        token: String,
    },
}

/// One operation record inside a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDataOperation {
    /// Operation type
    pub operation: WireOperationType,
    /// Target id; required for updates and removes, optional namespace for clears
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<WireContentId>,
    /// Payload; required for updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<WirePayload>,
}

/// Decoded server response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Schema version of the response
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    /// Operations in application order
    #[serde(default)]
    pub data_operations: Vec<WireDataOperation>,
}

impl Response {
    /// Build a response at the current schema version.
    pub fn new(data_operations: Vec<WireDataOperation>) -> Self {
        Self {
            schema_version: WIRE_SCHEMA_VERSION,
            data_operations,
        }
    }
}

/// Why a request is issued; sent in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestReason {
    /// Refresh of HEAD for all future sessions
    HeadRefresh,
    /// Refresh requested by one session
    SessionRefresh,
    /// Next page for a continuation token
    NextPage,
}

/// JSON request body sent to the feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedQuery {
    /// Why the request is made
    pub reason: RequestReason,
    /// Continuation token for next-page requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Failure to decode response bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Body was empty
    #[error("empty response body")]
    Empty,
    /// Body did not match the schema
    #[error("malformed response: {0}")]
    Malformed(String),
    /// Schema version newer than this client understands
    #[error("unsupported schema version {found}")]
    UnsupportedVersion {
        /// Version found in the response
        found: u16,
    },
}

/// Decoder for raw response bytes.
pub trait WireCodec: Send + Sync {
    /// Decode bytes into a response.
    fn decode(&self, bytes: &[u8]) -> Result<Response, DecodeError>;

    /// Encode a response; used by fakes and fixtures.
    fn encode(&self, response: &Response) -> Result<Vec<u8>, DecodeError>;
}

/// JSON rendition of the wire schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWireCodec;

impl WireCodec for JsonWireCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Response, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let response: Response =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        if response.schema_version > WIRE_SCHEMA_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                found: response.schema_version,
            });
        }
        Ok(response)
    }

    fn encode(&self, response: &Response) -> Result<Vec<u8>, DecodeError> {
        serde_json::to_vec(response).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unknown_operation_types_decode_as_unknown() {
        let body = br#"{"data_operations":[{"operation":"MERGE_LATER"}]}"#;
        let response = JsonWireCodec.decode(body).unwrap();
        assert_eq!(response.schema_version, WIRE_SCHEMA_VERSION);
        assert_eq!(
            response.data_operations[0].operation,
            WireOperationType::Unknown
        );
    }

    #[test]
    fn rejects_empty_and_future_bodies() {
        assert_matches!(JsonWireCodec.decode(b""), Err(DecodeError::Empty));
        assert_matches!(
            JsonWireCodec.decode(br#"{"schema_version":9}"#),
            Err(DecodeError::UnsupportedVersion { found: 9 })
        );
        assert_matches!(
            JsonWireCodec.decode(b"{not json"),
            Err(DecodeError::Malformed(_))
        );
    }

    #[test]
    fn payload_is_tagged_by_kind() {
        let op = WireDataOperation {
            operation: WireOperationType::UpdateOrAppend,
            content_id: Some(WireContentId::new("token", 3)),
            payload: Some(WirePayload::Token {
                token: "next".into(),
            }),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["operation"], "UPDATE_OR_APPEND");
        assert_eq!(json["payload"]["kind"], "token");
    }
}

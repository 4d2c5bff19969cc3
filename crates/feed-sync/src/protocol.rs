//! Protocol adapter
//!
//! Pure translation between the wire schema and [`DataOperation`]s. The
//! adapter holds no state and performs no I/O, so the same response always
//! yields the same operation list.

use std::sync::Arc;

use feed_core::wire::{
    JsonWireCodec, Response, WireCodec, WireDataOperation, WireOperationType, WirePayload,
};
use feed_core::{
    ContentId, ContinuationToken, DataOperation, FeedError, Payload, Result, WireContentId,
};
use tracing::debug;

/// Translates wire responses into data operations.
#[derive(Clone)]
pub struct ProtocolAdapter {
    codec: Arc<dyn WireCodec>,
}

impl Default for ProtocolAdapter {
    fn default() -> Self {
        Self::new(Arc::new(JsonWireCodec))
    }
}

impl std::fmt::Debug for ProtocolAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolAdapter").finish_non_exhaustive()
    }
}

impl ProtocolAdapter {
    /// Create an adapter decoding raw bodies with `codec`.
    pub fn new(codec: Arc<dyn WireCodec>) -> Self {
        Self { codec }
    }

    /// Translate a decoded response.
    ///
    /// Fails with [`FeedError::Parse`] if any record is structurally invalid;
    /// a failing response never yields a truncated list.
    pub fn create_model(&self, response: &Response) -> Result<Vec<DataOperation>> {
        let operations = response
            .data_operations
            .iter()
            .enumerate()
            .map(|(index, op)| convert_operation(index, op))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = operations.len(), "Translated wire response");
        Ok(operations)
    }

    /// Decode raw bytes and translate them.
    pub fn decode_model(&self, bytes: &[u8]) -> Result<Vec<DataOperation>> {
        let response = self.codec.decode(bytes)?;
        self.create_model(&response)
    }

    /// String form of a wire id.
    pub fn get_stream_content_id(&self, wire_id: &WireContentId) -> ContentId {
        wire_id.to_content_id()
    }

    /// Wire form of a stream id; inverse of [`get_stream_content_id`](Self::get_stream_content_id).
    pub fn get_wire_content_id(&self, content_id: &ContentId) -> Result<WireContentId> {
        WireContentId::parse(content_id.as_str())
    }
}

fn convert_operation(index: usize, op: &WireDataOperation) -> Result<DataOperation> {
    match op.operation {
        WireOperationType::UpdateOrAppend => {
            let id = required_id(index, op)?;
            let payload = match &op.payload {
                Some(WirePayload::Feature { data }) => Payload::Feature(data.clone()),
                Some(WirePayload::SharedState { data }) => Payload::SharedState(data.clone()),
                Some(WirePayload::Token { token }) if !token.is_empty() => {
                    Payload::Token(ContinuationToken::new(token.clone()))
                }
                Some(WirePayload::Token { .. }) => {
                    return Err(FeedError::parse(format!(
                        "operation {index}: empty continuation token"
                    )))
                }
                None => {
                    return Err(FeedError::parse(format!(
                        "operation {index}: update without payload"
                    )))
                }
            };
            Ok(DataOperation::UpdateOrAppend { id, payload })
        }
        WireOperationType::Remove => Ok(DataOperation::Remove {
            id: required_id(index, op)?,
        }),
        WireOperationType::ClearAll => Ok(DataOperation::ClearAll {
            namespace: op.content_id.as_ref().map(|id| id.namespace.clone()),
        }),
        WireOperationType::Unknown => Err(FeedError::parse(format!(
            "operation {index}: unknown operation type"
        ))),
    }
}

fn required_id(index: usize, op: &WireDataOperation) -> Result<ContentId> {
    match &op.content_id {
        Some(id) if !id.namespace.is_empty() => Ok(id.to_content_id()),
        Some(_) => Err(FeedError::parse(format!(
            "operation {index}: empty content id namespace"
        ))),
        None => Err(FeedError::parse(format!(
            "operation {index}: missing content id"
        ))),
    }
}
